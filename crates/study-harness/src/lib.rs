//! # Study Harness
//!
//! A local-first study-materials knowledge base. Study Harness turns
//! uploaded documents (Word, PowerPoint, PDF, Excel, markdown, plain
//! text) into a queryable chunk corpus, ranks chunks with BM25,
//! assembles token-bounded context for a downstream LLM call, and
//! tracks per-topic mastery with a spaced-repetition schedule.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │  Extractors  │──▶│  Segmenter    │──▶│ chunks.json  │
//! │ docx/pptx/… │   │ window+filter │   │  + images/   │
//! └──────────────┘   └──────────────┘   └──────┬──────┘
//!                                              │
//!                      ┌───────────────────────┤
//!                      ▼                       ▼
//!                ┌──────────┐            ┌──────────┐
//!                │  BM25    │            │  Prompt  │──▶ collaborator LLM
//!                │  index   │            │ assembly │
//!                └──────────┘            └──────────┘
//!
//!                ┌────────────────────────────────┐
//!                │  SM-2 schedule (SQLite)        │◀── quiz outcomes
//!                └────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! study init                          # create the schedule database
//! study process ./materials          # segment and index documents
//! study search "krebs cycle"         # ranked retrieval
//! study prompt "explain osmosis"     # assembled LLM request as JSON
//! study quiz ada osmosis --answer B --expected B
//! study plan ada                     # due / upcoming / mastered
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Per-format document extraction |
//! | [`images`] | Side-file persistence for embedded images |
//! | [`ingest`] | Processing pipeline and corpus persistence |
//! | [`search`] | Ranked retrieval command |
//! | [`stats`] | Corpus statistics and topics |
//! | [`prompt`] | LLM request assembly |
//! | [`quiz`] | Answer grading and schedule updates |
//! | [`plan`] | Study-plan reporting |
//! | [`sqlite_store`] | SQLite schedule store |
//! | [`migrate`] | Schema migrations |
//! | [`db`] | Database connection |

pub mod config;
pub mod db;
pub mod extract;
pub mod images;
pub mod ingest;
pub mod migrate;
pub mod plan;
pub mod prompt;
pub mod quiz;
pub mod search;
pub mod sqlite_store;
pub mod stats;
