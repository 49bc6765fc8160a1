//! # Study Harness Core
//!
//! Shared, runtime-free logic for Study Harness: data models, the
//! section-windowing segmentation pass, the BM25 lexical index with
//! hot-swappable snapshots, the token-budgeted context assembler, the
//! SM-2 review transition, and the schedule store abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies beyond what the algorithms themselves need.
//! Everything here is a synchronous, single-call operation; the
//! application crate supplies configuration, extraction of binary
//! formats, and persistence.

pub mod context;
pub mod index;
pub mod models;
pub mod schedule;
pub mod segment;
pub mod store;
pub mod tokenize;
