//! # Study Harness CLI (`study`)
//!
//! The `study` binary is the primary interface for Study Harness. It
//! provides commands for database initialization, document processing,
//! search, LLM prompt assembly, quiz grading, and study planning.
//!
//! ## Usage
//!
//! ```bash
//! study --config ./config/study.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `study init` | Create the SQLite database and run schema migrations |
//! | `study process <path>…` | Segment documents and rebuild the chunk corpus |
//! | `study search "<query>"` | Ranked BM25 search over the corpus |
//! | `study topics` | List distinct `file → section` topics |
//! | `study stats` | Corpus statistics |
//! | `study prompt "<message>"` | Print the assembled LLM request as JSON |
//! | `study quiz <student> <topic>` | Grade an answer and update the schedule |
//! | `study plan <student>` | Due, upcoming, and mastered topics |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use study_harness::{config, ingest, migrate, plan, prompt, quiz, search, stats};

/// Study Harness CLI — a local-first study-materials knowledge base
/// with BM25 retrieval and spaced-repetition scheduling.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/study.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "study",
    about = "Study Harness — turn study documents into a searchable, schedulable knowledge base",
    version,
    long_about = "Study Harness segments study documents (Word, PowerPoint, PDF, Excel, markdown, \
    plain text) into provenance-tagged chunks, ranks them with BM25, assembles token-bounded \
    context for a downstream LLM call, and tracks per-topic mastery with a simplified SM-2 \
    review schedule."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/study.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the schedule database.
    ///
    /// Creates the SQLite database file and the study_schedule and
    /// quiz_results tables. Idempotent — running it again is safe.
    Init,

    /// Segment documents into the chunk corpus.
    ///
    /// Accepts files and/or directories (directories are walked
    /// recursively). The corpus file is rebuilt wholesale from the
    /// given targets; a single failing file is skipped with a
    /// diagnostic and never aborts the batch.
    Process {
        /// Files or directories of study material.
        #[arg(required = true)]
        targets: Vec<PathBuf>,
    },

    /// Search the chunk corpus.
    ///
    /// Ranks every chunk with BM25 and prints the top results with
    /// their relevance scores and provenance.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List distinct `file → section` topics in the corpus.
    Topics,

    /// Show corpus statistics (chunk, file, and word counts).
    Stats,

    /// Assemble the LLM request for a message and print it as JSON.
    ///
    /// Retrieves relevant chunks, builds the tutor system prompt around
    /// them, and bounds the conversation history to the configured
    /// token budget. The output is exactly what the collaborator LLM
    /// call consumes.
    Prompt {
        /// The new user message.
        message: String,

        /// JSON file of prior turns: `[{"role": "user", "content": "…"}, …]`.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Student id; adds name and weak areas to the system prompt.
        #[arg(long)]
        student: Option<String>,
    },

    /// Grade a quiz answer and update the review schedule.
    Quiz {
        /// Student id.
        student: String,

        /// Topic being quizzed.
        topic: String,

        /// The student's answer.
        #[arg(long)]
        answer: String,

        /// The expected answer.
        #[arg(long)]
        expected: String,

        /// The question text (recorded with the result).
        #[arg(long, default_value = "")]
        question: String,
    },

    /// Show the study plan: due, upcoming, and mastered topics.
    Plan {
        /// Student id.
        student: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Process { targets } => {
            ingest::run_process(&cfg, &targets)?;
        }
        Commands::Search { query, top_k } => {
            search::run_search(&cfg, &query, top_k)?;
        }
        Commands::Topics => {
            stats::run_topics(&cfg)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::Prompt {
            message,
            history,
            student,
        } => {
            prompt::run_prompt(&cfg, &message, history.as_deref(), student.as_deref()).await?;
        }
        Commands::Quiz {
            student,
            topic,
            answer,
            expected,
            question,
        } => {
            quiz::run_quiz(&cfg, &student, &topic, &question, &answer, &expected, today).await?;
        }
        Commands::Plan { student } => {
            plan::run_plan(&cfg, &student, today).await?;
        }
    }

    Ok(())
}
