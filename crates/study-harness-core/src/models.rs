//! Core data models used throughout Study Harness.
//!
//! These types represent the chunks, conversation turns, review records,
//! and search results that flow through the segmentation, retrieval, and
//! scheduling pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How many characters of content participate in the chunk fingerprint.
const FINGERPRINT_CONTENT_PREFIX: usize = 100;

/// How many hex characters of the digest become the chunk id.
const FINGERPRINT_LEN: usize = 12;

/// A single retrievable unit of study material with provenance.
///
/// Chunks are immutable after segmentation: reprocessing a source file
/// replaces its chunks wholesale. The JSON field names below are the wire
/// format used by `chunks.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Content-derived fingerprint; see [`Chunk::new`].
    pub id: String,
    /// File name (not path) of the source document.
    pub source_file: String,
    /// Format tag: `docx`, `pptx`, `pdf`, `xlsx`, `md`, or `txt`.
    pub source_type: String,
    /// Heading, slide title, sheet name, or synthetic title.
    pub section_title: String,
    /// The chunk body, possibly carrying markdown image references.
    pub content: String,
    /// Page or slide number, where the format has one.
    pub page_or_slide: Option<u32>,
    /// Dense 0-based position within the source file, assigned after
    /// the post-filter pass.
    pub chunk_index: usize,
    /// Always `content.split_whitespace().count()`; never caller-set.
    pub word_count: usize,
}

impl Chunk {
    /// Build a chunk, deriving `word_count` and the fingerprint id.
    ///
    /// The id is the first 12 hex characters of
    /// `sha256(source_file ":" section_title ":" content-prefix)`, so
    /// identical content under the same file and section always maps to
    /// the same id, and any content difference produces a different one.
    pub fn new(
        source_file: impl Into<String>,
        source_type: impl Into<String>,
        section_title: impl Into<String>,
        content: impl Into<String>,
        page_or_slide: Option<u32>,
    ) -> Self {
        let source_file = source_file.into();
        let section_title = section_title.into();
        let content = content.into();

        let prefix: String = content.chars().take(FINGERPRINT_CONTENT_PREFIX).collect();
        let mut hasher = Sha256::new();
        hasher.update(source_file.as_bytes());
        hasher.update(b":");
        hasher.update(section_title.as_bytes());
        hasher.update(b":");
        hasher.update(prefix.as_bytes());
        let id = format!("{:x}", hasher.finalize())[..FINGERPRINT_LEN].to_string();

        let word_count = content.split_whitespace().count();

        Self {
            id,
            source_file,
            source_type: source_type.into(),
            section_title,
            content,
            page_or_slide,
            chunk_index: 0,
            word_count,
        }
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation handed to the collaborator LLM.
///
/// Turns are ordered and ephemeral — owned by the caller session, never
/// persisted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A ranked search result: the chunk plus its BM25 score rounded to
/// 3 decimal places.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub relevance_score: f64,
}

/// Aggregate statistics over the currently loaded chunk set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub total_files: usize,
    pub files: Vec<String>,
    pub total_words: usize,
}

/// Per-(student, topic) spaced-repetition state.
///
/// Exactly one record exists per `(student_id, topic)` pair. Created
/// lazily on the first graded answer, mutated on every one after, never
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub student_id: String,
    pub topic: String,
    pub ease_factor: f64,
    pub interval_days: i64,
    pub repetitions: i64,
    pub next_review_date: NaiveDate,
    pub last_reviewed_date: NaiveDate,
}

/// A graded quiz answer, persisted so the study-day streak and per-topic
/// accuracy can be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub student_id: String,
    pub topic: String,
    pub question: String,
    pub student_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub recorded_on: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = Chunk::new("notes.md", "md", "Intro", "same content here", None);
        let b = Chunk::new("notes.md", "md", "Intro", "same content here", None);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 12);
    }

    #[test]
    fn fingerprint_differs_on_content() {
        let a = Chunk::new("notes.md", "md", "Intro", "first version", None);
        let b = Chunk::new("notes.md", "md", "Intro", "second version", None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn fingerprint_differs_on_section() {
        let a = Chunk::new("notes.md", "md", "Intro", "shared body", None);
        let b = Chunk::new("notes.md", "md", "Results", "shared body", None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn word_count_is_whitespace_token_count() {
        let c = Chunk::new("f.txt", "txt", "Section 1", "one  two\nthree\tfour ", None);
        assert_eq!(c.word_count, 4);
    }

    #[test]
    fn chunk_roundtrips_through_json() {
        let c = Chunk::new("deck.pptx", "pptx", "Slide 3", "body text of the slide", Some(3));
        let json = serde_json::to_string(&c).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
