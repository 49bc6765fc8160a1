//! LLM request assembly: retrieved context + system prompt + bounded
//! conversation history.
//!
//! The LLM call itself belongs to an external collaborator; this module
//! produces everything that call needs — a system prompt embedding the
//! retrieved study material and an ordered message list ending with the
//! new user message. `study prompt` prints the assembled request as
//! JSON so the collaborator (or a curious human) can consume it.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use study_harness_core::context::build_messages;
use study_harness_core::index::IndexSnapshot;
use study_harness_core::models::{ConversationTurn, SearchHit};
use study_harness_core::store::ScheduleStore;

use crate::config::Config;
use crate::db;
use crate::ingest::load_corpus;
use crate::search::provenance;
use crate::sqlite_store::SqliteScheduleStore;

/// Topics answered correctly less often than this rate are weak areas.
const WEAK_AREA_THRESHOLD: f64 = 0.7;

const TUTOR_SYSTEM_PROMPT: &str = "\
You are a patient, encouraging study tutor helping a student master their course materials.

Your style:
- Clear explanations, built up in digestible steps
- Use analogies and concrete examples to make concepts stick
- Use bold for key terms the student should remember
- When you reference material, say which source it came from
- Keep answers focused; studying time is limited

Diagrams and figures:
- The study materials contain markdown image tags like ![description](/api/images/figure.png)
- These reference files that already exist on the server; they are not requests to generate images.
- When a source chunk contains such a tag, copy it into your answer verbatim alongside your explanation, and never claim you cannot display images — the frontend renders the markdown.";

/// Render ranked hits as numbered source blocks for the system prompt.
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No relevant materials found for this question.".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "--- Source {} [{}] ---\n{}",
                i + 1,
                provenance(hit),
                hit.chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Combine the tutor prompt, retrieved material, and student context
/// into the system prompt for the collaborator LLM.
pub fn build_system_prompt(
    search_context: &str,
    student: Option<&str>,
    weak_areas: &[String],
) -> String {
    let mut parts = vec![TUTOR_SYSTEM_PROMPT.to_string()];

    if let Some(name) = student {
        parts.push(format!("\nThe student's name is {}.", name));
    }
    if !weak_areas.is_empty() {
        parts.push(format!(
            "Their weak areas are: {}. Pay extra attention if the question relates to these topics.",
            weak_areas.join(", ")
        ));
    }

    parts.push(format!(
        "\n## Study Materials\n<study_materials>\n{}\n</study_materials>",
        search_context
    ));

    parts.join("\n")
}

/// The fully assembled LLM request.
#[derive(Debug, Serialize)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub messages: Vec<ConversationTurn>,
}

fn load_history(path: &Path) -> Result<Vec<ConversationTurn>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file: {}", path.display()))
}

async fn weak_areas_for(config: &Config, student: &str) -> Result<Vec<String>> {
    if !config.db.path.exists() {
        return Ok(Vec::new());
    }
    let pool = db::connect(config).await?;
    let store = SqliteScheduleStore::new(pool);
    let accuracy = store.topic_accuracy(student).await?;
    Ok(accuracy
        .into_iter()
        .filter(|a| a.total > 0 && (a.correct as f64 / a.total as f64) < WEAK_AREA_THRESHOLD)
        .map(|a| a.topic)
        .collect())
}

pub async fn run_prompt(
    config: &Config,
    message: &str,
    history_path: Option<&Path>,
    student: Option<&str>,
) -> Result<()> {
    let snapshot = IndexSnapshot::build(load_corpus(config));
    let hits = snapshot.search(message, config.retrieval.top_k);
    let search_context = format_hits(&hits);

    let weak_areas = match student {
        Some(name) => weak_areas_for(config, name).await?,
        None => Vec::new(),
    };

    let history = match history_path {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let request = LlmRequest {
        system_prompt: build_system_prompt(&search_context, student, &weak_areas),
        messages: build_messages(
            message,
            &history,
            config.context.max_history,
            config.context.max_context_tokens,
        ),
    };

    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_harness_core::models::Chunk;

    fn hit(file: &str, title: &str, content: &str) -> SearchHit {
        SearchHit {
            chunk: Chunk::new(file, "md", title, content, None),
            relevance_score: 1.5,
        }
    }

    #[test]
    fn no_hits_renders_fallback_line() {
        assert_eq!(
            format_hits(&[]),
            "No relevant materials found for this question."
        );
    }

    #[test]
    fn hits_render_as_numbered_source_blocks() {
        let hits = vec![
            hit("bio.md", "Cells", "Mitochondria make ATP."),
            hit("bio.md", "Anatomy", "The inner ear controls balance."),
        ];
        let out = format_hits(&hits);
        assert!(out.starts_with("--- Source 1 [bio.md — Cells] ---\nMitochondria make ATP."));
        assert!(out.contains("--- Source 2 [bio.md — Anatomy] ---"));
    }

    #[test]
    fn system_prompt_embeds_context_and_student() {
        let prompt = build_system_prompt(
            "the retrieved material",
            Some("Ada"),
            &["Optics".to_string()],
        );
        assert!(prompt.contains("<study_materials>\nthe retrieved material\n</study_materials>"));
        assert!(prompt.contains("The student's name is Ada."));
        assert!(prompt.contains("weak areas are: Optics"));
    }

    #[test]
    fn system_prompt_omits_student_lines_when_absent() {
        let prompt = build_system_prompt("ctx", None, &[]);
        assert!(!prompt.contains("student's name"));
        assert!(!prompt.contains("weak areas"));
    }
}
