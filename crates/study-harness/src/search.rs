use anyhow::Result;

use study_harness_core::index::IndexSnapshot;
use study_harness_core::models::SearchHit;

use crate::config::Config;
use crate::ingest::load_corpus;

/// Width of the snippet printed under each result.
const SNIPPET_CHARS: usize = 160;

pub fn run_search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let snapshot = IndexSnapshot::build(load_corpus(config));
    let hits = snapshot.search(query, top_k);

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{:>2}. [{:.3}] {}", i + 1, hit.relevance_score, provenance(hit));
        let snippet: String = hit.chunk.content.chars().take(SNIPPET_CHARS).collect();
        println!("      {}", snippet.replace('\n', " "));
    }

    Ok(())
}

/// `file — Slide/Page N — section` provenance line for a hit.
pub fn provenance(hit: &SearchHit) -> String {
    let mut out = hit.chunk.source_file.clone();
    if let Some(pos) = hit.chunk.page_or_slide {
        let label = if hit.chunk.source_type == "pptx" {
            "Slide"
        } else {
            "Page"
        };
        out.push_str(&format!(" — {} {}", label, pos));
    }
    out.push_str(&format!(" — {}", hit.chunk.section_title));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_harness_core::models::Chunk;

    #[test]
    fn provenance_labels_slides_and_pages() {
        let slide = SearchHit {
            chunk: Chunk::new("deck.pptx", "pptx", "Optics", "body", Some(4)),
            relevance_score: 1.0,
        };
        assert_eq!(provenance(&slide), "deck.pptx — Slide 4 — Optics");

        let page = SearchHit {
            chunk: Chunk::new("book.pdf", "pdf", "Page 7", "body", Some(7)),
            relevance_score: 1.0,
        };
        assert_eq!(provenance(&page), "book.pdf — Page 7 — Page 7");

        let md = SearchHit {
            chunk: Chunk::new("notes.md", "md", "Intro", "body", None),
            relevance_score: 1.0,
        };
        assert_eq!(provenance(&md), "notes.md — Intro");
    }
}
