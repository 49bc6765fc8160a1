//! Section windowing and text segmentation.
//!
//! Every extractor reduces its format to titled sections of plain text;
//! this module turns those sections into [`Chunk`]s. Oversized sections
//! are split into windows of at most `max_words` words, and each window
//! after the first is prefixed with the trailing `overlap_words` words of
//! its predecessor so information at a window boundary is never lost.
//!
//! # Algorithm
//!
//! 1. Split the section on blank-line paragraph boundaries.
//! 2. Accumulate paragraphs into a window until adding the next one
//!    would exceed `max_words`, then start a new window.
//! 3. A single paragraph larger than `max_words` is split further on
//!    sentence boundaries (after `.`, `!`, or `?` followed by space).
//! 4. Prefix windows 1..N with the previous window's trailing overlap.
//!
//! The module also hosts the markdown/plain-text segmenters (the only
//! formats that need no binary extraction) and the global post-filter
//! that drops low-signal chunks and reassigns dense chunk indices.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::Chunk;

/// Windowing parameters shared by all extractors.
#[derive(Debug, Clone, Copy)]
pub struct WindowPolicy {
    /// Soft maximum words per window.
    pub max_words: usize,
    /// Trailing words carried from the previous window.
    pub overlap_words: usize,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            max_words: 250,
            overlap_words: 30,
        }
    }
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").unwrap())
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,3}\s+").unwrap())
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    paragraph_re()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split a paragraph after sentence-ending punctuation followed by
/// whitespace. Keeps the punctuation with the preceding sentence.
fn split_sentences(para: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = para.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            let mut j = i + 1;
            while j < bytes.len() && matches!(bytes[j], b'.' | b'!' | b'?') {
                j += 1;
            }
            if j < bytes.len() && (bytes[j] as char).is_whitespace() {
                out.push(para[start..j].trim());
                while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                    j += 1;
                }
                start = j;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    if start < para.len() {
        let tail = para[start..].trim();
        if !tail.is_empty() {
            out.push(tail);
        }
    }
    out
}

/// Split `text` into windows of roughly `max_words` words with trailing
/// overlap carried from the previous window. Paragraphs are the primary
/// unit; an empty or whitespace-only input yields no windows.
pub fn window_text(text: &str, policy: WindowPolicy) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let paragraphs = split_paragraphs(text);
    if paragraphs.is_empty() {
        return Vec::new();
    }

    let mut windows: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0usize;

    fn flush(windows: &mut Vec<String>, current: &mut Vec<&str>, current_words: &mut usize) {
        if current.is_empty() {
            return;
        }
        let text = current.join("\n").trim().to_string();
        if !text.is_empty() {
            windows.push(text);
        }
        current.clear();
        *current_words = 0;
    }

    for para in paragraphs {
        let word_count = para.split_whitespace().count();
        if word_count > policy.max_words {
            for sentence in split_sentences(para) {
                let s_words = sentence.split_whitespace().count();
                if current_words + s_words > policy.max_words && !current.is_empty() {
                    flush(&mut windows, &mut current, &mut current_words);
                }
                current.push(sentence);
                current_words += s_words;
            }
            continue;
        }

        if current_words + word_count > policy.max_words && !current.is_empty() {
            flush(&mut windows, &mut current, &mut current_words);
        }
        current.push(para);
        current_words += word_count;
    }
    flush(&mut windows, &mut current, &mut current_words);

    if policy.overlap_words == 0 || windows.len() <= 1 {
        return windows;
    }

    // Carry tail words forward so window boundaries stay searchable.
    let mut overlapped = Vec::with_capacity(windows.len());
    for (idx, window) in windows.iter().enumerate() {
        if idx == 0 {
            overlapped.push(window.clone());
            continue;
        }
        let prev_words: Vec<&str> = windows[idx - 1].split_whitespace().collect();
        let start = prev_words.len().saturating_sub(policy.overlap_words);
        let overlap = prev_words[start..].join(" ");
        if overlap.is_empty() {
            overlapped.push(window.clone());
        } else {
            overlapped.push(format!("{}\n{}", overlap, window));
        }
    }
    overlapped
}

/// True when the content carries a markdown image reference pointing at
/// the image-serving route. Image-bearing chunks survive the word-count
/// post-filter regardless of length.
pub fn has_image_ref(content: &str) -> bool {
    content.contains("![") && content.contains("/api/images/")
}

/// Window a titled section into chunks.
pub fn section_to_chunks(
    source_file: &str,
    source_type: &str,
    section_title: &str,
    body: &str,
    page_or_slide: Option<u32>,
    policy: WindowPolicy,
) -> Vec<Chunk> {
    window_text(body, policy)
        .into_iter()
        .map(|window| {
            Chunk::new(
                source_file,
                source_type,
                section_title,
                window,
                page_or_slide,
            )
        })
        .collect()
}

/// Segment markdown into sections split on level 1–3 heading lines.
///
/// Content before the first heading is titled `Introduction`. A file
/// with no heading structure becomes one `Full Document` chunk.
pub fn segment_markdown(source_file: &str, content: &str, policy: WindowPolicy) -> Vec<Chunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current_title = "Introduction".to_string();
    let mut current_body: Vec<&str> = Vec::new();

    let mut flush = |title: &str, body: &mut Vec<&str>, chunks: &mut Vec<Chunk>| {
        if body.is_empty() {
            return;
        }
        let text = body.join("\n");
        chunks.extend(section_to_chunks(
            source_file,
            "md",
            title,
            &text,
            None,
            policy,
        ));
        body.clear();
    };

    for line in content.lines() {
        if heading_re().is_match(line.trim_start()) {
            flush(&current_title, &mut current_body, &mut chunks);
            current_title = heading_re()
                .replace(line.trim(), "")
                .trim()
                .to_string();
        } else {
            current_body.push(line);
        }
    }
    flush(&current_title, &mut current_body, &mut chunks);

    if chunks.is_empty() {
        vec![Chunk::new(
            source_file,
            "md",
            "Full Document",
            content.to_string(),
            None,
        )]
    } else {
        chunks
    }
}

/// Segment non-markdown plain text on blank-line paragraph boundaries,
/// one `Section N` per paragraph, each windowed. Falls back to a single
/// `Full Document` chunk when nothing structural survives.
pub fn segment_plain_text(source_file: &str, content: &str, policy: WindowPolicy) -> Vec<Chunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    for (i, para) in split_paragraphs(content).iter().enumerate() {
        let title = format!("Section {}", i + 1);
        chunks.extend(section_to_chunks(
            source_file,
            "txt",
            &title,
            para,
            None,
            policy,
        ));
    }

    if chunks.is_empty() {
        vec![Chunk::new(
            source_file,
            "txt",
            "Full Document",
            content.to_string(),
            None,
        )]
    } else {
        chunks
    }
}

/// Drop chunks below `min_words` unless they carry an image reference,
/// then reassign `chunk_index` as a dense 0-based sequence.
///
/// Callers apply this per source file, so indices restart at 0 for each
/// file in a batch. Returns the kept chunks and the dropped count.
pub fn post_filter(chunks: Vec<Chunk>, min_words: usize) -> (Vec<Chunk>, usize) {
    let before = chunks.len();
    let mut kept: Vec<Chunk> = chunks
        .into_iter()
        .filter(|c| c.word_count >= min_words || has_image_ref(&c.content))
        .collect();
    for (idx, chunk) in kept.iter_mut().enumerate() {
        chunk.chunk_index = idx;
    }
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_section_is_one_window() {
        let windows = window_text(&words(40), WindowPolicy::default());
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn oversized_section_splits_with_overlap() {
        let policy = WindowPolicy {
            max_words: 50,
            overlap_words: 10,
        };
        let text = format!("{}\n\n{}\n\n{}", words(40), words(40), words(40));
        let windows = window_text(&text, policy);
        assert!(windows.len() > 1);

        // Every later window starts with its predecessor's tail.
        for idx in 1..windows.len() {
            let prev: Vec<&str> = windows[idx - 1].split_whitespace().collect();
            let tail = prev[prev.len() - policy.overlap_words..].join(" ");
            assert!(
                windows[idx].starts_with(&tail),
                "window {} missing overlap prefix",
                idx
            );
        }
    }

    #[test]
    fn giant_paragraph_splits_on_sentences() {
        let sentences: Vec<String> = (0..30)
            .map(|i| format!("Sentence number {} has exactly six words.", i))
            .collect();
        let para = sentences.join(" ");
        let windows = window_text(
            &para,
            WindowPolicy {
                max_words: 60,
                overlap_words: 0,
            },
        );
        assert!(windows.len() > 1);
        for w in &windows {
            assert!(w.split_whitespace().count() <= 70);
        }
    }

    #[test]
    fn empty_text_yields_no_windows() {
        assert!(window_text("", WindowPolicy::default()).is_empty());
        assert!(window_text("  \n\n  ", WindowPolicy::default()).is_empty());
    }

    #[test]
    fn markdown_splits_on_headings() {
        let md = "# Intro\n\nBody of the intro section.\n\n## Results\n\nBody of the results section.";
        let chunks = segment_markdown("notes.md", md, WindowPolicy::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title, "Intro");
        assert_eq!(chunks[1].section_title, "Results");
        assert_eq!(chunks[0].source_type, "md");
    }

    #[test]
    fn markdown_leading_text_is_introduction() {
        let md = "Some preamble text first.\n\n# Real Heading\n\nHeading body.";
        let chunks = segment_markdown("notes.md", md, WindowPolicy::default());
        assert_eq!(chunks[0].section_title, "Introduction");
        assert_eq!(chunks[1].section_title, "Real Heading");
    }

    #[test]
    fn markdown_without_headings_is_full_document() {
        let chunks = segment_markdown("flat.md", "just one flat line", WindowPolicy::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section_title, "Full Document");
    }

    #[test]
    fn plain_text_sections_are_numbered() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = segment_plain_text("notes.txt", text, WindowPolicy::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title, "Section 1");
        assert_eq!(chunks[1].section_title, "Section 2");
    }

    #[test]
    fn post_filter_drops_short_chunks_and_reindexes() {
        let chunks = vec![
            Chunk::new("f.md", "md", "A", words(40), None),
            Chunk::new("f.md", "md", "B", "too short", None),
            Chunk::new("f.md", "md", "C", words(35), None),
        ];
        let (kept, dropped) = post_filter(chunks, 30);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 1);
        assert_eq!(kept[0].chunk_index, 0);
        assert_eq!(kept[1].chunk_index, 1);
        assert_eq!(kept[1].section_title, "C");
    }

    #[test]
    fn post_filter_keeps_image_bearing_chunks() {
        let chunks = vec![Chunk::new(
            "deck.pptx",
            "pptx",
            "Slide 2",
            "![Slide 2 image 1](/api/images/deck_slide2_img1.png)",
            Some(2),
        )];
        let (kept, dropped) = post_filter(chunks, 30);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 0);
    }
}
