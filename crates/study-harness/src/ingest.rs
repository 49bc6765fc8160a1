//! Processing pipeline orchestration.
//!
//! Coordinates the full upload flow: extract each file, post-filter the
//! raw chunks, persist the combined corpus as `chunks.json` (whole-file
//! overwrite), and report what happened. A single file failing never
//! aborts the batch — it logs a diagnostic and contributes zero chunks.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use study_harness_core::index::IndexSnapshot;
use study_harness_core::models::Chunk;
use study_harness_core::segment::post_filter;

use crate::config::Config;
use crate::extract::{extract_file, is_supported};

/// Process a single file into filtered, densely indexed chunks.
///
/// Unsupported extensions and extractor failures are diagnostics, not
/// errors: both yield an empty chunk list so the batch continues.
pub fn process_file(path: &Path, config: &Config) -> Vec<Chunk> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !is_supported(&ext) {
        warn!(file = %path.display(), extension = %ext, "unsupported file type, skipping");
        return Vec::new();
    }

    match extract_file(path, config) {
        Ok(raw) => {
            let (kept, dropped) = post_filter(raw, config.chunking.min_chunk_words);
            if dropped > 0 {
                info!(
                    file = %path.display(),
                    chunks = kept.len(),
                    dropped,
                    "segmented (short chunks dropped)"
                );
            } else {
                info!(file = %path.display(), chunks = kept.len(), "segmented");
            }
            kept
        }
        Err(e) => {
            error!(file = %path.display(), error = %e, "extraction failed, skipping file");
            Vec::new()
        }
    }
}

/// Recursively process every supported file under a directory, in
/// sorted path order.
pub fn process_directory(dir: &Path, config: &Config) -> Vec<Chunk> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| is_supported(&e.to_lowercase()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    info!(dir = %dir.display(), files = files.len(), "processing directory");

    let mut all_chunks = Vec::new();
    for path in files {
        all_chunks.extend(process_file(&path, config));
    }
    all_chunks
}

/// Persist the full chunk corpus, overwriting any previous file.
pub fn save_chunks(chunks: &[Chunk], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(chunks)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write chunks: {}", path.display()))?;
    Ok(())
}

/// Load a chunk corpus from disk.
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunks: {}", path.display()))?;
    let chunks: Vec<Chunk> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chunks: {}", path.display()))?;
    Ok(chunks)
}

/// The current corpus, or empty when nothing has been processed yet —
/// an unbuilt index is a valid state, not an error.
pub fn load_corpus(config: &Config) -> Vec<Chunk> {
    let path = config.chunks_path();
    if !path.exists() {
        return Vec::new();
    }
    match load_chunks(&path) {
        Ok(chunks) => chunks,
        Err(e) => {
            error!(error = %e, "failed to load corpus, treating as empty");
            Vec::new()
        }
    }
}

/// Run the `process` command: segment the targets, persist the corpus,
/// and print a summary.
pub fn run_process(config: &Config, targets: &[PathBuf]) -> Result<()> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut files_seen = 0usize;
    for target in targets {
        if target.is_dir() {
            chunks.extend(process_directory(target, config));
        } else {
            files_seen += 1;
            chunks.extend(process_file(target, config));
        }
    }

    let chunks_path = config.chunks_path();
    save_chunks(&chunks, &chunks_path)?;

    let stats = IndexSnapshot::build(chunks).stats();

    println!("process");
    if files_seen > 0 {
        println!("  files given: {}", files_seen);
    }
    println!("  files indexed: {}", stats.total_files);
    println!("  chunks written: {}", stats.total_chunks);
    println!("  total words: {}", stats.total_words);
    println!("  corpus: {}", chunks_path.display());
    println!("ok");

    Ok(())
}
