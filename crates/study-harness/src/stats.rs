//! Corpus statistics and topic listing.
//!
//! Gives a quick summary of what's indexed — chunk counts, file counts,
//! word totals, and the distinct `file → section` topics — so an upload
//! can be sanity-checked at a glance.

use std::collections::BTreeMap;

use anyhow::Result;

use study_harness_core::index::IndexSnapshot;

use crate::config::Config;
use crate::ingest::load_corpus;

pub fn run_stats(config: &Config) -> Result<()> {
    let chunks = load_corpus(config);
    let snapshot = IndexSnapshot::build(chunks);
    let stats = snapshot.stats();

    println!("Study Harness — Corpus Stats");
    println!("============================");
    println!();
    println!("  Corpus:      {}", config.chunks_path().display());
    println!("  Chunks:      {}", stats.total_chunks);
    println!("  Files:       {}", stats.total_files);
    println!("  Total words: {}", stats.total_words);

    if !stats.files.is_empty() {
        // Per-file breakdown
        let mut per_file: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for chunk in snapshot.chunks() {
            let entry = per_file.entry(&chunk.source_file).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += chunk.word_count;
        }

        println!();
        println!("  By file:");
        println!("  {:<36} {:>6} {:>8}", "FILE", "CHUNKS", "WORDS");
        println!("  {}", "-".repeat(52));
        for (file, (chunk_count, words)) in per_file {
            println!("  {:<36} {:>6} {:>8}", file, chunk_count, words);
        }
    }

    println!();
    Ok(())
}

pub fn run_topics(config: &Config) -> Result<()> {
    let snapshot = IndexSnapshot::build(load_corpus(config));
    let topics = snapshot.topics();

    if topics.is_empty() {
        println!("No study materials loaded yet.");
        return Ok(());
    }

    for topic in topics {
        println!("{}", topic);
    }
    Ok(())
}
