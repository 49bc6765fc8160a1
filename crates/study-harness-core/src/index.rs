//! BM25 lexical index with atomically swappable snapshots.
//!
//! The index is rebuilt whole-corpus on every upload event — partial
//! updates are not supported. [`IndexSnapshot`] is one immutable, fully
//! built generation; [`SharedIndex`] holds the current generation behind
//! an atomic pointer swap so concurrent readers always observe either
//! the old or the new complete index, never a mix.
//!
//! Scoring is the Okapi BM25 variant: k1 = 1.5, b = 0.75, with negative
//! idf values floored to ε × average idf (ε = 0.25).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::models::{Chunk, IndexStats, SearchHit};
use crate::tokenize::tokenize;

const K1: f64 = 1.5;
const B: f64 = 0.75;
const EPSILON: f64 = 0.25;

/// Okapi BM25 scorer over a tokenized corpus.
#[derive(Debug)]
struct Bm25 {
    doc_freqs: Vec<HashMap<String, usize>>,
    idf: HashMap<String, f64>,
    doc_len: Vec<usize>,
    avgdl: f64,
}

impl Bm25 {
    fn new(corpus: &[Vec<String>]) -> Self {
        let n = corpus.len();
        let mut doc_freqs = Vec::with_capacity(n);
        let mut doc_len = Vec::with_capacity(n);
        let mut nd: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            doc_len.push(doc.len());
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in doc {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *nd.entry(term.clone()).or_insert(0) += 1;
            }
            doc_freqs.push(freqs);
        }

        let total_len: usize = doc_len.iter().sum();
        let avgdl = if n > 0 { total_len as f64 / n as f64 } else { 0.0 };

        // idf(t) = ln((N − n_t + 0.5) / (n_t + 0.5)); terms present in
        // more than half the corpus go negative and are floored to
        // ε × average idf so they still contribute a small positive
        // weight instead of punishing matches.
        let mut idf: HashMap<String, f64> = HashMap::new();
        let mut idf_sum = 0.0;
        let mut negative: Vec<String> = Vec::new();
        for (term, freq) in &nd {
            let value = ((n as f64 - *freq as f64 + 0.5) / (*freq as f64 + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }
        if !idf.is_empty() {
            let eps = EPSILON * (idf_sum / idf.len() as f64);
            for term in negative {
                idf.insert(term, eps);
            }
        }

        Self {
            doc_freqs,
            idf,
            doc_len,
            avgdl,
        }
    }

    /// Score every document against the query tokens.
    fn scores(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.doc_freqs.len()];
        if self.avgdl == 0.0 {
            return scores;
        }
        for token in query {
            let idf = match self.idf.get(token) {
                Some(v) => *v,
                None => continue,
            };
            for (i, freqs) in self.doc_freqs.iter().enumerate() {
                let f = *freqs.get(token).unwrap_or(&0) as f64;
                if f == 0.0 {
                    continue;
                }
                let norm = 1.0 - B + B * self.doc_len[i] as f64 / self.avgdl;
                scores[i] += idf * (f * (K1 + 1.0)) / (f + K1 * norm);
            }
        }
        scores
    }
}

/// One immutable index generation: the chunk set plus its tokenized
/// corpus and BM25 state, positionally aligned.
#[derive(Debug)]
pub struct IndexSnapshot {
    chunks: Vec<Chunk>,
    tokenized: Vec<Vec<String>>,
    bm25: Option<Bm25>,
}

impl IndexSnapshot {
    /// Build a snapshot from a complete chunk set. The corpus text for
    /// each chunk is `section_title + " " + content`.
    pub fn build(chunks: Vec<Chunk>) -> Self {
        let tokenized: Vec<Vec<String>> = chunks
            .iter()
            .map(|c| tokenize(&format!("{} {}", c.section_title, c.content)))
            .collect();
        debug_assert_eq!(chunks.len(), tokenized.len());

        let bm25 = if tokenized.is_empty() {
            None
        } else {
            Some(Bm25::new(&tokenized))
        };

        Self {
            chunks,
            tokenized,
            bm25,
        }
    }

    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Rank all chunks against `query` and return up to `top_k` hits
    /// with strictly positive scores, each annotated with its score
    /// rounded to 3 decimal places. Exact ties keep original corpus
    /// order. An empty query or empty index yields no hits.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let bm25 = match &self.bm25 {
            Some(b) => b,
            None => return Vec::new(),
        };
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let scores = bm25.scores(&query_tokens);
        let mut ranked: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
        // Stable sort: equal scores preserve corpus position.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);

        ranked
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(idx, score)| SearchHit {
                chunk: self.chunks[idx].clone(),
                relevance_score: (score * 1000.0).round() / 1000.0,
            })
            .collect()
    }

    /// Sorted distinct `"source_file → section_title"` strings.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .chunks
            .iter()
            .map(|c| format!("{} → {}", c.source_file, c.section_title))
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// Aggregate statistics over the loaded chunk set.
    pub fn stats(&self) -> IndexStats {
        let mut files: Vec<String> = self
            .chunks
            .iter()
            .map(|c| c.source_file.clone())
            .collect();
        files.sort();
        files.dedup();
        IndexStats {
            total_chunks: self.chunks.len(),
            total_files: files.len(),
            total_words: self.chunks.iter().map(|c| c.word_count).sum(),
            files,
        }
    }

    /// Number of tokenized corpus entries (always equals [`Self::len`]).
    pub fn corpus_len(&self) -> usize {
        self.tokenized.len()
    }
}

/// The shared, hot-swappable index handle.
///
/// Readers clone the current snapshot `Arc` and never hold the lock
/// while scoring; a rebuild constructs the new snapshot entirely off to
/// the side and swaps the pointer in one write.
pub struct SharedIndex {
    snapshot: RwLock<Arc<IndexSnapshot>>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(IndexSnapshot::empty())),
        }
    }

    /// Atomically replace the current generation with a freshly built
    /// one. Readers in flight keep the snapshot they already hold.
    pub fn rebuild(&self, chunks: Vec<Chunk>) {
        let next = Arc::new(IndexSnapshot::build(chunks));
        debug!(chunks = next.len(), "index rebuilt");
        *self.snapshot.write().unwrap() = next;
    }

    /// The current complete generation.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().unwrap().clone()
    }

    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        self.snapshot().search(query, top_k)
    }
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::new()
    }
}
