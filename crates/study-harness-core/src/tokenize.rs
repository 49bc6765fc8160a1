//! Tokenizer for BM25 indexing and querying.
//!
//! Keeps hyphenated terms ("semi-circular") as single tokens and drops
//! anything of length ≤ 1. Index build and query must use the same
//! rules, so both go through [`tokenize`].

use std::sync::OnceLock;

use regex::Regex;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Alphanumeric runs, with internal hyphens allowed but not leading
    // or trailing ones.
    RE.get_or_init(|| Regex::new(r"[a-z0-9](?:[a-z0-9-]*[a-z0-9])?").unwrap())
}

/// Lower-case and tokenize text for indexing or querying.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_re()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|t| t.len() > 1)
        .collect()
}
