//! Text normalization shared by indexing and querying.

use std::collections::HashMap;

/// Tokens shorter than this are dropped.
const MIN_TOKEN_CHARS: usize = 3;

/// Common English function words excluded from indexing.
///
/// Must stay sorted: membership is checked with a binary search.
const STOP_WORDS: &[&str] = &[
    "about", "and", "are", "but", "can", "could", "did", "does", "for", "from", "had", "has",
    "have", "her", "him", "his", "how", "its", "not", "our", "she", "should", "that", "the",
    "their", "them", "they", "this", "was", "were", "what", "when", "where", "which", "who",
    "why", "will", "with", "would", "you", "your",
];

/// Normalize raw text into a flat sequence of lowercase tokens.
///
/// Every character that is not a letter or digit acts as a separator.
/// Tokens shorter than three characters and stop words are dropped.
/// Empty input yields an empty sequence; there are no error conditions.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|t| STOP_WORDS.binary_search(t).is_err())
        .map(|t| t.to_string())
        .collect()
}

/// Count token occurrences in `text`.
pub fn term_frequencies(text: &str) -> HashMap<String, usize> {
    let mut freqs = HashMap::new();
    for token in tokenize(text) {
        *freqs.entry(token).or_insert(0) += 1;
    }
    freqs
}
