//! Ranked retrieval over the knowledge index.
//!
//! # Scoring Algorithm
//!
//! Each document's score is the sum of three independent signals:
//!
//! 1. **TF-IDF**: for every query token present in the document,
//!    `tf × (ln(total_docs / df) + 1)` where `tf` is the raw in-document
//!    count and `df` the number of documents containing the token.
//! 2. **Filename bonus**: a fixed bonus per query token that exactly
//!    matches a filename token.
//! 3. **Exact-phrase bonus**: a fixed bonus when the trimmed, lower-cased
//!    query occurs contiguously in the document body.
//!
//! Documents with non-positive scores are dropped, the rest are sorted by
//! score (desc) then name (asc), and the top three are returned. The cap
//! bounds the context passed to answer synthesis and is not configurable.

use crate::config::{Config, RetrievalConfig};
use crate::index::{KnowledgeIndex, LoadState};
use crate::tokenize::tokenize;

/// Fixed result cap.
pub const TOP_K: usize = 3;

/// A ranked retrieval hit.
#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub name: String,
    pub doc_type: String,
    pub score: f64,
    /// Bounded excerpt for display.
    pub preview: String,
    /// Untruncated body; feeds the generation context, never shown raw.
    pub content: String,
}

/// Score every document against `query` and return the top hits.
///
/// An index that is not `Ready` is treated as empty: this never fails,
/// it returns an empty result set and logs a warning. A query whose
/// tokens are all stop words (or too short) also yields no results.
pub fn search(index: &KnowledgeIndex, query: &str, params: &RetrievalConfig) -> Vec<ScoredResult> {
    index.with_documents(|state, documents, document_frequency| {
        if state != LoadState::Ready {
            tracing::warn!(?state, "search against an index that is not ready");
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let phrase = query.trim().to_lowercase();
        let total_docs = documents.len() as f64;

        let mut results: Vec<ScoredResult> = Vec::new();
        for doc in documents {
            let mut score = 0.0;

            for token in &query_tokens {
                if let Some(&tf) = doc.term_frequencies.get(token) {
                    // df >= 1 whenever the token appears in any document.
                    let df = document_frequency.get(token).copied().unwrap_or(1) as f64;
                    score += tf as f64 * ((total_docs / df).ln() + 1.0);
                }
                if doc.filename_tokens.iter().any(|t| t == token) {
                    score += params.filename_bonus;
                }
            }

            if !phrase.is_empty() && doc.content.to_lowercase().contains(&phrase) {
                score += params.phrase_bonus;
            }

            if score > 0.0 {
                results.push(ScoredResult {
                    name: doc.name.clone(),
                    doc_type: doc.doc_type.clone(),
                    score,
                    preview: preview_of(&doc.content, params.preview_chars),
                    content: doc.content.clone(),
                });
            }
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        results.truncate(TOP_K);

        tracing::debug!(query, results = results.len(), "search complete");
        results
    })
}

/// First `max_chars` characters of `content` plus an ellipsis marker.
fn preview_of(content: &str, max_chars: usize) -> String {
    let mut preview: String = content.chars().take(max_chars).collect();
    preview.push('…');
    preview
}

/// Run the `kb search` command: load the corpus, search, print results.
pub async fn run_search(config: &Config, query: &str) -> anyhow::Result<()> {
    let index = KnowledgeIndex::new();
    index.ensure_loaded(&config.knowledge).await;

    let results = search(&index, query, &config.retrieval);
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. {} ({})  score: {:.2}",
            i + 1,
            result.name,
            result.doc_type,
            result.score
        );
        println!("    {}", result.preview.replace('\n', " "));
    }

    Ok(())
}
