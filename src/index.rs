//! Knowledge corpus loading and in-memory indexing.
//!
//! The index is built by scanning a single directory of text files,
//! tokenizing each file once at load time. It is read-only after load:
//! concurrent searches take read locks, and a load guard coalesces
//! concurrent load requests into a single directory scan. A completed
//! load replaces the whole index atomically, so searches never observe
//! a half-populated corpus.
//!
//! Load failures are absorbed, not propagated: a missing directory is
//! created and yields an empty corpus, and an unreadable corpus leaves
//! the index in [`LoadState::Failed`], which behaves as "ready with zero
//! documents" for search purposes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::{Config, KnowledgeConfig};
use crate::tokenize::{term_frequencies, tokenize};

/// One corpus file, fully tokenized at load time and immutable thereafter.
#[derive(Debug, Clone)]
pub struct Document {
    /// Filename, unique within the corpus; display key and ranking signal.
    pub name: String,
    /// Untruncated file contents.
    pub content: String,
    /// Display type derived from the file extension.
    pub doc_type: String,
    /// Normalized token → occurrence count within this document.
    pub term_frequencies: HashMap<String, usize>,
    /// Sum of all term frequencies.
    pub total_token_count: usize,
    /// Normalized tokens of the filename with the extension stripped.
    pub filename_tokens: Vec<String>,
}

/// Index lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

struct IndexInner {
    state: LoadState,
    documents: Vec<Document>,
    document_frequency: HashMap<String, usize>,
}

/// The in-memory corpus index. One instance per entry point; no global
/// singleton and no cross-process coordination.
pub struct KnowledgeIndex {
    inner: RwLock<IndexInner>,
    load_guard: tokio::sync::Mutex<()>,
}

/// Corpus summary for the `kb index` command and structured logs.
#[derive(Debug, Clone, Copy)]
pub struct IndexStats {
    pub state: LoadState,
    pub documents: usize,
    pub distinct_terms: usize,
    pub total_tokens: usize,
}

impl KnowledgeIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner {
                state: LoadState::Unloaded,
                documents: Vec::new(),
                document_frequency: HashMap::new(),
            }),
            load_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Load the corpus unless a previous load already completed.
    ///
    /// Concurrent callers share one in-flight scan: the first caller holds
    /// the guard while scanning, later callers wake to the completed state
    /// without re-entering the directory. Returns the terminal state
    /// (`Ready` or `Failed`); failures are logged, never raised.
    pub async fn ensure_loaded(&self, config: &KnowledgeConfig) -> LoadState {
        let _guard = self.load_guard.lock().await;

        {
            let inner = self.inner.read().unwrap();
            if matches!(inner.state, LoadState::Ready | LoadState::Failed) {
                return inner.state;
            }
        }

        self.inner.write().unwrap().state = LoadState::Loading;

        match scan_directory(config) {
            Ok(documents) => {
                let document_frequency = compute_document_frequency(&documents);
                tracing::info!(
                    dir = %config.dir.display(),
                    documents = documents.len(),
                    distinct_terms = document_frequency.len(),
                    "knowledge index loaded"
                );
                let mut inner = self.inner.write().unwrap();
                *inner = IndexInner {
                    state: LoadState::Ready,
                    documents,
                    document_frequency,
                };
                LoadState::Ready
            }
            Err(err) => {
                tracing::error!(
                    dir = %config.dir.display(),
                    error = %err,
                    "knowledge index load failed; searches will return no results"
                );
                let mut inner = self.inner.write().unwrap();
                *inner = IndexInner {
                    state: LoadState::Failed,
                    documents: Vec::new(),
                    document_frequency: HashMap::new(),
                };
                LoadState::Failed
            }
        }
    }

    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read().unwrap();
        IndexStats {
            state: inner.state,
            documents: inner.documents.len(),
            distinct_terms: inner.document_frequency.len(),
            total_tokens: inner.documents.iter().map(|d| d.total_token_count).sum(),
        }
    }

    /// Run `f` against a consistent snapshot of the index. The read lock
    /// is held for the duration of `f`.
    pub(crate) fn with_documents<R>(
        &self,
        f: impl FnOnce(LoadState, &[Document], &HashMap<String, usize>) -> R,
    ) -> R {
        let inner = self.inner.read().unwrap();
        f(inner.state, &inner.documents, &inner.document_frequency)
    }

    /// Build a ready index directly from (filename, content) pairs,
    /// bypassing the filesystem.
    #[cfg(test)]
    pub(crate) fn from_files(files: &[(&str, &str)]) -> Self {
        let mut documents: Vec<Document> = files
            .iter()
            .map(|(name, content)| build_document(name, Path::new(name), content.to_string()))
            .collect();
        documents.sort_by(|a, b| a.name.cmp(&b.name));
        let document_frequency = compute_document_frequency(&documents);
        Self {
            inner: RwLock::new(IndexInner {
                state: LoadState::Ready,
                documents,
                document_frequency,
            }),
            load_guard: tokio::sync::Mutex::new(()),
        }
    }
}

impl Default for KnowledgeIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn scan_directory(config: &KnowledgeConfig) -> Result<Vec<Document>> {
    let dir = &config.dir;
    if !dir.exists() {
        // First run: create an empty corpus directory instead of failing.
        std::fs::create_dir_all(dir)?;
        return Ok(Vec::new());
    }

    let include = build_globset(&config.include_globs)?;

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !include.is_match(&name) {
            continue;
        }
        let content = std::fs::read_to_string(entry.path())?;
        documents.push(build_document(&name, entry.path(), content));
    }

    // Sort for deterministic ordering
    documents.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(documents)
}

fn build_document(name: &str, path: &Path, content: String) -> Document {
    let term_frequencies = term_frequencies(&content);
    let total_token_count = term_frequencies.values().sum();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let filename_tokens = tokenize(&stem);

    Document {
        name: name.to_string(),
        content,
        doc_type: doc_type_for(path),
        term_frequencies,
        total_token_count,
        filename_tokens,
    }
}

fn doc_type_for(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md") => "markdown".to_string(),
        Some("txt") => "text".to_string(),
        Some("json") => "json".to_string(),
        Some(other) => other.to_string(),
        None => "text".to_string(),
    }
}

fn compute_document_frequency(documents: &[Document]) -> HashMap<String, usize> {
    let mut df: HashMap<String, usize> = HashMap::new();
    for doc in documents {
        for token in doc.term_frequencies.keys() {
            *df.entry(token.clone()).or_insert(0) += 1;
        }
    }
    df
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Run the `kb index` command: scan the corpus and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let index = KnowledgeIndex::new();
    index.ensure_loaded(&config.knowledge).await;
    let stats = index.stats();

    println!("Knowbase — Corpus Stats");
    println!("=======================");
    println!();
    println!("  Directory:      {}", config.knowledge.dir.display());
    println!("  State:          {:?}", stats.state);
    println!("  Documents:      {}", stats.documents);
    println!("  Distinct terms: {}", stats.distinct_terms);
    println!("  Total tokens:   {}", stats.total_tokens);

    Ok(())
}
