//! Retrieval-augmented answer pipeline.
//!
//! One pass per question: refine the question into search keywords,
//! search, retry the search with the original question if the refined one
//! came up empty, then synthesize an answer from the retrieved context.
//!
//! Every failure of the optional language-model stages is absorbed and
//! converted into a degraded-but-valid answer; the only user-visible
//! error is a fixed apology string when synthesis itself fails after
//! context was retrieved. Callers can distinguish the paths taken from
//! the [`Degradation`] values on the [`Answer`] instead of parsing logs.

use serde::Serialize;

use crate::completion::{self, CompletionRequest};
use crate::config::Config;
use crate::index::KnowledgeIndex;
use crate::search::{self, ScoredResult};

/// Fixed reply when no document matches either search pass.
pub const NO_RESULTS_MESSAGE: &str = "No relevant documentation found for that question.";

/// Fixed reply when answer generation fails after context was retrieved.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Sorry, something went wrong while generating an answer. Please try again.";

const REFINE_SYSTEM_PROMPT: &str = "You turn questions into search keywords. Reply with 2-5 \
    keywords that capture the question's topic, separated by spaces. Output the keywords and \
    nothing else.";

const ANSWER_SYSTEM_PROMPT: &str = "You answer questions using only the provided documentation \
    excerpts. Do not mention file names or the existence of the excerpts. If the excerpts do \
    not contain the answer, say you are not sure.";

const CONTEXT_DELIMITER: &str = "\n---\n";

/// Ways a question was answered with reduced fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// No language model configured; searched with the raw question.
    RefineUnavailable,
    /// The refinement call failed; searched with the raw question.
    RefineFailed,
    /// No language model configured; answered with a document listing.
    AnswerUnavailable,
    /// The synthesis call failed; answered with a fixed apology.
    AnswerFailed,
    /// Neither search pass matched any document.
    NoResults,
}

/// A retrieved document reference returned alongside the answer.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
}

/// The pipeline's terminal result. Always an answer, never an error.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub matches: Vec<MatchedDocument>,
    pub degradations: Vec<Degradation>,
}

/// The question-answering engine: one per call site, owning its own
/// index. Safe to share behind an `Arc`; the index handles its own
/// synchronization and is read-only once loaded.
pub struct Engine {
    config: Config,
    index: KnowledgeIndex,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            index: KnowledgeIndex::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }

    /// Answer a free-form question against the corpus.
    ///
    /// `Refine → Search(refined) → Search(original) if empty → Synthesize`,
    /// with the no-results short-circuit before synthesis.
    pub async fn answer(&self, question: &str) -> Answer {
        let mut degradations = Vec::new();
        self.index.ensure_loaded(&self.config.knowledge).await;

        let refined = self.refine(question, &mut degradations).await;

        let mut results = search::search(&self.index, &refined, &self.config.retrieval);
        if results.is_empty() && refined != question {
            tracing::debug!("refined query matched nothing; retrying with the original question");
            results = search::search(&self.index, question, &self.config.retrieval);
        }

        if results.is_empty() {
            tracing::info!(question, "no documents matched");
            degradations.push(Degradation::NoResults);
            return Answer {
                text: NO_RESULTS_MESSAGE.to_string(),
                matches: Vec::new(),
                degradations,
            };
        }

        let matches: Vec<MatchedDocument> = results
            .iter()
            .map(|r| MatchedDocument {
                name: r.name.clone(),
                doc_type: r.doc_type.clone(),
            })
            .collect();

        let text = self.synthesize(question, &results, &mut degradations).await;

        Answer {
            text,
            matches,
            degradations,
        }
    }

    /// Compress the question into search keywords. Refinement is an
    /// optimization: any failure falls back to the question itself.
    async fn refine(&self, question: &str, degradations: &mut Vec<Degradation>) -> String {
        if !completion::is_configured(&self.config.completion) {
            degradations.push(Degradation::RefineUnavailable);
            return question.to_string();
        }

        let req = CompletionRequest {
            system: REFINE_SYSTEM_PROMPT,
            user: question,
            max_tokens: self.config.completion.refine_max_tokens,
        };
        match completion::complete(&self.config.completion, &req).await {
            Ok(keywords) if !keywords.is_empty() => keywords,
            Ok(_) => {
                tracing::warn!("query refinement returned no keywords; using the raw question");
                degradations.push(Degradation::RefineFailed);
                question.to_string()
            }
            Err(err) => {
                tracing::warn!(error = %err, "query refinement failed; using the raw question");
                degradations.push(Degradation::RefineFailed);
                question.to_string()
            }
        }
    }

    /// Generate the final answer from the retrieved context, or fall back
    /// to a document listing (unconfigured) or a fixed apology (failure).
    async fn synthesize(
        &self,
        question: &str,
        results: &[ScoredResult],
        degradations: &mut Vec<Degradation>,
    ) -> String {
        if !completion::is_configured(&self.config.completion) {
            degradations.push(Degradation::AnswerUnavailable);
            return fallback_answer(results);
        }

        let context = assemble_context(results);
        let user = format!("Documentation:{CONTEXT_DELIMITER}{context}\n\nQuestion: {question}");
        let req = CompletionRequest {
            system: ANSWER_SYSTEM_PROMPT,
            user: &user,
            max_tokens: self.config.completion.answer_max_tokens,
        };
        match completion::complete(&self.config.completion, &req).await {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => {
                tracing::error!("answer synthesis returned empty text");
                degradations.push(Degradation::AnswerFailed);
                GENERATION_FAILED_MESSAGE.to_string()
            }
            Err(err) => {
                tracing::error!(error = %err, "answer synthesis failed");
                degradations.push(Degradation::AnswerFailed);
                GENERATION_FAILED_MESSAGE.to_string()
            }
        }
    }
}

/// Concatenate the retrieved items into the generation context block.
fn assemble_context(results: &[ScoredResult]) -> String {
    results
        .iter()
        .map(|r| format!("[{} ({})]\n{}", r.name, r.doc_type, r.content))
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

/// Deterministic answer used when no language model is configured: shows
/// which documents matched without generating prose.
fn fallback_answer(results: &[ScoredResult]) -> String {
    let mut text =
        String::from("Answer generation is not configured. These documents look relevant:\n");
    for r in results {
        text.push_str(&format!("  - {} ({})\n", r.name, r.doc_type));
    }
    text.trim_end().to_string()
}

/// Run the `kb ask` command: answer one question and print the result.
pub async fn run_ask(config: &Config, question: &str) -> anyhow::Result<()> {
    let engine = Engine::new(config.clone());
    let answer = engine.answer(question).await;

    println!("{}", answer.text);
    if !answer.matches.is_empty() {
        println!();
        println!("Sources:");
        for m in &answer.matches {
            println!("  - {} ({})", m.name, m.doc_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, KnowledgeConfig};
    use std::fs;
    use tempfile::TempDir;

    fn engine_for(dir: &TempDir) -> Engine {
        Engine::new(Config {
            knowledge: KnowledgeConfig {
                dir: dir.path().to_path_buf(),
                include_globs: vec!["*.md".to_string(), "*.txt".to_string()],
            },
            retrieval: Default::default(),
            completion: Default::default(),
            server: Default::default(),
        })
    }

    #[tokio::test]
    async fn test_no_match_short_circuits_to_fixed_message() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("installation.md"), "Download and run setup.").unwrap();
        fs::write(tmp.path().join("combat.md"), "Attack rolls use dice.").unwrap();

        let engine = engine_for(&tmp);
        let answer = engine.answer("weather system").await;

        assert_eq!(answer.text, NO_RESULTS_MESSAGE);
        assert!(answer.matches.is_empty());
        assert!(answer.degradations.contains(&Degradation::NoResults));
        // Synthesis is skipped entirely, so no generation degradations.
        assert!(!answer.degradations.contains(&Degradation::AnswerUnavailable));
    }

    #[tokio::test]
    async fn test_unconfigured_model_lists_matched_documents() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("gameplay-faq.md"),
            "To save: sleep in a bed.",
        )
        .unwrap();

        let engine = engine_for(&tmp);
        let answer = engine.answer("gameplay faq").await;

        assert!(answer.text.contains("gameplay-faq.md"));
        assert_eq!(answer.matches.len(), 1);
        assert_eq!(answer.matches[0].name, "gameplay-faq.md");
        assert_eq!(answer.matches[0].doc_type, "markdown");
        assert!(answer.degradations.contains(&Degradation::RefineUnavailable));
        assert!(answer.degradations.contains(&Degradation::AnswerUnavailable));
    }

    #[tokio::test]
    async fn test_raw_question_still_searches_when_refinement_unavailable() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("saving.md"),
            "Saving the game requires sleeping in a bed.",
        )
        .unwrap();

        let engine = engine_for(&tmp);
        // Refinement degrades to pass-through; the raw question's tokens
        // must still drive a successful search.
        let answer = engine.answer("How does saving work?").await;

        assert_eq!(answer.matches.len(), 1);
        assert_eq!(answer.matches[0].name, "saving.md");
        assert_ne!(answer.text, NO_RESULTS_MESSAGE);
    }

    #[tokio::test]
    async fn test_refine_passthrough_when_unconfigured() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_for(&tmp);

        let mut degradations = Vec::new();
        let refined = engine.refine("How do I save?", &mut degradations).await;
        assert_eq!(refined, "How do I save?");
        assert_eq!(degradations, vec![Degradation::RefineUnavailable]);
    }

    #[test]
    fn test_fallback_answer_lists_names_and_types() {
        let results = vec![
            ScoredResult {
                name: "a.md".to_string(),
                doc_type: "markdown".to_string(),
                score: 1.0,
                preview: String::new(),
                content: String::new(),
            },
            ScoredResult {
                name: "b.json".to_string(),
                doc_type: "json".to_string(),
                score: 0.5,
                preview: String::new(),
                content: String::new(),
            },
        ];
        let text = fallback_answer(&results);
        assert!(text.contains("a.md (markdown)"));
        assert!(text.contains("b.json (json)"));
    }

    #[test]
    fn test_context_assembly_uses_full_content_and_delimiter() {
        let results = vec![
            ScoredResult {
                name: "a.md".to_string(),
                doc_type: "markdown".to_string(),
                score: 1.0,
                preview: "short…".to_string(),
                content: "the full body".to_string(),
            },
            ScoredResult {
                name: "b.md".to_string(),
                doc_type: "markdown".to_string(),
                score: 0.5,
                preview: String::new(),
                content: "another body".to_string(),
            },
        ];
        let context = assemble_context(&results);
        assert!(context.contains("the full body"));
        assert!(context.contains("another body"));
        assert!(context.contains(CONTEXT_DELIMITER));
        assert!(!context.contains("short…"), "context must use full content, not previews");
    }
}
