//! # Knowbase
//!
//! File-backed retrieval-augmented question answering for small
//! documentation sets.
//!
//! Knowbase scans a directory of text files into an in-memory TF-IDF
//! index and answers free-form questions against it: a language-model
//! call refines the question into search keywords, ranked retrieval
//! assembles context from the top matches, and a second call generates
//! the final answer. Every language-model dependency is optional: when
//! it is missing or failing, the pipeline degrades to raw-question
//! search and a document-listing answer rather than erroring.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌────────────┐
//! │ Knowledge  │──▶│  TF-IDF      │──▶│  Answer    │
//! │ directory  │   │  index       │   │  pipeline  │
//! └────────────┘   └──────────────┘   └─────┬──────┘
//!                                           │
//!                        ┌──────────────────┤
//!                        ▼                  ▼
//!                   ┌──────────┐      ┌──────────┐
//!                   │   CLI    │      │   HTTP   │
//!                   │   (kb)   │      │  (/ask)  │
//!                   └──────────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kb index                        # scan the corpus, print stats
//! kb search "gameplay faq"        # ranked retrieval, for debugging
//! kb ask "How do I save my game?" # full question-answering pipeline
//! kb serve                        # start the HTTP entry point
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`tokenize`] | Text normalization and stop-word filtering |
//! | [`index`] | Corpus loading and the in-memory TF-IDF index |
//! | [`search`] | Ranked retrieval (TF-IDF + filename + phrase bonuses) |
//! | [`completion`] | Language-model completion client |
//! | [`pipeline`] | Refine → search → synthesize orchestration |
//! | [`server`] | HTTP entry point |

pub mod completion;
pub mod config;
pub mod index;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod tokenize;
