use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    pub dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec![
        "*.txt".to_string(),
        "*.md".to_string(),
        "*.json".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_filename_bonus")]
    pub filename_bonus: f64,
    #[serde(default = "default_phrase_bonus")]
    pub phrase_bonus: f64,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            filename_bonus: default_filename_bonus(),
            phrase_bonus: default_phrase_bonus(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_filename_bonus() -> f64 {
    50.0
}
fn default_phrase_bonus() -> f64 {
    100.0
}
fn default_preview_chars() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_refine_max_tokens")]
    pub refine_max_tokens: u32,
    #[serde(default = "default_answer_max_tokens")]
    pub answer_max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            refine_max_tokens: default_refine_max_tokens(),
            answer_max_tokens: default_answer_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_refine_max_tokens() -> u32 {
    40
}
fn default_answer_max_tokens() -> u32 {
    400
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate knowledge
    if config.knowledge.include_globs.is_empty() {
        anyhow::bail!("knowledge.include_globs must not be empty");
    }

    // Validate retrieval
    if config.retrieval.preview_chars == 0 {
        anyhow::bail!("retrieval.preview_chars must be > 0");
    }
    if config.retrieval.filename_bonus < 0.0 {
        anyhow::bail!("retrieval.filename_bonus must be >= 0");
    }
    if config.retrieval.phrase_bonus < 0.0 {
        anyhow::bail!("retrieval.phrase_bonus must be >= 0");
    }

    // Validate completion
    match config.completion.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown completion provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.completion.is_enabled() {
        if config.completion.model.is_empty() {
            anyhow::bail!(
                "completion.model must be specified when provider is '{}'",
                config.completion.provider
            );
        }
        if config.completion.timeout_secs == 0 {
            anyhow::bail!("completion.timeout_secs must be > 0");
        }
    }

    Ok(config)
}
