//! Language-model completion client.
//!
//! One bounded request/response pair per call: a model identifier, a
//! system instruction, a user content string, and an output-token cap.
//! The `disabled` provider (the default) fails every call with
//! [`CompletionError::NotConfigured`] so the pipeline can take its
//! deterministic fallback paths without touching the network.
//!
//! # Retry Strategy
//!
//! The OpenAI provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Every request carries the configured timeout, so an unresponsive
//! endpoint cannot hang a caller indefinitely.

use std::time::Duration;

use thiserror::Error;

use crate::config::CompletionConfig;

/// Failure modes of a completion call.
///
/// The pipeline maps these onto its degradation taxonomy; they are
/// logged but never shown to the end consumer.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The provider is `disabled` or `OPENAI_API_KEY` is absent.
    #[error("completion provider is not configured")]
    NotConfigured,
    /// The API returned a non-success status.
    #[error("completion API error {status}: {body}")]
    Api { status: u16, body: String },
    /// The request never produced a response.
    #[error("completion request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The response payload did not have the expected shape.
    #[error("malformed completion response: {0}")]
    Malformed(String),
    /// All retry attempts were consumed without a terminal response.
    #[error("completion retries exhausted")]
    RetriesExhausted,
}

/// One system + user instruction pair with an output-token cap.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
}

/// True when a completion call can be attempted: the provider is enabled
/// and the API key is present in the environment.
pub fn is_configured(config: &CompletionConfig) -> bool {
    config.is_enabled() && std::env::var("OPENAI_API_KEY").is_ok()
}

/// Issue a single bounded completion call.
pub async fn complete(
    config: &CompletionConfig,
    req: &CompletionRequest<'_>,
) -> Result<String, CompletionError> {
    match config.provider.as_str() {
        "openai" => complete_openai(config, req).await,
        _ => Err(CompletionError::NotConfigured),
    }
}

async fn complete_openai(
    config: &CompletionConfig,
    req: &CompletionRequest<'_>,
) -> Result<String, CompletionError> {
    let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| CompletionError::NotConfigured)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": req.system },
            { "role": "user", "content": req.user },
        ],
        "max_tokens": req.max_tokens,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_completion_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(CompletionError::Api {
                        status: status.as_u16(),
                        body: body_text,
                    });
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                return Err(CompletionError::Api {
                    status: status.as_u16(),
                    body: body_text,
                });
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or(CompletionError::RetriesExhausted))
}

/// Extract the generated text from a chat completions response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String, CompletionError> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            CompletionError::Malformed("missing choices[0].message.content".to_string())
        })?;

    Ok(content.trim().to_string())
}
