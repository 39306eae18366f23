//! HTTP entry point for stateless request handlers.
//!
//! Exposes the answer pipeline over a small JSON API so webhook workers
//! and bots can reuse the retrieval behavior without linking the crate.
//! The process owns a single [`Engine`]; its index is loaded once at
//! startup and shared read-only across request handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question against the corpus |
//! | `GET`  | `/health` | Health check (returns name and version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Degraded answers are not errors: a question with no matching
//! documents, or answered without a language model, still returns 200
//! with the degradations listed in the payload.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::pipeline::{Degradation, Engine, MatchedDocument};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    matched_documents: Vec<MatchedDocument>,
    degradations: Vec<Degradation>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            },
        }),
    )
        .into_response()
}

/// Start the HTTP server on the configured bind address.
///
/// Warms the index before accepting traffic so the first request does
/// not pay for the directory scan. Runs until the process is terminated.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let engine = Arc::new(Engine::new(config));
    engine
        .index()
        .ensure_loaded(&engine.config().knowledge)
        .await;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { engine });

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Response {
    if req.question.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "question must not be empty",
        );
    }

    let answer = state.engine.answer(&req.question).await;
    Json(AskResponse {
        answer: answer.text,
        matched_documents: answer.matches,
        degradations: answer.degradations,
    })
    .into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_response_shape() {
        let resp = AskResponse {
            answer: "text".to_string(),
            matched_documents: vec![MatchedDocument {
                name: "a.md".to_string(),
                doc_type: "markdown".to_string(),
            }],
            degradations: vec![Degradation::AnswerUnavailable],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["matched_documents"][0]["type"], "markdown");
        assert_eq!(json["degradations"][0], "answer_unavailable");
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "bad_request".to_string(),
                message: "question must not be empty".to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "bad_request");
    }
}
