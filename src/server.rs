//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a question about the site's documents |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Only request validation produces an error status:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Upstream failures (embedding, index, language model) degrade the answer
//! and still return `200`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the site's chat
//! widget can call the API from the browser.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chat::{ChatRequest, ChatResponse, ChatService};
use crate::config::Config;

/// Build every collaborator from `config` and serve on `[server].bind`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = ChatService::from_config(config).await?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    serve(listener, Arc::new(service)).await
}

/// Serve an already-built [`ChatService`] on a bound listener.
///
/// Used by [`run_server`] and by tests that inject in-memory collaborators.
pub async fn serve(
    listener: tokio::net::TcpListener,
    service: Arc<ChatService>,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "chat server listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// The application router.
pub fn router(service: Arc<ChatService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

/// Handler for `POST /chat`.
///
/// Malformed JSON and empty queries are `400`; everything else is answered.
async fn handle_chat(
    State(service): State<Arc<ChatService>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;
    request
        .validate()
        .map_err(|e| bad_request(e.to_string()))?;

    Ok(Json(service.answer(&request).await))
}
