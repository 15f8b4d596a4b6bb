//! HTTP API for the portfolio site.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question about the persona |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `POST /ask` takes `{"question": "...", "userApiKey": "sk-..."}` (key optional)
//! and returns `{"answer": "...", "sources": ["<path>", ...], "confidence": "High"}`.
//! Off-topic questions and upstream model failures are ordinary `200`
//! responses with a fixed answer, no sources and a `null` confidence.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `index_not_found` (500), `internal` (500).
//! Messages never include upstream or filesystem details.
//!
//! # CORS
//!
//! Only the origins in `[server].allowed_origins` (or `ALLOWED_ORIGINS`) are
//! allowed, for `GET`, `POST` and `OPTIONS`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;
use crate::context::AppContext;
use crate::error::IndexError;
use crate::models::{ConfidenceLabel, QueryRequest};
use crate::pipeline;

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let ctx = Arc::new(AppContext::from_config(config.clone())?);
    let listener = TcpListener::bind(&config.server.bind).await?;
    serve(listener, ctx).await
}

/// Serve the API on an already-bound listener.
pub async fn serve(listener: TcpListener, ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = router(ctx);
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router with CORS applied.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let origins: Vec<HeaderValue> = ctx
        .config
        .server
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(ctx)
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

/// Map a pipeline failure to a 500 without exposing its details.
fn server_error(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "request failed");
    match err.downcast_ref::<IndexError>() {
        Some(IndexError::NotFound(_)) => AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "index_not_found".to_string(),
            message: "The content index has not been built yet".to_string(),
        },
        _ => AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: "Internal server error".to_string(),
        },
    }
}

// ============ POST /ask ============

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: String,
    sources: Vec<String>,
    confidence: Option<ConfidenceLabel>,
}

async fn handle_ask(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let result = pipeline::answer(&ctx, &request)
        .await
        .map_err(server_error)?;

    Ok(Json(AskResponse {
        answer: result.text,
        sources: result.sources.into_iter().map(|s| s.source_path).collect(),
        confidence: result.confidence_label,
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
