//! HTTP server for uploads and conversation history.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/` | Service description |
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/upload` | Multipart upload (field `pdf`), returns the summary |
//! | `GET`    | `/history?limit=N` | Newest conversations, decrypted |
//! | `GET`    | `/history/{id}` | One conversation, decrypted |
//! | `PATCH`  | `/history/{id}` | Rename: `{ "name": "..." }` |
//! | `DELETE` | `/history/{id}` | Delete; succeeds for unknown ids |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "name must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `payload_too_large` (413), `extraction_failed` (422), `internal` (500).
//!
//! A failed model call or a failed insert does not produce an error
//! response: the upload still answers 200 with the (possibly degraded)
//! summary.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::DigestError;
use crate::extract::detect_content_type;
use crate::ingest::{IngestionPipeline, Upload};
use crate::models::{ConversationItem, IngestResponse};
use crate::store::{open_store, ConversationStore};

/// Multipart field names accepted for the uploaded document.
const UPLOAD_FIELDS: [&str; 2] = ["pdf", "file"];

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: IngestionPipeline,
    store: ConversationStore,
    default_limit: i64,
}

/// Starts the HTTP server with the production pipeline.
///
/// Refuses to start when no secret key is configured.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let pipeline = IngestionPipeline::from_config(config, store)?;
    run_server_with_pipeline(config, pipeline).await
}

/// Starts the HTTP server around an already-built pipeline.
pub async fn run_server_with_pipeline(
    config: &Config,
    pipeline: IngestionPipeline,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(config, pipeline);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(config: &Config, pipeline: IngestionPipeline) -> Router {
    let state = AppState {
        store: pipeline.store().clone(),
        pipeline,
        default_limit: config.history.default_limit,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/upload", post(handle_upload))
        .route("/history", get(handle_history))
        .route(
            "/history/{id}",
            get(handle_get).patch(handle_rename).delete(handle_delete),
        )
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }
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
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

impl From<DigestError> for AppError {
    fn from(err: DigestError) -> Self {
        match err {
            DigestError::NotFound(_) => {
                AppError::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            DigestError::InvalidTitle | DigestError::UnsupportedContentType(_) => {
                bad_request(err.to_string())
            }
            DigestError::ExtractionFailed(_) => AppError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "extraction_failed",
                err.to_string(),
            ),
            other => {
                tracing::error!(error = %other, "request failed");
                AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    other.to_string(),
                )
            }
        }
    }
}

// ============ GET / and /health ============

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

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "docdigest: document summarization with encrypted history",
        "endpoints": {
            "upload": "POST /upload - multipart field 'pdf'",
            "history": "GET /history?limit=N",
            "conversation": "GET | PATCH | DELETE /history/{id}",
        }
    }))
}

// ============ POST /upload ============

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_document = field
            .name()
            .map(|n| UPLOAD_FIELDS.contains(&n))
            .unwrap_or(false);
        if !is_document {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "document".to_string());
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        upload = Some(Upload {
            content_type: detect_content_type(&bytes, &filename, declared.as_deref()),
            bytes: bytes.to_vec(),
            filename,
        });
        break;
    }

    let upload = upload.ok_or_else(|| bad_request("no document provided (field 'pdf')"))?;
    let outcome = state.pipeline.ingest(upload).await?;
    Ok(Json(outcome.response))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "document exceeds the upload size limit",
        )
    } else {
        bad_request(err.body_text())
    }
}

// ============ /history ============

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<ConversationItem>,
}

async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let limit = params.limit.unwrap_or(state.default_limit);
    if limit < 1 {
        return Err(bad_request("limit must be >= 1"));
    }

    let history = state
        .store
        .list(limit)
        .await?
        .into_iter()
        .map(|c| c.into_item())
        .collect();

    Ok(Json(HistoryResponse { history }))
}

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationItem>, AppError> {
    Ok(Json(state.store.get(&id).await?.into_item()))
}

#[derive(Deserialize)]
struct RenameRequest {
    name: String,
}

#[derive(Serialize)]
struct RenameResponse {
    id: String,
    title: String,
}

async fn handle_rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<RenameResponse>, AppError> {
    let record = state.store.rename(&id, &req.name).await?;
    Ok(Json(RenameResponse {
        id: record.id,
        title: record.title,
    }))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: String,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.store.delete(&id).await?;
    Ok(Json(DeleteResponse { deleted: id }))
}
