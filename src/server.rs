//! HTTP trigger surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/bootstrap` | Check the configured index and ingest if it is empty |
//! | `POST` | `/api/ingest` | Same, against `{ "targetIndex": ... }` |
//! | `POST` | `/api/search` | Diversity-aware search for `{ "query": ... }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "timeout", "message": "Operation timed out - please try again" } }
//! ```
//!
//! Error codes: `bad_request` (400), `no_documents` (400), `conflict` (409),
//! `timeout` (504), `internal` (500). Messages are deliberately coarse;
//! details go to the log.

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
use tower_http::trace::TraceLayer;

use caselaw_core::search::{search_index, SearchHit};

use crate::bootstrap::{BootstrapError, BootstrapOptions, BootstrapOutcome, Bootstrapper};
use crate::config::Config;

/// Shared state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    bootstrapper: Arc<Bootstrapper>,
}

impl AppState {
    pub fn new(config: Arc<Config>, bootstrapper: Arc<Bootstrapper>) -> Self {
        Self {
            config,
            bootstrapper,
        }
    }
}

/// Build the router. Exposed separately from [`run_server`] for tests.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/bootstrap", post(handle_bootstrap))
        .route("/api/ingest", post(handle_ingest))
        .route("/api/search", post(handle_search))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `[server].bind` until the process is terminated.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config);
    let bootstrapper = Arc::new(Bootstrapper::from_config(config.clone())?);
    let app = build_router(AppState::new(config, bootstrapper));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "caselaw server listening");
    println!("caselaw server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
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
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<BootstrapError> for AppError {
    fn from(err: BootstrapError) -> Self {
        match err {
            BootstrapError::MissingIndexName => bad_request("Index name is required"),
            BootstrapError::NoDocuments { .. } => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "no_documents",
                message: "No documents found".to_string(),
            },
            BootstrapError::AlreadyRunning => AppError {
                status: StatusCode::CONFLICT,
                code: "conflict",
                message: "Bootstrap already in progress".to_string(),
            },
            BootstrapError::Timeout(_) => AppError {
                status: StatusCode::GATEWAY_TIMEOUT,
                code: "timeout",
                message: "Operation timed out - please try again".to_string(),
            },
            BootstrapError::Failed(_) => internal("Bootstrap procedure failed"),
        }
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

// ============ POST /api/bootstrap, /api/ingest ============

#[derive(Serialize)]
struct BootstrapResponse {
    success: bool,
    skipped: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestRequest {
    #[serde(default)]
    target_index: Option<String>,
}

async fn handle_bootstrap(
    State(state): State<AppState>,
) -> Result<Json<BootstrapResponse>, AppError> {
    run_bootstrap(&state, None).await
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<BootstrapResponse>, AppError> {
    let target = req
        .target_index
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| bad_request("targetIndex is required"))?;
    run_bootstrap(&state, Some(&target)).await
}

async fn run_bootstrap(
    state: &AppState,
    index: Option<&str>,
) -> Result<Json<BootstrapResponse>, AppError> {
    let outcome = state
        .bootstrapper
        .run(index, BootstrapOptions::default())
        .await?;
    Ok(Json(BootstrapResponse {
        success: true,
        skipped: matches!(outcome, BootstrapOutcome::Skipped { .. }),
    }))
}

// ============ POST /api/search ============

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = req
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| bad_request("Query is required"))?;
    let index = state
        .config
        .index_name()
        .ok_or_else(|| bad_request("Index name is required"))?;

    tracing::info!(query = %query, "search");
    let store = state.bootstrapper.store();
    let embedder = state.bootstrapper.embedder();
    let results = search_index(
        store.as_ref(),
        embedder.as_ref(),
        &index,
        &query,
        state.config.search_options(),
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %format!("{:#}", e), "search failed");
        internal("Failed to perform similarity search")
    })?;

    Ok(Json(SearchResponse { results }))
}
