//! HTTP front end for the grouping pipeline.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness message |
//! | `POST` | `/organize-by-content?path=<dir>&clusters=<k>` | Group a directory |
//!
//! Errors use `{ "error": { "code": ..., "message": ... } }`. Runs are
//! serialised: only one pipeline touches the filesystem at a time.

use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::error::GroupingError;
use crate::models::GroupingOutcome;
use crate::pipeline::{self, GroupingRequest, NoProgress};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Shared state passed to handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    embedder: Arc<dyn EmbeddingProvider>,
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            config: Arc::new(config),
            embedder,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the router; split from [`run_server`] so tests can drive it directly
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/organize-by-content", post(handle_organize))
        .layer(cors)
        .with_state(state)
}

/// Bind to `[server].bind` and serve until the process is terminated
pub async fn run_server(config: Config, embedder: Arc<dyn EmbeddingProvider>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config, embedder));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct MessageBody {
    message: String,
}

async fn handle_root() -> Json<MessageBody> {
    Json(MessageBody {
        message: "File Organizer API is running.".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct OrganizeParams {
    /// Absolute path to the folder with files
    pub path: PathBuf,
    /// Number of content clusters to create
    pub clusters: Option<usize>,
    #[serde(default)]
    pub dry_run: bool,
}

async fn handle_organize(
    State(state): State<AppState>,
    params: Result<Query<OrganizeParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let request = GroupingRequest {
        source_dir: params.path,
        clusters: params
            .clusters
            .unwrap_or(state.config.clustering.default_clusters),
        dry_run: params.dry_run,
    };

    let _guard = state.run_lock.lock().await;
    let outcome = pipeline::group_files_by_content(
        &request,
        &state.config,
        state.embedder.as_ref(),
        &NoProgress,
    )
    .await
    .map_err(AppError::from)?;

    match outcome {
        GroupingOutcome::Grouped(summary) => {
            let mut body = serde_json::to_value(&summary).map_err(|e| AppError::internal(e.to_string()))?;
            body["message"] = serde_json::Value::String(summary.message());
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        GroupingOutcome::NotEnoughData {
            discovered, valid, ..
        } => Err(AppError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "not_enough_data",
            message: format!(
                "Not enough valid files to cluster: {} of {} files usable",
                valid, discovered
            ),
        }),
    }
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

/// Internal error type that converts into an Axum HTTP response
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message,
        }
    }

    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<GroupingError>() {
            Some(GroupingError::SourceNotDirectory(_)) | Some(GroupingError::InvalidClusterCount { .. }) => {
                Self::bad_request(err.to_string())
            }
            _ => Self::internal(format!("{:#}", err)),
        }
    }
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
