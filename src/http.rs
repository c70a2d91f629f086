//! REST control surface for the job controller.

use std::io;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commands::CommandRegistry;
use crate::error::{CommandError, ControllerError};
use crate::logutil::LogEvent;
use crate::worker::{CompletionHandle, JobController, SlotState, SlotStatus};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<JobController>,
    pub registry: Arc<CommandRegistry>,
}

/// Build the Axum router for the control surface.
pub fn control_routes(controller: Arc<JobController>, registry: Arc<CommandRegistry>) -> Router {
    let state = AppState {
        controller,
        registry,
    };

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/log", get(job_log))
        .route("/commands", get(list_commands))
        .route("/jobs", post(start_job))
        .route("/cancel", post(cancel))
        .route("/reset", post(reset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `app` on `listener` until the run behind `handle` finishes.
///
/// Lets a single command-line run be inspected while it works.
pub async fn serve_until_finished(
    listener: TcpListener,
    app: Router,
    handle: CompletionHandle,
) -> io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = handle.wait().await;
        })
        .await
}

/// JSON rendering of [`SlotStatus`].
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusView {
    pub state: SlotState,
    pub job: Option<String>,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub cancelled: bool,
    pub cancel_requested: bool,
    pub log: Vec<LogEvent>,
    pub log_evicted: u64,
}

impl From<SlotStatus> for StatusView {
    fn from(status: SlotStatus) -> Self {
        Self {
            state: status.state,
            job: status.job,
            run_id: status.run_id,
            started_at: status.started_at,
            finished_at: status.finished_at,
            cancelled: status.last_error.as_ref().is_some_and(|e| e.is_cancelled()),
            last_error: status.last_error.map(|e| e.to_string()),
            cancel_requested: status.cancel_requested,
            log: status.log,
            log_evicted: status.log_evicted,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "reshard-worker"
    }))
}

// ── Queries ─────────────────────────────────────────────────────────────

async fn status(State(state): State<AppState>) -> Json<StatusView> {
    Json(state.controller.status().into())
}

/// Plain-text memory log of the running or most recent run.
async fn job_log(State(state): State<AppState>) -> String {
    state.controller.render_log()
}

async fn list_commands(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "commands": state.registry.names() }))
}

// ── Actions ─────────────────────────────────────────────────────────────

async fn start_job(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> impl IntoResponse {
    let job = match state.registry.build(&req.command, &req.args) {
        Ok(job) => job,
        Err(e) => {
            let code = match e {
                CommandError::Unknown { .. } => StatusCode::NOT_FOUND,
                CommandError::Empty | CommandError::InvalidArgs { .. } => StatusCode::BAD_REQUEST,
            };
            return (code, Json(serde_json::json!({ "error": e.to_string() })));
        }
    };

    let description = job.describe();
    match state.controller.start(job) {
        Ok(handle) => {
            info!(job = %description, run_id = %handle.run_id(), "Worker started from control surface");
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "started": description,
                    "run_id": handle.run_id(),
                })),
            )
        }
        // `start` only rejects an occupied slot; both variants mean "busy".
        Err(
            e @ (ControllerError::AlreadyRunning { .. } | ControllerError::JobInProgress { .. }),
        ) => {
            warn!(job = %description, "Rejected start: {e}");
            (
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn cancel(State(state): State<AppState>) -> impl IntoResponse {
    let cancelled = state.controller.cancel();
    Json(serde_json::json!({ "cancelled": cancelled }))
}

async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.reset() {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "reset": true }))),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
