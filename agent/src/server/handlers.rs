//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database;
use crate::deploy;
use crate::jobs::{JobKind, JobView};
use crate::server::state::ServerState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "betagent".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Submission response: the id to poll
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
}

/// Error body for rejected requests
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type Rejection = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, error: impl Into<String>) -> Rejection {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Deploy submission parameters
#[derive(Debug, Deserialize)]
pub struct DeployParams {
    pub branch: Option<String>,
}

/// `POST /deploy?branch=<name>`: redeploy the application from a branch.
///
/// Returns 202 with a job id; the procedure's own failures surface only via
/// polling.
pub async fn submit_deploy(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<DeployParams>,
) -> Result<(StatusCode, Json<SubmitResponse>), Rejection> {
    // Validated before the lock is touched, so a bad request cannot consume
    // the slot
    let branch = params.branch.as_deref().unwrap_or("").trim().to_string();
    if branch.is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "branch must be a non-empty string",
        ));
    }

    let settings = state.settings.clone();
    let job_id = state
        .registry
        .submit(JobKind::Deploy, Some(branch.clone()), move |job| {
            deploy::run(settings, branch, job)
        })
        .map_err(|busy| reject(StatusCode::CONFLICT, busy.to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}

/// `GET /deploy/{job_id}`: poll a deploy job.
pub async fn deploy_status(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobView>, StatusCode> {
    poll_kind(&state, job_id, JobKind::Deploy)
}

/// `DELETE /database`: reset the e2e database to its baseline.
pub async fn submit_database_reset(
    State(state): State<Arc<ServerState>>,
) -> Result<(StatusCode, Json<SubmitResponse>), Rejection> {
    let settings = state.settings.clone();
    let job_id = state
        .registry
        .submit(JobKind::DatabaseReset, None, move |job| {
            database::run(settings, job)
        })
        .map_err(|busy| reject(StatusCode::CONFLICT, busy.to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}

/// `GET /database/{job_id}`: poll a database reset job.
pub async fn database_status(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobView>, StatusCode> {
    poll_kind(&state, job_id, JobKind::DatabaseReset)
}

// Poll routes are kind-scoped: a deploy id is not resolvable through the
// database route, and vice versa.
fn poll_kind(
    state: &ServerState,
    job_id: Uuid,
    kind: JobKind,
) -> Result<Json<JobView>, StatusCode> {
    state
        .registry
        .poll(job_id)
        .filter(|view| view.kind == kind)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
