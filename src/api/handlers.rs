use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::coordinator::timeout_from_secs;
use crate::engine::types::{RunRecord, RunStatus, Submission};

use super::AppState;
use super::errors::AppError;

// --- Request/Response types ---

#[derive(Deserialize)]
pub struct RunAgentRequest {
    pub agent_type: String,
    pub user_id: String,
    /// Overrides the default lock wait and run time bound, in seconds.
    #[serde(default)]
    pub lock_timeout_s: Option<f64>,
}

#[derive(Deserialize)]
pub struct ListRunsQuery {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct AgentInfo {
    pub agent_type: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// --- Handlers ---

/// POST /agents/run
pub async fn run_agent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunAgentRequest>,
) -> Result<Json<Submission>, AppError> {
    let lock_timeout = req
        .lock_timeout_s
        .map(timeout_from_secs)
        .transpose()
        .map_err(|e| AppError::BadRequest(format!("Invalid lock_timeout_s: {}", e)))?;

    let submission = state
        .coordinator
        .submit(&req.agent_type, &req.user_id, lock_timeout)
        .await?;

    Ok(Json(submission))
}

/// GET /agents/status/{run_id}
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunRecord>, AppError> {
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|_| AppError::BadRequest(format!("Invalid run ID: {}", run_id)))?;

    let record = state.coordinator.status(run_id).await?;
    Ok(Json(record))
}

/// GET /agents
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let agents: Vec<AgentInfo> = state
        .coordinator
        .registry()
        .list()
        .iter()
        .map(|(agent_type, desc)| AgentInfo {
            agent_type: agent_type.to_string(),
            description: desc.to_string(),
        })
        .collect();

    let total = agents.len();
    Json(serde_json::json!({
        "agents": agents,
        "total": total,
    }))
}

/// GET /runs
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListRunsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status_filter = params
        .status
        .as_deref()
        .map(str::parse::<RunStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let runs = state.coordinator.list_runs(status_filter).await;

    // Summary view without result/error payloads
    let summaries: Vec<serde_json::Value> = runs
        .iter()
        .map(|r| {
            serde_json::json!({
                "run_id": r.run_id,
                "agent_type": r.agent_type,
                "user_id": r.user_id,
                "status": r.status,
                "started_at": r.started_at,
                "completed_at": r.completed_at,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "runs": summaries,
        "total": summaries.len(),
    })))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
