use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use nanobatch::{JobView, RawRow, SubmitResponse};

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub rows: Vec<RawRow>,
}

/// POST /api/jobs
///
/// Runs with the settings as stored right now; later edits do not reach
/// this job.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> AppResult<Json<SubmitResponse>> {
    let settings = state.load_settings().await?;
    let response = state.engine.submit_rows(&request.rows, settings)?;
    tracing::info!(job_id = %response.job_id, specs = response.spec_count, "Job submitted");
    Ok(Json(response))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobView>> {
    Ok(Json(state.engine.get_job(&job_id)?))
}
