use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/images/{job_id}/{filename}
pub async fn get_image(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let settings = state.load_settings().await?;
    let engine = state.engine.clone();

    let bytes = tokio::task::spawn_blocking(move || engine.artifact(&job_id, &filename, &settings))
        .await
        .map_err(|e| AppError::Internal(format!("artifact task failed: {}", e)))??;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

/// GET /api/download/{job_id}
pub async fn download_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let settings = state.load_settings().await?;
    let engine = state.engine.clone();

    let download = tokio::task::spawn_blocking(move || engine.download(&job_id, &settings))
        .await
        .map_err(|e| AppError::Internal(format!("archive task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download.filename),
            ),
        ],
        download.bytes,
    ))
}
