use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use nanobatch::{SettingsUpdate, SettingsView};

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<SettingsView>> {
    Ok(Json(state.load_settings().await?.view()))
}

/// POST /api/settings
///
/// Merges a partial update; a blank `apiKey` keeps the stored key.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> AppResult<Json<Value>> {
    state.save_settings(update).await?;
    Ok(Json(json!({ "ok": true })))
}
