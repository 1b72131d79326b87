use std::sync::Arc;

use nanobatch::{BatchEngine, Settings, SettingsStore, SettingsUpdate};

use crate::error::{AppError, AppResult};

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BatchEngine>,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    pub fn new(engine: Arc<BatchEngine>, settings: Arc<SettingsStore>) -> Self {
        Self { engine, settings }
    }

    /// Reads the settings file off the async workers.
    pub async fn load_settings(&self) -> AppResult<Settings> {
        let store = Arc::clone(&self.settings);
        tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| AppError::Internal(format!("settings task failed: {}", e)))
    }

    pub async fn save_settings(&self, update: SettingsUpdate) -> AppResult<Settings> {
        let store = Arc::clone(&self.settings);
        let saved = tokio::task::spawn_blocking(move || store.save(update))
            .await
            .map_err(|e| AppError::Internal(format!("settings task failed: {}", e)))??;
        Ok(saved)
    }
}
