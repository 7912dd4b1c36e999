use tauri::{AppHandle, State};

use super::notify_failure;
use crate::config::AppState;
use crate::models::{Settings, UpdateSettingsInput};
use crate::repository::settings;

#[tauri::command]
pub async fn get_settings(app: AppHandle, state: State<'_, AppState>) -> Result<Settings, String> {
    settings::load_settings(state.store.database())
        .map_err(|e| notify_failure(&app, "Loading Settings Failed", e))
}

/// Persisted immediately; aggregation options take effect on next launch
#[tauri::command]
pub async fn update_settings(
    app: AppHandle,
    state: State<'_, AppState>,
    settings: UpdateSettingsInput,
) -> Result<Settings, String> {
    settings::update_settings(state.store.database(), settings)
        .map_err(|e| notify_failure(&app, "Saving Settings Failed", e))
}
