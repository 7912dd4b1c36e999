use tauri::{AppHandle, State};

use super::notify_failure;
use crate::config::AppState;
use crate::export::{self, ImportSummary};
use crate::models::TradeFilters;
use crate::repository::TradeStore;

#[tauri::command]
pub async fn export_trades_csv(
    app: AppHandle,
    state: State<'_, AppState>,
    filters: Option<TradeFilters>,
) -> Result<Vec<u8>, String> {
    state
        .store
        .list_trades(filters.as_ref())
        .and_then(|trades| export::trades_to_csv(&trades))
        .map_err(|e| notify_failure(&app, "Export Failed", e))
}

#[tauri::command]
pub async fn export_statistics_csv(
    app: AppHandle,
    state: State<'_, AppState>,
    filters: Option<TradeFilters>,
) -> Result<Vec<u8>, String> {
    state
        .store
        .list_trades(filters.as_ref())
        .and_then(|trades| export::statistics_to_csv(&trades, &state.config.aggregation))
        .map_err(|e| notify_failure(&app, "Export Failed", e))
}

#[tauri::command]
pub async fn export_statistics_pdf(
    app: AppHandle,
    state: State<'_, AppState>,
    filters: Option<TradeFilters>,
) -> Result<Vec<u8>, String> {
    state
        .store
        .list_trades(filters.as_ref())
        .and_then(|trades| export::statistics_to_pdf(&trades, &state.config.aggregation))
        .map_err(|e| notify_failure(&app, "Export Failed", e))
}

#[tauri::command]
pub async fn export_all_data(app: AppHandle, state: State<'_, AppState>) -> Result<String, String> {
    export::export_all_data(&state.store).map_err(|e| notify_failure(&app, "Export Failed", e))
}

#[tauri::command]
pub async fn import_all_data(
    app: AppHandle,
    state: State<'_, AppState>,
    json_data: String,
) -> Result<ImportSummary, String> {
    let summary = export::import_all_data(&state.store, &json_data)
        .map_err(|e| notify_failure(&app, "Import Failed", e))?;
    if let Err(e) = state.stats.refresh() {
        log::warn!("Stats refresh after import failed: {}", e);
    }
    Ok(summary)
}
