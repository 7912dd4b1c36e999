use tauri::{AppHandle, State};

use super::notify_failure;
use crate::config::AppState;
use crate::models::{CreateTradeInput, DeleteResult, Trade, TradeFilters};
use crate::repository::TradeStore;

fn refresh_stats(state: &AppState) {
    if let Err(e) = state.stats.refresh() {
        log::warn!("Stats refresh after trade change failed: {}", e);
    }
}

#[tauri::command]
pub async fn get_trades(
    app: AppHandle,
    state: State<'_, AppState>,
    filters: Option<TradeFilters>,
) -> Result<Vec<Trade>, String> {
    state
        .store
        .list_trades(filters.as_ref())
        .map_err(|e| notify_failure(&app, "Loading Trades Failed", e))
}

#[tauri::command]
pub async fn get_trade(app: AppHandle, state: State<'_, AppState>, id: String) -> Result<Trade, String> {
    state
        .store
        .get_trade(&id)
        .map_err(|e| notify_failure(&app, "Loading Trade Failed", e))
}

#[tauri::command]
pub async fn create_trade(
    app: AppHandle,
    state: State<'_, AppState>,
    trade: CreateTradeInput,
) -> Result<Trade, String> {
    let created = state
        .store
        .create_trade(trade)
        .map_err(|e| notify_failure(&app, "Saving Trade Failed", e))?;
    refresh_stats(&state);
    Ok(created)
}

#[tauri::command]
pub async fn update_trade(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
    patch: serde_json::Value,
) -> Result<Trade, String> {
    let updated = state
        .store
        .update_trade(&id, &patch)
        .map_err(|e| notify_failure(&app, "Updating Trade Failed", e))?;
    refresh_stats(&state);
    Ok(updated)
}

#[tauri::command]
pub async fn delete_trade(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
) -> Result<DeleteResult, String> {
    let result = state
        .store
        .delete_trade(&id)
        .map_err(|e| notify_failure(&app, "Deleting Trade Failed", e))?;
    if result.success {
        refresh_stats(&state);
    }
    Ok(result)
}
