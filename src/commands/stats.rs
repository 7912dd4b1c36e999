use tauri::{AppHandle, Emitter, State};

use super::notify_failure;
use crate::config::AppState;
use crate::controller::StatsView;
use crate::models::TradeFilters;
use crate::repository::TradeStore;
use crate::stats::{build_report, StatisticsReport};

pub const STATS_VIEW_EVENT: &str = "stats://view";

/// Forward every controller publication to the webview
pub fn spawn_stats_forwarder(app: AppHandle, state: &AppState) {
    let mut rx = state.stats.subscribe();
    tauri::async_runtime::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = rx.borrow_and_update().clone();
            if let Err(e) = app.emit(STATS_VIEW_EVENT, &view) {
                log::warn!("Failed to emit stats view: {}", e);
            }
        }
        log::debug!("Stats forwarder stopped");
    });
}

#[tauri::command]
pub async fn get_stats_view(state: State<'_, AppState>) -> Result<StatsView, String> {
    Ok(state.stats.current())
}

const STATS_FAILED: &str = "Statistics Unavailable";

#[tauri::command]
pub async fn refresh_stats(app: AppHandle, state: State<'_, AppState>) -> Result<u64, String> {
    state
        .stats
        .refresh()
        .map_err(|e| notify_failure(&app, STATS_FAILED, e))
}

#[tauri::command]
pub async fn set_stats_date_range(
    app: AppHandle,
    state: State<'_, AppState>,
    start_date: Option<i64>,
    end_date: Option<i64>,
) -> Result<u64, String> {
    state
        .stats
        .set_date_range(start_date, end_date)
        .map_err(|e| notify_failure(&app, STATS_FAILED, e))
}

#[tauri::command]
pub async fn set_stats_symbol(
    app: AppHandle,
    state: State<'_, AppState>,
    text: String,
) -> Result<(), String> {
    state
        .stats
        .set_symbol_text(&text)
        .map_err(|e| notify_failure(&app, STATS_FAILED, e))
}

#[tauri::command]
pub async fn set_stats_setup_type(
    app: AppHandle,
    state: State<'_, AppState>,
    setup_type: Option<String>,
) -> Result<u64, String> {
    state
        .stats
        .set_setup_type(setup_type)
        .map_err(|e| notify_failure(&app, STATS_FAILED, e))
}

#[tauri::command]
pub async fn set_stats_asset_type(
    app: AppHandle,
    state: State<'_, AppState>,
    asset_type: Option<String>,
) -> Result<u64, String> {
    state
        .stats
        .set_asset_type(asset_type)
        .map_err(|e| notify_failure(&app, STATS_FAILED, e))
}

/// One-off report outside the dashboard controller
#[tauri::command]
pub async fn compute_statistics(
    app: AppHandle,
    state: State<'_, AppState>,
    filters: Option<TradeFilters>,
) -> Result<StatisticsReport, String> {
    let trades = state
        .store
        .list_trades(filters.as_ref())
        .map_err(|e| notify_failure(&app, STATS_FAILED, e))?;
    Ok(build_report(&trades, &state.config.aggregation))
}
