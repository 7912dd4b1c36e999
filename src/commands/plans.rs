use chrono::NaiveDate;
use tauri::{AppHandle, State};

use super::notify_failure;
use crate::config::AppState;
use crate::models::{CreateDailyPlanInput, DailyPlan, DeleteResult, PlanSaveOutcome};
use crate::repository::PlanStore;

#[tauri::command]
pub async fn get_plan_by_date(
    app: AppHandle,
    state: State<'_, AppState>,
    date: NaiveDate,
) -> Result<Option<DailyPlan>, String> {
    state
        .store
        .get_plan_by_date(date)
        .map_err(|e| notify_failure(&app, "Loading Plan Failed", e))
}

#[tauri::command]
pub async fn list_plans(
    app: AppHandle,
    state: State<'_, AppState>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<DailyPlan>, String> {
    state
        .store
        .list_plans(from, to)
        .map_err(|e| notify_failure(&app, "Loading Plans Failed", e))
}

#[tauri::command]
pub async fn save_plan(
    app: AppHandle,
    state: State<'_, AppState>,
    plan: CreateDailyPlanInput,
) -> Result<PlanSaveOutcome, String> {
    crate::plans::save_plan(state.store.as_ref(), plan)
        .map_err(|e| notify_failure(&app, "Saving Plan Failed", e))
}

#[tauri::command]
pub async fn update_plan(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
    plan: CreateDailyPlanInput,
) -> Result<DailyPlan, String> {
    state
        .store
        .update_plan(&id, plan)
        .map_err(|e| notify_failure(&app, "Saving Plan Failed", e))
}

#[tauri::command]
pub async fn delete_plan(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
) -> Result<DeleteResult, String> {
    state
        .store
        .delete_plan(&id)
        .map_err(|e| notify_failure(&app, "Deleting Plan Failed", e))
}
