use chrono::Utc;
use tauri::{AppHandle, State};

use super::notify_failure;
use crate::coach::{generate_commentary, AnthropicCoach, COACH_API_KEY};
use crate::config::AppState;
use crate::error::JournalError;
use crate::models::CoachingNote;
use crate::repository::{CoachingStore, PlanStore};

const KEY_FAILED: &str = "API Key Storage Failed";

#[tauri::command]
pub async fn save_coach_api_key(
    app: AppHandle,
    state: State<'_, AppState>,
    api_key: String,
) -> Result<(), String> {
    if api_key.trim().is_empty() {
        return Err(JournalError::validation("api_key", "must not be empty").to_string());
    }
    state
        .secrets
        .store(COACH_API_KEY, api_key.trim())
        .map_err(|e| notify_failure(&app, KEY_FAILED, e))
}

#[tauri::command]
pub async fn delete_coach_api_key(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    state
        .secrets
        .delete(COACH_API_KEY)
        .map_err(|e| notify_failure(&app, KEY_FAILED, e))
}

#[tauri::command]
pub async fn has_coach_api_key(app: AppHandle, state: State<'_, AppState>) -> Result<bool, String> {
    state
        .secrets
        .retrieve(COACH_API_KEY)
        .map(|key| key.is_some())
        .map_err(|e| notify_failure(&app, KEY_FAILED, e))
}

/// Commentary on the dashboard's current report and today's plan
#[tauri::command]
pub async fn generate_coaching(
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<CoachingNote, String> {
    let result = async {
        let view = state.stats.current();
        let report = view
            .report
            .ok_or_else(|| JournalError::validation("report", "statistics are still loading"))?;

        let api_key = state
            .secrets
            .retrieve(COACH_API_KEY)?
            .ok_or_else(|| JournalError::validation("api_key", "no coaching API key saved"))?;
        let client = AnthropicCoach::new(api_key, state.config.coach_model.clone())?;

        let today = state
            .config
            .aggregation
            .local_date(Utc::now().timestamp())
            .unwrap_or_else(|| Utc::now().date_naive());
        let plan = state.store.get_plan_by_date(today)?;

        generate_commentary(
            &client,
            state.store.as_ref(),
            &state.config.capabilities,
            &report,
            plan.as_ref(),
            &view.filter,
            &state.config.currency,
        )
        .await
    }
    .await;

    result.map_err(|e| notify_failure(&app, "Coaching Failed", e))
}

#[tauri::command]
pub async fn get_coaching_notes(
    app: AppHandle,
    state: State<'_, AppState>,
    limit: Option<usize>,
) -> Result<Vec<CoachingNote>, String> {
    state
        .store
        .recent_notes(limit.unwrap_or(10))
        .map_err(|e| notify_failure(&app, "Loading Coaching Notes Failed", e))
}
