use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: i32,
    pub currency: String,
    pub utc_offset_minutes: i32,
    pub time_bucketing: String, // "session" | "hourly"
    pub consistency_window: i32,
    pub default_range_days: i32,
    pub enable_ai_coach: bool,
    pub coach_model: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub currency: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    pub time_bucketing: Option<String>,
    pub consistency_window: Option<i32>,
    pub default_range_days: Option<i32>,
    pub enable_ai_coach: Option<bool>,
    pub coach_model: Option<String>,
}
