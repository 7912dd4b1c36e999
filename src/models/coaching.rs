use serde::{Deserialize, Serialize};

/// AI commentary generated for a statistics period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingNote {
    pub id: String,
    pub user_id: String,
    pub period_start: Option<i64>,
    pub period_end: Option<i64>,
    pub model: String,
    pub content: String,
    pub created_at: i64,
}
