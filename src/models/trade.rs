use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeOutcome {
    Win,
    Loss,
    Breakeven,
}

impl TradeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeOutcome::Win => "WIN",
            TradeOutcome::Loss => "LOSS",
            TradeOutcome::Breakeven => "BREAKEVEN",
        }
    }

    /// Lenient parse for stored values; older rows used "BE"
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "WIN" => Some(TradeOutcome::Win),
            "LOSS" => Some(TradeOutcome::Loss),
            "BREAKEVEN" | "BE" => Some(TradeOutcome::Breakeven),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    #[serde(default = "default_asset_type")]
    pub asset_type: String,
    pub setup_type: Option<String>,

    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub entry_time: i64,
    pub exit_time: Option<i64>,
    pub position_size: f64,

    pub outcome: Option<TradeOutcome>,
    pub planned_rr: Option<f64>,
    pub actual_rr: Option<f64>,
    pub profit_loss: Option<f64>,

    pub emotional_state: Option<String>,
    pub plan_adherence: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,

    pub created_at: i64,
    pub updated_at: i64,
}

pub fn default_asset_type() -> String {
    "STOCK".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTradeInput {
    pub symbol: String,
    #[serde(default = "default_asset_type")]
    pub asset_type: String,
    pub setup_type: Option<String>,

    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub entry_time: i64,
    pub exit_time: Option<i64>,
    pub position_size: f64,

    pub outcome: Option<TradeOutcome>,
    pub planned_rr: Option<f64>,
    pub actual_rr: Option<f64>,
    pub profit_loss: Option<f64>,

    pub emotional_state: Option<String>,
    pub plan_adherence: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// Fetch-boundary filter; all fields optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeFilters {
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub symbol: Option<String>,
    pub setup_type: Option<String>,
    pub asset_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
}
