use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketBias {
    Bullish,
    Bearish,
    Neutral,
}

impl MarketBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketBias::Bullish => "bullish",
            MarketBias::Bearish => "bearish",
            MarketBias::Neutral => "neutral",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "bullish" => MarketBias::Bullish,
            "bearish" => MarketBias::Bearish,
            _ => MarketBias::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLevelKind {
    Support,
    Resistance,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
    pub price: f64,
    pub kind: KeyLevelKind,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    pub max_daily_loss: Option<f64>,
    pub max_risk_per_trade: Option<f64>,
    pub target_profit: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPlan {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub market_bias: MarketBias,
    pub key_levels: Vec<KeyLevel>,
    pub goals: Vec<String>,
    pub risk_parameters: RiskParameters,
    pub mental_state: String,
    pub notes: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDailyPlanInput {
    pub date: NaiveDate,
    pub market_bias: MarketBias,
    #[serde(default)]
    pub key_levels: Vec<KeyLevel>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub risk_parameters: RiskParameters,
    #[serde(default)]
    pub mental_state: String,
    #[serde(default)]
    pub notes: String,
}

/// Result of a plan save: creates for a date that already has a plan become updates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", content = "plan", rename_all = "lowercase")]
pub enum PlanSaveOutcome {
    Created(DailyPlan),
    Updated(DailyPlan),
}

impl PlanSaveOutcome {
    pub fn plan(&self) -> &DailyPlan {
        match self {
            PlanSaveOutcome::Created(plan) | PlanSaveOutcome::Updated(plan) => plan,
        }
    }

    pub fn into_plan(self) -> DailyPlan {
        match self {
            PlanSaveOutcome::Created(plan) | PlanSaveOutcome::Updated(plan) => plan,
        }
    }
}
