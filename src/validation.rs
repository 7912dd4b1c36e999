//! Input checks run before anything is written to the store.

use regex::Regex;

use crate::error::{JournalError, JournalResult};
use crate::models::{CreateDailyPlanInput, CreateTradeInput};

const SYMBOL_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9./:_-]*$";
const MAX_SYMBOL_LEN: usize = 24;

pub fn validate_symbol(symbol: &str) -> JournalResult<()> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(JournalError::validation("symbol", "is required"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(JournalError::validation(
            "symbol",
            format!("must be at most {} characters", MAX_SYMBOL_LEN),
        ));
    }

    let re = Regex::new(SYMBOL_PATTERN).map_err(|e| JournalError::Parse(e.to_string()))?;
    if !re.is_match(symbol) {
        return Err(JournalError::validation("symbol", "contains invalid characters"));
    }
    Ok(())
}

fn require_positive(field: &str, value: f64) -> JournalResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(JournalError::validation(field, "must be greater than zero"));
    }
    Ok(())
}

fn require_finite(field: &str, value: Option<f64>) -> JournalResult<()> {
    match value {
        Some(v) if !v.is_finite() => Err(JournalError::validation(field, "must be a number")),
        _ => Ok(()),
    }
}

fn require_non_negative(field: &str, value: Option<f64>) -> JournalResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(JournalError::validation(field, "must not be negative"))
        }
        _ => Ok(()),
    }
}

pub fn validate_trade_input(input: &CreateTradeInput) -> JournalResult<()> {
    validate_symbol(&input.symbol)?;
    require_positive("entry_price", input.entry_price)?;
    require_positive("position_size", input.position_size)?;

    if input.entry_time <= 0 {
        return Err(JournalError::validation("entry_time", "is required"));
    }
    if let Some(exit_time) = input.exit_time {
        if exit_time < input.entry_time {
            return Err(JournalError::validation("exit_time", "must not be before entry_time"));
        }
    }
    if let Some(exit_price) = input.exit_price {
        require_positive("exit_price", exit_price)?;
    }

    require_finite("planned_rr", input.planned_rr)?;
    require_finite("actual_rr", input.actual_rr)?;
    require_finite("profit_loss", input.profit_loss)?;
    Ok(())
}

pub fn validate_plan_input(input: &CreateDailyPlanInput) -> JournalResult<()> {
    if input.goals.iter().any(|g| g.trim().is_empty()) {
        return Err(JournalError::validation("goals", "must not contain blank entries"));
    }

    for level in &input.key_levels {
        require_positive("key_levels", level.price)?;
    }

    let risk = &input.risk_parameters;
    require_non_negative("max_daily_loss", risk.max_daily_loss)?;
    require_non_negative("max_risk_per_trade", risk.max_risk_per_trade)?;
    require_non_negative("target_profit", risk.target_profit)?;

    if let (Some(per_trade), Some(daily)) = (risk.max_risk_per_trade, risk.max_daily_loss) {
        if per_trade > daily {
            return Err(JournalError::validation(
                "max_risk_per_trade",
                "must not exceed max_daily_loss",
            ));
        }
    }
    Ok(())
}

/// Trim free-text labels so "Breakout " and "Breakout" land in one bucket
pub fn normalize_label(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn normalize_trade_input(mut input: CreateTradeInput) -> CreateTradeInput {
    input.symbol = input.symbol.trim().to_uppercase();
    input.asset_type = input.asset_type.trim().to_uppercase();
    input.setup_type = normalize_label(input.setup_type);
    input.emotional_state = normalize_label(input.emotional_state);
    input.plan_adherence = normalize_label(input.plan_adherence);
    input.tags = input
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeyLevel, KeyLevelKind, MarketBias, RiskParameters};
    use chrono::NaiveDate;

    fn trade_input() -> CreateTradeInput {
        CreateTradeInput {
            symbol: "AAPL".to_string(),
            asset_type: "STOCK".to_string(),
            setup_type: Some("Breakout".to_string()),
            entry_price: 190.0,
            exit_price: Some(195.0),
            entry_time: 1_704_100_000,
            exit_time: Some(1_704_103_600),
            position_size: 100.0,
            outcome: None,
            planned_rr: Some(2.0),
            actual_rr: Some(1.5),
            profit_loss: Some(500.0),
            emotional_state: None,
            plan_adherence: None,
            tags: vec![],
            notes: String::new(),
        }
    }

    fn plan_input() -> CreateDailyPlanInput {
        CreateDailyPlanInput {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            market_bias: MarketBias::Bullish,
            key_levels: vec![KeyLevel { price: 5100.0, kind: KeyLevelKind::Support, note: None }],
            goals: vec!["Wait for the open range".to_string()],
            risk_parameters: RiskParameters {
                max_daily_loss: Some(500.0),
                max_risk_per_trade: Some(100.0),
                target_profit: Some(1000.0),
            },
            mental_state: "Calm".to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_valid_trade_passes() {
        assert!(validate_trade_input(&trade_input()).is_ok());
    }

    #[test]
    fn test_symbol_rules() {
        assert!(validate_symbol("BTC/USDT").is_ok());
        assert!(validate_symbol("ES:CME").is_ok());
        assert!(validate_symbol("  ").is_err());
        assert!(validate_symbol("AAPL MSFT").is_err());
        assert!(validate_symbol("-AAPL").is_err());
    }

    #[test]
    fn test_exit_before_entry_rejected() {
        let mut input = trade_input();
        input.exit_time = Some(input.entry_time - 60);

        match validate_trade_input(&input) {
            Err(JournalError::Validation { field, .. }) => assert_eq!(field, "exit_time"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_size_rejected() {
        let mut input = trade_input();
        input.position_size = 0.0;
        assert!(validate_trade_input(&input).is_err());
    }

    #[test]
    fn test_plan_risk_limits() {
        assert!(validate_plan_input(&plan_input()).is_ok());

        let mut input = plan_input();
        input.risk_parameters.max_risk_per_trade = Some(600.0);
        assert!(validate_plan_input(&input).is_err());

        let mut input = plan_input();
        input.goals.push("   ".to_string());
        assert!(validate_plan_input(&input).is_err());
    }

    #[test]
    fn test_normalize_trims_labels() {
        let mut input = trade_input();
        input.symbol = " aapl ".to_string();
        input.setup_type = Some(" Breakout ".to_string());
        input.emotional_state = Some("   ".to_string());
        input.tags = vec!["gap".to_string(), " ".to_string()];

        let normalized = normalize_trade_input(input);
        assert_eq!(normalized.symbol, "AAPL");
        assert_eq!(normalized.setup_type.as_deref(), Some("Breakout"));
        assert_eq!(normalized.emotional_state, None);
        assert_eq!(normalized.tags, vec!["gap".to_string()]);
    }
}
