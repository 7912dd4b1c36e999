//! Division and missing-field guards shared by every statistic.

use crate::models::Trade;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// Reported when a bucket has profit but no losing trades; also the cap for real ratios
pub const NO_LOSS_PROFIT_FACTOR: f64 = 999.0;

pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `part / whole * 100` rounded to one decimal, 0 for an empty whole
pub fn percentage(part: usize, whole: usize) -> f64 {
    round_to(safe_div(part as f64, whole as f64) * 100.0, 1)
}

pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    let gross_loss = gross_loss.abs();
    if gross_loss > 0.0 {
        (gross_profit / gross_loss).min(NO_LOSS_PROFIT_FACTOR)
    } else if gross_profit > 0.0 {
        NO_LOSS_PROFIT_FACTOR
    } else {
        0.0
    }
}

pub fn pnl_or_zero(trade: &Trade) -> f64 {
    trade.profit_loss.filter(|p| p.is_finite()).unwrap_or(0.0)
}

pub fn label_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_LABEL.to_string(),
    }
}

/// Running sum/count pair for optional samples
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    pub fn value(&self) -> f64 {
        safe_div(self.sum, self.count as f64)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}
