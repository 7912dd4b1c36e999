//! Derived statistics over a trade snapshot.
//!
//! Everything in here is a pure function of the trades passed in: nothing is
//! cached or persisted, and empty input yields zeroed values rather than errors.

pub mod breakdown;
pub mod dimension;
pub mod safe;
pub mod streaks;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_support;

use serde::{Deserialize, Serialize};

pub use breakdown::{
    breakdown, performance_by_emotion, performance_by_time_slot, win_rate_by_setup, BucketStat,
    EmotionStat, TimeSlotStat, WinRateStat,
};
pub use dimension::{AggregationOptions, Dimension, TimeBucketing};
pub use streaks::{compute_streaks, StreakState, StreakType};
pub use summary::{dashboard_stats, equity_curve, DashboardStats, EquityCurvePoint};

use crate::models::Trade;

/// Every aggregate for one fetched snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub summary: DashboardStats,
    pub streaks: StreakState,
    pub by_setup: Vec<WinRateStat>,
    pub by_time_slot: Vec<TimeSlotStat>,
    pub by_day_of_week: Vec<BucketStat>,
    pub by_emotion: Vec<EmotionStat>,
    pub by_plan_adherence: Vec<BucketStat>,
    pub by_risk_reward: Vec<BucketStat>,
    pub by_symbol: Vec<BucketStat>,
    pub equity_curve: Vec<EquityCurvePoint>,
}

pub fn build_report(trades: &[Trade], options: &AggregationOptions) -> StatisticsReport {
    StatisticsReport {
        summary: dashboard_stats(trades),
        streaks: compute_streaks(trades, options.consistency_window),
        by_setup: win_rate_by_setup(trades, options),
        by_time_slot: performance_by_time_slot(trades, options),
        by_day_of_week: breakdown(trades, Dimension::DayOfWeek, options),
        by_emotion: performance_by_emotion(trades, options),
        by_plan_adherence: breakdown(trades, Dimension::PlanAdherence, options),
        by_risk_reward: breakdown(trades, Dimension::RiskReward, options),
        by_symbol: breakdown(trades, Dimension::Symbol, options),
        equity_curve: equity_curve(trades, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::trade;

    #[test]
    fn test_report_on_empty_snapshot() {
        let report = build_report(&[], &AggregationOptions::default());
        assert_eq!(report.summary.total_trades, 0);
        assert!(report.by_setup.is_empty());
        assert_eq!(report.by_time_slot.len(), 6);
        assert!(report.by_time_slot.iter().all(|s| s.trade_count == 0));
        assert_eq!(report.by_risk_reward.len(), 4);
        assert!(report.equity_curve.is_empty());
        assert_eq!(report.streaks.current_streak_type, StreakType::None);
    }

    #[test]
    fn test_report_is_deterministic() {
        let trades = vec![
            trade("a").symbol("MSFT").setup("Breakout").adherence("Followed").win(120.0).build(),
            trade("b").symbol("AAPL").setup("Reversal").adherence("Deviated").loss(-80.0).build(),
        ];
        let options = AggregationOptions::default();
        let first = build_report(&trades, &options);
        assert_eq!(first, build_report(&trades, &options));

        let symbols: Vec<&str> = first.by_symbol.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(first.by_plan_adherence.len(), 2);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let trades = vec![trade("a").win(10.0).build()];
        let report = build_report(&trades, &AggregationOptions::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["profit_factor"], 999.0);
        assert_eq!(json["streaks"]["current_streak_type"], "win");
    }
}
