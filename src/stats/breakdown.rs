use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dimension::{AggregationOptions, Dimension};
use super::safe::{
    percentage, pnl_or_zero, profit_factor, round_to, safe_div, Mean, UNKNOWN_LABEL,
};
use crate::models::{Trade, TradeOutcome};

/// Aggregate over every trade that falls into one label of a dimension.
///
/// Money fields are unrounded so `net_profit` is exactly the sum of the
/// bucket's P&L; round when rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStat {
    pub label: String,
    pub trade_count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub breakeven_count: usize,
    /// Trades with no recorded outcome; keeps the counts summing to trade_count
    pub unknown_count: usize,
    pub win_rate: f64,
    pub net_profit: f64,
    pub average_profit: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub average_planned_rr: f64,
    pub average_actual_rr: f64,
}

#[derive(Debug, Default)]
struct BucketAccumulator {
    trade_count: usize,
    win_count: usize,
    loss_count: usize,
    breakeven_count: usize,
    unknown_count: usize,
    net_profit: f64,
    gross_profit: f64,
    gross_loss: f64,
    planned_rr: Mean,
    actual_rr: Mean,
}

impl BucketAccumulator {
    fn push(&mut self, trade: &Trade) {
        self.trade_count += 1;
        match trade.outcome {
            Some(TradeOutcome::Win) => self.win_count += 1,
            Some(TradeOutcome::Loss) => self.loss_count += 1,
            Some(TradeOutcome::Breakeven) => self.breakeven_count += 1,
            None => self.unknown_count += 1,
        }

        let pnl = pnl_or_zero(trade);
        self.net_profit += pnl;
        if pnl > 0.0 {
            self.gross_profit += pnl;
        } else if pnl < 0.0 {
            self.gross_loss += pnl.abs();
        }

        self.planned_rr.push(trade.planned_rr);
        self.actual_rr.push(trade.actual_rr);
    }

    fn finish(self, label: String) -> BucketStat {
        BucketStat {
            label,
            trade_count: self.trade_count,
            win_count: self.win_count,
            loss_count: self.loss_count,
            breakeven_count: self.breakeven_count,
            unknown_count: self.unknown_count,
            win_rate: percentage(self.win_count, self.trade_count),
            net_profit: self.net_profit,
            average_profit: safe_div(self.net_profit, self.trade_count as f64),
            gross_profit: self.gross_profit,
            gross_loss: self.gross_loss,
            profit_factor: round_to(profit_factor(self.gross_profit, self.gross_loss), 2),
            average_planned_rr: round_to(self.planned_rr.value(), 2),
            average_actual_rr: round_to(self.actual_rr.value(), 2),
        }
    }
}

/// Group trades by one dimension.
///
/// Dimensions with a fixed label set (time of day, weekday, R:R range) always
/// report every label in its natural order, zeroed when empty. Categorical
/// dimensions report only labels that occur, sorted, with `Unknown` last.
pub fn breakdown(trades: &[Trade], dimension: Dimension, options: &AggregationOptions) -> Vec<BucketStat> {
    let mut buckets: BTreeMap<String, BucketAccumulator> = BTreeMap::new();
    for trade in trades {
        buckets
            .entry(dimension.label_for(trade, options))
            .or_default()
            .push(trade);
    }

    let unknown = buckets.remove(UNKNOWN_LABEL);
    let mut stats = Vec::with_capacity(buckets.len() + 1);

    match dimension.fixed_labels(options) {
        Some(labels) => {
            for label in labels {
                let acc = buckets.remove(*label).unwrap_or_default();
                stats.push(acc.finish(label.to_string()));
            }
        }
        None => {
            stats.extend(buckets.into_iter().map(|(label, acc)| acc.finish(label)));
        }
    }

    if let Some(acc) = unknown {
        stats.push(acc.finish(UNKNOWN_LABEL.to_string()));
    }
    stats
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRateStat {
    pub setup_type: String,
    pub trade_count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub win_rate: f64,
    pub net_profit: f64,
    pub average_profit: f64,
    pub profit_factor: f64,
    pub average_rr: f64,
}

impl From<BucketStat> for WinRateStat {
    fn from(stat: BucketStat) -> Self {
        Self {
            setup_type: stat.label,
            trade_count: stat.trade_count,
            win_count: stat.win_count,
            loss_count: stat.loss_count,
            win_rate: stat.win_rate,
            net_profit: stat.net_profit,
            average_profit: stat.average_profit,
            profit_factor: stat.profit_factor,
            average_rr: stat.average_actual_rr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlotStat {
    pub time_slot: String,
    pub trade_count: usize,
    pub win_rate: f64,
    pub net_profit: f64,
    pub average_profit: f64,
}

impl From<BucketStat> for TimeSlotStat {
    fn from(stat: BucketStat) -> Self {
        Self {
            time_slot: stat.label,
            trade_count: stat.trade_count,
            win_rate: stat.win_rate,
            net_profit: stat.net_profit,
            average_profit: stat.average_profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionStat {
    pub name: String,
    pub count: usize,
    pub win_rate: f64,
    pub net_profit: f64,
    pub average_profit: f64,
}

impl From<BucketStat> for EmotionStat {
    fn from(stat: BucketStat) -> Self {
        Self {
            name: stat.label,
            count: stat.trade_count,
            win_rate: stat.win_rate,
            net_profit: stat.net_profit,
            average_profit: stat.average_profit,
        }
    }
}

pub fn win_rate_by_setup(trades: &[Trade], options: &AggregationOptions) -> Vec<WinRateStat> {
    breakdown(trades, Dimension::SetupType, options)
        .into_iter()
        .map(WinRateStat::from)
        .collect()
}

pub fn performance_by_time_slot(trades: &[Trade], options: &AggregationOptions) -> Vec<TimeSlotStat> {
    breakdown(trades, Dimension::TimeOfDay, options)
        .into_iter()
        .map(TimeSlotStat::from)
        .collect()
}

pub fn performance_by_emotion(trades: &[Trade], options: &AggregationOptions) -> Vec<EmotionStat> {
    breakdown(trades, Dimension::EmotionalState, options)
        .into_iter()
        .map(EmotionStat::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::{trade, TradeBuilder};

    fn sample() -> Vec<Trade> {
        vec![
            trade("1").setup("Breakout").win(300.0).rr(2.0, 3.0).build(),
            trade("2").setup("Breakout").loss(-100.0).rr(2.0, -1.0).build(),
            trade("3").setup("Breakout").outcome(TradeOutcome::Breakeven).pnl(0.0).build(),
            trade("4").setup("Pullback").win(150.0).build(),
            trade("5").win(50.0).build(),
            trade("6").setup("Pullback").build(),
        ]
    }

    #[test]
    fn test_counts_sum_to_total_for_every_dimension() {
        let trades = sample();
        let options = AggregationOptions::default();

        for dimension in Dimension::ALL {
            let stats = breakdown(&trades, dimension, &options);
            let total: usize = stats.iter().map(|s| s.trade_count).sum();
            assert_eq!(total, trades.len(), "{:?}", dimension);

            for stat in &stats {
                assert_eq!(
                    stat.win_count + stat.loss_count + stat.breakeven_count + stat.unknown_count,
                    stat.trade_count,
                    "{:?} / {}",
                    dimension,
                    stat.label
                );
            }
        }
    }

    #[test]
    fn test_setup_bucket_values() {
        let stats = breakdown(&sample(), Dimension::SetupType, &AggregationOptions::default());
        let labels: Vec<&str> = stats.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Breakout", "Pullback", UNKNOWN_LABEL]);

        let breakout = &stats[0];
        assert_eq!(breakout.trade_count, 3);
        assert_eq!(breakout.win_count, 1);
        assert_eq!(breakout.loss_count, 1);
        assert_eq!(breakout.breakeven_count, 1);
        assert_eq!(breakout.win_rate, 33.3);
        assert_eq!(breakout.net_profit, 200.0);
        assert_eq!(breakout.average_profit, 200.0 / 3.0);
        assert_eq!(breakout.gross_profit, 300.0);
        assert_eq!(breakout.gross_loss, 100.0);
        assert_eq!(breakout.profit_factor, 3.0);
        assert_eq!(breakout.average_planned_rr, 2.0);
        assert_eq!(breakout.average_actual_rr, 1.0);

        // Missing profit_loss counts as zero; missing outcome lands in unknown_count
        let pullback = &stats[1];
        assert_eq!(pullback.trade_count, 2);
        assert_eq!(pullback.unknown_count, 1);
        assert_eq!(pullback.net_profit, 150.0);
        assert_eq!(pullback.average_profit, 75.0);
        assert_eq!(pullback.win_rate, 50.0);
    }

    #[test]
    fn test_sub_cent_pnl_is_not_rounded_away() {
        let trades = vec![
            trade("1").setup("Grid").win(0.004).build(),
            trade("2").setup("Grid").win(0.004).build(),
            trade("3").setup("Grid").win(0.004).build(),
        ];
        let expected = trades.iter().fold(0.0, |acc, t| acc + t.profit_loss.unwrap());

        let stats = breakdown(&trades, Dimension::SetupType, &AggregationOptions::default());
        assert_eq!(stats[0].net_profit, expected);
        assert_eq!(stats[0].average_profit, expected / 3.0);
        assert!(stats[0].average_profit > 0.0);
    }

    #[test]
    fn test_profit_factor_without_losses_uses_sentinel() {
        let trades = vec![trade("1").setup("Scalp").win(80.0).build()];
        let stats = breakdown(&trades, Dimension::SetupType, &AggregationOptions::default());
        assert_eq!(stats[0].profit_factor, crate::stats::safe::NO_LOSS_PROFIT_FACTOR);
    }

    #[test]
    fn test_fixed_dimensions_emit_empty_buckets() {
        let stats = breakdown(&[], Dimension::TimeOfDay, &AggregationOptions::default());
        assert_eq!(stats.len(), 6);
        assert!(stats.iter().all(|s| s.trade_count == 0 && s.win_rate == 0.0 && s.net_profit == 0.0));
        assert_eq!(stats[0].label, "Pre-Market");

        let stats = breakdown(&[], Dimension::DayOfWeek, &AggregationOptions::default());
        assert_eq!(stats.len(), 7);

        assert!(breakdown(&[], Dimension::SetupType, &AggregationOptions::default()).is_empty());
    }

    #[test]
    fn test_risk_reward_unknown_appended_after_fixed_ranges() {
        let trades = vec![
            trade("1").win(10.0).rr(1.0, 2.4).build(),
            trade("2").loss(-10.0).build(),
        ];
        let stats = breakdown(&trades, Dimension::RiskReward, &AggregationOptions::default());
        let labels: Vec<&str> = stats.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["<1", "1-2", "2-3", ">3", UNKNOWN_LABEL]);
        assert_eq!(stats[2].trade_count, 1);
        assert_eq!(stats[4].trade_count, 1);
    }

    #[test]
    fn test_breakdown_is_idempotent() {
        let trades = sample();
        let options = AggregationOptions::default();
        assert_eq!(
            breakdown(&trades, Dimension::EmotionalState, &options),
            breakdown(&trades, Dimension::EmotionalState, &options)
        );
    }

    #[test]
    fn test_named_views() {
        let trades: Vec<Trade> = vec![
            TradeBuilder::new("1").emotion("Calm").win(100.0).build(),
            TradeBuilder::new("2").emotion("FOMO").loss(-60.0).build(),
            TradeBuilder::new("3").emotion("FOMO").loss(-40.0).build(),
        ];
        let options = AggregationOptions::default();

        let emotions = performance_by_emotion(&trades, &options);
        assert_eq!(emotions[0].name, "Calm");
        assert_eq!(emotions[1].name, "FOMO");
        assert_eq!(emotions[1].count, 2);
        assert_eq!(emotions[1].average_profit, -50.0);

        let setups = win_rate_by_setup(&trades, &options);
        assert_eq!(setups.len(), 1);
        assert_eq!(setups[0].setup_type, UNKNOWN_LABEL);
        assert_eq!(setups[0].win_rate, 33.3);

        let slots = performance_by_time_slot(&trades, &options);
        assert_eq!(slots.iter().map(|s| s.trade_count).sum::<usize>(), 3);
    }
}
