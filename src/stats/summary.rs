use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dimension::AggregationOptions;
use super::safe::{percentage, pnl_or_zero, profit_factor, round_to, Mean};
use crate::models::{Trade, TradeOutcome};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    /// Trades with no outcome recorded yet
    pub open_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub avg_planned_rr: f64,
    pub avg_actual_rr: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: String,
    pub cumulative_pnl: f64,
    pub daily_pnl: f64,
    pub trade_count: usize,
}

pub fn dashboard_stats(trades: &[Trade]) -> DashboardStats {
    let mut stats = DashboardStats {
        total_trades: trades.len(),
        ..Default::default()
    };

    let mut planned_rr = Mean::default();
    let mut actual_rr = Mean::default();
    let mut best: Option<f64> = None;
    let mut worst: Option<f64> = None;

    for trade in trades {
        match trade.outcome {
            Some(TradeOutcome::Win) => stats.wins += 1,
            Some(TradeOutcome::Loss) => stats.losses += 1,
            Some(TradeOutcome::Breakeven) => stats.breakevens += 1,
            None => stats.open_trades += 1,
        }

        let pnl = pnl_or_zero(trade);
        stats.total_pnl += pnl;
        if pnl > 0.0 {
            stats.gross_profit += pnl;
        } else if pnl < 0.0 {
            stats.gross_loss += pnl.abs();
        }

        if trade.profit_loss.is_some() {
            best = Some(best.map_or(pnl, |b| b.max(pnl)));
            worst = Some(worst.map_or(pnl, |w| w.min(pnl)));
        }

        planned_rr.push(trade.planned_rr);
        actual_rr.push(trade.actual_rr);
    }

    stats.win_rate = percentage(stats.wins, stats.total_trades);
    stats.profit_factor = round_to(profit_factor(stats.gross_profit, stats.gross_loss), 2);
    stats.avg_planned_rr = round_to(planned_rr.value(), 2);
    stats.avg_actual_rr = round_to(actual_rr.value(), 2);
    stats.best_trade = best.unwrap_or(0.0);
    stats.worst_trade = worst.unwrap_or(0.0);
    stats
}

/// Daily P&L keyed by the local close date (entry date for open trades)
pub fn equity_curve(trades: &[Trade], options: &AggregationOptions) -> Vec<EquityCurvePoint> {
    let mut daily: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for trade in trades {
        let Some(pnl) = trade.profit_loss.filter(|p| p.is_finite()) else {
            continue;
        };
        let timestamp = trade.exit_time.unwrap_or(trade.entry_time);
        let Some(local) = options.local_time(timestamp) else {
            log::warn!("Skipping trade {} with invalid timestamp {}", trade.id, timestamp);
            continue;
        };

        let entry = daily.entry(local.format("%Y-%m-%d").to_string()).or_insert((0.0, 0));
        entry.0 += pnl;
        entry.1 += 1;
    }

    let mut cumulative = 0.0;
    daily
        .into_iter()
        .map(|(date, (daily_pnl, trade_count))| {
            cumulative += daily_pnl;
            EquityCurvePoint {
                date,
                cumulative_pnl: cumulative,
                daily_pnl,
                trade_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::{trade, BASE_TIME};

    const DAY: i64 = 86_400;

    #[test]
    fn test_dashboard_totals() {
        let trades = vec![
            trade("1").win(250.0).rr(2.0, 2.5).build(),
            trade("2").loss(-100.0).rr(2.0, -1.0).build(),
            trade("3").outcome(TradeOutcome::Breakeven).pnl(0.0).build(),
            trade("4").build(),
        ];
        let stats = dashboard_stats(&trades);

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.breakevens, 1);
        assert_eq!(stats.open_trades, 1);
        assert_eq!(stats.win_rate, 25.0);
        assert_eq!(stats.total_pnl, 150.0);
        assert_eq!(stats.profit_factor, 2.5);
        assert_eq!(stats.avg_actual_rr, 0.75);
        assert_eq!(stats.best_trade, 250.0);
        assert_eq!(stats.worst_trade, -100.0);
    }

    #[test]
    fn test_totals_keep_sub_cent_pnl() {
        let trades = vec![
            trade("1").win(0.004).build(),
            trade("2").win(0.004).build(),
            trade("3").loss(-0.001).build(),
        ];
        let expected = trades.iter().fold(0.0, |acc, t| acc + t.profit_loss.unwrap());

        let stats = dashboard_stats(&trades);
        assert_eq!(stats.total_pnl, expected);
        assert_eq!(stats.gross_loss, 0.001);

        let curve = equity_curve(&trades, &AggregationOptions::default());
        assert_eq!(curve.len(), 1);
        assert_eq!(curve[0].daily_pnl, expected);
        assert_eq!(curve[0].cumulative_pnl, expected);
    }

    #[test]
    fn test_dashboard_empty() {
        assert_eq!(dashboard_stats(&[]), DashboardStats::default());
    }

    #[test]
    fn test_equity_curve_accumulates_by_day() {
        let trades = vec![
            trade("3").at(BASE_TIME + DAY).loss(-50.0).build(),
            trade("1").at(BASE_TIME).win(100.0).build(),
            trade("2").at(BASE_TIME + 600).win(40.0).build(),
            trade("open").at(BASE_TIME + 2 * DAY).build(),
        ];
        let curve = equity_curve(&trades, &AggregationOptions::default());

        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].date, "2024-01-02");
        assert_eq!(curve[0].daily_pnl, 140.0);
        assert_eq!(curve[0].trade_count, 2);
        assert_eq!(curve[1].date, "2024-01-03");
        assert_eq!(curve[1].cumulative_pnl, 90.0);
    }

    #[test]
    fn test_equity_curve_uses_exit_date() {
        let trades = vec![trade("1").at(BASE_TIME).exit_at(BASE_TIME + DAY).win(10.0).build()];
        let curve = equity_curve(&trades, &AggregationOptions::default());
        assert_eq!(curve[0].date, "2024-01-03");
    }
}
