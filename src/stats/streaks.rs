use serde::{Deserialize, Serialize};

use super::safe::percentage;
use crate::models::{Trade, TradeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakType {
    Win,
    Loss,
    Breakeven,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: usize,
    pub current_streak_type: StreakType,
    pub longest_win_streak: usize,
    pub longest_loss_streak: usize,
    /// Win percentage over the most recent resolved trades
    pub consistency: f64,
}

/// Scan trades in entry order (ties broken by id). Trades without an outcome
/// are skipped; a breakeven ends both win and loss runs.
pub fn compute_streaks(trades: &[Trade], consistency_window: usize) -> StreakState {
    let mut resolved: Vec<(&Trade, TradeOutcome)> = trades
        .iter()
        .filter_map(|t| t.outcome.map(|o| (t, o)))
        .collect();
    resolved.sort_by(|(a, _), (b, _)| a.entry_time.cmp(&b.entry_time).then_with(|| a.id.cmp(&b.id)));

    let mut state = StreakState::default();
    let mut run = 0usize;
    let mut run_type = StreakType::None;

    for (_, outcome) in &resolved {
        let kind = match outcome {
            TradeOutcome::Win => StreakType::Win,
            TradeOutcome::Loss => StreakType::Loss,
            TradeOutcome::Breakeven => StreakType::Breakeven,
        };

        if kind == run_type {
            run += 1;
        } else {
            run_type = kind;
            run = 1;
        }

        match run_type {
            StreakType::Win => state.longest_win_streak = state.longest_win_streak.max(run),
            StreakType::Loss => state.longest_loss_streak = state.longest_loss_streak.max(run),
            _ => {}
        }
    }

    state.current_streak = run;
    state.current_streak_type = run_type;

    let window = consistency_window.max(1);
    let recent = &resolved[resolved.len().saturating_sub(window)..];
    let wins = recent
        .iter()
        .filter(|(_, o)| *o == TradeOutcome::Win)
        .count();
    state.consistency = percentage(wins, recent.len());

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::{trade, BASE_TIME};

    fn sequence(outcomes: &[TradeOutcome]) -> Vec<Trade> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| trade(&format!("t{}", i)).at(BASE_TIME + i as i64 * 60).outcome(*o).build())
            .collect()
    }

    use TradeOutcome::{Breakeven as B, Loss as L, Win as W};

    #[test]
    fn test_streak_example() {
        let state = compute_streaks(&sequence(&[W, W, L, W, W, W]), 20);
        assert_eq!(state.longest_win_streak, 3);
        assert_eq!(state.longest_loss_streak, 1);
        assert_eq!(state.current_streak, 3);
        assert_eq!(state.current_streak_type, StreakType::Win);
        assert_eq!(state.consistency, 83.3);
    }

    #[test]
    fn test_breakeven_ends_runs() {
        let state = compute_streaks(&sequence(&[L, L, B, L, W, B]), 20);
        assert_eq!(state.longest_loss_streak, 2);
        assert_eq!(state.longest_win_streak, 1);
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.current_streak_type, StreakType::Breakeven);
    }

    #[test]
    fn test_order_follows_entry_time_not_input() {
        let mut trades = sequence(&[L, W, W]);
        trades.reverse();
        let state = compute_streaks(&trades, 20);
        assert_eq!(state.current_streak_type, StreakType::Win);
        assert_eq!(state.current_streak, 2);
    }

    #[test]
    fn test_unknown_outcomes_skipped() {
        let mut trades = sequence(&[W, W]);
        trades.insert(1, trade("t-open").at(BASE_TIME + 30).build());
        let state = compute_streaks(&trades, 20);
        assert_eq!(state.longest_win_streak, 2);
        assert_eq!(state.consistency, 100.0);
    }

    #[test]
    fn test_consistency_window() {
        let state = compute_streaks(&sequence(&[L, L, L, W, W]), 2);
        assert_eq!(state.consistency, 100.0);
        let state = compute_streaks(&sequence(&[L, L, L, W, W]), 4);
        assert_eq!(state.consistency, 50.0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(compute_streaks(&[], 20), StreakState::default());
    }
}
