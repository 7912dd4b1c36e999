//! AI coaching commentary over a statistics snapshot.

pub mod anthropic;
pub mod rate_limiter;
pub mod secure_storage;

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use anthropic::AnthropicCoach;
pub use secure_storage::{SecureStorage, COACH_API_KEY};

use crate::config::Capabilities;
use crate::error::{JournalError, JournalResult};
use crate::models::{CoachingNote, DailyPlan, TradeFilters};
use crate::repository::{generate_id, CoachingStore};
use crate::stats::{BucketStat, StatisticsReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachRequest {
    pub system: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachReply {
    pub content: String,
    pub model: String,
}

#[async_trait]
pub trait CoachClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: &CoachRequest) -> JournalResult<CoachReply>;
}

const SYSTEM_PROMPT: &str = "You are a trading performance coach. You review a trader's journal \
statistics and daily plan and give short, specific, actionable feedback. Focus on behaviour \
and process, not market predictions. Use at most five bullet points.";

fn best_and_worst(stats: &[BucketStat]) -> Option<(&BucketStat, &BucketStat)> {
    let populated: Vec<&BucketStat> = stats.iter().filter(|s| s.trade_count > 0).collect();
    let best = populated
        .iter()
        .copied()
        .max_by(|a, b| a.net_profit.total_cmp(&b.net_profit))?;
    let worst = populated
        .iter()
        .copied()
        .min_by(|a, b| a.net_profit.total_cmp(&b.net_profit))?;
    Some((best, worst))
}

/// Render the report (and today's plan, if any) as the user prompt
pub fn build_request(report: &StatisticsReport, plan: Option<&DailyPlan>, currency: &str) -> CoachRequest {
    let s = &report.summary;
    let mut prompt = String::new();

    let _ = writeln!(prompt, "PERFORMANCE SUMMARY");
    let _ = writeln!(
        prompt,
        "- {} trades: {} wins, {} losses, {} breakeven, {} open",
        s.total_trades, s.wins, s.losses, s.breakevens, s.open_trades
    );
    let _ = writeln!(prompt, "- Win rate {:.1}%, profit factor {:.2}", s.win_rate, s.profit_factor);
    let _ = writeln!(prompt, "- Net P&L {:.2} {}", s.total_pnl, currency);
    let _ = writeln!(
        prompt,
        "- Average R:R planned {:.2}, actual {:.2}",
        s.avg_planned_rr, s.avg_actual_rr
    );
    let _ = writeln!(
        prompt,
        "- Current streak: {} {:?}; longest win {}, longest loss {}; consistency {:.1}%",
        report.streaks.current_streak,
        report.streaks.current_streak_type,
        report.streaks.longest_win_streak,
        report.streaks.longest_loss_streak,
        report.streaks.consistency
    );

    let _ = writeln!(prompt, "\nSETUPS");
    for setup in &report.by_setup {
        let _ = writeln!(
            prompt,
            "- {}: {} trades, {:.1}% win, net {:.2}",
            setup.setup_type, setup.trade_count, setup.win_rate, setup.net_profit
        );
    }

    let _ = writeln!(prompt, "\nEMOTIONAL STATE");
    for emotion in &report.by_emotion {
        let _ = writeln!(
            prompt,
            "- {}: {} trades, {:.1}% win, avg {:.2}",
            emotion.name, emotion.count, emotion.win_rate, emotion.average_profit
        );
    }

    if let Some((best, worst)) = best_and_worst(&report.by_plan_adherence) {
        let _ = writeln!(
            prompt,
            "\nPLAN ADHERENCE\n- Best: {} (net {:.2})\n- Worst: {} (net {:.2})",
            best.label, best.net_profit, worst.label, worst.net_profit
        );
    }

    if let Some(plan) = plan {
        let _ = writeln!(prompt, "\nTODAY'S PLAN ({})", plan.date);
        let _ = writeln!(prompt, "- Bias: {}", plan.market_bias.as_str());
        for goal in &plan.goals {
            let _ = writeln!(prompt, "- Goal: {}", goal);
        }
        if let Some(max_loss) = plan.risk_parameters.max_daily_loss {
            let _ = writeln!(prompt, "- Max daily loss: {:.2} {}", max_loss, currency);
        }
        if !plan.mental_state.is_empty() {
            let _ = writeln!(prompt, "- Mental state: {}", plan.mental_state);
        }
    }

    CoachRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
    }
}

/// Ask the coach about `report` and keep the reply as a note for the period
pub async fn generate_commentary<C, S>(
    client: &C,
    store: &S,
    capabilities: &Capabilities,
    report: &StatisticsReport,
    plan: Option<&DailyPlan>,
    period: &TradeFilters,
    currency: &str,
) -> JournalResult<CoachingNote>
where
    C: CoachClient + ?Sized,
    S: CoachingStore + ?Sized,
{
    if !capabilities.ai_coach {
        return Err(JournalError::Disabled("AI coach".to_string()));
    }
    if report.summary.total_trades == 0 {
        return Err(JournalError::validation("trades", "no trades in the selected period"));
    }

    let request = build_request(report, plan, currency);
    log::info!(
        "Requesting coaching for {} trades from {}",
        report.summary.total_trades,
        client.model()
    );
    let reply = client.complete(&request).await?;

    store.save_note(CoachingNote {
        id: generate_id("NOTE"),
        user_id: String::new(),
        period_start: period.start_date,
        period_end: period.end_date,
        model: reply.model,
        content: reply.content,
        created_at: Utc::now().timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{MarketBias, RiskParameters};
    use crate::repository::SqliteJournalStore;
    use crate::stats::test_support::trade;
    use crate::stats::{build_report, AggregationOptions};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct FakeCoach {
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl FakeCoach {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CoachClient for FakeCoach {
        fn model(&self) -> &str {
            "fake-coach"
        }

        async fn complete(&self, request: &CoachRequest) -> JournalResult<CoachReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(request.prompt.clone());
            Ok(CoachReply {
                content: "- Cut FOMO entries.".to_string(),
                model: "fake-coach".to_string(),
            })
        }
    }

    fn report() -> StatisticsReport {
        let trades = vec![
            trade("1").setup("Breakout").emotion("Calm").adherence("Followed").win(200.0).build(),
            trade("2").setup("Breakout").emotion("FOMO").adherence("Deviated").loss(-150.0).build(),
        ];
        build_report(&trades, &AggregationOptions::default())
    }

    fn plan() -> DailyPlan {
        DailyPlan {
            id: "PLAN-1".to_string(),
            user_id: "user-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            market_bias: MarketBias::Bullish,
            key_levels: vec![],
            goals: vec!["No trades before 9:45".to_string()],
            risk_parameters: RiskParameters {
                max_daily_loss: Some(300.0),
                ..Default::default()
            },
            mental_state: "Tired".to_string(),
            notes: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_prompt_mentions_key_figures() {
        let request = build_request(&report(), Some(&plan()), "USD");

        assert!(request.prompt.contains("2 trades: 1 wins, 1 losses"));
        assert!(request.prompt.contains("Breakout: 2 trades, 50.0% win"));
        assert!(request.prompt.contains("FOMO"));
        assert!(request.prompt.contains("- Best: Followed"));
        assert!(request.prompt.contains("Goal: No trades before 9:45"));
        assert!(request.prompt.contains("Max daily loss: 300.00 USD"));
    }

    #[tokio::test]
    async fn test_commentary_saved_as_note() {
        let store = SqliteJournalStore::new(Arc::new(Database::open_in_memory().unwrap()), "user-1");
        let coach = FakeCoach::new();
        let period = TradeFilters {
            start_date: Some(1_704_067_200),
            ..Default::default()
        };

        let note = generate_commentary(
            &coach,
            &store,
            &Capabilities { ai_coach: true },
            &report(),
            None,
            &period,
            "USD",
        )
        .await
        .unwrap();

        assert_eq!(note.user_id, "user-1");
        assert_eq!(note.period_start, Some(1_704_067_200));
        assert_eq!(note.model, "fake-coach");
        assert_eq!(store.recent_notes(5).unwrap().len(), 1);
        assert!(coach.last_prompt.lock().unwrap().as_ref().unwrap().contains("PERFORMANCE SUMMARY"));
    }

    #[tokio::test]
    async fn test_disabled_capability_skips_request() {
        let store = SqliteJournalStore::new(Arc::new(Database::open_in_memory().unwrap()), "user-1");
        let coach = FakeCoach::new();

        let result = generate_commentary(
            &coach,
            &store,
            &Capabilities { ai_coach: false },
            &report(),
            None,
            &TradeFilters::default(),
            "USD",
        )
        .await;

        assert!(matches!(result, Err(JournalError::Disabled(_))));
        assert_eq!(coach.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_report_rejected() {
        let store = SqliteJournalStore::new(Arc::new(Database::open_in_memory().unwrap()), "user-1");
        let coach = FakeCoach::new();
        let empty = build_report(&[], &AggregationOptions::default());

        let result = generate_commentary(
            &coach,
            &store,
            &Capabilities { ai_coach: true },
            &empty,
            None,
            &TradeFilters::default(),
            "USD",
        )
        .await;

        assert!(matches!(result, Err(JournalError::Validation { .. })));
        assert_eq!(coach.calls.load(Ordering::SeqCst), 0);
    }
}
