use crate::models::{Trade, TradeOutcome};

// 2024-01-02 14:45:00 UTC
pub const BASE_TIME: i64 = 1_704_206_700;

pub struct TradeBuilder {
    trade: Trade,
}

pub fn trade(id: &str) -> TradeBuilder {
    TradeBuilder::new(id)
}

impl TradeBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            trade: Trade {
                id: id.to_string(),
                user_id: "user-1".to_string(),
                symbol: "AAPL".to_string(),
                asset_type: "STOCK".to_string(),
                setup_type: None,
                entry_price: 100.0,
                exit_price: None,
                entry_time: BASE_TIME,
                exit_time: None,
                position_size: 10.0,
                outcome: None,
                planned_rr: None,
                actual_rr: None,
                profit_loss: None,
                emotional_state: None,
                plan_adherence: None,
                tags: vec![],
                notes: String::new(),
                created_at: BASE_TIME,
                updated_at: BASE_TIME,
            },
        }
    }

    pub fn symbol(mut self, symbol: &str) -> Self {
        self.trade.symbol = symbol.to_string();
        self
    }

    pub fn setup(mut self, setup: &str) -> Self {
        self.trade.setup_type = Some(setup.to_string());
        self
    }

    pub fn emotion(mut self, emotion: &str) -> Self {
        self.trade.emotional_state = Some(emotion.to_string());
        self
    }

    pub fn adherence(mut self, adherence: &str) -> Self {
        self.trade.plan_adherence = Some(adherence.to_string());
        self
    }

    pub fn at(mut self, entry_time: i64) -> Self {
        self.trade.entry_time = entry_time;
        self
    }

    pub fn exit_at(mut self, exit_time: i64) -> Self {
        self.trade.exit_time = Some(exit_time);
        self
    }

    pub fn outcome(mut self, outcome: TradeOutcome) -> Self {
        self.trade.outcome = Some(outcome);
        self
    }

    pub fn pnl(mut self, pnl: f64) -> Self {
        self.trade.profit_loss = Some(pnl);
        self
    }

    pub fn win(self, pnl: f64) -> Self {
        self.outcome(TradeOutcome::Win).pnl(pnl)
    }

    pub fn loss(self, pnl: f64) -> Self {
        self.outcome(TradeOutcome::Loss).pnl(pnl)
    }

    pub fn rr(mut self, planned: f64, actual: f64) -> Self {
        self.trade.planned_rr = Some(planned);
        self.trade.actual_rr = Some(actual);
        self
    }

    pub fn build(self) -> Trade {
        self.trade
    }
}
