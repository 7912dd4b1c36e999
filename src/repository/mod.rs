//! Record store access.
//!
//! The traits here are the only way the rest of the crate reaches stored
//! trades, plans and coaching notes. [`SqliteJournalStore`] is the single
//! implementation; tests substitute in-memory fakes.

pub mod coaching;
pub mod plans;
pub mod settings;
pub mod trades;

use std::sync::{Arc, MutexGuard};

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use crate::db::Database;
use crate::error::{JournalError, JournalResult, StoreErrorCode};
use crate::models::{
    CoachingNote, CreateDailyPlanInput, CreateTradeInput, DailyPlan, DeleteResult, Trade,
    TradeFilters,
};

pub trait TradeStore: Send + Sync {
    /// All trades for the current user matching `filters`
    fn list_trades(&self, filters: Option<&TradeFilters>) -> JournalResult<Vec<Trade>>;

    fn get_trade(&self, id: &str) -> JournalResult<Trade>;

    fn create_trade(&self, input: CreateTradeInput) -> JournalResult<Trade>;

    /// Apply a partial JSON patch; unknown keys are ignored
    fn update_trade(&self, id: &str, patch: &serde_json::Value) -> JournalResult<Trade>;

    fn delete_trade(&self, id: &str) -> JournalResult<DeleteResult>;
}

pub trait PlanStore: Send + Sync {
    /// `None` is the normal "no plan yet" state
    fn get_plan_by_date(&self, date: NaiveDate) -> JournalResult<Option<DailyPlan>>;

    fn get_plan(&self, id: &str) -> JournalResult<DailyPlan>;

    fn list_plans(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> JournalResult<Vec<DailyPlan>>;

    fn create_plan(&self, input: CreateDailyPlanInput) -> JournalResult<DailyPlan>;

    fn update_plan(&self, id: &str, input: CreateDailyPlanInput) -> JournalResult<DailyPlan>;

    fn delete_plan(&self, id: &str) -> JournalResult<DeleteResult>;
}

pub trait CoachingStore: Send + Sync {
    fn save_note(&self, note: CoachingNote) -> JournalResult<CoachingNote>;

    fn recent_notes(&self, limit: usize) -> JournalResult<Vec<CoachingNote>>;
}

/// SQLite-backed store scoped to one user
#[derive(Clone)]
pub struct SqliteJournalStore {
    db: Arc<Database>,
    user_id: String,
}

impl SqliteJournalStore {
    pub fn new(db: Arc<Database>, user_id: impl Into<String>) -> Self {
        Self {
            db,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub(crate) fn lock(&self) -> JournalResult<MutexGuard<'_, Connection>> {
        lock_connection(&self.db)
    }
}

pub(crate) fn lock_connection(db: &Database) -> JournalResult<MutexGuard<'_, Connection>> {
    db.conn
        .lock()
        .map_err(|e| JournalError::store(StoreErrorCode::Unavailable, e.to_string()))
}

pub(crate) fn generate_id(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4()
    )
}
