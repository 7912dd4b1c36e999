//! Statistics view controller.
//!
//! Owns the filter state for one statistics view. Every change re-fetches the
//! trade snapshot and recomputes the report off the async runtime. Refreshes
//! are numbered; only the newest generation may publish, so a slow response
//! for an old filter can never overwrite a newer one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{JournalError, JournalResult, StoreErrorCode};
use crate::models::TradeFilters;
use crate::repository::TradeStore;
use crate::stats::{build_report, AggregationOptions, StatisticsReport};
use crate::validation::normalize_label;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_RANGE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What the view renders. Published on every state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsView {
    pub generation: u64,
    pub filter: TradeFilters,
    pub status: ViewStatus,
    /// Last successfully computed report; kept while a newer one loads
    pub report: Option<StatisticsReport>,
    pub error: Option<String>,
}

/// Filter covering the last `days` days up to now
pub fn last_days_filter(days: i64) -> TradeFilters {
    TradeFilters {
        start_date: Some(Utc::now().timestamp() - days.max(0) * 86_400),
        ..Default::default()
    }
}

#[derive(Default)]
struct ControllerState {
    filter: TradeFilters,
    in_flight: Option<JoinHandle<()>>,
    pending_symbol: Option<JoinHandle<()>>,
}

struct Inner<S> {
    store: Arc<S>,
    options: AggregationOptions,
    debounce: Duration,
    state: Mutex<ControllerState>,
    sender: watch::Sender<StatsView>,
    closed: AtomicBool,
}

pub struct StatsController<S: TradeStore + 'static> {
    inner: Arc<Inner<S>>,
}

impl<S: TradeStore + 'static> Clone for StatsController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TradeStore + 'static> StatsController<S> {
    pub fn new(store: Arc<S>, options: AggregationOptions, initial_filter: TradeFilters) -> Self {
        let (sender, _) = watch::channel(StatsView {
            generation: 0,
            filter: initial_filter.clone(),
            status: ViewStatus::Idle,
            report: None,
            error: None,
        });

        Self {
            inner: Arc::new(Inner {
                store,
                options,
                debounce: DEFAULT_DEBOUNCE,
                state: Mutex::new(ControllerState {
                    filter: initial_filter,
                    ..Default::default()
                }),
                sender,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Replace the symbol debounce window; call before sharing the controller
    pub fn with_debounce(self, debounce: Duration) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.debounce = debounce;
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(inner) => {
                log::warn!("Debounce not changed: controller already shared");
                Self { inner }
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StatsView> {
        self.inner.sender.subscribe()
    }

    pub fn current(&self) -> StatsView {
        self.inner.sender.borrow().clone()
    }

    pub fn filter(&self) -> JournalResult<TradeFilters> {
        Ok(self.inner.lock_state()?.filter.clone())
    }

    /// Re-fetch with the current filter. Returns the generation started.
    pub fn refresh(&self) -> JournalResult<u64> {
        self.inner.refresh()
    }

    pub fn set_date_range(&self, start: Option<i64>, end: Option<i64>) -> JournalResult<u64> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(JournalError::validation("date_range", "start must not be after end"));
            }
        }
        self.inner.update_filter(|filter| {
            filter.start_date = start;
            filter.end_date = end;
        })
    }

    pub fn set_setup_type(&self, setup_type: Option<String>) -> JournalResult<u64> {
        let setup_type = normalize_label(setup_type);
        self.inner.update_filter(|filter| filter.setup_type = setup_type)
    }

    pub fn set_asset_type(&self, asset_type: Option<String>) -> JournalResult<u64> {
        let asset_type = normalize_label(asset_type).map(|a| a.to_uppercase());
        self.inner.update_filter(|filter| filter.asset_type = asset_type)
    }

    /// Free-text symbol input; applied once typing pauses for the debounce window
    pub fn set_symbol_text(&self, text: &str) -> JournalResult<()> {
        if self.inner.is_closed() {
            return Ok(());
        }

        let symbol = normalize_label(Some(text.to_string()));
        let inner = Arc::clone(&self.inner);
        let debounce = self.inner.debounce;

        let mut state = self.inner.lock_state()?;
        if let Some(previous) = state.pending_symbol.take() {
            previous.abort();
        }
        state.pending_symbol = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Err(e) = inner.update_filter(|filter| filter.symbol = symbol) {
                log::error!("Failed to apply symbol filter: {}", e);
            }
        }));
        Ok(())
    }

    /// Stop all work for this view. Nothing is published afterwards.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        match self.inner.lock_state() {
            Ok(mut state) => {
                if let Some(handle) = state.in_flight.take() {
                    handle.abort();
                }
                if let Some(handle) = state.pending_symbol.take() {
                    handle.abort();
                }
            }
            Err(e) => log::error!("Failed to close stats controller: {}", e),
        }
        log::debug!("Stats controller closed");
    }
}

impl<S: TradeStore + 'static> Inner<S> {
    fn lock_state(&self) -> JournalResult<MutexGuard<'_, ControllerState>> {
        self.state
            .lock()
            .map_err(|e| JournalError::store(StoreErrorCode::Internal, e.to_string()))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn update_filter(self: &Arc<Self>, apply: impl FnOnce(&mut TradeFilters)) -> JournalResult<u64> {
        {
            let mut state = self.lock_state()?;
            let before = state.filter.clone();
            apply(&mut state.filter);
            if state.filter == before && self.sender.borrow().status != ViewStatus::Idle {
                return Ok(self.sender.borrow().generation);
            }
        }
        self.refresh()
    }

    fn refresh(self: &Arc<Self>) -> JournalResult<u64> {
        if self.is_closed() {
            return Ok(self.sender.borrow().generation);
        }

        let mut state = self.lock_state()?;
        if let Some(previous) = state.in_flight.take() {
            previous.abort();
        }

        let filter = state.filter.clone();
        let mut generation = 0;
        self.sender.send_modify(|view| {
            view.generation += 1;
            view.filter = filter.clone();
            view.status = ViewStatus::Loading;
            view.error = None;
            generation = view.generation;
        });
        log::debug!("Stats refresh {} started: {:?}", generation, filter);

        let inner = Arc::clone(self);
        state.in_flight = Some(tokio::spawn(async move {
            let store = Arc::clone(&inner.store);
            let options = inner.options;
            let result = tokio::task::spawn_blocking(move || {
                let trades = store.list_trades(Some(&filter))?;
                Ok::<_, JournalError>(build_report(&trades, &options))
            })
            .await
            .unwrap_or_else(|e| Err(JournalError::store(StoreErrorCode::Internal, e.to_string())));

            inner.publish(generation, result);
        }));

        Ok(generation)
    }

    fn publish(&self, generation: u64, result: JournalResult<StatisticsReport>) {
        let closed = self.is_closed();
        let applied = self.sender.send_if_modified(|view| {
            if closed || view.generation != generation {
                return false;
            }
            match &result {
                Ok(report) => {
                    view.status = ViewStatus::Ready;
                    view.report = Some(report.clone());
                    view.error = None;
                }
                Err(e) => {
                    view.status = ViewStatus::Failed;
                    view.error = Some(e.user_message());
                }
            }
            true
        });

        match (&result, applied) {
            (_, false) => log::debug!("Discarded stale stats result for generation {}", generation),
            (Err(e), true) => log::error!("Stats refresh {} failed: {}", generation, e),
            (Ok(report), true) => log::debug!(
                "Stats refresh {} ready: {} trades",
                generation,
                report.summary.total_trades
            ),
        }
    }
}
