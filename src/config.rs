//! Startup configuration.
//!
//! [`AppConfig`] is resolved once from the settings row plus `TRADE_JOURNAL_*`
//! environment overrides and handed to the components that need it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::coach::SecureStorage;
use crate::controller::{last_days_filter, StatsController, DEFAULT_DEBOUNCE};
use crate::db::Database;
use crate::models::Settings;
use crate::repository::settings::load_settings;
use crate::repository::SqliteJournalStore;
use crate::stats::{AggregationOptions, TimeBucketing};

pub const DATABASE_FILE: &str = "trading_journal.db";
pub const DEFAULT_USER_ID: &str = "local";
const ENV_PREFIX: &str = "TRADE_JOURNAL_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub ai_coach: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub user_id: String,
    pub data_source: DataSource,
    pub capabilities: Capabilities,
    pub aggregation: AggregationOptions,
    pub default_range_days: i64,
    pub debounce_ms: u64,
    pub currency: String,
    pub coach_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            data_source: DataSource::Sqlite,
            capabilities: Capabilities::default(),
            aggregation: AggregationOptions::default(),
            default_range_days: crate::controller::DEFAULT_RANGE_DAYS,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            currency: "USD".to_string(),
            coach_model: crate::coach::anthropic::DEFAULT_MODEL.to_string(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            capabilities: Capabilities {
                ai_coach: settings.enable_ai_coach,
            },
            aggregation: AggregationOptions {
                utc_offset_minutes: settings.utc_offset_minutes,
                time_bucketing: TimeBucketing::parse(&settings.time_bucketing),
                consistency_window: settings.consistency_window.max(1) as usize,
            },
            default_range_days: i64::from(settings.default_range_days.max(1)),
            currency: settings.currency.clone(),
            coach_model: settings.coach_model.clone(),
            ..Default::default()
        }
    }

    /// Apply `TRADE_JOURNAL_*` overrides read through `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(user_id) = var("USER_ID").filter(|v| !v.trim().is_empty()) {
            self.user_id = user_id.trim().to_string();
        }
        if let Some(source) = var("DATA_SOURCE") {
            if !source.eq_ignore_ascii_case("sqlite") {
                log::warn!("Unsupported data source '{}', using sqlite", source);
            }
        }
        if let Some(flag) = var("AI_COACH") {
            match parse_flag(&flag) {
                Some(enabled) => self.capabilities.ai_coach = enabled,
                None => log::warn!("Ignoring invalid {}AI_COACH value '{}'", ENV_PREFIX, flag),
            }
        }
        if let Some(offset) = var("UTC_OFFSET_MINUTES") {
            match offset.trim().parse::<i32>() {
                Ok(minutes) if (-14 * 60..=14 * 60).contains(&minutes) => {
                    self.aggregation.utc_offset_minutes = minutes
                }
                _ => log::warn!("Ignoring invalid {}UTC_OFFSET_MINUTES value '{}'", ENV_PREFIX, offset),
            }
        }
        if let Some(ms) = var("DEBOUNCE_MS").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.debounce_ms = ms;
        }
        self
    }

    pub fn from_env(settings: &Settings) -> Self {
        Self::from_settings(settings).with_overrides(|name| std::env::var(name).ok())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Everything the desktop shell shares between commands
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<SqliteJournalStore>,
    pub stats: StatsController<SqliteJournalStore>,
    pub secrets: SecureStorage,
}

impl AppState {
    /// Open (and migrate) the journal database under `app_dir`
    pub fn initialize(app_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(app_dir)
            .with_context(|| format!("Failed to create app data dir {}", app_dir.display()))?;

        let db_path = app_dir.join(DATABASE_FILE);
        let db_path = db_path
            .to_str()
            .context("Database path is not valid UTF-8")?;
        log::info!("Opening journal database at {}", db_path);

        let db = Arc::new(Database::new(db_path).context("Failed to open database")?);
        let settings = load_settings(&db).context("Failed to load settings")?;
        let config = AppConfig::from_env(&settings);
        log::info!(
            "Config: user={}, ai_coach={}, utc_offset={}min",
            config.user_id,
            config.capabilities.ai_coach,
            config.aggregation.utc_offset_minutes
        );

        Ok(Self::with_database(db, config, SecureStorage::new(app_dir)?))
    }

    pub fn with_database(db: Arc<Database>, config: AppConfig, secrets: SecureStorage) -> Self {
        let store = Arc::new(SqliteJournalStore::new(db, config.user_id.clone()));
        let stats = StatsController::new(
            Arc::clone(&store),
            config.aggregation,
            last_days_filter(config.default_range_days),
        )
        .with_debounce(config.debounce());

        Self {
            config,
            store,
            stats,
            secrets,
        }
    }
}
