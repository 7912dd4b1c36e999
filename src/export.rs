//! CSV and PDF exports, full JSON backup/restore.

use chrono::Utc;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, JournalResult};
use crate::models::{
    CreateDailyPlanInput, CreateTradeInput, DailyPlan, Settings, Trade, UpdateSettingsInput,
};
use crate::repository::plans::{find_plan_by_date, insert_plan, query_plans};
use crate::repository::settings::{load_settings, write_settings};
use crate::repository::trades::{insert_trade, query_trades};
use crate::repository::SqliteJournalStore;
use crate::stats::safe::round_to;
use crate::stats::{breakdown, dashboard_stats, AggregationOptions, Dimension};
use crate::validation::{validate_plan_input, validate_trade_input};

pub const BACKUP_VERSION: &str = "1.1.0";

#[derive(Debug, Serialize)]
struct TradeCsvRow<'a> {
    id: &'a str,
    symbol: &'a str,
    asset_type: &'a str,
    setup_type: &'a str,
    entry_time: String,
    exit_time: String,
    entry_price: f64,
    exit_price: Option<f64>,
    position_size: f64,
    outcome: &'a str,
    planned_rr: Option<f64>,
    actual_rr: Option<f64>,
    profit_loss: Option<f64>,
    emotional_state: &'a str,
    plan_adherence: &'a str,
    tags: String,
    notes: &'a str,
}

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

fn money(value: f64) -> f64 {
    round_to(value, 2)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> JournalResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| JournalError::Export(e.to_string()))
}

/// One row per trade, timestamps as RFC 3339
pub fn trades_to_csv(trades: &[Trade]) -> JournalResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for trade in trades {
        writer.serialize(TradeCsvRow {
            id: &trade.id,
            symbol: &trade.symbol,
            asset_type: &trade.asset_type,
            setup_type: trade.setup_type.as_deref().unwrap_or(""),
            entry_time: format_timestamp(trade.entry_time),
            exit_time: trade.exit_time.map(format_timestamp).unwrap_or_default(),
            entry_price: trade.entry_price,
            exit_price: trade.exit_price,
            position_size: trade.position_size,
            outcome: trade.outcome.map(|o| o.as_str()).unwrap_or(""),
            planned_rr: trade.planned_rr,
            actual_rr: trade.actual_rr,
            profit_loss: trade.profit_loss,
            emotional_state: trade.emotional_state.as_deref().unwrap_or(""),
            plan_adherence: trade.plan_adherence.as_deref().unwrap_or(""),
            tags: trade.tags.join(";"),
            notes: &trade.notes,
        })?;
    }

    finish_csv(writer)
}

fn summary_rows(trades: &[Trade]) -> Vec<(&'static str, f64)> {
    let summary = dashboard_stats(trades);
    vec![
        ("total_trades", summary.total_trades as f64),
        ("wins", summary.wins as f64),
        ("losses", summary.losses as f64),
        ("breakevens", summary.breakevens as f64),
        ("win_rate", summary.win_rate),
        ("total_pnl", money(summary.total_pnl)),
        ("profit_factor", summary.profit_factor),
        ("avg_actual_rr", summary.avg_actual_rr),
        ("best_trade", money(summary.best_trade)),
        ("worst_trade", money(summary.worst_trade)),
    ]
}

/// Summary block followed by one section per breakdown dimension.
/// Money columns are rounded to cents here, not in the aggregates.
pub fn statistics_to_csv(trades: &[Trade], options: &AggregationOptions) -> JournalResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(["section", "metric", "value"])?;
    for (metric, value) in summary_rows(trades) {
        writer.write_record(["summary", metric, &value.to_string()])?;
    }

    writer.write_record([
        "section",
        "label",
        "trades",
        "wins",
        "losses",
        "breakevens",
        "unknown",
        "win_rate",
        "net_profit",
        "average_profit",
        "profit_factor",
        "average_rr",
    ])?;
    for dimension in Dimension::ALL {
        for stat in breakdown(trades, dimension, options) {
            writer.write_record([
                dimension.as_str().to_string(),
                stat.label,
                stat.trade_count.to_string(),
                stat.win_count.to_string(),
                stat.loss_count.to_string(),
                stat.breakeven_count.to_string(),
                stat.unknown_count.to_string(),
                stat.win_rate.to_string(),
                money(stat.net_profit).to_string(),
                money(stat.average_profit).to_string(),
                stat.profit_factor.to_string(),
                stat.average_actual_rr.to_string(),
            ])?;
        }
    }

    finish_csv(writer)
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const LAYER_NAME: &str = "Statistics";

fn pdf_error(err: impl std::fmt::Display) -> JournalError {
    JournalError::Export(format!("PDF: {}", err))
}

/// A4 pages filled top to bottom, one text line at a time
struct PdfPages {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    heading: IndirectFontRef,
    body: IndirectFontRef,
    y: f32,
}

impl PdfPages {
    fn new(title: &str) -> JournalResult<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
        let heading = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
        let body = doc.add_builtin_font(BuiltinFont::Courier).map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            heading,
            body,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn line(&mut self, text: &str, size: f32, heading: bool) {
        let line_height = size * 0.5;
        if self.y - line_height < MARGIN_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
        self.y -= line_height;

        let font = if heading { &self.heading } else { &self.body };
        self.layer
            .use_text(text, size, Mm(MARGIN_MM), Mm(self.y), font);
    }

    fn gap(&mut self) {
        self.y -= 3.0;
    }

    fn finish(self) -> JournalResult<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

/// Same content as [`statistics_to_csv`], laid out as a printable report
pub fn statistics_to_pdf(trades: &[Trade], options: &AggregationOptions) -> JournalResult<Vec<u8>> {
    let mut pages = PdfPages::new("Trading Statistics")?;

    pages.line("Trading Statistics", 18.0, true);
    pages.line(
        &format!("Generated {}", Utc::now().format("%Y-%m-%d %H:%M UTC")),
        9.0,
        false,
    );
    pages.gap();

    pages.line("Summary", 13.0, true);
    for (metric, value) in summary_rows(trades) {
        pages.line(&format!("{:<20} {:>14}", metric, value), 9.0, false);
    }

    for dimension in Dimension::ALL {
        pages.gap();
        pages.line(&dimension.as_str().replace('_', " "), 13.0, true);
        pages.line(
            &format!(
                "{:<20} {:>6} {:>8} {:>14} {:>14} {:>8}",
                "label", "trades", "win %", "net", "average", "pf"
            ),
            9.0,
            false,
        );
        for stat in breakdown(trades, dimension, options) {
            pages.line(
                &format!(
                    "{:<20.20} {:>6} {:>8} {:>14} {:>14} {:>8}",
                    stat.label,
                    stat.trade_count,
                    stat.win_rate,
                    money(stat.net_profit),
                    money(stat.average_profit),
                    stat.profit_factor
                ),
                9.0,
                false,
            );
        }
    }

    pages.finish()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupData {
    pub settings: Settings,
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub plans: Vec<DailyPlan>,
    pub export_date: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub settings_updated: bool,
    pub trades_imported: usize,
    pub plans_imported: usize,
    /// Backup plans written onto a plan that already existed for their date
    pub plans_merged: usize,
}

/// Export settings, trades and plans for the store's user as pretty JSON
pub fn export_all_data(store: &SqliteJournalStore) -> JournalResult<String> {
    let settings = load_settings(store.database())?;

    let (trades, plans) = {
        let conn = store.lock()?;
        (
            query_trades(&conn, store.user_id(), None)?,
            query_plans(&conn, store.user_id(), None, None)?,
        )
    };

    log::info!("Exporting {} trades and {} plans", trades.len(), plans.len());

    let backup = BackupData {
        settings,
        trades,
        plans,
        export_date: Utc::now().to_rfc3339(),
        version: BACKUP_VERSION.to_string(),
    };

    Ok(serde_json::to_string_pretty(&backup)?)
}

fn trade_input(trade: &Trade) -> CreateTradeInput {
    CreateTradeInput {
        symbol: trade.symbol.clone(),
        asset_type: trade.asset_type.clone(),
        setup_type: trade.setup_type.clone(),
        entry_price: trade.entry_price,
        exit_price: trade.exit_price,
        entry_time: trade.entry_time,
        exit_time: trade.exit_time,
        position_size: trade.position_size,
        outcome: trade.outcome,
        planned_rr: trade.planned_rr,
        actual_rr: trade.actual_rr,
        profit_loss: trade.profit_loss,
        emotional_state: trade.emotional_state.clone(),
        plan_adherence: trade.plan_adherence.clone(),
        tags: trade.tags.clone(),
        notes: trade.notes.clone(),
    }
}

fn plan_input(plan: &DailyPlan) -> CreateDailyPlanInput {
    CreateDailyPlanInput {
        date: plan.date,
        market_bias: plan.market_bias,
        key_levels: plan.key_levels.clone(),
        goals: plan.goals.clone(),
        risk_parameters: plan.risk_parameters.clone(),
        mental_state: plan.mental_state.clone(),
        notes: plan.notes.clone(),
    }
}

/// Prefix a validation failure with the backup record it came from
fn in_record(kind: &str, id: &str, err: JournalError) -> JournalError {
    match err {
        JournalError::Validation { field, message } => JournalError::Validation {
            field: format!("{} {} {}", kind, id, field),
            message,
        },
        other => other,
    }
}

/// Restore a backup into the store's user.
///
/// Every record is validated before anything is written, then settings,
/// trades and plans go in one transaction. Records with the same id are
/// replaced; a plan whose date already has a plan updates that plan.
pub fn import_all_data(store: &SqliteJournalStore, json_data: &str) -> JournalResult<ImportSummary> {
    let backup: BackupData = serde_json::from_str(json_data)?;

    if backup.version.split('.').next() != BACKUP_VERSION.split('.').next() {
        return Err(JournalError::Parse(format!(
            "Unsupported backup version {}",
            backup.version
        )));
    }

    for trade in &backup.trades {
        validate_trade_input(&trade_input(trade)).map_err(|e| in_record("trade", &trade.id, e))?;
    }
    for plan in &backup.plans {
        validate_plan_input(&plan_input(plan)).map_err(|e| in_record("plan", &plan.id, e))?;
    }

    let settings = UpdateSettingsInput {
        currency: Some(backup.settings.currency),
        utc_offset_minutes: Some(backup.settings.utc_offset_minutes),
        time_bucketing: Some(backup.settings.time_bucketing),
        consistency_window: Some(backup.settings.consistency_window),
        default_range_days: Some(backup.settings.default_range_days),
        enable_ai_coach: Some(backup.settings.enable_ai_coach),
        coach_model: Some(backup.settings.coach_model),
    };
    crate::repository::settings::validate(&settings)?;

    let user_id = store.user_id();
    let mut conn = store.lock()?;
    let tx = conn.transaction()?;

    write_settings(&tx, settings)?;

    let mut trades_imported = 0;
    for trade in backup.trades {
        let trade = Trade {
            user_id: user_id.to_string(),
            ..trade
        };
        insert_trade(&tx, &trade)?;
        trades_imported += 1;
    }

    let mut plans_imported = 0;
    let mut plans_merged = 0;
    for plan in backup.plans {
        let plan = match find_plan_by_date(&tx, user_id, plan.date)? {
            Some(existing) if existing.id != plan.id => {
                log::info!(
                    "Backup plan {} for {} merged into existing plan {}",
                    plan.id,
                    plan.date,
                    existing.id
                );
                plans_merged += 1;
                DailyPlan {
                    id: existing.id,
                    user_id: user_id.to_string(),
                    created_at: existing.created_at,
                    ..plan
                }
            }
            _ => DailyPlan {
                user_id: user_id.to_string(),
                ..plan
            },
        };
        insert_plan(&tx, &plan)?;
        plans_imported += 1;
    }

    tx.commit()?;
    log::info!(
        "Imported backup from {}: {} trades, {} plans ({} merged by date)",
        backup.export_date,
        trades_imported,
        plans_imported,
        plans_merged
    );

    Ok(ImportSummary {
        settings_updated: true,
        trades_imported,
        plans_imported,
        plans_merged,
    })
}
