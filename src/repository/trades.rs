use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, ToSql};
use serde_json::Value;

use super::{generate_id, SqliteJournalStore, TradeStore};
use crate::error::{JournalError, JournalResult};
use crate::models::{CreateTradeInput, DeleteResult, Trade, TradeFilters, TradeOutcome};
use crate::validation::{normalize_label, normalize_trade_input, validate_symbol, validate_trade_input};

const TRADE_COLUMNS: &str = "id, user_id, symbol, asset_type, setup_type, entry_price, exit_price, \
     entry_time, exit_time, position_size, outcome, planned_rr, actual_rr, profit_loss, \
     emotional_state, plan_adherence, tags, notes, created_at, updated_at";

fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    let outcome: Option<String> = row.get("outcome")?;
    let tags: String = row.get("tags")?;
    let id: String = row.get("id")?;

    let tags = serde_json::from_str::<Vec<String>>(&tags).unwrap_or_else(|e| {
        log::warn!("Trade {} has unreadable tags ({}), treating as empty", id, e);
        Vec::new()
    });

    Ok(Trade {
        user_id: row.get("user_id")?,
        symbol: row.get("symbol")?,
        asset_type: row.get("asset_type")?,
        setup_type: row.get("setup_type")?,
        entry_price: row.get("entry_price")?,
        exit_price: row.get("exit_price")?,
        entry_time: row.get("entry_time")?,
        exit_time: row.get("exit_time")?,
        position_size: row.get("position_size")?,
        outcome: outcome.as_deref().and_then(TradeOutcome::parse),
        planned_rr: row.get("planned_rr")?,
        actual_rr: row.get("actual_rr")?,
        profit_loss: row.get("profit_loss")?,
        emotional_state: row.get("emotional_state")?,
        plan_adherence: row.get("plan_adherence")?,
        tags,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        id,
    })
}

pub(crate) fn query_trades(
    conn: &Connection,
    user_id: &str,
    filters: Option<&TradeFilters>,
) -> JournalResult<Vec<Trade>> {
    let mut query = format!("SELECT {} FROM trades WHERE user_id = ?", TRADE_COLUMNS);
    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

    if let Some(f) = filters {
        if let Some(start_date) = f.start_date {
            conditions.push("entry_time >= ?");
            params.push(Box::new(start_date));
        }
        if let Some(end_date) = f.end_date {
            conditions.push("entry_time <= ?");
            params.push(Box::new(end_date));
        }
        if let Some(symbol) = selected(&f.symbol) {
            conditions.push("symbol LIKE ? ESCAPE '\\'");
            params.push(Box::new(format!("%{}%", escape_like(symbol))));
        }
        if let Some(setup_type) = selected(&f.setup_type) {
            conditions.push("setup_type = ?");
            params.push(Box::new(setup_type.to_string()));
        }
        if let Some(asset_type) = selected(&f.asset_type) {
            conditions.push("asset_type = ?");
            params.push(Box::new(asset_type.to_uppercase()));
        }
    }

    if !conditions.is_empty() {
        query.push_str(&format!(" AND {}", conditions.join(" AND ")));
    }
    query.push_str(" ORDER BY entry_time DESC");

    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let trades = stmt
        .query_map(param_refs.as_slice(), map_row_to_trade)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(trades)
}

/// Treat `%`, `_` and `\` in user text as literals inside a LIKE pattern
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Dropdown values of "all" or "" mean no filter
fn selected(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

fn fetch_trade(conn: &Connection, user_id: &str, id: &str) -> JournalResult<Trade> {
    conn.query_row(
        &format!("SELECT {} FROM trades WHERE id = ? AND user_id = ?", TRADE_COLUMNS),
        [id, user_id],
        map_row_to_trade,
    )
    .optional()?
    .ok_or_else(|| JournalError::NotFound(format!("Trade {}", id)))
}

pub(crate) fn insert_trade(conn: &Connection, trade: &Trade) -> JournalResult<()> {
    let tags = serde_json::to_string(&trade.tags)?;
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO trades ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRADE_COLUMNS
        ),
        rusqlite::params![
            trade.id,
            trade.user_id,
            trade.symbol,
            trade.asset_type,
            trade.setup_type,
            trade.entry_price,
            trade.exit_price,
            trade.entry_time,
            trade.exit_time,
            trade.position_size,
            trade.outcome.map(|o| o.as_str()),
            trade.planned_rr,
            trade.actual_rr,
            trade.profit_loss,
            trade.emotional_state,
            trade.plan_adherence,
            tags,
            trade.notes,
            trade.created_at,
            trade.updated_at,
        ],
    )?;
    Ok(())
}

/// Column updates for one patch key; `null` clears nullable columns
enum PatchValue {
    Text(Option<String>),
    Real(Option<f64>),
    Integer(Option<i64>),
}

impl PatchValue {
    fn into_sql(self) -> Box<dyn ToSql> {
        match self {
            PatchValue::Text(v) => Box::new(v),
            PatchValue::Real(v) => Box::new(v),
            PatchValue::Integer(v) => Box::new(v),
        }
    }
}

fn patch_text(value: &Value, field: &str, nullable: bool) -> JournalResult<PatchValue> {
    match value {
        Value::Null if nullable => Ok(PatchValue::Text(None)),
        Value::String(s) => Ok(PatchValue::Text(if nullable {
            normalize_label(Some(s.clone()))
        } else {
            Some(s.clone())
        })),
        _ => Err(JournalError::validation(field, "must be a string")),
    }
}

fn patch_real(value: &Value, field: &str, nullable: bool) -> JournalResult<PatchValue> {
    match value {
        Value::Null if nullable => Ok(PatchValue::Real(None)),
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| PatchValue::Real(Some(v)))
            .ok_or_else(|| JournalError::validation(field, "must be a number")),
        _ => Err(JournalError::validation(field, "must be a number")),
    }
}

fn patch_integer(value: &Value, field: &str, nullable: bool) -> JournalResult<PatchValue> {
    match value {
        Value::Null if nullable => Ok(PatchValue::Integer(None)),
        Value::Number(n) => n
            .as_i64()
            .map(|v| PatchValue::Integer(Some(v)))
            .ok_or_else(|| JournalError::validation(field, "must be a whole number")),
        _ => Err(JournalError::validation(field, "must be a whole number")),
    }
}

fn build_patch(patch: &Value) -> JournalResult<Vec<(&'static str, PatchValue)>> {
    let Some(object) = patch.as_object() else {
        return Err(JournalError::validation("patch", "must be an object"));
    };

    let mut updates = Vec::new();
    for (key, value) in object {
        let update = match key.as_str() {
            "symbol" => {
                let symbol = value
                    .as_str()
                    .ok_or_else(|| JournalError::validation("symbol", "must be a string"))?;
                validate_symbol(symbol)?;
                ("symbol", PatchValue::Text(Some(symbol.trim().to_uppercase())))
            }
            "asset_type" => match value.as_str() {
                Some(s) if !s.trim().is_empty() => {
                    ("asset_type", PatchValue::Text(Some(s.trim().to_uppercase())))
                }
                _ => return Err(JournalError::validation("asset_type", "must not be empty")),
            },
            "setup_type" => ("setup_type", patch_text(value, "setup_type", true)?),
            "emotional_state" => ("emotional_state", patch_text(value, "emotional_state", true)?),
            "plan_adherence" => ("plan_adherence", patch_text(value, "plan_adherence", true)?),
            "notes" => ("notes", patch_text(value, "notes", false)?),
            "outcome" => {
                let outcome = match value {
                    Value::Null => None,
                    Value::String(s) => Some(
                        TradeOutcome::parse(s)
                            .ok_or_else(|| JournalError::validation("outcome", "must be WIN, LOSS or BREAKEVEN"))?
                            .as_str()
                            .to_string(),
                    ),
                    _ => return Err(JournalError::validation("outcome", "must be a string")),
                };
                ("outcome", PatchValue::Text(outcome))
            }
            "tags" => {
                let tags: Vec<String> = serde_json::from_value(value.clone())
                    .map_err(|_| JournalError::validation("tags", "must be a list of strings"))?;
                ("tags", PatchValue::Text(Some(serde_json::to_string(&tags)?)))
            }
            "entry_price" => ("entry_price", patch_real(value, "entry_price", false)?),
            "exit_price" => ("exit_price", patch_real(value, "exit_price", true)?),
            "position_size" => ("position_size", patch_real(value, "position_size", false)?),
            "planned_rr" => ("planned_rr", patch_real(value, "planned_rr", true)?),
            "actual_rr" => ("actual_rr", patch_real(value, "actual_rr", true)?),
            "profit_loss" => ("profit_loss", patch_real(value, "profit_loss", true)?),
            "entry_time" => ("entry_time", patch_integer(value, "entry_time", false)?),
            "exit_time" => ("exit_time", patch_integer(value, "exit_time", true)?),
            _ => continue,
        };
        updates.push(update);
    }
    Ok(updates)
}

impl TradeStore for SqliteJournalStore {
    fn list_trades(&self, filters: Option<&TradeFilters>) -> JournalResult<Vec<Trade>> {
        let conn = self.lock()?;
        let trades = query_trades(&conn, self.user_id(), filters)?;
        log::debug!("Fetched {} trades for {}", trades.len(), self.user_id());
        Ok(trades)
    }

    fn get_trade(&self, id: &str) -> JournalResult<Trade> {
        let conn = self.lock()?;
        fetch_trade(&conn, self.user_id(), id)
    }

    fn create_trade(&self, input: CreateTradeInput) -> JournalResult<Trade> {
        let input = normalize_trade_input(input);
        validate_trade_input(&input)?;

        let now = Utc::now().timestamp();
        let trade = Trade {
            id: generate_id("TRADE"),
            user_id: self.user_id().to_string(),
            symbol: input.symbol,
            asset_type: input.asset_type,
            setup_type: input.setup_type,
            entry_price: input.entry_price,
            exit_price: input.exit_price,
            entry_time: input.entry_time,
            exit_time: input.exit_time,
            position_size: input.position_size,
            outcome: input.outcome,
            planned_rr: input.planned_rr,
            actual_rr: input.actual_rr,
            profit_loss: input.profit_loss,
            emotional_state: input.emotional_state,
            plan_adherence: input.plan_adherence,
            tags: input.tags,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let conn = self.lock()?;
        insert_trade(&conn, &trade)?;
        log::info!("Created trade {} ({})", trade.id, trade.symbol);

        fetch_trade(&conn, self.user_id(), &trade.id)
    }

    fn update_trade(&self, id: &str, patch: &Value) -> JournalResult<Trade> {
        let updates = build_patch(patch)?;

        let conn = self.lock()?;
        let current = fetch_trade(&conn, self.user_id(), id)?;

        let mut columns = vec!["updated_at = ?".to_string()];
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(Utc::now().timestamp())];
        for (column, value) in updates {
            columns.push(format!("{} = ?", column));
            values.push(value.into_sql());
        }
        values.push(Box::new(current.id.clone()));
        values.push(Box::new(self.user_id().to_string()));

        let query = format!("UPDATE trades SET {} WHERE id = ? AND user_id = ?", columns.join(", "));
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();

        let tx = conn.unchecked_transaction()?;
        tx.execute(&query, params.as_slice())?;

        // Re-check the cross-field rules on the merged record
        let updated = fetch_trade(&tx, self.user_id(), id)?;
        if let Some(exit_time) = updated.exit_time {
            if exit_time < updated.entry_time {
                return Err(JournalError::validation("exit_time", "must not be before entry_time"));
            }
        }
        if updated.entry_price <= 0.0 || updated.position_size <= 0.0 {
            return Err(JournalError::validation("trade", "prices and size must be greater than zero"));
        }
        tx.commit()?;

        Ok(updated)
    }

    fn delete_trade(&self, id: &str) -> JournalResult<DeleteResult> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM trades WHERE id = ? AND user_id = ?",
            [id, self.user_id()],
        )?;
        if deleted > 0 {
            log::info!("Deleted trade {}", id);
        }
        Ok(DeleteResult { success: deleted > 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> SqliteJournalStore {
        SqliteJournalStore::new(Arc::new(Database::open_in_memory().unwrap()), "user-1")
    }

    fn input(symbol: &str, setup: &str, entry_time: i64, pnl: f64) -> CreateTradeInput {
        CreateTradeInput {
            symbol: symbol.to_string(),
            asset_type: "STOCK".to_string(),
            setup_type: Some(setup.to_string()),
            entry_price: 100.0,
            exit_price: Some(101.0),
            entry_time,
            exit_time: Some(entry_time + 600),
            position_size: 10.0,
            outcome: Some(if pnl > 0.0 { TradeOutcome::Win } else { TradeOutcome::Loss }),
            planned_rr: Some(2.0),
            actual_rr: Some(1.0),
            profit_loss: Some(pnl),
            emotional_state: Some("Calm".to_string()),
            plan_adherence: Some("Full".to_string()),
            tags: vec!["a-plus".to_string()],
            notes: String::new(),
        }
    }

    #[test]
    fn test_create_and_get_roundtrip_fields() {
        let store = store();
        let created = store.create_trade(input("aapl", "Breakout", 1_704_100_000, 50.0)).unwrap();

        assert!(created.id.starts_with("TRADE-"));
        assert_eq!(created.symbol, "AAPL");
        assert_eq!(created.outcome, Some(TradeOutcome::Win));
        assert_eq!(created.tags, vec!["a-plus".to_string()]);

        let fetched = store.get_trade(&created.id).unwrap();
        assert_eq!(fetched.profit_loss, Some(50.0));
    }

    #[test]
    fn test_filters_applied_at_fetch() {
        let store = store();
        store.create_trade(input("AAPL", "Breakout", 1_000_000, 10.0)).unwrap();
        store.create_trade(input("MSFT", "Pullback", 2_000_000, -5.0)).unwrap();
        store.create_trade(input("AAPL", "Pullback", 3_000_000, 7.0)).unwrap();

        let all = store.list_trades(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].entry_time, 3_000_000, "newest first");

        let ranged = store
            .list_trades(Some(&TradeFilters {
                start_date: Some(1_500_000),
                end_date: Some(2_500_000),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].symbol, "MSFT");

        let by_symbol_and_setup = store
            .list_trades(Some(&TradeFilters {
                symbol: Some("aap".to_string()),
                setup_type: Some("Pullback".to_string()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(by_symbol_and_setup.len(), 1);

        let all_setups = store
            .list_trades(Some(&TradeFilters {
                setup_type: Some("all".to_string()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(all_setups.len(), 3);
    }

    #[test]
    fn test_symbol_filter_matches_wildcards_literally() {
        let store = store();
        store.create_trade(input("BTC_USD", "Breakout", 1_000_000, 10.0)).unwrap();
        store.create_trade(input("BTCXUSD", "Breakout", 2_000_000, 10.0)).unwrap();

        let matched = store
            .list_trades(Some(&TradeFilters {
                symbol: Some("btc_usd".to_string()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].symbol, "BTC_USD");

        let percent = store
            .list_trades(Some(&TradeFilters {
                symbol: Some("%".to_string()),
                ..Default::default()
            }))
            .unwrap();
        assert!(percent.is_empty());
    }

    #[test]
    fn test_queries_scoped_to_user() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let alice = SqliteJournalStore::new(db.clone(), "alice");
        let bob = SqliteJournalStore::new(db, "bob");

        let trade = alice.create_trade(input("AAPL", "Breakout", 1_000_000, 10.0)).unwrap();

        assert_eq!(bob.list_trades(None).unwrap().len(), 0);
        assert!(matches!(bob.get_trade(&trade.id), Err(JournalError::NotFound(_))));
        assert!(!bob.delete_trade(&trade.id).unwrap().success);
    }

    #[test]
    fn test_update_applies_patch() {
        let store = store();
        let trade = store.create_trade(input("AAPL", "Breakout", 1_000_000, 10.0)).unwrap();

        let updated = store
            .update_trade(
                &trade.id,
                &json!({
                    "outcome": "be",
                    "profit_loss": 0.0,
                    "emotional_state": null,
                    "tags": ["scratch"],
                    "unknown_field": 42
                }),
            )
            .unwrap();

        assert_eq!(updated.outcome, Some(TradeOutcome::Breakeven));
        assert_eq!(updated.profit_loss, Some(0.0));
        assert_eq!(updated.emotional_state, None);
        assert_eq!(updated.tags, vec!["scratch".to_string()]);
        assert_eq!(updated.setup_type.as_deref(), Some("Breakout"));
    }

    #[test]
    fn test_update_rejects_inconsistent_times() {
        let store = store();
        let trade = store.create_trade(input("AAPL", "Breakout", 1_000_000, 10.0)).unwrap();

        let result = store.update_trade(&trade.id, &json!({ "exit_time": 10 }));
        assert!(matches!(result, Err(JournalError::Validation { .. })));

        // Rolled back
        assert_eq!(store.get_trade(&trade.id).unwrap().exit_time, Some(1_000_600));
    }

    #[test]
    fn test_update_missing_trade_is_not_found() {
        let store = store();
        let result = store.update_trade("TRADE-missing", &json!({ "notes": "x" }));
        assert!(matches!(result, Err(JournalError::NotFound(_))));
    }

    #[test]
    fn test_delete_reports_success() {
        let store = store();
        let trade = store.create_trade(input("AAPL", "Breakout", 1_000_000, 10.0)).unwrap();

        assert!(store.delete_trade(&trade.id).unwrap().success);
        assert!(!store.delete_trade(&trade.id).unwrap().success);
    }

    #[test]
    fn test_invalid_input_never_written() {
        let store = store();
        let mut bad = input("AAPL", "Breakout", 1_000_000, 10.0);
        bad.entry_price = -1.0;

        assert!(matches!(store.create_trade(bad), Err(JournalError::Validation { .. })));
        assert!(store.list_trades(None).unwrap().is_empty());
    }
}
