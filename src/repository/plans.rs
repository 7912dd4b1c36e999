use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql};

use super::{generate_id, PlanStore, SqliteJournalStore};
use crate::error::{JournalError, JournalResult};
use crate::models::{
    CreateDailyPlanInput, DailyPlan, DeleteResult, KeyLevel, MarketBias, RiskParameters,
};
use crate::validation::validate_plan_input;

const PLAN_COLUMNS: &str = "id, user_id, plan_date, market_bias, key_levels, goals, \
     max_daily_loss, max_risk_per_trade, target_profit, mental_state, notes, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn map_row_to_plan(row: &rusqlite::Row) -> rusqlite::Result<DailyPlan> {
    let plan_date: String = row.get("plan_date")?;
    let date = NaiveDate::parse_from_str(&plan_date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let key_levels: String = row.get("key_levels")?;
    let goals: String = row.get("goals")?;
    let market_bias: String = row.get("market_bias")?;

    Ok(DailyPlan {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        date,
        market_bias: MarketBias::parse(&market_bias),
        key_levels: serde_json::from_str::<Vec<KeyLevel>>(&key_levels).unwrap_or_default(),
        goals: serde_json::from_str::<Vec<String>>(&goals).unwrap_or_default(),
        risk_parameters: RiskParameters {
            max_daily_loss: row.get("max_daily_loss")?,
            max_risk_per_trade: row.get("max_risk_per_trade")?,
            target_profit: row.get("target_profit")?,
        },
        mental_state: row.get("mental_state")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn fetch_plan(conn: &Connection, user_id: &str, id: &str) -> JournalResult<DailyPlan> {
    conn.query_row(
        &format!("SELECT {} FROM daily_plans WHERE id = ? AND user_id = ?", PLAN_COLUMNS),
        [id, user_id],
        map_row_to_plan,
    )
    .optional()?
    .ok_or_else(|| JournalError::NotFound(format!("Plan {}", id)))
}

pub(crate) fn query_plans(
    conn: &Connection,
    user_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> JournalResult<Vec<DailyPlan>> {
    let mut query = format!("SELECT {} FROM daily_plans WHERE user_id = ?", PLAN_COLUMNS);
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

    if let Some(from) = from {
        query.push_str(" AND plan_date >= ?");
        params.push(Box::new(from.format(DATE_FORMAT).to_string()));
    }
    if let Some(to) = to {
        query.push_str(" AND plan_date <= ?");
        params.push(Box::new(to.format(DATE_FORMAT).to_string()));
    }
    query.push_str(" ORDER BY plan_date DESC, created_at ASC");

    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let plans = stmt
        .query_map(param_refs.as_slice(), map_row_to_plan)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(plans)
}

pub(crate) fn insert_plan(conn: &Connection, plan: &DailyPlan) -> JournalResult<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO daily_plans ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PLAN_COLUMNS
        ),
        rusqlite::params![
            plan.id,
            plan.user_id,
            plan.date.format(DATE_FORMAT).to_string(),
            plan.market_bias.as_str(),
            serde_json::to_string(&plan.key_levels)?,
            serde_json::to_string(&plan.goals)?,
            plan.risk_parameters.max_daily_loss,
            plan.risk_parameters.max_risk_per_trade,
            plan.risk_parameters.target_profit,
            plan.mental_state,
            plan.notes,
            plan.created_at,
            plan.updated_at,
        ],
    )?;
    Ok(())
}

/// Oldest plan for `date`, if a race ever produced two
pub(crate) fn find_plan_by_date(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
) -> JournalResult<Option<DailyPlan>> {
    let date_key = date.format(DATE_FORMAT).to_string();
    let plan = conn
        .query_row(
            &format!(
                "SELECT {} FROM daily_plans WHERE user_id = ? AND plan_date = ? ORDER BY created_at ASC LIMIT 1",
                PLAN_COLUMNS
            ),
            [user_id, date_key.as_str()],
            map_row_to_plan,
        )
        .optional()?;
    Ok(plan)
}

impl PlanStore for SqliteJournalStore {
    fn get_plan_by_date(&self, date: NaiveDate) -> JournalResult<Option<DailyPlan>> {
        let conn = self.lock()?;
        find_plan_by_date(&conn, self.user_id(), date)
    }

    fn get_plan(&self, id: &str) -> JournalResult<DailyPlan> {
        let conn = self.lock()?;
        fetch_plan(&conn, self.user_id(), id)
    }

    fn list_plans(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> JournalResult<Vec<DailyPlan>> {
        let conn = self.lock()?;
        query_plans(&conn, self.user_id(), from, to)
    }

    fn create_plan(&self, input: CreateDailyPlanInput) -> JournalResult<DailyPlan> {
        validate_plan_input(&input)?;

        let now = Utc::now().timestamp();
        let plan = DailyPlan {
            id: generate_id("PLAN"),
            user_id: self.user_id().to_string(),
            date: input.date,
            market_bias: input.market_bias,
            key_levels: input.key_levels,
            goals: input.goals.into_iter().map(|g| g.trim().to_string()).collect(),
            risk_parameters: input.risk_parameters,
            mental_state: input.mental_state,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let conn = self.lock()?;
        insert_plan(&conn, &plan)?;
        log::info!("Created plan {} for {}", plan.id, plan.date);

        fetch_plan(&conn, self.user_id(), &plan.id)
    }

    fn update_plan(&self, id: &str, input: CreateDailyPlanInput) -> JournalResult<DailyPlan> {
        validate_plan_input(&input)?;

        let conn = self.lock()?;
        let existing = fetch_plan(&conn, self.user_id(), id)?;

        if input.date != existing.date {
            if let Some(other) = find_plan_by_date(&conn, self.user_id(), input.date)? {
                return Err(JournalError::validation(
                    "date",
                    format!("a plan for {} already exists ({})", input.date, other.id),
                ));
            }
        }

        let plan = DailyPlan {
            date: input.date,
            market_bias: input.market_bias,
            key_levels: input.key_levels,
            goals: input.goals.into_iter().map(|g| g.trim().to_string()).collect(),
            risk_parameters: input.risk_parameters,
            mental_state: input.mental_state,
            notes: input.notes,
            updated_at: Utc::now().timestamp(),
            ..existing
        };
        insert_plan(&conn, &plan)?;
        log::info!("Updated plan {} for {}", plan.id, plan.date);

        fetch_plan(&conn, self.user_id(), id)
    }

    fn delete_plan(&self, id: &str) -> JournalResult<DeleteResult> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM daily_plans WHERE id = ? AND user_id = ?",
            [id, self.user_id()],
        )?;
        Ok(DeleteResult { success: deleted > 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::KeyLevelKind;
    use std::sync::Arc;

    fn store() -> SqliteJournalStore {
        SqliteJournalStore::new(Arc::new(Database::open_in_memory().unwrap()), "user-1")
    }

    fn input(date: NaiveDate) -> CreateDailyPlanInput {
        CreateDailyPlanInput {
            date,
            market_bias: MarketBias::Bearish,
            key_levels: vec![
                KeyLevel { price: 4980.0, kind: KeyLevelKind::Support, note: Some("prior low".to_string()) },
                KeyLevel { price: 5050.0, kind: KeyLevelKind::Resistance, note: None },
            ],
            goals: vec!["Only A setups".to_string(), "Stop after two losses".to_string()],
            risk_parameters: RiskParameters {
                max_daily_loss: Some(400.0),
                max_risk_per_trade: Some(100.0),
                target_profit: Some(800.0),
            },
            mental_state: "Focused".to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_create_and_lookup_by_date() {
        let store = store();
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();

        assert!(store.get_plan_by_date(date).unwrap().is_none());

        let created = store.create_plan(input(date)).unwrap();
        let found = store.get_plan_by_date(date).unwrap().unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.market_bias, MarketBias::Bearish);
        assert_eq!(found.key_levels.len(), 2);
        assert_eq!(found.goals[1], "Stop after two losses");
        assert_eq!(found.risk_parameters.max_daily_loss, Some(400.0));
    }

    #[test]
    fn test_update_keeps_identity() {
        let store = store();
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let created = store.create_plan(input(date)).unwrap();

        let mut changed = input(date);
        changed.market_bias = MarketBias::Neutral;
        changed.goals = vec!["Sit on hands".to_string()];

        let updated = store.update_plan(&created.id, changed).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.market_bias, MarketBias::Neutral);
        assert_eq!(updated.goals, vec!["Sit on hands".to_string()]);
    }

    #[test]
    fn test_moving_plan_onto_taken_date_rejected() {
        let store = store();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        store.create_plan(input(monday)).unwrap();
        let moved = store.create_plan(input(tuesday)).unwrap();

        match store.update_plan(&moved.id, input(monday)) {
            Err(JournalError::Validation { field, .. }) => assert_eq!(field, "date"),
            other => panic!("expected date conflict, got {:?}", other),
        }
        assert_eq!(store.list_plans(Some(monday), Some(monday)).unwrap().len(), 1);
        assert_eq!(store.get_plan(&moved.id).unwrap().date, tuesday);

        // Moving to a free date is fine
        let wednesday = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(store.update_plan(&moved.id, input(wednesday)).unwrap().date, wednesday);
    }

    #[test]
    fn test_list_plans_in_range() {
        let store = store();
        for day in [1, 2, 3, 4] {
            store.create_plan(input(NaiveDate::from_ymd_opt(2024, 5, day).unwrap())).unwrap();
        }

        let plans = store
            .list_plans(
                NaiveDate::from_ymd_opt(2024, 5, 2),
                NaiveDate::from_ymd_opt(2024, 5, 3),
            )
            .unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
    }

    #[test]
    fn test_delete_plan() {
        let store = store();
        let created = store.create_plan(input(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap())).unwrap();

        assert!(store.delete_plan(&created.id).unwrap().success);
        assert!(matches!(store.get_plan(&created.id), Err(JournalError::NotFound(_))));
    }
}
