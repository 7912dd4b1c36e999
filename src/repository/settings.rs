use rusqlite::Connection;

use super::lock_connection;
use crate::db::Database;
use crate::error::{JournalError, JournalResult};
use crate::models::{Settings, UpdateSettingsInput};

pub fn load_settings(db: &Database) -> JournalResult<Settings> {
    let conn = lock_connection(db)?;

    let settings = conn.query_row(
        "SELECT id, currency, utc_offset_minutes, time_bucketing, consistency_window, default_range_days, enable_ai_coach, coach_model, created_at, updated_at FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                id: row.get(0)?,
                currency: row.get(1)?,
                utc_offset_minutes: row.get(2)?,
                time_bucketing: row.get(3)?,
                consistency_window: row.get(4)?,
                default_range_days: row.get(5)?,
                enable_ai_coach: row.get::<_, i32>(6)? == 1,
                coach_model: row.get(7)?,
                created_at: row.get(8)?,
                updated_at: row.get(9)?,
            })
        },
    )?;

    Ok(settings)
}

pub(crate) fn validate(settings: &UpdateSettingsInput) -> JournalResult<()> {
    if let Some(offset) = settings.utc_offset_minutes {
        if !(-14 * 60..=14 * 60).contains(&offset) {
            return Err(JournalError::validation("utc_offset_minutes", "must be within ±14 hours"));
        }
    }
    if let Some(mode) = &settings.time_bucketing {
        if mode != "session" && mode != "hourly" {
            return Err(JournalError::validation("time_bucketing", "must be 'session' or 'hourly'"));
        }
    }
    if let Some(window) = settings.consistency_window {
        if window < 1 {
            return Err(JournalError::validation("consistency_window", "must be at least 1"));
        }
    }
    if let Some(days) = settings.default_range_days {
        if days < 1 {
            return Err(JournalError::validation("default_range_days", "must be at least 1"));
        }
    }
    Ok(())
}

pub fn update_settings(db: &Database, settings: UpdateSettingsInput) -> JournalResult<Settings> {
    {
        let conn = lock_connection(db)?;
        write_settings(&conn, settings)?;
    }

    load_settings(db)
}

/// Validate and apply a partial update on an open connection or transaction
pub(crate) fn write_settings(conn: &Connection, settings: UpdateSettingsInput) -> JournalResult<()> {
    validate(&settings)?;

    let mut updates = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(val) = settings.currency {
        updates.push("currency = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.utc_offset_minutes {
        updates.push("utc_offset_minutes = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.time_bucketing {
        updates.push("time_bucketing = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.consistency_window {
        updates.push("consistency_window = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.default_range_days {
        updates.push("default_range_days = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.enable_ai_coach {
        updates.push("enable_ai_coach = ?");
        values.push(Box::new(val as i32));
    }
    if let Some(val) = settings.coach_model {
        updates.push("coach_model = ?");
        values.push(Box::new(val));
    }

    updates.push("updated_at = strftime('%s', 'now')");

    let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();

    conn.execute(&query, params.as_slice())?;
    Ok(())
}
