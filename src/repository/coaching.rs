use super::{CoachingStore, SqliteJournalStore};
use crate::error::JournalResult;
use crate::models::CoachingNote;

fn map_row_to_note(row: &rusqlite::Row) -> rusqlite::Result<CoachingNote> {
    Ok(CoachingNote {
        id: row.get(0)?,
        user_id: row.get(1)?,
        period_start: row.get(2)?,
        period_end: row.get(3)?,
        model: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl CoachingStore for SqliteJournalStore {
    fn save_note(&self, note: CoachingNote) -> JournalResult<CoachingNote> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO coaching_notes (id, user_id, period_start, period_end, model, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                note.id,
                self.user_id(),
                note.period_start,
                note.period_end,
                note.model,
                note.content,
                note.created_at,
            ],
        )?;
        Ok(CoachingNote {
            user_id: self.user_id().to_string(),
            ..note
        })
    }

    fn recent_notes(&self, limit: usize) -> JournalResult<Vec<CoachingNote>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, period_start, period_end, model, content, created_at
             FROM coaching_notes WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )?;
        let notes = stmt
            .query_map(rusqlite::params![self.user_id(), limit as i64], map_row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::Arc;

    fn note(id: &str, created_at: i64) -> CoachingNote {
        CoachingNote {
            id: id.to_string(),
            user_id: String::new(),
            period_start: Some(1_000),
            period_end: Some(2_000),
            model: "test-model".to_string(),
            content: format!("note {}", id),
            created_at,
        }
    }

    #[test]
    fn test_recent_notes_newest_first() {
        let store = SqliteJournalStore::new(Arc::new(Database::open_in_memory().unwrap()), "user-1");
        store.save_note(note("n1", 100)).unwrap();
        store.save_note(note("n2", 300)).unwrap();
        store.save_note(note("n3", 200)).unwrap();

        let notes = store.recent_notes(2).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "n2");
        assert_eq!(notes[1].id, "n3");
        assert_eq!(notes[0].user_id, "user-1");
    }
}
