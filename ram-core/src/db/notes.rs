use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Row};

use super::Database;
use crate::models::Note;
use crate::Result;

/// Upper bound on the number of notes returned by [`Database::recent_notes`].
pub const RECENT_NOTES_LIMIT: usize = 250;

impl Database {
    /// Inserts `note` if it is still a phantom; otherwise does nothing.
    ///
    /// The note itself is left untouched: callers mark it persisted once
    /// this returns `Ok`.
    pub fn persist_note(&self, note: &Note) -> Result<()> {
        if !note.is_phantom() {
            return Ok(());
        }

        let tags = serde_json::to_string(&note.tags)?;
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO note (id, note, url, tags, created, done)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        stmt.execute(params![
            note.id,
            note.note,
            note.url,
            tags,
            format_timestamp(&note.created),
            note.done,
        ])?;

        tracing::debug!("Persisted note {}", note.id);
        Ok(())
    }

    /// Most recent notes first, at most [`RECENT_NOTES_LIMIT`].
    pub fn recent_notes(&self) -> Result<Vec<Note>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, note, url, tags, created, done
             FROM note
             ORDER BY created DESC
             LIMIT ?1",
        )?;

        let notes = stmt
            .query_map([RECENT_NOTES_LIMIT as i64], note_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: Option<String>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn decode_tags(id: &str, raw: Option<String>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(tags) => tags,
        Err(e) => {
            tracing::warn!("Note {} has unreadable tags {:?}: {}", id, raw, e);
            Vec::new()
        }
    }
}

fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
    let id: String = row.get(0)?;
    let tags = decode_tags(&id, row.get(3)?);
    Ok(Note {
        note: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        url: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        tags,
        created: parse_timestamp(row.get(4)?),
        done: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
        phantom: false,
        id,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rusqlite::Connection;

    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn total_changes(conn: &Connection) -> i64 {
        conn.query_row("SELECT total_changes()", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn persisted_note_is_not_written_again() {
        let db = setup_db();
        let mut note = Note::new("once", "", "a");
        db.persist_note(&note).unwrap();
        note.mark_persisted();

        let before = total_changes(&db.connection().unwrap());
        db.persist_note(&note).unwrap();
        db.persist_note(&note).unwrap();
        let after = total_changes(&db.connection().unwrap());

        assert_eq!(before, after);
        assert_eq!(db.recent_notes().unwrap().len(), 1);
    }

    #[test]
    fn phantom_note_is_inserted_with_every_field() {
        let db = setup_db();
        let note = Note::new("buy milk", "https://shop.example", "errand, home");

        let before = total_changes(&db.connection().unwrap());
        db.persist_note(&note).unwrap();

        let conn = db.connection().unwrap();
        assert_eq!(total_changes(&conn) - before, 1);

        let (id, body, url, tags, created, done): (String, String, String, String, String, bool) =
            conn.query_row(
                "SELECT id, note, url, tags, created, done FROM note",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .unwrap();

        assert_eq!(id, note.id);
        assert_eq!(body, "buy milk");
        assert_eq!(url, "https://shop.example");
        assert_eq!(tags, r#"["errand","home"]"#);
        assert_eq!(created, format_timestamp(&note.created));
        assert!(!done);
    }

    #[test]
    fn persist_does_not_touch_caller_note() {
        let db = setup_db();
        let note = Note::new("x", "", "");

        db.persist_note(&note).unwrap();

        assert!(note.is_phantom());
    }

    #[test]
    fn duplicate_id_is_an_error() {
        let db = setup_db();
        let note = Note::new("x", "", "");

        db.persist_note(&note).unwrap();

        assert!(db.persist_note(&note).is_err());
    }

    #[test]
    fn recent_notes_are_capped_and_newest_first() {
        let db = setup_db();
        let start = Utc::now();
        for i in 0..(RECENT_NOTES_LIMIT + 20) {
            let mut note = Note::new(format!("note {i}"), "", "");
            note.created = start + Duration::seconds(i as i64);
            db.persist_note(&note).unwrap();
        }

        let notes = db.recent_notes().unwrap();

        assert_eq!(notes.len(), RECENT_NOTES_LIMIT);
        assert_eq!(notes[0].note, format!("note {}", RECENT_NOTES_LIMIT + 19));
        assert!(notes.windows(2).all(|w| w[0].created > w[1].created));
        assert!(notes.iter().all(|n| !n.is_phantom()));
    }

    #[test]
    fn loaded_note_matches_stored_note() {
        let db = setup_db();
        let note = Note::new("round", "https://a.example", "x;y");
        db.persist_note(&note).unwrap();

        let loaded = db.recent_notes().unwrap().remove(0);

        assert_eq!(loaded.id, note.id);
        assert_eq!(loaded.tags, vec!["x", "y"]);
        assert_eq!(
            format_timestamp(&loaded.created),
            format_timestamp(&note.created)
        );
    }

    #[test]
    fn malformed_tags_degrade_to_empty() {
        let db = setup_db();
        {
            let conn = db.connection().unwrap();
            conn.execute(
                "INSERT INTO note (id, note, url, tags, created, done)
                 VALUES ('broken', 'text', '', 'not json [', '2024-01-01T00:00:00.000000Z', 0)",
                [],
            )
            .unwrap();
        }

        let notes = db.recent_notes().unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "broken");
        assert!(notes[0].tags.is_empty());
    }

    #[test]
    fn legacy_rows_with_nulls_still_load() {
        let db = setup_db();
        {
            let conn = db.connection().unwrap();
            conn.execute("INSERT INTO note (id) VALUES ('legacy')", [])
                .unwrap();
        }

        let notes = db.recent_notes().unwrap();

        assert_eq!(notes[0].id, "legacy");
        assert_eq!(notes[0].note, "");
        assert!(notes[0].tags.is_empty());
        assert!(!notes[0].done);
        assert_eq!(notes[0].created, DateTime::<Utc>::default());
    }
}
