use super::migration::Migration;

/// Every schema change the application knows about, keyed by version.
///
/// Append new migrations with the next free key. Never edit or remove an
/// entry once it has shipped: stores remember only the highest key applied.
/// Keep one statement per entry.
pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "create note table",
        r#"
CREATE TABLE IF NOT EXISTS note (
    id TEXT NOT NULL PRIMARY KEY,
    note TEXT,
    url TEXT,
    tags TEXT,
    done BOOLEAN
);
"#,
    ),
    Migration::new(
        2,
        "add note.user_id",
        "ALTER TABLE note ADD COLUMN user_id INTEGER;",
    ),
    Migration::new(
        3,
        "add note.created",
        "ALTER TABLE note ADD COLUMN created DATETIME;",
    ),
    Migration::new(
        4,
        "index note.created",
        "CREATE INDEX IF NOT EXISTS idx_note_created ON note(created);",
    ),
];
