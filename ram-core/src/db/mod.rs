mod migration;
mod notes;
mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{Error, Result};

pub use migration::{apply_migrations, Migration, SchemaStore};
pub use notes::RECENT_NOTES_LIMIT;
pub use schema::MIGRATIONS;

/// Shared handle to the single SQLite connection.
///
/// Cloning is cheap; every clone talks to the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database file at `path`.
    ///
    /// The schema is not touched; call [`Database::migrate`] before use.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!("Opened database at {}", path.as_ref().display());
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Brings the schema up to date with [`MIGRATIONS`].
    ///
    /// Returns the number of migrations applied.
    pub fn migrate(&self) -> Result<usize> {
        let conn = self.connection()?;
        apply_migrations(&*conn, MIGRATIONS)
    }

    /// Locks and returns the underlying connection.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }
}
