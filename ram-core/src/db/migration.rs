use std::collections::HashSet;

use rusqlite::Connection;

use crate::{Error, Result};

/// Individual migration with version metadata.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

impl Migration {
    pub const fn new(version: i64, description: &'static str, up: &'static str) -> Self {
        Self {
            version,
            description,
            up,
        }
    }
}

/// What the migrator needs from a store.
pub trait SchemaStore {
    /// Highest migration key applied so far, 0 for a fresh store.
    fn schema_version(&self) -> Result<i64>;

    fn set_schema_version(&self, version: i64) -> Result<()>;

    fn execute_batch(&self, sql: &str) -> Result<()>;
}

impl SchemaStore for Connection {
    fn schema_version(&self) -> Result<i64> {
        Ok(self.pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    fn set_schema_version(&self, version: i64) -> Result<()> {
        Ok(self.pragma_update(None, "user_version", version)?)
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(Connection::execute_batch(self, sql)?)
    }
}

/// Applies every migration newer than the store's version, in ascending key
/// order, advancing the version after each one.
///
/// Registration order does not matter and keys need not be contiguous. The
/// first failure stops the run; the version then points at the last
/// migration that succeeded. Returns the number of migrations applied.
pub fn apply_migrations<S>(store: &S, migrations: &[Migration]) -> Result<usize>
where
    S: SchemaStore + ?Sized,
{
    let mut pending: Vec<&Migration> = migrations.iter().collect();
    pending.sort_by_key(|m| m.version);

    let mut seen = HashSet::new();
    for migration in &pending {
        if migration.version <= 0 {
            return Err(Error::InvalidMigrationKey(migration.version));
        }
        if !seen.insert(migration.version) {
            return Err(Error::DuplicateMigration(migration.version));
        }
    }

    tracing::info!("Start DB migrations");
    let current = store.schema_version()?;
    tracing::info!("DB schema is in version {}", current);

    let mut applied = 0;
    for migration in pending.into_iter().filter(|m| m.version > current) {
        tracing::info!(
            "Executing DB migration #{}: {}",
            migration.version,
            migration.description
        );
        store
            .execute_batch(migration.up)
            .and_then(|()| store.set_schema_version(migration.version))
            .map_err(|e| Error::Migration {
                version: migration.version,
                source: Box::new(e),
            })?;
        applied += 1;
    }

    if applied == 0 {
        tracing::info!("DB schema is up to date");
    }
    Ok(applied)
}
