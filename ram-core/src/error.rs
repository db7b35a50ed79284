use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: Box<Error>,
    },

    #[error("migration key {0} is registered more than once")]
    DuplicateMigration(i64),

    #[error("migration key {0} is not a positive integer")]
    InvalidMigrationKey(i64),

    #[error("failed to encode tags: {0}")]
    TagEncoding(#[from] serde_json::Error),

    #[error("database connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, Error>;
