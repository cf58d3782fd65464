/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// SQLite primary result codes that mean "someone else holds the lock"
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// The database has no readable schema version
    #[error("Database schema version not found - unsupported or foreign database")]
    SchemaMissing,

    /// The database schema is a version this daemon was not built for
    #[error("Unsupported database schema version {found} (supported: {supported:?})")]
    SchemaIncompatible { found: i64, supported: Vec<i64> },

    /// Startup backup could not be created
    #[error("Backup failed: {0}")]
    Backup(String),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this failure is lock contention that may clear up on its own
    pub fn is_busy(&self) -> bool {
        match self {
            StorageError::Database(e) => is_busy_error(e),
            _ => false,
        }
    }
}

fn is_busy_error(err: &sqlx::Error) -> bool {
    match err {
        // SQLite reports extended result codes; the low byte is the primary code
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_busy() {
        assert!(!StorageError::SchemaMissing.is_busy());
        assert!(!StorageError::Backup("disk full".into()).is_busy());
        assert!(!StorageError::Database(sqlx::Error::RowNotFound).is_busy());
    }

    #[test]
    fn test_pool_timeout_is_busy() {
        assert!(StorageError::Database(sqlx::Error::PoolTimedOut).is_busy());
    }
}
