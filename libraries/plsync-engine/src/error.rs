use plsync_playlist::ParseError;
use plsync_storage::StorageError;
use thiserror::Error;

/// Errors that can occur while syncing a playlist
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Playlist error: {0}")]
    Parse(#[from] ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database stayed locked after {attempts} attempts: {source}")]
    Transaction {
        attempts: u32,
        #[source]
        source: StorageError,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watcher error: {0}")]
    Watcher(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
