//! Playlist Sync Storage
//!
//! Access layer for the media player's `SQLite` catalog. The daemon does not
//! own this database: it never creates or migrates it, and only ever writes
//! to the playlist tables.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: Each feature owns its own queries (`songs`, `playlists`, `schema`)
//! - **Single Writer**: One pooled connection; concurrency comes from the player, not from us
//! - **Backups**: The database file is copied aside before the first write of a session
//!
//! # Example
//!
//! ```rust,no_run
//! use plsync_storage::{create_pool, playlists, schema, songs};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(Path::new("strawberry.db"), Duration::from_secs(1)).await?;
//! schema::check_schema_version(&pool, schema::SUPPORTED_SCHEMA_VERSIONS).await?;
//!
//! let song = songs::find_by_path(&pool, Path::new("/music/a.flac")).await?;
//! let outcome = playlists::replace_items(&pool, "Pop", song.as_slice()).await?;
//! println!("{} items written", outcome.items_written);
//! # Ok(())
//! # }
//! ```

mod error;

// Vertical slices
pub mod playlists;
pub mod schema;
pub mod songs;

// File-level safety net
pub mod backup;

#[cfg(feature = "testing")]
pub mod testing;

pub use error::{Result, StorageError};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Open a pool on an existing catalog database
///
/// The file must already exist. `busy_timeout` is how long each statement
/// waits on a lock held by the player before failing with `SQLITE_BUSY`.
///
/// # Errors
///
/// Returns an error if the file is missing or cannot be opened
pub async fn create_pool(database_path: &Path, busy_timeout: Duration) -> Result<SqlitePool> {
    debug!("Opening catalog database {:?}", database_path);

    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(false)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    debug!("Catalog pool ready");
    Ok(pool)
}
