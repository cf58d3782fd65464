//! Song lookup by file location
//!
//! The catalog keys local songs by a `file://` URL rather than a plain path.

use crate::Result;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use plsync_core::SongId;
use sqlx::SqlitePool;
use std::path::Path;

/// Characters the player leaves unescaped in song URLs
const URL_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Build the catalog URL for an absolute file path
///
/// # Example
///
/// ```
/// use plsync_storage::songs::file_url;
/// use std::path::Path;
///
/// assert_eq!(
///     file_url(Path::new("/music/A B/01 #1.flac")),
///     "file:///music/A%20B/01%20%231.flac"
/// );
/// ```
pub fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy();
    format!("file://{}", utf8_percent_encode(&path, URL_PATH))
}

/// Find a song by its exact catalog URL
pub async fn find_by_url(pool: &SqlitePool, url: &str) -> Result<Option<SongId>> {
    let id = sqlx::query_scalar("SELECT rowid FROM songs WHERE url = ? ORDER BY rowid LIMIT 1")
        .bind(url)
        .fetch_optional(pool)
        .await?;

    Ok(id)
}

/// Find a song by absolute file path
pub async fn find_by_path(pool: &SqlitePool, path: &Path) -> Result<Option<SongId>> {
    find_by_url(pool, &file_url(path)).await
}
