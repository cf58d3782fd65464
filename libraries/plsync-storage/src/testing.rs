//! Catalog fixtures for tests
//!
//! Builds a minimal database with the tables and columns the sync daemon
//! touches, laid out like the media player's own schema.

use crate::{songs, Result};
use plsync_core::SongId;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Schema version written by [`create_catalog`]
pub const FIXTURE_SCHEMA_VERSION: i64 = 20;

const CATALOG_SCHEMA: &str = r#"
CREATE TABLE schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE songs (
    title TEXT NOT NULL DEFAULT '',
    artist TEXT NOT NULL DEFAULT '',
    album TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL,
    unavailable INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE playlists (
    name TEXT NOT NULL,
    last_played INTEGER NOT NULL DEFAULT -1,
    playlist_path TEXT,
    ui_order INTEGER NOT NULL DEFAULT 0,
    special_type TEXT,
    ui_path TEXT,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    dynamic_playlist_type INTEGER,
    dynamic_playlist_data BLOB,
    dynamic_playlist_backend TEXT
);

CREATE TABLE playlist_items (
    playlist INTEGER NOT NULL,
    type INTEGER NOT NULL DEFAULT 0,
    collection_id INTEGER,
    playlist_url TEXT,
    title TEXT NOT NULL DEFAULT '',
    artist TEXT NOT NULL DEFAULT '',
    album TEXT NOT NULL DEFAULT '',
    track INTEGER NOT NULL DEFAULT -1,
    disc INTEGER NOT NULL DEFAULT -1,
    year INTEGER NOT NULL DEFAULT -1,
    originalyear INTEGER NOT NULL DEFAULT 0,
    compilation INTEGER NOT NULL DEFAULT 0,
    beginning INTEGER NOT NULL DEFAULT 0,
    length INTEGER NOT NULL DEFAULT 0,
    bitrate INTEGER NOT NULL DEFAULT -1,
    samplerate INTEGER NOT NULL DEFAULT -1,
    bitdepth INTEGER NOT NULL DEFAULT -1,
    source INTEGER NOT NULL DEFAULT 0,
    directory_id INTEGER,
    url TEXT,
    filetype INTEGER NOT NULL DEFAULT 0,
    filesize INTEGER NOT NULL DEFAULT -1,
    mtime INTEGER NOT NULL DEFAULT -1,
    ctime INTEGER NOT NULL DEFAULT -1,
    unavailable INTEGER DEFAULT 0,
    playcount INTEGER NOT NULL DEFAULT 0,
    skipcount INTEGER NOT NULL DEFAULT 0,
    lastplayed INTEGER NOT NULL DEFAULT -1,
    lastseen INTEGER NOT NULL DEFAULT -1,
    compilation_detected INTEGER DEFAULT 0,
    compilation_on INTEGER NOT NULL DEFAULT 0,
    compilation_off INTEGER NOT NULL DEFAULT 0,
    compilation_effective INTEGER NOT NULL DEFAULT 0,
    effective_originalyear INTEGER NOT NULL DEFAULT 0,
    rating INTEGER DEFAULT -1,
    art_embedded INTEGER DEFAULT 0,
    art_unset INTEGER DEFAULT 0
);
"#;

/// Create a catalog database at `path`
///
/// `schema_version` of `None` leaves the version table empty.
pub async fn create_catalog(path: &Path, schema_version: Option<i64>) -> Result<()> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::raw_sql(CATALOG_SCHEMA).execute(&pool).await?;

    if let Some(version) = schema_version {
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&pool)
            .await?;
    }

    pool.close().await;
    Ok(())
}

/// Register a song for `path` the way the player's collection scanner does
pub async fn insert_song(pool: &SqlitePool, path: &Path) -> Result<SongId> {
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let result = sqlx::query("INSERT INTO songs (title, url) VALUES (?, ?)")
        .bind(title)
        .bind(songs::file_url(path))
        .execute(pool)
        .await?;

    Ok(SongId::new(result.last_insert_rowid()))
}
