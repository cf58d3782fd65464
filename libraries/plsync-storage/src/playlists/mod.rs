//! Playlist reconciliation
//!
//! A synced playlist's items are replaced wholesale: the file is the source
//! of truth, so there is nothing to merge. Everything happens in a single
//! transaction; the player either sees the old list or the new one.

use crate::Result;
use plsync_core::{PlaylistId, SongId};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

/// `playlist_items.type` for items backed by a collection song
const ITEM_TYPE_COLLECTION: i64 = 2;

/// Result of writing one playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub playlist_id: PlaylistId,
    /// The playlist row did not exist before this write
    pub created: bool,
    pub items_written: u64,
    pub items_removed: u64,
}

/// Find a playlist by display name
///
/// With duplicate names the oldest row wins.
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<PlaylistId>> {
    let id = sqlx::query_scalar("SELECT rowid FROM playlists WHERE name = ? ORDER BY rowid LIMIT 1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(id)
}

/// Song ids of a playlist's items, in playback order
pub async fn item_song_ids(pool: &SqlitePool, playlist_id: PlaylistId) -> Result<Vec<SongId>> {
    let ids = sqlx::query_scalar(
        "SELECT collection_id FROM playlist_items WHERE playlist = ? ORDER BY rowid",
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Replace the items of playlist `name` with `songs`, creating it if needed
///
/// Item order is insertion order. Duplicate song ids are kept. On any error
/// the transaction rolls back and the previous items stay untouched.
///
/// # Errors
///
/// Returns the database error that aborted the transaction. Lock contention
/// can be detected with `StorageError::is_busy`.
pub async fn replace_items(
    pool: &SqlitePool,
    name: &str,
    songs: &[SongId],
) -> Result<ReconcileOutcome> {
    let mut tx = pool.begin().await?;

    let (playlist_id, created) = find_or_create(&mut *tx, name).await?;

    let items_removed = sqlx::query("DELETE FROM playlist_items WHERE playlist = ?")
        .bind(playlist_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let mut items_written = 0;
    for song in songs {
        items_written += insert_item(&mut *tx, playlist_id, *song).await?;
    }

    tx.commit().await?;

    debug!(
        "Playlist '{}' ({}): removed {} items, wrote {}",
        name, playlist_id, items_removed, items_written
    );

    Ok(ReconcileOutcome {
        playlist_id,
        created,
        items_written,
        items_removed,
    })
}

async fn find_or_create(conn: &mut SqliteConnection, name: &str) -> Result<(PlaylistId, bool)> {
    let existing: Option<PlaylistId> =
        sqlx::query_scalar("SELECT rowid FROM playlists WHERE name = ? ORDER BY rowid LIMIT 1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(id) = existing {
        return Ok((id, false));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO playlists (name, last_played, ui_order, is_favorite)
        VALUES (?, -1, -1, 1)
        "#,
    )
    .bind(name)
    .execute(&mut *conn)
    .await?;

    Ok((PlaylistId::new(result.last_insert_rowid()), true))
}

async fn insert_item(conn: &mut SqliteConnection, playlist_id: PlaylistId, song: SongId) -> Result<u64> {
    // Metadata columns carry the player's "unknown" markers; it fills them
    // from the collection when the playlist is loaded.
    let result = sqlx::query(
        r#"
        INSERT INTO playlist_items (
            playlist, type, collection_id,
            track, disc, year, originalyear, compilation,
            beginning, length, bitrate, samplerate, bitdepth,
            source, directory_id, filetype, filesize, mtime, ctime, unavailable,
            playcount, skipcount, lastplayed, lastseen,
            compilation_detected, compilation_on, compilation_off, compilation_effective,
            effective_originalyear, rating, art_embedded, art_unset
        ) VALUES (
            ?, ?, ?,
            -1, -1, -1, -1, 0,
            0, -1, -1, -1, -1,
            2, -1, 0, 0, -1, -1, 0,
            0, 0, -1, -1,
            0, 0, 0, 0,
            0, -1, 0, 0
        )
        "#,
    )
    .bind(playlist_id)
    .bind(ITEM_TYPE_COLLECTION)
    .bind(song)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
