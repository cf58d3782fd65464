//! Integration tests for the catalog slices
//!
//! - Schema version gate
//! - Song lookup by file URL
//! - Playlist reconciliation: create, replace, ordering, atomicity


use plsync_storage::schema::{self, SchemaPolicy, SUPPORTED_SCHEMA_VERSIONS};
use plsync_storage::{playlists, songs, StorageError};
use std::path::Path;
use test_helpers::*;

#[tokio::test]
async fn test_supported_schema_passes() {
    let catalog = TestCatalog::new().await;

    let version = schema::check_schema_version(catalog.pool(), SUPPORTED_SCHEMA_VERSIONS)
        .await
        .unwrap();
    assert_eq!(version, 20);
}

#[tokio::test]
async fn test_unknown_schema_is_incompatible() {
    let catalog = TestCatalog::with_version(Some(19)).await;

    let err = schema::check_schema_version(catalog.pool(), SUPPORTED_SCHEMA_VERSIONS)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::SchemaIncompatible { found: 19, .. }));

    // Overridden by the caller
    let version = schema::verify(catalog.pool(), SchemaPolicy::Ignore).await.unwrap();
    assert_eq!(version, None);
}

#[tokio::test]
async fn test_missing_schema_row_and_table() {
    let catalog = TestCatalog::with_version(None).await;
    let err = schema::verify(catalog.pool(), SchemaPolicy::Enforce).await.unwrap_err();
    assert!(matches!(err, StorageError::SchemaMissing));

    sqlx::query("DROP TABLE schema_version")
        .execute(catalog.pool())
        .await
        .unwrap();
    let err = schema::check_schema_version(catalog.pool(), SUPPORTED_SCHEMA_VERSIONS)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::SchemaMissing));
}

#[tokio::test]
async fn test_pool_refuses_missing_database() {
    let dir = tempfile::tempdir().unwrap();
    let result = plsync_storage::create_pool(
        &dir.path().join("nope.db"),
        std::time::Duration::from_millis(100),
    )
    .await;
    assert!(result.is_err());
    assert!(!dir.path().join("nope.db").exists());
}

#[tokio::test]
async fn test_find_song_by_path() {
    let catalog = TestCatalog::new().await;
    let ids = insert_songs(catalog.pool(), &["Artist/01 Intro (Live).flac", "Björk/Jóga.mp3"]).await;

    let found = songs::find_by_path(catalog.pool(), Path::new("/music/Artist/01 Intro (Live).flac"))
        .await
        .unwrap();
    assert_eq!(found, Some(ids[0]));

    let found = songs::find_by_path(catalog.pool(), Path::new("/music/Björk/Jóga.mp3"))
        .await
        .unwrap();
    assert_eq!(found, Some(ids[1]));

    let missing = songs::find_by_path(catalog.pool(), Path::new("/music/Artist/02.flac"))
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_replace_items_creates_playlist() {
    let catalog = TestCatalog::new().await;
    let ids = insert_songs(catalog.pool(), &["a.flac", "b.flac", "c.flac"]).await;

    let outcome = playlists::replace_items(catalog.pool(), "Pop", &[ids[2], ids[0], ids[2]])
        .await
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.items_written, 3);
    assert_eq!(outcome.items_removed, 0);

    let items = playlists::item_song_ids(catalog.pool(), outcome.playlist_id)
        .await
        .unwrap();
    assert_eq!(items, vec![ids[2], ids[0], ids[2]]);

    let (ui_order, is_favorite): (i64, i64) =
        sqlx::query_as("SELECT ui_order, is_favorite FROM playlists WHERE rowid = ?")
            .bind(outcome.playlist_id)
            .fetch_one(catalog.pool())
            .await
            .unwrap();
    assert_eq!((ui_order, is_favorite), (-1, 1));
}

#[tokio::test]
async fn test_replace_items_replaces_existing() {
    let catalog = TestCatalog::new().await;
    let ids = insert_songs(catalog.pool(), &["a.flac", "b.flac", "c.flac"]).await;

    let first = playlists::replace_items(catalog.pool(), "Pop", &ids).await.unwrap();
    let second = playlists::replace_items(catalog.pool(), "Pop", &[ids[1]]).await.unwrap();

    assert!(!second.created);
    assert_eq!(second.playlist_id, first.playlist_id);
    assert_eq!(second.items_removed, 3);
    assert_eq!(second.items_written, 1);

    assert_eq!(count(catalog.pool(), "playlists").await, 1);
    assert_eq!(
        playlists::item_song_ids(catalog.pool(), second.playlist_id).await.unwrap(),
        vec![ids[1]]
    );
    assert_eq!(
        playlists::find_by_name(catalog.pool(), "Pop").await.unwrap(),
        Some(first.playlist_id)
    );
}

#[tokio::test]
async fn test_other_playlists_are_untouched() {
    let catalog = TestCatalog::new().await;
    let ids = insert_songs(catalog.pool(), &["a.flac", "b.flac"]).await;

    let rock = playlists::replace_items(catalog.pool(), "Rock", &ids).await.unwrap();
    playlists::replace_items(catalog.pool(), "Pop", &[ids[0]]).await.unwrap();
    playlists::replace_items(catalog.pool(), "Pop", &[]).await.unwrap();

    assert_eq!(
        playlists::item_song_ids(catalog.pool(), rock.playlist_id).await.unwrap(),
        ids
    );
}

#[tokio::test]
async fn test_failed_reconcile_rolls_back() {
    let catalog = TestCatalog::new().await;
    let ids = insert_songs(catalog.pool(), &["a.flac", "b.flac"]).await;

    let before = playlists::replace_items(catalog.pool(), "Pop", &ids).await.unwrap();

    // Fail the second insert of the next write, after the DELETE already ran
    sqlx::query(
        "CREATE TRIGGER reject_item BEFORE INSERT ON playlist_items
         WHEN NEW.collection_id = 999
         BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(catalog.pool())
    .await
    .unwrap();

    let err = playlists::replace_items(
        catalog.pool(),
        "Pop",
        &[ids[1], plsync_core::SongId::new(999)],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StorageError::Database(_)));
    assert!(!err.is_busy());

    assert_eq!(
        playlists::item_song_ids(catalog.pool(), before.playlist_id).await.unwrap(),
        ids
    );
}

#[tokio::test]
async fn test_locked_database_reports_busy() {
    let catalog = TestCatalog::new().await;
    let ids = insert_songs(catalog.pool(), &["a.flac"]).await;

    // A second writer, like the player saving its own state
    let other = plsync_storage::create_pool(&catalog.path, std::time::Duration::from_millis(10))
        .await
        .unwrap();
    let mut holder = other.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *holder).await.unwrap();

    let err = playlists::replace_items(catalog.pool(), "Pop", &ids).await.unwrap_err();
    assert!(err.is_busy(), "expected busy, got {err:?}");

    sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
    drop(holder);

    let outcome = playlists::replace_items(catalog.pool(), "Pop", &ids).await.unwrap();
    assert_eq!(outcome.items_written, 1);
}
