//! Shared fixtures for engine integration tests
//!
//! Each fixture is a temp directory holding a music library, its playlists,
//! a REAL SQLite catalog file, and the daemon's cache.

#![allow(dead_code)]

use plsync_core::{RetryPolicy, SongId, SyncSettings};
use plsync_engine::{SchemaPolicy, SyncEngine};
use plsync_storage::testing;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub struct Fixture {
    pub music: PathBuf,
    pub db: PathBuf,
    pub settings: SyncSettings,
    _dir: TempDir,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_schema_version(testing::FIXTURE_SCHEMA_VERSION).await
    }

    pub async fn with_schema_version(version: i64) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let music = dir.path().join("music");
        std::fs::create_dir_all(&music).unwrap();

        let db = dir.path().join("strawberry.db");
        testing::create_catalog(&db, Some(version))
            .await
            .expect("Failed to create catalog");

        let mut settings = SyncSettings::new(
            &music,
            &db,
            dir.path().join("playlist_sync_cache.json"),
            dir.path().join("backups"),
        );
        settings.parse_retry = RetryPolicy::fixed(2, Duration::from_millis(10));
        settings.transaction_retry =
            RetryPolicy::exponential(3, Duration::from_millis(10), Duration::from_millis(40));
        settings.busy_timeout = Duration::from_millis(20);
        settings.coalesce_window = Duration::from_millis(50);

        Self {
            music,
            db,
            settings,
            _dir: dir,
        }
    }

    pub async fn engine(&self) -> SyncEngine {
        SyncEngine::open(self.settings.clone(), SchemaPolicy::Enforce)
            .await
            .expect("Failed to open engine")
    }

    /// Register library-relative songs in the catalog
    pub async fn add_songs(&self, names: &[String]) -> Vec<SongId> {
        let pool = plsync_storage::create_pool(&self.db, Duration::from_secs(1))
            .await
            .unwrap();
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            ids.push(testing::insert_song(&pool, &self.music.join(name)).await.unwrap());
        }
        pool.close().await;
        ids
    }

    /// Write `<music>/<relative>` as an extended M3U file
    pub fn write_playlist(&self, relative: &str, lines: &[String]) -> PathBuf {
        let path = self.music.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }

        let mut text = String::from("#EXTM3U\n");
        for line in lines {
            text.push_str(&format!("#EXTINF:180,{}\n{}\n", line, line));
        }
        std::fs::write(&path, text).unwrap();
        path
    }
}

/// Library-relative names `Artist/01 Song.flac` ..
pub fn song_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Artist/{i:02} Song.flac")).collect()
}

/// Push a file's mtime forward so a rewrite is always seen as a change
pub fn bump_mtime(path: &Path, secs: u64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(secs))
        .unwrap();
}
