//! Change cache
//!
//! Remembers the modification time of every playlist at its last successful
//! sync, so unchanged files are skipped across restarts.
//!
//! ```json
//! {
//!   "version": 1,
//!   "playlists": {
//!     "/home/me/Music/Pop.m3u8": {
//!       "name": "Pop",
//!       "last_modified": "2025-01-02T10:15:00.123456789Z",
//!       "last_synced": "2025-01-02T10:15:03Z"
//!     }
//!   }
//! }
//! ```

use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use plsync_core::PlaylistSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const CACHE_VERSION: u32 = 1;

/// What was applied for one playlist file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub last_synced: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    playlists: BTreeMap<String, CacheEntry>,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    playlists: &'a BTreeMap<String, CacheEntry>,
}

/// On-disk record of already-synced playlist versions
#[derive(Debug)]
pub struct ChangeCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl ChangeCache {
    /// Load the cache, starting empty if the file is missing or unreadable
    ///
    /// An unusable cache only costs a resync of every playlist, so it is
    /// never an error.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<CacheFile>(&bytes) {
                Ok(file) if file.version == CACHE_VERSION => file.playlists,
                Ok(file) => {
                    warn!(
                        "Ignoring cache {:?} with unknown version {}",
                        path, file.version
                    );
                    BTreeMap::new()
                }
                Err(e) => {
                    warn!("Cache {:?} is corrupt, starting fresh: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache at {:?}, every playlist counts as changed", path);
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Cannot read cache {:?}, starting fresh: {}", path, e);
                BTreeMap::new()
            }
        };

        info!("Loaded change cache with {} playlists", entries.len());
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, source_path: &Path) -> Option<&CacheEntry> {
        self.entries.get(&*source_path.to_string_lossy())
    }

    /// Whether `source` differs from what was last synced
    pub fn should_process(&self, source: &PlaylistSource) -> bool {
        self.entries
            .get(&source.key())
            .map_or(true, |entry| entry.last_modified != source.modified)
    }

    /// Record `source` as synced and persist the cache
    ///
    /// The in-memory entry is updated even if writing the file fails.
    pub async fn commit(&mut self, source: &PlaylistSource) -> Result<()> {
        self.entries.insert(
            source.key(),
            CacheEntry {
                name: source.name.clone(),
                last_modified: source.modified,
                last_synced: Utc::now(),
            },
        );
        self.persist().await
    }

    /// Drop the entry for a file, returning whether one existed
    pub async fn forget(&mut self, source_path: &Path) -> Result<bool> {
        if self
            .entries
            .remove(&*source_path.to_string_lossy())
            .is_none()
        {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write to `<cache>.tmp`, flush, then rename over the real file
    async fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&CacheFileRef {
            version: CACHE_VERSION,
            playlists: &self.entries,
        })
        .map_err(|e| SyncError::Cache(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Wrote change cache ({} playlists)", self.entries.len());
        Ok(())
    }
}
