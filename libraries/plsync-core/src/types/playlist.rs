//! Playlist source files
//!
//! A playlist source is a playlist text file on disk. Its absolute path is its
//! identity; the file name without extension is the key of the matching
//! playlist in the media player's catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// A playlist text file as last observed on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSource {
    /// Absolute path to the file
    pub path: PathBuf,

    /// Catalog playlist name (file name without extension)
    pub name: String,

    /// Directory holding the file, used for playlist-relative paths
    pub directory: PathBuf,

    /// Modification time observed when the file was last stat'ed
    pub modified: DateTime<Utc>,
}

impl PlaylistSource {
    /// Build a source from a path and an already-known modification time
    pub fn new(path: impl Into<PathBuf>, modified: DateTime<Utc>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        Self {
            path,
            name,
            directory,
            modified,
        }
    }

    /// Stat `path` and build a source carrying its current modification time
    pub async fn observe(path: &Path) -> io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok(Self::new(path, modified))
    }

    /// Identity key used by the change cache
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}
