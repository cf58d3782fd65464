//! Sync settings
//!
//! Validated configuration handed to each component's constructor. Loading
//! and validating the on-disk configuration happens in the daemon.

use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Default coalescing window for bursts of change events on one file
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_secs(2);

/// Default number of startup backups kept (0 means unlimited)
pub const DEFAULT_BACKUP_RETENTION: usize = 3;

/// Default capacity of the change-event channel
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Everything the sync core needs to know about its environment
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Directory holding the playlist text files
    pub playlist_dir: PathBuf,

    /// Base directory for library-relative track paths
    pub library_root: PathBuf,

    /// The media player's SQLite database
    pub database_path: PathBuf,

    /// Change cache file
    pub cache_path: PathBuf,

    /// Directory receiving startup backups
    pub backup_dir: PathBuf,

    /// Startup backups to keep, 0 = unlimited
    pub backup_retention: usize,

    /// Playlist file extensions (lowercase, without the dot)
    pub playlist_extensions: Vec<String>,

    /// Watch and scan subdirectories too
    pub recursive: bool,

    /// Bursts of events for one file within this window collapse into one attempt
    pub coalesce_window: Duration,

    /// Retries for reading a playlist that may be mid-write
    pub parse_retry: RetryPolicy,

    /// Retries for a reconciliation transaction that hit a locked database
    pub transaction_retry: RetryPolicy,

    /// SQLite busy handler timeout per statement
    pub busy_timeout: Duration,

    /// Capacity of the bounded change-event channel
    pub queue_capacity: usize,
}

impl SyncSettings {
    /// Settings for a playlist directory that is also the library root
    pub fn new(
        playlist_dir: impl Into<PathBuf>,
        database_path: impl Into<PathBuf>,
        cache_path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        let playlist_dir = playlist_dir.into();
        Self {
            library_root: playlist_dir.clone(),
            playlist_dir,
            database_path: database_path.into(),
            cache_path: cache_path.into(),
            backup_dir: backup_dir.into(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            playlist_extensions: vec!["m3u8".to_string()],
            recursive: false,
            coalesce_window: DEFAULT_COALESCE_WINDOW,
            parse_retry: RetryPolicy::default(),
            transaction_retry: RetryPolicy::exponential(
                5,
                Duration::from_millis(250),
                Duration::from_secs(4),
            ),
            busy_timeout: Duration::from_secs(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Use a library root different from the playlist directory
    pub fn with_library_root(mut self, library_root: impl Into<PathBuf>) -> Self {
        self.library_root = library_root.into();
        self
    }
}
