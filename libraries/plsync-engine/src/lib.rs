//! Playlist sync engine
//!
//! Turns playlist file changes into catalog updates:
//!
//! ```text
//! watcher / startup scan → SyncQueue → ChangeCache check → parse → resolve
//!     → match → reconcile (one transaction) → ChangeCache commit
//! ```
//!
//! Attempts run one at a time. The catalog belongs to the media player,
//! which may hold it open and locked while we work.

mod cache;
mod engine;
mod error;
mod queue;
mod state;
mod watcher;

// Public exports
pub use cache::{CacheEntry, ChangeCache};
pub use engine::{RunSummary, ScanReport, SyncEngine, SyncReport};
pub use error::{Result, SyncError};
pub use queue::SyncQueue;
pub use state::{SyncAttempt, SyncState};
pub use watcher::{PlaylistWatcher, WatcherEvent};

// Re-exported so callers can build an engine without naming the storage crate
pub use plsync_storage::schema::SchemaPolicy;
