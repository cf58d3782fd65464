//! Playlist Sync Core
//!
//! Shared building blocks for the playlist synchronisation daemon.
//!
//! This crate defines:
//! - **Domain Types**: `PlaylistSource`, `TrackReference`, `ResolvedPath`, catalog ids
//! - **Retry Policy**: bounded retry with backoff, shared by parsing and reconciliation
//! - **Settings**: the explicit configuration handed to every component
//!
//! # Example
//!
//! ```rust
//! use plsync_core::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::exponential(5, Duration::from_millis(250), Duration::from_secs(4));
//! assert_eq!(policy.delay_for(0), Duration::from_millis(250));
//! assert_eq!(policy.delay_for(1), Duration::from_millis(500));
//! ```

#![forbid(unsafe_code)]

pub mod retry;
pub mod settings;
pub mod types;

pub use retry::RetryPolicy;
pub use settings::SyncSettings;
pub use types::{PlaylistId, PlaylistSource, ResolutionRule, ResolvedPath, SongId, TrackReference};
