//! Playlist sync daemon
//!
//! Configuration loading, logging setup, and startup checks for the `plsync`
//! binary. The sync itself lives in `plsync-engine`.

pub mod config;
pub mod error;
pub mod logging;

pub use config::DaemonConfig;
pub use error::{DaemonError, Result};
