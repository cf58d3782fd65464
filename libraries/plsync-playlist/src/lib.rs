//! Playlist Sync Playlist Text
//!
//! Reads externally-authored playlist text and turns each entry into an
//! absolute path the catalog can be queried with.
//!
//! # Architecture
//!
//! - `parser`: Extended M3U text to ordered `TrackReference`s
//! - `reader`: File reads that ride out partial writes by retrying
//! - `resolver`: Three-tier raw path to `ResolvedPath` resolution
//!
//! Playlist files are only ever read, never written.

mod error;

pub mod parser;
pub mod reader;
pub mod resolver;

pub use error::ParseError;
pub use parser::parse;
pub use reader::{is_playlist_file, read_playlist};
pub use resolver::{normalize, resolve};

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, ParseError>;
