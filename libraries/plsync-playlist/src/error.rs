//! Error types for playlist reading

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Playlist is empty")]
    Empty,

    #[error("Playlist is not valid UTF-8 (byte offset {offset})")]
    InvalidEncoding { offset: usize },

    #[error("Missing #EXTM3U header before line {line}")]
    MissingHeader { line: usize },

    #[error("Track metadata on line {line} has no path line after it")]
    Truncated { line: usize },

    #[error("Playlist has a header but no tracks")]
    NoTracks,
}

impl ParseError {
    /// Whether another read might succeed
    ///
    /// Everything except a vanished file can be a writer that has not
    /// finished yet.
    pub fn is_transient(&self) -> bool {
        match self {
            ParseError::Io(e) => e.kind() != io::ErrorKind::NotFound,
            _ => true,
        }
    }
}
