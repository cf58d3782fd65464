//! Playlist file reading
//!
//! Phones and sync tools often write playlists in several steps (truncate,
//! write, rename). A read that lands in the middle sees an empty or cut-off
//! file, so reads are retried under a bounded `RetryPolicy` before giving up.

use crate::{parser, ParseError, Result};
use plsync_core::{RetryPolicy, TrackReference};
use std::path::Path;
use tracing::{debug, info};

/// Check if a path is a playlist file based on extension
///
/// `extensions` are lowercase, without the leading dot.
pub fn is_playlist_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

/// Read and parse a playlist file, retrying while it looks half-written
pub async fn read_playlist(path: &Path, retry: &RetryPolicy) -> Result<Vec<TrackReference>> {
    let label = format!("Reading playlist {}", path.display());

    let tracks = retry
        .run(&label, ParseError::is_transient, move || async move {
            let bytes = tokio::fs::read(path).await?;
            debug!("Read {} bytes from {:?}", bytes.len(), path);
            parser::parse(&bytes)
        })
        .await?;

    info!(
        "Parsed {} tracks from {}",
        tracks.len(),
        path.file_name().map_or_else(
            || path.display().to_string(),
            |n| n.to_string_lossy().into_owned()
        )
    );
    Ok(tracks)
}
