/// Track references as written in playlist text, and their resolved forms
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One track entry parsed from a playlist file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackReference {
    /// Path exactly as written in the playlist
    pub raw_path: String,

    /// Zero-based position within the playlist
    pub position: usize,

    /// Duration in seconds from the metadata directive (logging only)
    pub duration_secs: Option<u32>,

    /// Display title from the metadata directive (logging only)
    pub title: Option<String>,
}

impl TrackReference {
    /// Create a reference without display metadata
    pub fn new(raw_path: impl Into<String>, position: usize) -> Self {
        Self {
            raw_path: raw_path.into(),
            position,
            duration_secs: None,
            title: None,
        }
    }

    /// Human readable label for log lines
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.raw_path)
    }
}

/// Which resolution tier produced a resolved path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    /// `./` or `../` prefix, joined to the playlist's directory
    PlaylistRelative,
    /// Already absolute, used as-is
    Absolute,
    /// Anything else, joined to the library root
    LibraryRelative,
}

/// Canonical absolute path for one track reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    /// Normalised absolute path (not checked for existence)
    pub path: PathBuf,

    /// Tier that produced it
    pub rule: ResolutionRule,

    /// Position of the originating reference
    pub position: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_title() {
        let mut track = TrackReference::new("Artist/01 Song.flac", 0);
        assert_eq!(track.label(), "Artist/01 Song.flac");

        track.title = Some("Artist - Song".to_string());
        assert_eq!(track.label(), "Artist - Song");
    }
}
