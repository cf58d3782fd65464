//! Extended M3U parsing
//!
//! ```text
//! #EXTM3U
//! #EXTINF:245,Artist - Title
//! Artist/Album/01 - Title.flac
//! ../Other/Song.mp3
//! ```
//!
//! The header must come first. `#EXTINF` lines carry display metadata for the
//! path line that follows them; other directives and blank lines are skipped.

use crate::{ParseError, Result};
use plsync_core::TrackReference;

const HEADER: &str = "#EXTM3U";
const TRACK_INFO: &str = "#EXTINF:";
const BOM: char = '\u{feff}';

/// Display metadata from an `#EXTINF` line
#[derive(Debug, Default, PartialEq)]
struct TrackInfo {
    duration_secs: Option<u32>,
    title: Option<String>,
}

/// Parse playlist bytes into track references in file order
///
/// Fails on content that looks like an unfinished write: no bytes, a path
/// before the header, metadata with no path after it, or no tracks at all.
pub fn parse(bytes: &[u8]) -> Result<Vec<TrackReference>> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }

    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidEncoding {
        offset: e.valid_up_to(),
    })?;
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut seen_header = false;
    let mut pending: Option<(usize, TrackInfo)> = None;
    let mut tracks = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if !seen_header {
            if line.starts_with(HEADER) {
                seen_header = true;
                continue;
            }
            return Err(ParseError::MissingHeader { line: line_number });
        }

        if let Some(info) = line.strip_prefix(TRACK_INFO) {
            pending = Some((line_number, parse_track_info(info)));
            continue;
        }

        if line.starts_with('#') {
            // Unknown directive (#EXTGRP, #PLAYLIST, comments...)
            continue;
        }

        let info = pending.take().map(|(_, info)| info).unwrap_or_default();
        tracks.push(TrackReference {
            raw_path: line.to_string(),
            position: tracks.len(),
            duration_secs: info.duration_secs,
            title: info.title,
        });
    }

    if !seen_header {
        return Err(ParseError::Empty);
    }

    if let Some((line, _)) = pending {
        return Err(ParseError::Truncated { line });
    }

    if tracks.is_empty() {
        return Err(ParseError::NoTracks);
    }

    Ok(tracks)
}

/// Parse the part after `#EXTINF:`, e.g. `245,Artist - Title`
///
/// Attributes between the duration and the comma are ignored. Negative
/// durations mean "unknown".
fn parse_track_info(info: &str) -> TrackInfo {
    let (head, title) = match info.split_once(',') {
        Some((head, title)) => (head, Some(title.trim())),
        None => (info, None),
    };

    let duration_secs = head
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs.round() as u32);

    TrackInfo {
        duration_secs,
        title: title.filter(|t| !t.is_empty()).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(tracks: &[TrackReference]) -> Vec<&str> {
        tracks.iter().map(|t| t.raw_path.as_str()).collect()
    }

    #[test]
    fn test_parse_extended_playlist() {
        let text = "#EXTM3U\n\
                    #EXTINF:245,Artist - First\n\
                    Artist/Album/01 First.flac\n\
                    #EXTINF:-1,Second\n\
                    ../Other/Second.mp3\n\
                    /abs/Third.ogg\n";

        let tracks = parse(text.as_bytes()).unwrap();

        assert_eq!(
            paths(&tracks),
            vec!["Artist/Album/01 First.flac", "../Other/Second.mp3", "/abs/Third.ogg"]
        );
        assert_eq!(tracks[0].duration_secs, Some(245));
        assert_eq!(tracks[0].title.as_deref(), Some("Artist - First"));
        assert_eq!(tracks[1].duration_secs, None);
        assert_eq!(tracks[1].title.as_deref(), Some("Second"));
        assert_eq!(tracks[2].title, None);
        assert_eq!(
            tracks.iter().map(|t| t.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_skips_blank_lines_and_unknown_directives() {
        let text = "\u{feff}#EXTM3U\r\n\r\n#PLAYLIST:Mix\r\n#EXTGRP:Rock\r\n  song.flac  \r\n\r\n";
        let tracks = parse(text.as_bytes()).unwrap();
        assert_eq!(paths(&tracks), vec!["song.flac"]);
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let tracks = parse(b"#EXTM3U\na.flac\nb.flac\na.flac\n").unwrap();
        assert_eq!(paths(&tracks), vec!["a.flac", "b.flac", "a.flac"]);
    }

    #[test]
    fn test_extinf_with_attributes() {
        let info = parse_track_info("123.6 tvg-id=\"x\",Title, with comma");
        assert_eq!(info.duration_secs, Some(124));
        assert_eq!(info.title.as_deref(), Some("Title, with comma"));

        let info = parse_track_info("garbage");
        assert_eq!(info, TrackInfo::default());
    }

    #[test]
    fn test_empty_bytes() {
        assert!(matches!(parse(b""), Err(ParseError::Empty)));
        assert!(matches!(parse(b"\n \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_path_before_header_is_rejected() {
        let err = parse(b"\nsong.flac\n#EXTM3U\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingHeader { line: 2 }));
    }

    #[test]
    fn test_dangling_metadata_is_truncated() {
        let err = parse(b"#EXTM3U\na.flac\n#EXTINF:10,B\n").unwrap_err();
        assert!(matches!(err, ParseError::Truncated { line: 3 }));
    }

    #[test]
    fn test_header_only_has_no_tracks() {
        assert!(matches!(parse(b"#EXTM3U\n"), Err(ParseError::NoTracks)));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = parse(b"#EXTM3U\n\xff\xfe.flac\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidEncoding { offset: 8 }));
    }
}
