//! Track path resolution
//!
//! Raw playlist paths come in three shapes, checked in this order:
//!
//! 1. `./x` or `../x` → relative to the playlist file's own directory
//! 2. `/x` → absolute, used as-is
//! 3. anything else → relative to the library root
//!
//! The joined path is normalised lexically. Nothing here touches the
//! filesystem: a file that does not exist simply fails the catalog lookup.

use plsync_core::{ResolutionRule, ResolvedPath, TrackReference};
use std::path::{Component, Path, PathBuf};

/// Resolve one track reference
pub fn resolve(track: &TrackReference, playlist_dir: &Path, library_root: &Path) -> ResolvedPath {
    let raw = track.raw_path.as_str();
    let rule = classify(raw);

    let joined = match rule {
        ResolutionRule::PlaylistRelative => playlist_dir.join(raw),
        ResolutionRule::Absolute => PathBuf::from(raw),
        ResolutionRule::LibraryRelative => library_root.join(raw),
    };

    ResolvedPath {
        path: normalize(&joined),
        rule,
        position: track.position,
    }
}

fn classify(raw: &str) -> ResolutionRule {
    if raw == "." || raw == ".." || raw.starts_with("./") || raw.starts_with("../") {
        ResolutionRule::PlaylistRelative
    } else if Path::new(raw).is_absolute() {
        ResolutionRule::Absolute
    } else {
        ResolutionRule::LibraryRelative
    }
}

/// Collapse `.` and `..` components without consulting the filesystem
///
/// `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = normalized
                    .components()
                    .next_back()
                    .map_or(true, |last| matches!(last, Component::RootDir | Component::Prefix(_)));
                if !at_root {
                    normalized.pop();
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_raw(raw: &str) -> ResolvedPath {
        resolve(
            &TrackReference::new(raw, 0),
            Path::new("/music/Lists"),
            Path::new("/music"),
        )
    }

    #[test]
    fn test_three_tiers() {
        let library = resolve_raw("artist/song.flac");
        assert_eq!(library.path, PathBuf::from("/music/artist/song.flac"));
        assert_eq!(library.rule, ResolutionRule::LibraryRelative);

        let parent = resolve_raw("../Other/song.mp3");
        assert_eq!(parent.path, PathBuf::from("/music/Other/song.mp3"));
        assert_eq!(parent.rule, ResolutionRule::PlaylistRelative);

        let current = resolve_raw("./song.wav");
        assert_eq!(current.path, PathBuf::from("/music/Lists/song.wav"));
        assert_eq!(current.rule, ResolutionRule::PlaylistRelative);
    }

    #[test]
    fn test_absolute_is_kept_but_normalised() {
        let resolved = resolve_raw("/srv/audio/./a/../b.flac");
        assert_eq!(resolved.path, PathBuf::from("/srv/audio/b.flac"));
        assert_eq!(resolved.rule, ResolutionRule::Absolute);
    }

    #[test]
    fn test_dot_inside_library_path_is_library_relative() {
        let resolved = resolve_raw(".hidden/song.flac");
        assert_eq!(resolved.path, PathBuf::from("/music/.hidden/song.flac"));
        assert_eq!(resolved.rule, ResolutionRule::LibraryRelative);
    }

    #[test]
    fn test_parent_above_root_stays_at_root() {
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(normalize(Path::new("/../../x.mp3")), PathBuf::from("/x.mp3"));
    }

    #[test]
    fn test_position_is_carried_over() {
        let resolved = resolve(
            &TrackReference::new("x.flac", 7),
            Path::new("/p"),
            Path::new("/lib"),
        );
        assert_eq!(resolved.position, 7);
    }
}
