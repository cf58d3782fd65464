//! Filesystem watcher for the playlist directory
//!
//! Converts debounced `notify` events on playlist files into
//! [`WatcherEvent`]s and pushes them into a bounded channel. The sync loop
//! only ever sees the channel.
//!
//! # Platform Support
//!
//! - Windows: `ReadDirectoryChangesW`
//! - macOS: `FSEvents`
//! - Linux: `inotify`

use crate::{Result, SyncError};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use plsync_playlist::is_playlist_file;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Debounce applied by the watcher itself, below the engine's coalescing window
const WATCHER_DEBOUNCE_MS: u64 = 500;

/// Change to a playlist file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEvent {
    /// A file was created or moved into the watched directory
    Created(PathBuf),
    /// A file was modified
    Modified(PathBuf),
    /// A file was deleted or moved out of the watched directory
    Removed(PathBuf),
    /// A file was renamed (old path, new path)
    Renamed(PathBuf, PathBuf),
}

/// Watches the playlist directory while it is alive
pub struct PlaylistWatcher {
    path: PathBuf,
    // The debouncer owns the OS watcher; dropping it stops the events
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl PlaylistWatcher {
    /// Start watching `dir` and forward playlist events to `events`
    ///
    /// Events are dropped once the receiving side of `events` is closed.
    pub fn start(
        dir: &Path,
        recursive: bool,
        extensions: Vec<String>,
        events: mpsc::Sender<WatcherEvent>,
    ) -> Result<Self> {
        let mut debouncer = new_debouncer(
            Duration::from_millis(WATCHER_DEBOUNCE_MS),
            None,
            move |result: DebounceEventResult| match result {
                Ok(debounced) => {
                    for event in debounced {
                        let Some(watcher_event) = convert_event(&event.event, &extensions) else {
                            continue;
                        };
                        debug!("Watcher event: {:?}", watcher_event);
                        // Runs on the debouncer's own thread, not the runtime
                        if events.blocking_send(watcher_event).is_err() {
                            debug!("Event channel closed, dropping watcher event");
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        error!("Watcher error: {:?}", e);
                    }
                }
            },
        )
        .map_err(|e| SyncError::Watcher(format!("Failed to create debouncer: {}", e)))?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        debouncer
            .watch(dir, mode)
            .map_err(|e| SyncError::Watcher(format!("Failed to watch {:?}: {}", dir, e)))?;

        info!("Started watching: {:?} ({:?})", dir, mode);
        Ok(Self {
            path: dir.to_path_buf(),
            _debouncer: debouncer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Convert a notify event into a playlist event, dropping non-playlist paths
fn convert_event(event: &Event, extensions: &[String]) -> Option<WatcherEvent> {
    let paths = &event.paths;
    let first = paths
        .first()
        .filter(|p| is_playlist_file(p, extensions))
        .cloned();

    match &event.kind {
        EventKind::Create(_) => first.map(WatcherEvent::Created),
        EventKind::Remove(_) => first.map(WatcherEvent::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => first.map(WatcherEvent::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => first.map(WatcherEvent::Created),
        EventKind::Modify(ModifyKind::Name(_)) if paths.len() == 2 => {
            rename_event(&paths[0], &paths[1], extensions)
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => first.map(WatcherEvent::Modified),
        EventKind::Other if paths.len() == 2 => rename_event(&paths[0], &paths[1], extensions),
        _ => None,
    }
}

/// Editors save via "write temp file, rename over original", so a rename
/// onto a playlist is a change to it
fn rename_event(from: &Path, to: &Path, extensions: &[String]) -> Option<WatcherEvent> {
    match (is_playlist_file(from, extensions), is_playlist_file(to, extensions)) {
        (true, true) => Some(WatcherEvent::Renamed(from.to_path_buf(), to.to_path_buf())),
        (false, true) => Some(WatcherEvent::Created(to.to_path_buf())),
        (true, false) => Some(WatcherEvent::Removed(from.to_path_buf())),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn extensions() -> Vec<String> {
        vec!["m3u8".to_string()]
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_convert_create_event() {
        let result = convert_event(
            &event(EventKind::Create(CreateKind::File), &["/p/Pop.m3u8"]),
            &extensions(),
        );
        assert_eq!(result, Some(WatcherEvent::Created(PathBuf::from("/p/Pop.m3u8"))));
    }

    #[test]
    fn test_convert_modify_event() {
        let result = convert_event(
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Any)), &["/p/Pop.m3u8"]),
            &extensions(),
        );
        assert_eq!(result, Some(WatcherEvent::Modified(PathBuf::from("/p/Pop.m3u8"))));
    }

    #[test]
    fn test_convert_remove_event() {
        let result = convert_event(
            &event(EventKind::Remove(RemoveKind::File), &["/p/Pop.m3u8"]),
            &extensions(),
        );
        assert_eq!(result, Some(WatcherEvent::Removed(PathBuf::from("/p/Pop.m3u8"))));
    }

    #[test]
    fn test_non_playlist_files_are_ignored() {
        let result = convert_event(
            &event(EventKind::Create(CreateKind::File), &["/p/cover.jpg"]),
            &extensions(),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn test_atomic_save_is_a_change() {
        let result = convert_event(
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/p/.Pop.m3u8.swp", "/p/Pop.m3u8"],
            ),
            &extensions(),
        );
        assert_eq!(result, Some(WatcherEvent::Created(PathBuf::from("/p/Pop.m3u8"))));
    }

    #[test]
    fn test_playlist_rename() {
        let result = convert_event(
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/p/Pop.m3u8", "/p/Pop Hits.m3u8"],
            ),
            &extensions(),
        );
        assert_eq!(
            result,
            Some(WatcherEvent::Renamed(
                PathBuf::from("/p/Pop.m3u8"),
                PathBuf::from("/p/Pop Hits.m3u8")
            ))
        );
    }

    #[tokio::test]
    async fn test_watcher_reports_new_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let _watcher = PlaylistWatcher::start(dir.path(), false, extensions(), tx).unwrap();

        std::fs::write(dir.path().join("Pop.m3u8"), "#EXTM3U\na.flac\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let received = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("watcher event")
            .expect("channel open");

        match received {
            WatcherEvent::Created(path) | WatcherEvent::Modified(path) => {
                assert_eq!(path.file_name().unwrap(), "Pop.m3u8");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
