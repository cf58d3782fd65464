use crate::{
    cache::ChangeCache, error::Result, queue::SyncQueue, state::SyncAttempt, SyncError,
    SyncState, WatcherEvent,
};
use plsync_core::{PlaylistSource, ResolvedPath, SongId, SyncSettings};
use plsync_playlist::{is_playlist_file, read_playlist, resolve};
use plsync_storage::playlists::{self, ReconcileOutcome};
use plsync_storage::schema::{self, SchemaPolicy};
use plsync_storage::{songs, StorageError};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Result of one committed playlist sync
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub name: String,
    pub path: PathBuf,
    pub state: SyncState,
    pub matched: usize,
    pub missing: Vec<ResolvedPath>,
    pub outcome: ReconcileOutcome,
}

/// Playlists found by a directory scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Changed since the last sync, queued for processing
    pub queued: Vec<PathBuf>,
    /// Unchanged since the last sync
    pub skipped: usize,
}

/// Totals over a `sync_once` or `run` session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub missing_tracks: usize,
}

/// Orchestrates scan, queue, and per-playlist sync attempts
pub struct SyncEngine {
    settings: SyncSettings,
    pool: SqlitePool,
    cache: ChangeCache,
    queue: SyncQueue,
}

impl SyncEngine {
    /// Connect to the catalog, check its schema, and load the change cache
    pub async fn open(settings: SyncSettings, schema_policy: SchemaPolicy) -> Result<Self> {
        let pool =
            plsync_storage::create_pool(&settings.database_path, settings.busy_timeout).await?;
        schema::verify(&pool, schema_policy).await?;

        let cache = ChangeCache::load(&settings.cache_path).await;
        let queue = SyncQueue::new(settings.coalesce_window);

        Ok(Self {
            settings,
            pool,
            cache,
            queue,
        })
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// Find playlist files and queue the ones that changed since last sync
    pub async fn startup_scan(&mut self) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        for path in self.discover()? {
            let source = match PlaylistSource::observe(&path).await {
                Ok(source) => source,
                Err(e) => {
                    warn!("Cannot stat {:?}, skipping: {}", path, e);
                    continue;
                }
            };

            if self.cache.should_process(&source) {
                self.queue.push_ready(&path);
                report.queued.push(path);
            } else {
                debug!("Unchanged since last sync: {}", source.name);
                report.skipped += 1;
            }
        }

        info!(
            "Startup scan: {} playlists to sync, {} unchanged",
            report.queued.len(),
            report.skipped
        );
        Ok(report)
    }

    fn discover(&self) -> Result<Vec<PathBuf>> {
        let max_depth = if self.settings.recursive { usize::MAX } else { 1 };

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.settings.playlist_dir)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    // The playlist directory itself is unreadable
                    return Err(SyncError::Io(e.into()));
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file()
                && is_playlist_file(entry.path(), &self.settings.playlist_extensions)
            {
                found.push(entry.into_path());
            }
        }

        found.sort();
        Ok(found)
    }

    /// Run one sync attempt for `path`, regardless of the change cache
    ///
    /// On failure the cache is left alone so the file is retried on its next
    /// change or at the next startup.
    pub async fn sync_playlist(&mut self, path: &Path) -> Result<SyncReport> {
        let mut attempt = SyncAttempt::new(path);
        attempt.advance(SyncState::Debounced);

        match self.attempt(&mut attempt).await {
            Ok(report) => Ok(report),
            Err(e) => {
                attempt.fail(e.to_string());
                error!("Failed to sync {:?}: {}", path, e);
                Err(e)
            }
        }
    }

    async fn attempt(&mut self, attempt: &mut SyncAttempt) -> Result<SyncReport> {
        let path = attempt.path().to_path_buf();

        attempt.advance(SyncState::Parsing);
        // Stat before reading: a write landing in between only causes a resync
        let source = PlaylistSource::observe(&path).await?;
        let tracks = read_playlist(&path, &self.settings.parse_retry).await?;

        attempt.advance(SyncState::Resolving);
        let resolved: Vec<ResolvedPath> = tracks
            .iter()
            .map(|track| resolve(track, &source.directory, &self.settings.library_root))
            .collect();

        attempt.advance(SyncState::Matching);
        let label = format!("Matching tracks of '{}'", source.name);
        let pool = &self.pool;
        let paths = resolved.as_slice();
        let lookups = self
            .with_lock_retry(&label, move || find_songs(pool, paths))
            .await?;

        let mut matched = Vec::with_capacity(resolved.len());
        let mut missing = Vec::new();
        for ((track, resolved_path), song) in tracks.iter().zip(resolved).zip(lookups) {
            match song {
                Some(song) => matched.push(song),
                None => {
                    warn!(
                        "Track not found in catalog: {} ({}, entry {} of {})",
                        resolved_path.path.display(),
                        track.label(),
                        resolved_path.position + 1,
                        source.name
                    );
                    missing.push(resolved_path);
                }
            }
        }

        attempt.advance(SyncState::Reconciling);
        let outcome = self.reconcile(&source.name, &matched).await?;
        attempt.advance(SyncState::Committed);

        if let Err(e) = self.cache.commit(&source).await {
            warn!("Synced {} but could not update the cache: {}", source.name, e);
        }

        if outcome.created {
            info!("Created playlist: {}", source.name);
        }
        info!(
            "Synced playlist '{}': {} tracks, {} missing",
            source.name,
            matched.len(),
            missing.len()
        );

        Ok(SyncReport {
            name: source.name,
            path,
            state: attempt.state().clone(),
            matched: matched.len(),
            missing,
            outcome,
        })
    }

    async fn reconcile(&self, name: &str, songs: &[SongId]) -> Result<ReconcileOutcome> {
        let label = format!("Writing playlist '{}'", name);
        let pool = &self.pool;
        self.with_lock_retry(&label, move || playlists::replace_items(pool, name, songs))
            .await
    }

    /// Run a catalog operation under the transaction retry policy
    ///
    /// A lock that outlasts every attempt becomes `SyncError::Transaction`.
    async fn with_lock_retry<T, F, Fut>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StorageError>>,
    {
        let retry = &self.settings.transaction_retry;
        retry
            .run(label, StorageError::is_busy, op)
            .await
            .map_err(|e| {
                if e.is_busy() {
                    SyncError::Transaction {
                        attempts: retry.max_attempts,
                        source: e,
                    }
                } else {
                    SyncError::Storage(e)
                }
            })
    }

    /// Feed one watcher event into the queue
    pub async fn handle_event(&mut self, event: WatcherEvent, now: Instant) {
        match event {
            WatcherEvent::Created(path) | WatcherEvent::Modified(path) => {
                debug!("Change queued: {:?}", path);
                self.queue.push(path, now);
            }
            WatcherEvent::Removed(path) => self.handle_removed(&path).await,
            WatcherEvent::Renamed(from, to) => {
                self.handle_removed(&from).await;
                self.queue.push(to, now);
            }
        }
    }

    /// A deleted file only loses its cache entry; the catalog playlist stays
    async fn handle_removed(&mut self, path: &Path) {
        self.queue.remove(path);

        match self.cache.forget(path).await {
            Ok(true) => info!(
                "Playlist file removed: {:?} (catalog playlist left in place)",
                path
            ),
            Ok(false) => debug!("Removed file was never synced: {:?}", path),
            Err(e) => warn!("Could not drop cache entry for {:?}: {}", path, e),
        }
    }

    /// Process every queued path that is due at `now`
    pub async fn process_due(&mut self, now: Instant) -> RunSummary {
        let mut summary = RunSummary::default();
        while let Some(path) = self.queue.pop_ready(now) {
            self.process_queued(&path, &mut summary).await;
        }
        summary
    }

    async fn process_queued(&mut self, path: &Path, summary: &mut RunSummary) {
        let source = match PlaylistSource::observe(path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Queued playlist disappeared: {:?}", path);
                return;
            }
            Err(e) => {
                warn!("Cannot stat {:?}: {}", path, e);
                summary.failed += 1;
                return;
            }
        };

        if !self.cache.should_process(&source) {
            debug!("Unchanged since last sync: {}", source.name);
            summary.skipped += 1;
            return;
        }

        match self.sync_playlist(path).await {
            Ok(report) => {
                summary.synced += 1;
                summary.missing_tracks += report.missing.len();
            }
            // Already logged by sync_playlist
            Err(_) => summary.failed += 1,
        }
    }

    /// Scan once and sync everything that changed, without watching
    pub async fn sync_once(&mut self) -> Result<RunSummary> {
        let scan = self.startup_scan().await?;

        let mut summary = self.process_due(Instant::now()).await;
        summary.skipped += scan.skipped;

        info!(
            "Sync complete: {} synced, {} unchanged, {} failed",
            summary.synced, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Scan, then process watcher events until `shutdown` fires
    ///
    /// If the event channel closes, the loop finishes the queued work and
    /// returns. On shutdown, the attempt in progress runs to commit or
    /// rollback and queued work is left for the next start.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<WatcherEvent>,
        shutdown: CancellationToken,
    ) -> Result<RunSummary> {
        let scan = self.startup_scan().await?;
        let mut summary = RunSummary {
            skipped: scan.skipped,
            ..RunSummary::default()
        };
        let mut events_open = true;

        info!("Sync loop started");

        loop {
            while !shutdown.is_cancelled() {
                let Some(path) = self.queue.pop_ready(Instant::now()) else {
                    break;
                };
                self.process_queued(&path, &mut summary).await;
            }

            if shutdown.is_cancelled() {
                info!("Shutdown requested, {} playlists left queued", self.queue.len());
                break;
            }
            if !events_open && self.queue.is_empty() {
                break;
            }

            let deadline = self.queue.next_deadline();
            let wait_for_deadline = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;

                () = shutdown.cancelled() => {}
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event, Instant::now()).await,
                    None => {
                        debug!("Event channel closed");
                        events_open = false;
                    }
                },
                () = wait_for_deadline => {}
            }
        }

        info!(
            "Sync loop stopped: {} synced, {} unchanged, {} failed",
            summary.synced, summary.skipped, summary.failed
        );
        Ok(summary)
    }
}

/// Look up every resolved path, keeping playlist order
async fn find_songs(
    pool: &SqlitePool,
    resolved: &[ResolvedPath],
) -> std::result::Result<Vec<Option<SongId>>, StorageError> {
    let mut found = Vec::with_capacity(resolved.len());
    for resolved_path in resolved {
        found.push(songs::find_by_path(pool, &resolved_path.path).await?);
    }
    Ok(found)
}
