//! Startup backups of the catalog database
//!
//! Before the first write of a session the database file is copied into the
//! backup directory. The very first copy ever made is kept forever; later
//! ones rotate according to the retention count.
//!
//! ```text
//! backups/
//!   strawberry_before_first_use.db            (never pruned)
//!   strawberry_backup_startup_20250101_093000.db
//!   strawberry_backup_startup_20250102_101500.db
//! ```

use crate::{Result, StorageError};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;

/// Which rotation class a backup belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    /// First backup ever taken in this directory, exempt from retention
    BeforeFirstUse,
    /// Regular per-startup backup
    Startup,
}

/// A backup that was just written
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub path: PathBuf,
    pub kind: BackupKind,
    pub created_at: DateTime<Local>,
    pub size: u64,
}

/// Creates and rotates backups of one database file
#[derive(Debug, Clone)]
pub struct BackupManager {
    database_path: PathBuf,
    backup_dir: PathBuf,
    retention: usize,
    stem: String,
    extension: String,
}

impl BackupManager {
    /// `retention` is the number of startup backups to keep; 0 keeps all
    pub fn new(
        database_path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        retention: usize,
    ) -> Self {
        let database_path = database_path.into();
        let stem = database_path
            .file_stem()
            .map_or_else(|| "database".to_string(), |s| s.to_string_lossy().into_owned());
        let extension = database_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Self {
            database_path,
            backup_dir: backup_dir.into(),
            retention,
            stem,
            extension,
        }
    }

    /// Path of the permanent first-use backup
    pub fn exempt_path(&self) -> PathBuf {
        self.backup_dir
            .join(format!("{}_before_first_use{}", self.stem, self.extension))
    }

    fn startup_prefix(&self) -> String {
        format!("{}_backup_startup_", self.stem)
    }

    /// Copy the database aside and prune old startup backups
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Backup` if the database is missing, the copy
    /// fails, or the copy came out empty. Pruning problems are only logged.
    pub async fn create_startup_backup(&self) -> Result<BackupRecord> {
        if !tokio::fs::try_exists(&self.database_path).await? {
            return Err(StorageError::Backup(format!(
                "database file {} does not exist",
                self.database_path.display()
            )));
        }

        tokio::fs::create_dir_all(&self.backup_dir).await.map_err(|e| {
            StorageError::Backup(format!(
                "cannot create backup directory {}: {}",
                self.backup_dir.display(),
                e
            ))
        })?;

        let created_at = Local::now();
        let exempt = self.exempt_path();
        let first_ever =
            !tokio::fs::try_exists(&exempt).await? && self.list_startup_backups().await?.is_empty();

        let (path, kind) = if first_ever {
            info!("Creating initial backup before first use: {}", exempt.display());
            (exempt, BackupKind::BeforeFirstUse)
        } else {
            let path = self.next_startup_path(&created_at).await?;
            info!("Creating startup backup: {}", path.display());
            (path, BackupKind::Startup)
        };

        let size = tokio::fs::copy(&self.database_path, &path)
            .await
            .map_err(|e| StorageError::Backup(format!("copy to {} failed: {}", path.display(), e)))?;

        if size == 0 {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove empty backup {}: {}", path.display(), e);
            }
            return Err(StorageError::Backup(format!(
                "backup {} is empty",
                path.display()
            )));
        }

        info!("Database backup created: {} ({} bytes)", path.display(), size);

        if kind == BackupKind::Startup {
            self.prune().await?;
        }

        Ok(BackupRecord {
            path,
            kind,
            created_at,
            size,
        })
    }

    /// Startup backups of this database, newest first
    pub async fn list_startup_backups(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = self.startup_prefix();
        let mut backups: Vec<((String, u32), PathBuf)> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(key) = startup_sort_key(name, &prefix, &self.extension) {
                backups.push((key, entry.path()));
            }
        }

        backups.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Delete all but the newest `retention` startup backups
    ///
    /// Returns the paths that were removed. A file that cannot be deleted is
    /// logged and skipped.
    pub async fn prune(&self) -> Result<Vec<PathBuf>> {
        if self.retention == 0 {
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        for old in self.list_startup_backups().await?.into_iter().skip(self.retention) {
            match tokio::fs::remove_file(&old).await {
                Ok(()) => {
                    info!("Removed old backup: {}", old.display());
                    removed.push(old);
                }
                Err(e) => warn!("Failed to remove old backup {}: {}", old.display(), e),
            }
        }

        Ok(removed)
    }

    async fn next_startup_path(&self, now: &DateTime<Local>) -> Result<PathBuf> {
        let base = format!("{}{}", self.startup_prefix(), now.format(TIMESTAMP_FORMAT));

        let mut candidate = self.backup_dir.join(format!("{}{}", base, self.extension));
        let mut n = 1;
        while tokio::fs::try_exists(&candidate).await? {
            candidate = self.backup_dir.join(format!("{}_{}{}", base, n, self.extension));
            n += 1;
        }

        Ok(candidate)
    }
}

/// Create a startup backup of `database_path` in `backup_dir`
///
/// # Errors
///
/// See [`BackupManager::create_startup_backup`]
pub async fn create_startup_backup(
    database_path: &Path,
    backup_dir: &Path,
    retention: usize,
) -> Result<BackupRecord> {
    BackupManager::new(database_path, backup_dir, retention)
        .create_startup_backup()
        .await
}

/// Ordering key `(timestamp, collision suffix)` for a startup backup file name
fn startup_sort_key(name: &str, prefix: &str, extension: &str) -> Option<(String, u32)> {
    let rest = name.strip_prefix(prefix)?.strip_suffix(extension)?;
    let timestamp = rest.get(..TIMESTAMP_LEN)?;

    let well_formed = timestamp
        .char_indices()
        .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() });
    if !well_formed {
        return None;
    }

    let suffix = match &rest[TIMESTAMP_LEN..] {
        "" => 0,
        s => s.strip_prefix('_')?.parse().ok()?,
    };

    Some((timestamp.to_string(), suffix))
}
