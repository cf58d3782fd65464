/// Daemon configuration
use crate::error::{DaemonError, Result};
use plsync_core::{RetryPolicy, SyncSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "playlist_sync_config.json";

/// Ceiling for the growing delay between transaction attempts
const MAX_TRANSACTION_RETRY_DELAY: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonConfig {
    #[serde(default = "default_playlist_directory")]
    pub playlist_directory: PathBuf,

    /// Base for library-relative track paths, defaults to `playlist_directory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_root: Option<PathBuf>,

    #[serde(default = "default_strawberry_db_path")]
    pub strawberry_db_path: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    #[serde(default = "default_backup_directory")]
    pub backup_directory: PathBuf,

    /// Startup backups to keep, 0 = unlimited
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default)]
    pub monitoring: MonitoringSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringSettings {
    /// Seconds a file must stay quiet before it is synced
    #[serde(default = "default_debounce_delay")]
    pub debounce_delay: f64,

    /// Extra read attempts for a playlist that looks half-written
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds between read attempts
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,

    #[serde(default)]
    pub recursive: bool,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// Seconds each statement waits on the player's lock
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout: f64,

    #[serde(default = "default_transaction_attempts")]
    pub transaction_attempts: u32,

    /// Seconds before the first transaction retry, doubling after each
    #[serde(default = "default_transaction_retry_delay")]
    pub transaction_retry_delay: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl DaemonConfig {
    /// Load configuration from a JSON file and `PLSYNC__*` environment variables
    ///
    /// A missing file means all defaults. Relative log, cache and backup
    /// paths are taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = config::Config::builder();

        if path.exists() {
            settings = settings.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Json),
            );
        }

        // e.g. PLSYNC__MONITORING__RECURSIVE=true
        settings = settings.add_source(
            config::Environment::with_prefix("PLSYNC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;

        let cwd = std::env::current_dir()?;
        let base = match path.parent() {
            Some(parent) => relative_to(&cwd, parent),
            None => cwd.clone(),
        };
        Ok(config.resolve_paths(&cwd, &base))
    }

    /// Make every path absolute
    ///
    /// Library paths are taken relative to `cwd`, daemon-owned files
    /// relative to `base` (the config file's directory).
    fn resolve_paths(mut self, cwd: &Path, base: &Path) -> Self {
        self.playlist_directory = relative_to(cwd, &expand_home(&self.playlist_directory));
        self.library_root = self
            .library_root
            .as_deref()
            .map(|root| relative_to(cwd, &expand_home(root)));
        self.strawberry_db_path = relative_to(cwd, &expand_home(&self.strawberry_db_path));
        self.log_file = relative_to(base, &expand_home(&self.log_file));
        self.cache_file = relative_to(base, &expand_home(&self.cache_file));
        self.backup_directory = relative_to(base, &expand_home(&self.backup_directory));
        self
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let delays = [
            ("monitoring.debounce_delay", self.monitoring.debounce_delay),
            ("monitoring.retry_delay", self.monitoring.retry_delay),
            ("database.busy_timeout", self.database.busy_timeout),
            (
                "database.transaction_retry_delay",
                self.database.transaction_retry_delay,
            ),
        ];
        for (key, value) in delays {
            if !value.is_finite() || value < 0.0 {
                return Err(DaemonError::Config(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    key, value
                )));
            }
        }

        if self.database.transaction_attempts == 0 {
            return Err(DaemonError::Config(
                "database.transaction_attempts must be at least 1".to_string(),
            ));
        }

        if self.monitoring.extensions.is_empty() {
            return Err(DaemonError::Config(
                "monitoring.extensions must list at least one extension".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the sync core's settings
    pub fn to_settings(&self) -> Result<SyncSettings> {
        self.validate()?;

        let mut settings = SyncSettings::new(
            &self.playlist_directory,
            &self.strawberry_db_path,
            &self.cache_file,
            &self.backup_directory,
        );

        if let Some(root) = &self.library_root {
            settings = settings.with_library_root(root);
        }

        settings.backup_retention = self.backup_retention;
        settings.recursive = self.monitoring.recursive;
        settings.playlist_extensions = self
            .monitoring
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        settings.coalesce_window = seconds(self.monitoring.debounce_delay);
        settings.parse_retry = RetryPolicy::fixed(
            self.monitoring.max_retries + 1,
            seconds(self.monitoring.retry_delay),
        );
        settings.transaction_retry = RetryPolicy::exponential(
            self.database.transaction_attempts,
            seconds(self.database.transaction_retry_delay),
            MAX_TRANSACTION_RETRY_DELAY,
        );
        settings.busy_timeout = seconds(self.database.busy_timeout);

        Ok(settings)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            playlist_directory: default_playlist_directory(),
            library_root: None,
            strawberry_db_path: default_strawberry_db_path(),
            log_file: default_log_file(),
            cache_file: default_cache_file(),
            backup_directory: default_backup_directory(),
            backup_retention: default_backup_retention(),
            monitoring: MonitoringSettings::default(),
            database: DatabaseSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            debounce_delay: default_debounce_delay(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            recursive: false,
            extensions: default_extensions(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            busy_timeout: default_busy_timeout(),
            transaction_attempts: default_transaction_attempts(),
            transaction_retry_delay: default_transaction_retry_delay(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Write the default configuration to `path`, refusing to overwrite
pub fn create_config_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(DaemonError::ConfigExists(path.to_path_buf()));
    }

    let json = serde_json::to_string_pretty(&DaemonConfig::default())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json + "\n")?;
    Ok(())
}

/// Fail early when the directories and files the daemon needs are missing
pub fn verify_paths(settings: &SyncSettings) -> Result<()> {
    if !settings.playlist_dir.is_dir() {
        return Err(DaemonError::MissingPath {
            what: "Playlist directory",
            path: settings.playlist_dir.clone(),
        });
    }

    if !settings.database_path.is_file() {
        return Err(DaemonError::MissingPath {
            what: "Strawberry database",
            path: settings.database_path.clone(),
        });
    }

    Ok(())
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// Validated non-negative and finite before use
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

// Default values
fn default_playlist_directory() -> PathBuf {
    PathBuf::from("~/Music")
}

fn default_strawberry_db_path() -> PathBuf {
    PathBuf::from("~/.local/share/strawberry/strawberry/strawberry.db")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("playlist_sync.log")
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("playlist_sync_cache.json")
}

fn default_backup_directory() -> PathBuf {
    PathBuf::from("backups")
}

fn default_backup_retention() -> usize {
    3
}

fn default_debounce_delay() -> f64 {
    2.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    0.5
}

fn default_extensions() -> Vec<String> {
    vec!["m3u8".to_string()]
}

fn default_busy_timeout() -> f64 {
    1.0
}

fn default_transaction_attempts() -> u32 {
    5
}

fn default_transaction_retry_delay() -> f64 {
    0.25
}

fn default_log_level() -> String {
    "info".to_string()
}
