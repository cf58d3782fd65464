/// plsync - keeps Strawberry playlists in sync with playlist files
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use plsync_daemon::config::{self, DaemonConfig, DEFAULT_CONFIG_FILE};
use plsync_daemon::logging;
use plsync_engine::{PlaylistWatcher, SchemaPolicy, SyncEngine};
use plsync_storage::backup::create_startup_backup;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "plsync", version)]
#[command(about = "Sync playlist files into the Strawberry music player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync changed playlists, then keep watching for changes
    Run(RunArgs),
    /// Sync changed playlists once and exit
    Once(RunArgs),
    /// Write a configuration file with default values
    CreateConfig {
        /// Configuration file path
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file path
    #[arg(short, long, env = "PLSYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Run even if the database schema version is not a known one
    #[arg(long)]
    ignore_database_schema_version: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => start(args, true).await,
        Commands::Once(args) => start(args, false).await,
        Commands::CreateConfig { config: path } => {
            config::create_config_file(&path)?;
            println!("Created {}", path.display());
            Ok(())
        }
    }
}

async fn start(args: RunArgs, watch: bool) -> anyhow::Result<()> {
    let config = DaemonConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    logging::init(&config.logging.level, Some(&config.log_file))?;

    info!("Starting plsync {}", env!("CARGO_PKG_VERSION"));
    if !args.config.exists() {
        warn!("No configuration file at {:?}, using defaults", args.config);
    }

    let settings = config.to_settings()?;
    config::verify_paths(&settings)?;
    info!("Playlists: {:?}", settings.playlist_dir);
    info!("Database: {:?}", settings.database_path);

    let schema_policy = if args.ignore_database_schema_version {
        warn!("Database schema version check disabled - writes may corrupt an unknown schema");
        SchemaPolicy::Ignore
    } else {
        SchemaPolicy::Enforce
    };

    if let Err(e) = create_startup_backup(
        &settings.database_path,
        &settings.backup_dir,
        settings.backup_retention,
    )
    .await
    {
        warn!("Continuing without a fresh database backup: {}", e);
    }

    let mut engine = SyncEngine::open(settings.clone(), schema_policy).await?;

    if !watch {
        engine.sync_once().await?;
        return Ok(());
    }

    let (tx, rx) = mpsc::channel(settings.queue_capacity);
    let _watcher = PlaylistWatcher::start(
        &settings.playlist_dir,
        settings.recursive,
        settings.playlist_extensions.clone(),
        tx,
    )?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    engine.run(rx, shutdown).await?;
    info!("Stopped");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Interrupted, finishing current playlist"),
            Err(e) => {
                error!("Cannot listen for Ctrl-C: {}", e);
                return;
            }
        },
        () = terminate => info!("Terminated, finishing current playlist"),
    }

    shutdown.cancel();
}
