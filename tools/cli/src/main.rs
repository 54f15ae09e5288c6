//! PackMirror CLI - Serve, mirror and inspect distributed content trees.
//!
//! This tool runs a distribution server (origin or replica), pulls a
//! whole tree or a single game folder from a list of origins, and prints
//! the fingerprint tree of a local directory.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use packmirror_common::TreePath;
use packmirror_server::ServerConfig;
use packmirror_sync::{
    sync_with_failover, ContentSource, HttpOrigin, ProgressTracker, SyncPolicy,
};
use packmirror_tree::TreeBuilder;

#[derive(Parser)]
#[command(name = "packmirror")]
#[command(about = "PackMirror - Content tree distribution")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a distribution server.
    Serve {
        /// Address to bind the HTTP surface to.
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// Root of the content directory to serve.
        #[arg(short, long)]
        content_root: PathBuf,

        /// Origin base URL to mirror. Omitting this runs the server as
        /// the origin.
        #[arg(short, long)]
        origin: Option<String>,

        /// Profiles file (origin role). Defaults to profiles.json next
        /// to the content root.
        #[arg(short, long)]
        profiles_file: Option<PathBuf>,

        /// Seconds between rebuild/replication cycles.
        #[arg(short, long, default_value_t = 3600)]
        interval: u64,
    },

    /// Mirror the whole published tree into a local directory.
    Pull {
        /// Destination directory.
        #[arg(short, long)]
        dest: PathBuf,

        /// Origin base URL. Repeat for ordered failover.
        #[arg(short, long, required = true)]
        origin: Vec<String>,

        /// Top-level directory names exempt from deletion.
        #[arg(short, long)]
        keep: Vec<String>,
    },

    /// Update one game folder, preserving user-owned directories.
    Update {
        /// Local game folder directory.
        #[arg(short, long)]
        dest: PathBuf,

        /// Origin base URL. Repeat for ordered failover.
        #[arg(short, long, required = true)]
        origin: Vec<String>,

        /// Name of the game folder to update.
        #[arg(short, long)]
        game_folder: String,

        /// Top-level directory names exempt from deletion.
        #[arg(short, long, default_values_t = vec!["config".to_string(), "saves".to_string()])]
        keep: Vec<String>,
    },

    /// Print the fingerprint tree of a local directory as JSON.
    Hash {
        /// Directory to fingerprint.
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Show a server's version and published profiles.
    Status {
        /// Server base URL.
        #[arg(short, long)]
        origin: String,
    },

    /// Trigger an out-of-band rebuild/reconcile cycle on a server.
    Reload {
        /// Server base URL.
        #[arg(short, long)]
        origin: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve {
            bind,
            content_root,
            origin,
            profiles_file,
            interval,
        } => cmd_serve(bind, content_root, origin, profiles_file, interval).await,

        Commands::Pull { dest, origin, keep } => cmd_pull(&dest, &origin, keep).await,

        Commands::Update {
            dest,
            origin,
            game_folder,
            keep,
        } => cmd_update(&dest, &origin, &game_folder, keep).await,

        Commands::Hash { path } => cmd_hash(&path).await,

        Commands::Status { origin } => cmd_status(&origin).await,

        Commands::Reload { origin } => cmd_reload(&origin).await,
    }
}

/// Run a server until killed.
async fn cmd_serve(
    bind: SocketAddr,
    content_root: PathBuf,
    origin: Option<String>,
    profiles_file: Option<PathBuf>,
    interval: u64,
) -> Result<()> {
    let mut config = ServerConfig::new(bind, content_root).with_interval_secs(interval);
    if let Some(origin) = origin {
        config = config.with_origin(origin);
    }
    if let Some(path) = profiles_file {
        config = config.with_profiles_file(path);
    }

    packmirror_server::run(config).await.context("server failed")
}

/// Mirror the whole tree.
async fn cmd_pull(dest: &Path, origins: &[String], keep: Vec<String>) -> Result<()> {
    info!("Pulling whole tree into {}", dest.display());

    let policy = SyncPolicy::mirror().with_skip(keep);
    run_sync(origins, dest, &policy).await
}

/// Update one game folder subtree.
async fn cmd_update(
    dest: &Path,
    origins: &[String],
    game_folder: &str,
    keep: Vec<String>,
) -> Result<()> {
    info!("Updating game folder '{}' at {}", game_folder, dest.display());

    let subtree = TreePath::root()
        .join("gameFolders")
        .and_then(|p| p.join(game_folder))
        .context("Invalid game folder name")?;

    let policy = SyncPolicy::game_folder(subtree, keep);
    run_sync(origins, dest, &policy).await
}

/// Reconcile `dest` against the first healthy origin, logging progress.
async fn run_sync(origins: &[String], dest: &Path, policy: &SyncPolicy) -> Result<()> {
    let progress = Arc::new(ProgressTracker::new());
    let watcher = tokio::spawn(watch_progress(progress.clone()));

    let outcome = sync_with_failover(origins, HttpOrigin::new, dest, policy, &progress).await;
    watcher.abort();

    let outcome = outcome.context("All origins failed")?;
    println!(
        "Synced from {}: {} fetched, {} deleted, {} directories created",
        outcome.origin,
        outcome.stats.files_fetched,
        outcome.stats.files_deleted,
        outcome.stats.dirs_created
    );

    Ok(())
}

/// Log the completion percentage each time it changes.
async fn watch_progress(progress: Arc<ProgressTracker>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut last = None;

    loop {
        ticker.tick().await;
        if progress.total() == 0 {
            continue;
        }

        let percent = progress.percent();
        if last != Some(percent) {
            info!(
                "progress: {}% ({}/{})",
                percent,
                progress.completed(),
                progress.total()
            );
            last = Some(percent);
        }
    }
}

/// Show a server's version and published profiles.
async fn cmd_status(origin: &str) -> Result<()> {
    let peer = HttpOrigin::new(origin)?;

    let version = peer.version().await.context("Failed to query version")?;
    let profiles = peer
        .fetch_profiles()
        .await
        .context("Failed to fetch profiles")?;

    println!("Server {} (version {})", origin, version);
    if profiles.is_empty() {
        println!("  no published profiles");
        return Ok(());
    }

    for profile in profiles {
        match &profile.game_folder {
            Some(folder) => {
                let files = peer
                    .file_count(folder)
                    .await
                    .with_context(|| format!("Failed to count files for '{}'", folder))?;
                println!("  {} (mc {}): {} files", profile.name, profile.version.mc, files);
            }
            None => println!("  {} (mc {})", profile.name, profile.version.mc),
        }
    }

    Ok(())
}

/// Trigger a rebuild/reconcile cycle on a server.
async fn cmd_reload(origin: &str) -> Result<()> {
    let peer = HttpOrigin::new(origin)?;
    peer.reload().await.context("Reload request failed")?;

    println!("Reload triggered on {}", origin);
    Ok(())
}

/// Print the fingerprint tree of a directory.
async fn cmd_hash(path: &Path) -> Result<()> {
    let tree = TreeBuilder::new()
        .build(path)
        .await
        .context("Failed to fingerprint directory")?;

    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}
