//! warden: membership tracking and ban enforcement for the game network.
//!
//! `warden run` keeps the maintenance scheduler alive until Ctrl-C. The
//! other subcommands perform one operation against the local store and exit.

mod commands;
mod config;
mod gamelist;
mod maintenance;
mod names;
mod scan;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<Mutex<Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
}

impl DaemonState {
    pub fn new(conn: Connection, config: DaemonConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "warden", version, about = "Game network membership warden")]
struct Cli {
    /// Configuration file (default: $WARDEN_DATA_DIR/config.toml or ~/.warden/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run scan, cleanup and reconciliation on schedule until interrupted.
    Run,
    /// Run one reconciliation pass.
    Reconcile,
    /// Purge expired sightings.
    Cleanup,
    /// Run the game-list binary once and record sightings.
    Scan,
    /// Ban a network address.
    Ban { address: IpAddr },
    /// Lift a ban.
    Unban { address: IpAddr },
    /// List banned addresses.
    Bans,
    /// Show one network member.
    Member { id: String },
    /// List stored network members.
    Members,
    /// Show sightings of a player.
    Player { name: String },
    /// Show sightings in a game.
    Game { name: String },
}

fn init_tracing(config: &DaemonConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load config
    let config = DaemonConfig::load(cli.config.as_deref())?;
    init_tracing(&config)?;

    // 2. Open database
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let conn = warden_db::open(&config.db_path())?;
    let state = Arc::new(DaemonState::new(conn, config));

    // 3. Dispatch
    let lines = match cli.command {
        Command::Run => {
            info!(data_dir = %data_dir.display(), "Warden daemon starting");
            tokio::select! {
                result = maintenance::run(state.clone()) => result?,
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
            }
            info!("Daemon stopped");
            Vec::new()
        }
        Command::Reconcile => commands::jobs::reconcile(&state).await?,
        Command::Cleanup => commands::jobs::cleanup(&state).await?,
        Command::Scan => commands::jobs::scan(&state).await?,
        Command::Ban { address } => commands::moderation::ban(&state, address).await?,
        Command::Unban { address } => commands::moderation::unban(&state, address).await?,
        Command::Bans => commands::moderation::bans(&state).await?,
        Command::Member { id } => commands::lookup::member(&state, &id).await?,
        Command::Members => commands::lookup::members(&state).await?,
        Command::Player { name } => commands::lookup::player(&state, &name).await?,
        Command::Game { name } => commands::lookup::game(&state, &name).await?,
    };

    for line in lines {
        println!("{line}");
    }
    Ok(())
}
