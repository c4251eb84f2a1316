//! # poolsync
//!
//! Command-line client for a pool controller.
//!
//! ## Commands
//!
//! - `config`: Show or change the saved controller address and units
//! - `fetch`: Print the controller's current state
//! - `watch`: Follow the controller live until interrupted
//! - `send`: Send a raw command to an endpoint
//! - `toggle`, `setpoint`, `heat-mode`, `pump-speed`: Typed commands
//!
//! ## Example
//!
//! ```bash
//! # Point at the controller
//! poolsync config set --host 192.168.1.20 --port 4200
//!
//! # Follow state changes for a minute
//! poolsync watch --duration 60
//!
//! # Flip the spa
//! poolsync toggle circuit 1
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_client::Timing;

mod commands;
mod config;
mod logging;

use commands::control::Switch;
use commands::{build_client, config as config_cmd, control, fetch, send, watch};
use config::{Preferences, Units};

/// Command-line client for a pool controller.
#[derive(Parser, Debug)]
#[command(name = "poolsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for saved preferences
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML file with a [timing] table of timer overrides
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or change saved preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the controller's current state
    Fetch {
        /// Print the full JSON document instead of a summary
        #[arg(long)]
        raw: bool,
    },

    /// Follow the controller live
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Send a raw command
    Send {
        /// Endpoint, e.g. /state/circuit/setState
        endpoint: String,

        /// JSON object body, e.g. '{"id":6,"state":true}'
        #[arg(default_value = "{}")]
        params: String,
    },

    /// Flip a circuit or feature
    Toggle {
        /// Entity kind
        #[arg(value_enum)]
        kind: Switch,

        /// Entity id
        id: i64,
    },

    /// Set a body's heat setpoint
    Setpoint {
        /// Body id
        body_id: i64,

        /// Setpoint in the configured units
        value: f64,
    },

    /// Set a body's heat mode
    HeatMode {
        /// Body id
        body_id: i64,

        /// Controller heat mode value
        mode: i64,
    },

    /// Set a pump's speed
    PumpSpeed {
        /// Pump id
        pump_id: i64,

        /// Speed in rpm
        rpm: u32,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print saved preferences
    Show,

    /// Change saved preferences
    Set {
        /// Controller host name or address
        #[arg(long)]
        host: Option<String>,

        /// Controller port
        #[arg(long)]
        port: Option<u16>,

        /// Use https/wss
        #[arg(long)]
        tls: Option<bool>,

        /// Temperature units
        #[arg(long, value_enum)]
        units: Option<Units>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    if let Commands::Config { action } = cli.command {
        return match action {
            ConfigAction::Show => config_cmd::show(&data_dir).await,
            ConfigAction::Set {
                host,
                port,
                tls,
                units,
            } => {
                let update = config_cmd::Update {
                    host,
                    port,
                    tls,
                    units,
                };
                config_cmd::set(&data_dir, update).await
            }
        };
    }

    let prefs = Preferences::load(&data_dir).await?;
    let timing = load_timing(cli.config.as_deref())?;
    let client = build_client(prefs.client_config(timing))?;
    tracing::debug!("controller at {}", client.config().base_url());

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Fetch { raw } => fetch::run(&client, prefs.units, raw).await?,
        Commands::Watch { duration } => {
            watch::run(&client, prefs.units, duration.map(Duration::from_secs)).await?;
        }
        Commands::Send { endpoint, params } => send::run(&client, &endpoint, &params).await?,
        Commands::Toggle { kind, id } => control::toggle(&client, kind, id).await?,
        Commands::Setpoint { body_id, value } => {
            control::setpoint(&client, body_id, value, prefs.units).await?;
        }
        Commands::HeatMode { body_id, mode } => control::heat_mode(&client, body_id, mode).await?,
        Commands::PumpSpeed { pump_id, rpm } => control::pump_speed(&client, pump_id, rpm).await?,
    }

    Ok(())
}

/// Timer settings from `--config`, or the defaults.
fn load_timing(path: Option<&Path>) -> Result<Timing> {
    match path {
        Some(path) => Ok(Timing::from_file(path)?),
        None => Ok(Timing::default()),
    }
}

/// Get the default data directory for poolsync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "poolsync", "poolsync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
