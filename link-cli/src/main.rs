//! # pairlink
//!
//! CLI tool for pairing this device with a phone.
//!
//! ## Commands
//!
//! - `pair`: Show pairing codes until a phone scans one
//! - `status`: Show the stored device identity
//! - `logout`: Forget the stored device identity
//!
//! The pairing server is simulated in-process, so the whole flow can be
//! exercised without a network.
//!
//! ## Example
//!
//! ```bash
//! # Show codes; the simulated phone scans the second one
//! pairlink pair --scan-after 2
//!
//! # Show codes until they run out
//! pairlink pair
//!
//! # Inspect and remove the identity
//! pairlink status
//! pairlink logout
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `pairlink=info`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod simulator;

use commands::{logout, pair, status};
use config::CliConfig;

/// CLI tool for pairing this device with a phone.
#[derive(Parser, Debug)]
#[command(name = "pairlink")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for storing the device identity
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (default: <data-dir>/pairlink.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show pairing codes until a phone scans one
    Pair {
        /// Simulate the phone scanning the N-th code (1-based)
        #[arg(long, value_name = "N")]
        scan_after: Option<usize>,
    },

    /// Show the stored device identity
    Status,

    /// Forget the stored device identity
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

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

    let config = CliConfig::load(cli.config.as_deref(), &data_dir)?;

    match cli.command {
        Commands::Pair { scan_after } => {
            pair::run(&data_dir, &config, scan_after).await?;
        }
        Commands::Status => {
            status::run(&data_dir).await?;
        }
        Commands::Logout => {
            logout::run(&data_dir).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pairlink=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for pairlink.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "ydun", "pairlink")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
