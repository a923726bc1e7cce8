//! # CLI Interface
//!
//! Defines the command-line argument structure for `kas-server` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kas_ledger::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// kas community cash fund server.
///
/// Serves the fund's HTTP JSON API: proof submission and review, ledger
/// summaries, membership requests, and notifications. Exposes Prometheus
/// metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "kas-server",
    about = "Community cash fund API server",
    version,
    propagate_version = true
)]
pub struct KasServerCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the kas server binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server.
    Run(RunArgs),
    /// Initialize a new data directory and seat the first administrator.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the data directory where the fund database is stored.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "KAS_DATA_DIR", default_value = "~/.kas")]
    pub data_dir: PathBuf,

    /// Port for the HTTP JSON API.
    #[arg(long, env = "KAS_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "KAS_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "KAS_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "KAS_DATA_DIR", default_value = "~/.kas")]
    pub data_dir: PathBuf,

    /// Display name for the first administrator account.
    #[arg(long, default_value = "Administrator")]
    pub admin_name: String,
}
