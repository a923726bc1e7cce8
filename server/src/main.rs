// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # kas Server
//!
//! Entry point for the `kas-server` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the fund database, and serves
//! the HTTP JSON API alongside a Prometheus metrics endpoint.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the API server
//! - `init`    — initialize the data directory and seat the first admin
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use kas_ledger::member::{Role, User};
use kas_ledger::storage::db::KasDb;

use cli::{Commands, KasServerCli};
use logging::LogFormat;
use metrics::FundMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = KasServerCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Init(args) => init_data_dir(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full server: API listener and metrics listener.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "kas_server=info,kas_ledger=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting kas-server"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = Arc::new(
        KasDb::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Metrics ---
    let fund_metrics = Arc::new(FundMetrics::new());
    match kas_ledger::ledger::summary::balance(&db) {
        Ok(balance) => fund_metrics.fund_balance.set(balance),
        Err(e) => tracing::warn!("failed to compute startup balance: {}", e),
    }

    // --- Application state ---
    let app_state = api::AppState {
        version: kas_ledger::config::SERVICE_VERSION.to_string(),
        db: Arc::clone(&db),
        metrics: Arc::clone(&fund_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&fund_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    db.flush().context("failed to flush database on shutdown")?;
    tracing::info!("kas-server stopped");
    Ok(())
}

/// Initializes the data directory and seats the first administrator.
///
/// Idempotent on the directory, not on the admin: running `init` twice
/// seats two administrators, which is occasionally exactly what you want
/// and otherwise harmless.
fn init_data_dir(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("kas_server=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing data directory");

    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = KasDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    let admin = User::new(args.admin_name.clone(), Role::Admin);
    db.put_user(&admin).context("failed to seat administrator")?;
    db.flush().context("failed to flush database")?;

    tracing::info!(admin_id = %admin.id, "administrator seated");

    println!("Fund initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Administrator  : {}", admin.full_name);
    println!("  Admin user id  : {}", admin.id);
    println!();
    println!("Pass the admin user id as `reviewer` on privileged API calls.");

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("kas-server {}", env!("CARGO_PKG_VERSION"));
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
