//! # Tally Server
//!
//! ```bash
//! # defaults, or the platform tally.toml if present
//! cargo run -p tally-server
//!
//! # explicit config file (or TALLY_CONFIG)
//! cargo run -p tally-server -- --config ./tally.toml
//!
//! # environment overrides
//! TALLY_PORT=8080 TALLY_DB_PATH=./data/tally.db cargo run -p tally-server
//! ```

use anyhow::Context;
use clap::Parser;
use std::future::IntoFuture;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tally_core::BusinessClock;
use tally_db::{Database, DbConfig};
use tally_server::{router, AppState, BackgroundTasks, DailyReportScheduler, TallyConfig};

/// How often the background tasks are checked for an early exit.
const TASK_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// `tally-server` command arguments.
#[derive(Debug, Parser)]
#[command(name = "tally-server", about = "Tally POS transaction ledger", version)]
struct Cli {
    /// Path to `tally.toml`. Defaults to the platform config directory.
    #[arg(short, long, env = "TALLY_CONFIG", value_name = "path")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Starting Tally POS ledger...");

    let config = TallyConfig::load(cli.config).context("Failed to load configuration")?;
    let tz = config.timezone()?;
    let cutover = config.cutover()?;
    info!(
        addr = %config.server.address(),
        db = %config.database.path.display(),
        timezone = %tz,
        cutover = %cutover,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database.path))
        .await
        .context("Failed to open database")?;
    let clock = BusinessClock::system(tz);
    let state = AppState::new(db.clone(), clock.clone(), config.clone())?;

    let mut tasks = BackgroundTasks::new();
    if config.reports.scheduler_enabled {
        let scheduler = DailyReportScheduler::new(
            state.runner.clone(),
            clock,
            cutover,
            config.reports.catch_up_days,
            tasks.shutdown_token(),
        );
        tasks.spawn("daily_report_scheduler", scheduler.run());
    } else {
        info!("Daily report scheduler disabled by configuration");
    }

    let listener = TcpListener::bind(config.server.address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.address()))?;
    info!(addr = %config.server.address(), "HTTP server listening");

    let server = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        result = server => result.context("HTTP server failed")?,
        _ = watch_tasks(&tasks) => {}
    }

    tasks.shutdown().await;
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Logs any background task that exited while the server is still up.
async fn watch_tasks(tasks: &BackgroundTasks) {
    let mut interval = tokio::time::interval(TASK_CHECK_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if tasks.check_health() > 0 {
            error!("Background tasks stopped; restart the server to resume daily reports");
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
