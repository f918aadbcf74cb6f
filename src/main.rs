//! `kit`: start pandora daemons.
//!
//! # Startup
//!
//! ```text
//!   CLI args ──▶ settings file ──▶ logging ──▶ Context
//!                                                 │
//!                                                 ▼
//!                  ┌──────────────── Supervisor ────────────────┐
//!                  │   api     core     discovery     node      │
//!                  │    │       │          │            │       │
//!                  │    ▼       ▼          ▼            ▼       │
//!                  │  route table → HTTP layer → TLS listener   │
//!                  └──────────────── all reported ──────────────┘
//!                                                 │
//!                                                 ▼
//!                                 servers keep the process alive
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pandora::config::{self, DEFAULT_CONFIG_PATH};
use pandora::observability::logging;
use pandora::{daemons, Context, Supervisor};

#[derive(Parser)]
#[command(name = "kit")]
#[command(about = "Start pandora daemons", long_about = None)]
struct Cli {
    /// Daemons to start (default: all of api, core, discovery, node)
    names: Vec<String>,

    /// Path to the settings file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match config::load_settings(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            let _ = logging::init(false);
            tracing::error!(path = %cli.config.display(), error = %e, "Cannot load settings");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(settings.verbose) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "kit starting");

    let registry = match daemons::registry() {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!(error = %e, "Cannot build daemon registry");
            return ExitCode::FAILURE;
        }
    };

    let names = if cli.names.is_empty() {
        daemons::NAMES.iter().map(|n| n.to_string()).collect()
    } else {
        cli.names
    };

    let ctx = Context::new(settings);
    let report = Supervisor::new(registry).run(&ctx, names.as_slice()).await;

    tracing::info!(
        ready = report.ready().count(),
        failed = report.failed().count(),
        skipped = report.skipped.len(),
        "Startup complete"
    );

    if !report.any_ready() {
        tracing::error!("No daemon is running");
        return ExitCode::FAILURE;
    }

    std::future::pending::<()>().await;
    ExitCode::SUCCESS
}
