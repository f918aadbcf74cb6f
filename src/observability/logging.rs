//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Select the level from the `verbose` setting
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the settings file when present
//! - Events carry file and line of the call site

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "pandora=debug,kit=debug"
    } else {
        "pandora=info,kit=info"
    }
}

/// Install the global subscriber. Must run before any daemon starts.
///
/// Returns an error if a subscriber was already installed.
pub fn init(verbose: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(verbose).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
}
