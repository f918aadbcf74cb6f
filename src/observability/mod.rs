//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, stderr)
//!
//! Every HTTP listener produces:
//!     → access_log.rs (one common-log line per request, stdout)
//! ```
//!
//! # Design Decisions
//! - Diagnostics go through `tracing`; access lines bypass it so their
//!   format stays fixed regardless of the subscriber
//! - Verbosity is chosen once at startup from the settings file

pub mod access_log;
pub mod logging;

pub use access_log::{AccessLog, AccessRecord};
