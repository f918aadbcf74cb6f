//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load settings → init logging → build Context
//!     → supervisor.rs resolves requested names against daemon.rs registry
//!     → every matching daemon starts concurrently
//!     → caller resumes once each one has reported
//! ```
//!
//! # Design Decisions
//! - The daemon set is static; unknown names are skipped, not fatal
//! - A daemon that fails to become ready never stops its siblings
//! - No start timeout: a start that never returns blocks the run

pub mod daemon;
pub mod supervisor;

pub use daemon::{DaemonEntry, DaemonError, DaemonRegistry};
pub use supervisor::{DaemonReport, Supervisor, SupervisorReport};
