//! Bootstrap and serving backbone for the pandora subsystems.
//!
//! `kit` starts a chosen subset of named daemons concurrently and waits for
//! each to report readiness; the daemons expose their APIs through the
//! shared HTTP layer (route tables, middleware chains, CORS, TLS, static
//! files, access logging).

pub mod config;
pub mod context;
pub mod daemons;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::Settings;
pub use context::Context;
pub use lifecycle::{DaemonEntry, DaemonRegistry, Supervisor, SupervisorReport};
