//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! endpoint + RouteTable
//!     → tls.rs (load certificate and key, offer http/1.1 over ALPN)
//!     → listener.rs (bind, then serve on a spawned task)
//!     → axum-server accepts connections, one task each
//! ```
//!
//! # Design Decisions
//! - TLS is mandatory
//! - Binding happens before the serving task is spawned so bind errors
//!   reach the caller
//! - Per-connection resource use is bounded by timeouts, not a connection cap

pub mod listener;
pub mod tls;

pub use listener::{listen, listen_with, ListenerError, ServerHandle};
pub use tls::{load_tls_config, TlsError};
