//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML)
//!     → loader.rs (resolve path, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → shared via Context to the supervisor and every daemon
//! ```
//!
//! # Design Decisions
//! - Settings are read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, ConfigError, DEFAULT_CONFIG_PATH};
pub use schema::{ServiceSettings, Settings, TlsSettings};
