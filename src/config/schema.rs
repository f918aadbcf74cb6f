//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the YAML settings
//! file. Daemon sections are keyed by the daemon's registry name.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings for a `kit` run.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Enables debug-level logging.
    pub verbose: bool,

    /// Certificate material shared by every HTTP listener.
    pub tls: TlsSettings,

    pub api: ServiceSettings,
    pub core: ServiceSettings,
    pub discovery: ServiceSettings,
    pub node: ServiceSettings,
}

impl Settings {
    /// Look up the section for a daemon by its registry name.
    pub fn service(&self, name: &str) -> Option<&ServiceSettings> {
        match name {
            "api" => Some(&self.api),
            "core" => Some(&self.core),
            "discovery" => Some(&self.discovery),
            "node" => Some(&self.node),
            _ => None,
        }
    }

    /// Iterate over `(name, section)` pairs in a stable order.
    pub fn services(&self) -> impl Iterator<Item = (&'static str, &ServiceSettings)> {
        [
            ("api", &self.api),
            ("core", &self.core),
            ("discovery", &self.discovery),
            ("node", &self.node),
        ]
        .into_iter()
    }
}

/// TLS certificate and private key locations (PEM).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TlsSettings {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Per-daemon HTTP settings.
///
/// A daemon without an `endpoint` does not open a listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceSettings {
    /// Externally reachable address, also used as the bind address
    /// (e.g., "127.0.0.1:8443").
    pub endpoint: Option<String>,

    /// Directory served under `/static/`.
    #[serde(rename = "static")]
    pub static_dir: Option<PathBuf>,
}

impl ServiceSettings {
    /// Parse the endpoint as a socket address, if one is configured.
    pub fn socket_addr(&self) -> Option<Result<SocketAddr, std::net::AddrParseError>> {
        self.endpoint.as_deref().map(str::parse)
    }
}
