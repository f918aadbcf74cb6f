//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoints parse and are not shared between daemons
//! - Require TLS material whenever a listener is configured
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Settings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted into the system

use std::collections::HashMap;

use thiserror::Error;

use crate::config::schema::Settings;

/// A single semantic problem in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{daemon}: invalid endpoint {endpoint:?}")]
    InvalidEndpoint { daemon: String, endpoint: String },

    #[error("{daemon}: endpoint {endpoint} already used by {other}")]
    SharedEndpoint {
        daemon: String,
        other: String,
        endpoint: String,
    },

    #[error("tls.{0} is required when an endpoint is configured")]
    MissingTls(&'static str),

    #[error("{0}: static directory must not be empty")]
    EmptyStaticDir(String),
}

/// Check the settings, collecting every problem found.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen: HashMap<std::net::SocketAddr, &str> = HashMap::new();
    let mut listening = false;

    for (name, service) in settings.services() {
        if let Some(endpoint) = service.endpoint.as_deref() {
            listening = true;
            match endpoint.parse() {
                Ok(addr) => {
                    if let Some(other) = seen.insert(addr, name) {
                        errors.push(ValidationError::SharedEndpoint {
                            daemon: name.to_string(),
                            other: other.to_string(),
                            endpoint: endpoint.to_string(),
                        });
                    }
                }
                Err(_) => errors.push(ValidationError::InvalidEndpoint {
                    daemon: name.to_string(),
                    endpoint: endpoint.to_string(),
                }),
            }
        }

        if let Some(dir) = &service.static_dir {
            if dir.as_os_str().is_empty() {
                errors.push(ValidationError::EmptyStaticDir(name.to_string()));
            }
        }
    }

    if listening {
        if settings.tls.cert.as_os_str().is_empty() {
            errors.push(ValidationError::MissingTls("cert"));
        }
        if settings.tls.key.as_os_str().is_empty() {
            errors.push(ValidationError::MissingTls("key"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
