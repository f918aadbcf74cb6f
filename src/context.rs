//! Process-wide context handed to the supervisor, daemons, and listeners.

use std::sync::Arc;

use crate::config::{ServiceSettings, Settings};

/// Immutable startup state shared by every subsystem.
///
/// Built once in `main` after logging is initialized. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct Context {
    settings: Arc<Settings>,
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings section for the named daemon, if the name is known.
    pub fn service(&self, name: &str) -> Option<&ServiceSettings> {
        self.settings.service(name)
    }
}
