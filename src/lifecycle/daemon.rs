//! Named daemons and the static registry they live in.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::context::Context;
use crate::net::ListenerError;

/// Why a daemon did not reach its ready state.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Start returned a plain `false`.
    #[error("daemon reported not ready")]
    NotReady,

    #[error("daemon {0} was already started in this run")]
    AlreadyStarted(String),

    #[error("daemon {0} is already registered")]
    Duplicate(String),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("daemon start panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

type StartFn = dyn Fn(Context) -> BoxFuture<'static, Result<(), DaemonError>> + Send + Sync;

/// A named subsystem and the operation that brings it up.
///
/// `start` resolves once the daemon is operational (or has failed to become
/// so); long-running work must be left on spawned tasks. It may be invoked
/// at most once per entry.
pub struct DaemonEntry {
    name: String,
    start: Box<StartFn>,
    started: AtomicBool,
}

impl DaemonEntry {
    pub fn new<F, Fut>(name: impl Into<String>, start: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DaemonError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            start: Box::new(move |ctx: Context| -> BoxFuture<'static, Result<(), DaemonError>> {
                Box::pin(start(ctx))
            }),
            started: AtomicBool::new(false),
        }
    }

    /// Wrap a start operation that only reports a readiness flag.
    pub fn from_flag<F, Fut>(name: impl Into<String>, start: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self::new(name, move |ctx| {
            let ready = start(ctx);
            async move {
                if ready.await {
                    Ok(())
                } else {
                    Err(DaemonError::NotReady)
                }
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the start operation. A second call fails with `AlreadyStarted`.
    pub fn start(&self, ctx: Context) -> BoxFuture<'static, Result<(), DaemonError>> {
        if self.started.swap(true, Ordering::SeqCst) {
            let name = self.name.clone();
            return Box::pin(async move { Err(DaemonError::AlreadyStarted(name)) });
        }
        (self.start)(ctx)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for DaemonEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonEntry")
            .field("name", &self.name)
            .field("started", &self.is_started())
            .finish()
    }
}

/// Static mapping from daemon name to its entry.
#[derive(Debug, Default)]
pub struct DaemonRegistry {
    entries: BTreeMap<String, Arc<DaemonEntry>>,
}

impl DaemonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Names must be unique.
    pub fn register(&mut self, entry: DaemonEntry) -> Result<(), DaemonError> {
        if self.entries.contains_key(entry.name()) {
            return Err(DaemonError::Duplicate(entry.name().to_string()));
        }
        self.entries.insert(entry.name().to_string(), Arc::new(entry));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<DaemonEntry>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
