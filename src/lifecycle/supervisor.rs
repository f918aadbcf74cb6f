//! Concurrent daemon startup.
//!
//! The supervisor launches every requested daemon on its own task and
//! waits until each of them has reported exactly once. Reports are handed
//! over a channel whose only consumer is the waiting caller, which counts
//! them down; no state is shared between daemons.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::context::Context;
use crate::lifecycle::daemon::{DaemonError, DaemonRegistry};

/// Outcome of one daemon's start.
#[derive(Debug)]
pub struct DaemonReport {
    pub name: String,
    pub outcome: Result<(), DaemonError>,
}

impl DaemonReport {
    pub fn is_ready(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Everything observed during one supervisor run.
#[derive(Debug, Default)]
pub struct SupervisorReport {
    /// One entry per launched daemon, in completion order.
    pub reports: Vec<DaemonReport>,
    /// Requested names that were not launched (unknown or repeated).
    pub skipped: Vec<String>,
}

impl SupervisorReport {
    pub fn ready(&self) -> impl Iterator<Item = &DaemonReport> {
        self.reports.iter().filter(|r| r.is_ready())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DaemonReport> {
        self.reports.iter().filter(|r| !r.is_ready())
    }

    pub fn all_ready(&self) -> bool {
        self.reports.iter().all(DaemonReport::is_ready)
    }

    /// Whether anything is left running once startup has settled.
    pub fn any_ready(&self) -> bool {
        self.ready().next().is_some()
    }

    pub fn launched(&self) -> usize {
        self.reports.len()
    }

    pub fn get(&self, name: &str) -> Option<&DaemonReport> {
        self.reports.iter().find(|r| r.name == name)
    }
}

/// Starts a subset of the registry and waits for every start to report.
#[derive(Debug, Clone)]
pub struct Supervisor {
    registry: Arc<DaemonRegistry>,
}

impl Supervisor {
    pub fn new(registry: DaemonRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &DaemonRegistry {
        &self.registry
    }

    /// Launch each requested daemon concurrently and wait for all of them.
    ///
    /// Unknown names are skipped with a warning; so are repeats of a name
    /// already launched. When nothing is launched the call returns
    /// immediately. A failing daemon does not affect the others.
    pub async fn run<S: AsRef<str>>(&self, ctx: &Context, names: &[S]) -> SupervisorReport {
        let (tx, mut rx) = mpsc::unbounded_channel::<DaemonReport>();
        let mut launched = HashSet::new();
        let mut report = SupervisorReport::default();
        let mut pending = 0usize;

        for name in names.iter().map(|n| n.as_ref()) {
            let Some(entry) = self.registry.get(name) else {
                tracing::warn!(daemon = %name, "Unknown daemon, skipping");
                report.skipped.push(name.to_string());
                continue;
            };
            if !launched.insert(name.to_string()) {
                tracing::warn!(daemon = %name, "Daemon requested twice, skipping repeat");
                report.skipped.push(name.to_string());
                continue;
            }

            pending += 1;
            tracing::debug!(daemon = %name, "Starting daemon");

            let tx = tx.clone();
            let ctx = ctx.clone();
            let name = name.to_string();
            tokio::spawn(async move {
                let outcome = match tokio::spawn(entry.start(ctx)).await {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_panic() => Err(DaemonError::Panicked(panic_message(e))),
                    Err(e) => Err(DaemonError::Failed(e.to_string())),
                };
                let _ = tx.send(DaemonReport { name, outcome });
            });
        }
        drop(tx);

        while pending > 0 {
            let Some(daemon) = rx.recv().await else {
                break;
            };
            pending -= 1;

            match &daemon.outcome {
                Ok(()) => tracing::info!(daemon = %daemon.name, "Daemon ready"),
                Err(e) => {
                    tracing::error!(daemon = %daemon.name, error = %e, "Daemon failed to start")
                }
            }
            report.reports.push(daemon);
        }

        tracing::debug!(
            launched = report.launched(),
            skipped = report.skipped.len(),
            "All daemons reported"
        );
        report
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::daemon::DaemonEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    const PROMPT: Duration = Duration::from_secs(2);

    fn registry(entries: Vec<DaemonEntry>) -> Supervisor {
        let mut registry = DaemonRegistry::new();
        for entry in entries {
            registry.register(entry).unwrap();
        }
        Supervisor::new(registry)
    }

    #[tokio::test]
    async fn single_ready_daemon_completes() {
        let supervisor = registry(vec![DaemonEntry::from_flag("core", |_ctx| async { true })]);

        let report = timeout(PROMPT, supervisor.run(&Context::default(), &["core"]))
            .await
            .expect("supervisor should finish");

        assert_eq!(report.launched(), 1);
        assert!(report.all_ready());
    }

    #[tokio::test]
    async fn failure_does_not_block_completion() {
        let supervisor = registry(vec![
            DaemonEntry::from_flag("core", |_ctx| async { false }),
            DaemonEntry::from_flag("node", |_ctx| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                true
            }),
        ]);

        let report = timeout(PROMPT, supervisor.run(&Context::default(), &["core", "node"]))
            .await
            .expect("supervisor should finish");

        assert_eq!(report.launched(), 2);
        assert!(!report.get("core").unwrap().is_ready());
        assert!(report.get("node").unwrap().is_ready());
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.ready().count(), 1);
    }

    #[tokio::test]
    async fn waits_for_every_daemon() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
        let supervisor = registry(vec![
            DaemonEntry::from_flag("api", |_ctx| async { true }),
            DaemonEntry::from_flag("discovery", move |_ctx| {
                let release_rx = Arc::clone(&release_rx);
                async move {
                    if let Some(rx) = release_rx.lock().await.take() {
                        let _ = rx.await;
                    }
                    true
                }
            }),
        ]);

        let ctx = Context::default();
        let run = supervisor.run(&ctx, &["api", "discovery"]);
        tokio::pin!(run);

        assert!(timeout(Duration::from_millis(100), &mut run).await.is_err());

        release_tx.send(()).unwrap();
        let report = timeout(PROMPT, run).await.expect("supervisor should finish");
        assert_eq!(report.launched(), 2);
    }

    #[tokio::test]
    async fn unknown_names_return_immediately() {
        let supervisor = registry(vec![DaemonEntry::from_flag("core", |_ctx| async { true })]);

        let report = timeout(PROMPT, supervisor.run(&Context::default(), &["bogus"]))
            .await
            .expect("empty effective set must not hang");

        assert_eq!(report.launched(), 0);
        assert_eq!(report.skipped, vec!["bogus".to_string()]);
        assert!(!supervisor.registry().get("core").unwrap().is_started());
    }

    #[tokio::test]
    async fn empty_request_returns_immediately() {
        let supervisor = registry(vec![]);
        let names: [&str; 0] = [];
        let report = timeout(PROMPT, supervisor.run(&Context::default(), &names))
            .await
            .unwrap();
        assert_eq!(report.launched(), 0);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn unknown_names_mixed_with_known() {
        let supervisor = registry(vec![DaemonEntry::from_flag("node", |_ctx| async { true })]);

        let report = timeout(PROMPT, supervisor.run(&Context::default(), &["bogus", "node"]))
            .await
            .unwrap();

        assert_eq!(report.launched(), 1);
        assert_eq!(report.skipped, vec!["bogus".to_string()]);
    }

    #[tokio::test]
    async fn repeated_name_starts_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let supervisor = registry(vec![DaemonEntry::from_flag("api", move |_ctx| {
            counted.fetch_add(1, Ordering::SeqCst);
            async { true }
        })]);

        let report = timeout(PROMPT, supervisor.run(&Context::default(), &["api", "api"]))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.launched(), 1);
        assert_eq!(report.skipped, vec!["api".to_string()]);
    }

    #[tokio::test]
    async fn any_ready_needs_one_running_daemon() {
        let supervisor = registry(vec![
            DaemonEntry::from_flag("core", |_ctx| async { false }),
            DaemonEntry::from_flag("node", |_ctx| async { true }),
        ]);
        let ctx = Context::default();

        let report = supervisor.run(&ctx, &["core"]).await;
        assert!(!report.any_ready());

        let report = supervisor.run(&ctx, &["bogus"]).await;
        assert!(!report.any_ready());

        let report = supervisor.run(&ctx, &["node"]).await;
        assert!(report.any_ready());
    }

    fn explode() -> Result<(), DaemonError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panicking_daemon_is_reported() {
        let supervisor = registry(vec![
            DaemonEntry::new("core", |_ctx| async { explode() }),
            DaemonEntry::from_flag("node", |_ctx| async { true }),
        ]);

        let report = timeout(PROMPT, supervisor.run(&Context::default(), &["core", "node"]))
            .await
            .unwrap();

        match &report.get("core").unwrap().outcome {
            Err(DaemonError::Panicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(report.get("node").unwrap().is_ready());
    }

    #[tokio::test]
    async fn daemons_start_concurrently() {
        let gate = Arc::new(tokio::sync::Barrier::new(2));
        let entries = ["api", "core"]
            .into_iter()
            .map(|name| {
                let gate = Arc::clone(&gate);
                DaemonEntry::from_flag(name, move |_ctx| {
                    let gate = Arc::clone(&gate);
                    async move {
                        gate.wait().await;
                        true
                    }
                })
            })
            .collect();
        let supervisor = registry(entries);

        let report = timeout(PROMPT, supervisor.run(&Context::default(), &["api", "core"]))
            .await
            .expect("both daemons must be running at once to pass the barrier");
        assert!(report.all_ready());
    }
}
