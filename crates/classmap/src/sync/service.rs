//! Background synchronization service
//!
//! One tokio task owns the [`Workspace`] and is the only writer. Source
//! events arrive over a channel, bursts are coalesced by [`DebounceState`],
//! and each run executes on the blocking pool while the task keeps
//! accepting edits. A run whose input was overtaken by newer edits is
//! dropped rather than committed.

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{self, JoinHandle};
use tokio::time;
use tracing::{debug, info, warn};

use super::debounce::DebounceState;
use super::pipeline::RunOutput;
use super::source::SourceEvent;
use super::workspace::Workspace;
use crate::diagram::DiagramStore;

/// Source events buffered before `notify` applies backpressure
const CHANNEL_CAPACITY: usize = 1024;

/// Observable state of a running service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    /// A run is executing
    pub running: bool,
    /// Events received since the last run started
    pub pending_events: usize,
    pub input_generation: u64,
    pub committed_generation: u64,
    /// Version of the committed graph
    pub version: u64,
    pub superseded_runs: u64,
    /// Diagnostics reported by the last commit
    pub diagnostics: usize,
    pub last_error: Option<String>,
}

impl ServiceStatus {
    fn refresh(&mut self, workspace: &Workspace, state: &DebounceState) {
        self.pending_events = state.pending();
        self.input_generation = workspace.input_generation();
        self.committed_generation = workspace.committed_generation();
        self.version = workspace.graph().version();
    }

    /// Every received edit is reflected in the committed diagram
    pub fn is_idle(&self) -> bool {
        !self.running && self.pending_events == 0 && self.input_generation == self.committed_generation
    }
}

enum ServiceMessage {
    Event(SourceEvent),
    Flush(oneshot::Sender<ServiceStatus>),
    Shutdown,
}

/// Handle to a running synchronization task
pub struct SyncService {
    tx: mpsc::Sender<ServiceMessage>,
    status: watch::Receiver<ServiceStatus>,
    store: DiagramStore,
    task: Option<JoinHandle<Workspace>>,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl SyncService {
    /// Spawn the service task on the current tokio runtime
    pub fn start(workspace: Workspace) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut initial = ServiceStatus::default();
        initial.refresh(&workspace, &DebounceState::new(Default::default(), Default::default()));
        let (status_tx, status) = watch::channel(initial);
        let store = workspace.store();

        let task = tokio::spawn(run_loop(workspace, rx, status_tx));
        info!("Sync service started");

        Self {
            tx,
            status,
            store,
            task: Some(task),
        }
    }

    /// Diagram store of the owned workspace
    pub fn store(&self) -> DiagramStore {
        self.store.clone()
    }

    pub fn status(&self) -> ServiceStatus {
        self.status.borrow().clone()
    }

    pub fn status_stream(&self) -> watch::Receiver<ServiceStatus> {
        self.status.clone()
    }

    /// Queue a source event
    pub async fn notify(&self, event: SourceEvent) -> Result<()> {
        self.tx
            .send(ServiceMessage::Event(event))
            .await
            .map_err(|_| anyhow!("sync service has stopped"))
    }

    /// Run immediately and wait until every queued event is committed
    pub async fn flush(&self) -> Result<ServiceStatus> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(ServiceMessage::Flush(done_tx))
            .await
            .map_err(|_| anyhow!("sync service has stopped"))?;
        done_rx
            .await
            .map_err(|_| anyhow!("sync service stopped before flushing"))
    }

    /// Stop the task and take the workspace back
    pub async fn shutdown(mut self) -> Result<Workspace> {
        let _ = self.tx.send(ServiceMessage::Shutdown).await;
        let task = self
            .task
            .take()
            .ok_or_else(|| anyhow!("sync service already shut down"))?;
        let workspace = task.await?;
        info!("Sync service stopped");
        Ok(workspace)
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.try_send(ServiceMessage::Shutdown);
        }
    }
}

async fn run_loop(
    mut workspace: Workspace,
    mut rx: mpsc::Receiver<ServiceMessage>,
    status_tx: watch::Sender<ServiceStatus>,
) -> Workspace {
    let config = workspace.config().clone();
    let mut state = DebounceState::new(config.quiescence(), config.max_batch_wait());
    let mut status = status_tx.borrow().clone();
    let mut in_flight: Option<JoinHandle<RunOutput>> = None;
    let mut waiters: Vec<oneshot::Sender<ServiceStatus>> = Vec::new();

    if workspace.is_dirty() {
        state.record_event();
    }

    loop {
        let next_deadline = state.next_deadline();

        tokio::select! {
            message = rx.recv() => match message {
                Some(ServiceMessage::Event(event)) => match workspace.apply_event(event) {
                    Ok(()) => state.record_event(),
                    Err(error) => {
                        warn!(%error, "Ignored source event");
                        status.last_error = Some(error.to_string());
                    }
                },
                Some(ServiceMessage::Flush(done)) => {
                    waiters.push(done);
                    if state.should_run() || workspace.is_dirty() {
                        state.force_run();
                    }
                }
                Some(ServiceMessage::Shutdown) | None => break,
            },
            () = async {
                if let Some(deadline) = next_deadline {
                    time::sleep_until(deadline).await;
                }
            }, if in_flight.is_none() && state.should_run() && next_deadline.is_some() => {
                state.reset();
                let input = workspace.begin_run();
                debug!(generation = input.generation(), files = input.file_count(), "Starting run");
                in_flight = Some(task::spawn_blocking(move || input.execute()));
                status.running = true;
            }
            joined = async {
                match in_flight.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                status.running = false;
                match joined {
                    Ok(output) => match workspace.commit(output) {
                        Ok(report) => {
                            status.last_error = None;
                            status.diagnostics = report.diagnostics.len();
                        }
                        Err(error) if error.is_superseded() => {
                            debug!(%error, "Run superseded");
                            status.superseded_runs += 1;
                        }
                        Err(error) => {
                            warn!(%error, "Commit failed");
                            status.last_error = Some(error.to_string());
                        }
                    },
                    Err(error) => {
                        warn!(%error, "Run task failed");
                        status.last_error = Some(error.to_string());
                    }
                }
            }
        }

        status.refresh(&workspace, &state);
        status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status.clone();
                true
            }
        });

        if in_flight.is_none() && !state.should_run() && !workspace.is_dirty() {
            for waiter in waiters.drain(..) {
                let _ = waiter.send(status.clone());
            }
        }
    }

    if let Some(handle) = in_flight {
        // the blocking run finishes on its own; its output is never committed
        handle.abort();
    }
    status.running = false;
    status_tx.send_replace(status);
    workspace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Database, SyncConfig};

    fn fast_workspace() -> Workspace {
        Workspace::new(SyncConfig {
            quiescence_ms: 10,
            max_batch_wait_ms: 50,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_flush_commits_queued_events() {
        let service = SyncService::start(fast_workspace());
        service
            .notify(SourceEvent::Created {
                path: "animal.ts".into(),
                content: "export class Animal {}".into(),
            })
            .await
            .unwrap();
        service
            .notify(SourceEvent::Created {
                path: "dog.ts".into(),
                content: "import { Animal } from './animal';\nclass Dog extends Animal {}".into(),
            })
            .await
            .unwrap();

        let status = service.flush().await.unwrap();
        assert!(status.is_idle());
        assert_eq!(status.input_generation, 2);

        let diagram = service.store().current_diagram();
        assert_eq!(diagram.node_count(), 2);
        assert_eq!(diagram.edge_count(), 1);

        let workspace = service.shutdown().await.unwrap();
        assert_eq!(workspace.graph().symbol_count(), 2);
    }

    #[tokio::test]
    async fn test_flush_on_idle_service_returns() {
        let service = SyncService::start(fast_workspace());
        let status = service.flush().await.unwrap();
        assert!(status.is_idle());
        assert_eq!(status.version, 0);
    }

    #[tokio::test]
    async fn test_bad_event_is_reported_not_fatal() {
        let service = SyncService::start(fast_workspace());
        service
            .notify(SourceEvent::Deleted {
                path: "missing.ts".into(),
            })
            .await
            .unwrap();
        let status = service.flush().await.unwrap();
        assert!(status.last_error.unwrap().contains("missing.ts"));
        assert!(service.notify(SourceEvent::Created {
            path: "a.ts".into(),
            content: "class A {}".into(),
        })
        .await
        .is_ok());
    }
}
