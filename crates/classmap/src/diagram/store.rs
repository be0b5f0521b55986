//! Committed diagram state shared with the rendering layer
//!
//! The store holds the latest fully-applied [`DiagramModel`] behind a
//! `tokio::sync::watch` channel and announces every change on a broadcast
//! channel. Readers only ever observe complete snapshots.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use super::adapter::LayoutAdapter;
use super::model::DiagramModel;
use crate::core::{QualifiedName, SyncError};
use crate::graph::{ChangeEvent, ChangeSet, EntityGraph};

/// Updates buffered per subscriber before the slowest one starts lagging
const UPDATE_CAPACITY: usize = 256;

/// Notification sent to diagram subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramUpdate {
    /// A committed run changed the diagram
    Changed {
        version: u64,
        events: Arc<Vec<ChangeEvent>>,
    },
    /// The user moved a node
    NodeMoved { id: QualifiedName, x: f64, y: f64 },
}

struct StoreInner {
    snapshot: watch::Sender<Arc<DiagramModel>>,
    updates: broadcast::Sender<DiagramUpdate>,
}

/// Cloneable handle to the committed diagram
#[derive(Clone)]
pub struct DiagramStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for DiagramStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current_diagram();
        f.debug_struct("DiagramStore")
            .field("version", &current.version)
            .field("subscribers", &self.inner.updates.receiver_count())
            .finish()
    }
}

impl Default for DiagramStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(DiagramModel::new()));
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            inner: Arc::new(StoreInner { snapshot, updates }),
        }
    }

    /// Latest committed diagram
    pub fn current_diagram(&self) -> Arc<DiagramModel> {
        self.inner.snapshot.borrow().clone()
    }

    /// Stream of diagram updates from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DiagramUpdate> {
        self.inner.updates.subscribe()
    }

    /// Receiver that always yields the latest snapshot
    pub fn watch(&self) -> watch::Receiver<Arc<DiagramModel>> {
        self.inner.snapshot.subscribe()
    }

    /// Store a user-chosen node position; nothing is recomputed
    pub fn set_node_position(&self, id: &str, x: f64, y: f64) -> Result<(), SyncError> {
        let mut result = Ok(());
        self.inner.snapshot.send_if_modified(|snapshot| {
            result = Arc::make_mut(snapshot).set_position(id, x, y);
            result.is_ok()
        });
        result?;

        debug!(id, x, y, "Node moved");
        let _ = self.inner.updates.send(DiagramUpdate::NodeMoved {
            id: id.to_string(),
            x,
            y,
        });
        Ok(())
    }

    /// Apply a committed change set to the current diagram and publish it
    ///
    /// `graph` is the graph the change set leads to.
    pub(crate) fn commit(&self, adapter: &LayoutAdapter, changes: &ChangeSet, graph: &EntityGraph) {
        self.inner.snapshot.send_modify(|snapshot| {
            let model = Arc::make_mut(snapshot);
            adapter.apply_in_place(model, changes);
            adapter.sync_flags(model, graph);
        });

        if changes.is_empty() {
            return;
        }
        info!(version = changes.to_version, events = changes.len(), "Diagram updated");
        // no subscribers is fine
        let _ = self.inner.updates.send(DiagramUpdate::Changed {
            version: changes.to_version,
            events: Arc::new(changes.events.clone()),
        });
    }
}
