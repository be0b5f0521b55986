//! Layout adapter: change sets to diagram mutations
//!
//! Only nodes named by an event are touched. A node keeps its position for
//! as long as its symbol exists.

use std::sync::Arc;

use tracing::{debug, span, trace, Level};

use super::model::{DiagramEdge, DiagramModel, DiagramNode};
use super::placement::{GridPlacement, Placement};
use crate::core::{Database, LayoutConfig};
use crate::graph::{ChangeEvent, ChangeSet, EntityGraph};

/// Applies [`ChangeSet`]s to a [`DiagramModel`]
#[derive(Clone)]
pub struct LayoutAdapter {
    layout: LayoutConfig,
    placement: Arc<dyn Placement>,
}

impl std::fmt::Debug for LayoutAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutAdapter")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Default for LayoutAdapter {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutAdapter {
    /// Adapter placing new nodes on a [`GridPlacement`]
    pub fn new(layout: LayoutConfig) -> Self {
        let placement = Arc::new(GridPlacement::new(layout.clone()));
        Self { layout, placement }
    }

    pub fn with_placement(layout: LayoutConfig, placement: impl Placement + 'static) -> Self {
        Self {
            layout,
            placement: Arc::new(placement),
        }
    }

    /// Next diagram after `changes`, leaving `previous` untouched
    pub fn apply(&self, previous: &DiagramModel, changes: &ChangeSet) -> DiagramModel {
        let mut next = previous.clone();
        self.apply_in_place(&mut next, changes);
        next
    }

    /// Apply `changes` in phases: node removals, additions, modifications,
    /// then edge removals and additions
    pub fn apply_in_place(&self, model: &mut DiagramModel, changes: &ChangeSet) {
        let apply_span = span!(
            Level::DEBUG,
            "apply_layout",
            events = changes.len(),
            version = changes.to_version
        );
        let _enter = apply_span.enter();

        for event in changes.iter() {
            if let ChangeEvent::SymbolRemoved { qualified_name } = event {
                if model.remove_node(qualified_name).is_none() {
                    trace!(id = %qualified_name, "Removed node was not in diagram");
                }
            }
        }

        for event in changes.iter() {
            if let ChangeEvent::SymbolAdded { symbol } = event {
                if let Some(node) = model.node_mut(&symbol.qualified_name) {
                    node.refresh(symbol, &self.layout);
                    continue;
                }
                let mut node = DiagramNode::from_symbol(symbol, &self.layout);
                let (x, y) = self.placement.place(model, node.width, node.height);
                node.x = x;
                node.y = y;
                trace!(id = %node.id, x, y, "Placed node");
                if let Err(error) = model.add_node(node) {
                    debug!(%error, "Failed to add node");
                }
            }
        }

        for event in changes.iter() {
            if let ChangeEvent::SymbolModified { symbol } = event {
                match model.node_mut(&symbol.qualified_name) {
                    Some(node) => node.refresh(symbol, &self.layout),
                    None => debug!(id = %symbol.qualified_name, "Modified symbol has no node"),
                }
            }
        }

        for event in changes.iter() {
            if let ChangeEvent::RelationshipRemoved { relationship } = event {
                model.remove_edge(&relationship.source, &relationship.target);
            }
        }

        for event in changes.iter() {
            if let ChangeEvent::RelationshipAdded { relationship } = event {
                if let Err(error) = model.add_edge(DiagramEdge::from_relationship(relationship)) {
                    debug!(%error, "Skipped edge");
                }
            }
        }

        model.version = changes.to_version;
        debug!(
            nodes = model.node_count(),
            edges = model.edge_count(),
            "Applied changes to diagram"
        );
    }

    /// Copy the flags that change detection ignores from `graph` onto
    /// existing nodes; sizes and positions stay as they are
    pub fn sync_flags(&self, model: &mut DiagramModel, graph: &EntityGraph) -> usize {
        let mut updated = 0;
        for symbol in graph.symbols() {
            let Some(node) = model.node_mut(&symbol.qualified_name) else {
                continue;
            };
            let is_abstract = symbol.modifiers.is_abstract;
            if node.conflicting != symbol.conflicting || node.is_abstract != is_abstract {
                node.conflicting = symbol.conflicting;
                node.is_abstract = is_abstract;
                updated += 1;
            }
        }
        if updated > 0 {
            debug!(updated, "Synced node flags");
        }
        updated
    }
}
