//! Core database trait for keyed node/edge storage
//!
//! Both the entity graph and the diagram model are node/edge stores keyed by
//! qualified name. This trait gives them one interface so the layout adapter
//! and the tests can treat them alike.

use anyhow::Result;

/// Core trait for node/edge stores
///
/// The associated types let each store define its own node and edge
/// structures. Implementations keep nodes and edges in key order so iteration
/// is deterministic.
pub trait Database: Send + Sync {
    /// The node data type for this database
    type Node: Clone + Send + Sync;

    /// The edge data type for this database
    type Edge: Clone + Send + Sync;

    /// Add a node, replacing any node with the same key
    fn add_node(&mut self, node: Self::Node) -> Result<()>;

    /// Add an edge; both endpoints must already be present
    fn add_edge(&mut self, edge: Self::Edge) -> Result<()>;

    /// Remove a node and every edge touching it
    fn remove_node(&mut self, id: &str) -> Option<Self::Node>;

    /// Get a node by key
    fn get_node(&self, id: &str) -> Option<&Self::Node>;

    /// Iterate over all nodes in key order
    fn nodes(&self) -> impl Iterator<Item = &Self::Node>;

    /// Iterate over all edges in (source, target) order
    fn edges(&self) -> impl Iterator<Item = &Self::Edge>;

    /// Clear all data from the database
    fn clear(&mut self);

    /// Get the number of nodes
    fn node_count(&self) -> usize;

    /// Get the number of edges
    fn edge_count(&self) -> usize;
}
