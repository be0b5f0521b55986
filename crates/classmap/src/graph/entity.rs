//! Entity graph storage
//!
//! One version of the workspace: every declared symbol keyed by qualified
//! name and every resolved relationship keyed by its ordered endpoint pair.
//! Relationships refer to endpoints by key only, so snapshots are plain
//! values that clone and compare cheaply.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::core::{Database, Diagnostic, QualifiedName, Relationship, Symbol};

/// Ordered endpoint pair of a relationship
pub type EdgeKey = (QualifiedName, QualifiedName);

/// Symbols and relationships of one workspace version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityGraph {
    version: u64,
    symbols: BTreeMap<QualifiedName, Symbol>,
    relationships: BTreeMap<EdgeKey, Relationship>,
    /// Every declaration that claimed a conflicting key, in declaration order
    conflicts: BTreeMap<QualifiedName, Vec<Symbol>>,
    diagnostics: Vec<Diagnostic>,
}

impl EntityGraph {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn symbol(&self, key: &str) -> Option<&Symbol> {
        self.symbols.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.symbols.contains_key(key)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn relationship(&self, source: &str, target: &str) -> Option<&Relationship> {
        self.relationships
            .get(&(source.to_string(), target.to_string()))
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// Relationships with `key` as source or target
    pub fn relationships_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships.values().filter(move |r| r.touches(key))
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Record that several declarations share `key`
    pub fn add_conflict(&mut self, key: impl Into<QualifiedName>, declarations: Vec<Symbol>) {
        self.conflicts.insert(key.into(), declarations);
    }

    pub fn conflicts(&self) -> impl Iterator<Item = (&QualifiedName, &Vec<Symbol>)> {
        self.conflicts.iter()
    }

    pub fn is_conflicting(&self, key: &str) -> bool {
        self.conflicts.contains_key(key)
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn sort_diagnostics(&mut self) {
        self.diagnostics.sort();
        self.diagnostics.dedup();
    }

    /// Conflict and resolution diagnostics found while building this version
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Same symbols and relationships, ignoring version and diagnostics
    pub fn same_entities(&self, other: &EntityGraph) -> bool {
        self.symbols == other.symbols && self.relationships == other.relationships
    }
}

impl Database for EntityGraph {
    type Node = Symbol;
    type Edge = Relationship;

    fn add_node(&mut self, node: Self::Node) -> Result<()> {
        self.symbols.insert(node.qualified_name.clone(), node);
        Ok(())
    }

    fn add_edge(&mut self, edge: Self::Edge) -> Result<()> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.symbols.contains_key(endpoint) {
                bail!("relationship {} references unknown symbol `{}`", edge, endpoint);
            }
        }
        self.relationships.insert(edge.key(), edge);
        Ok(())
    }

    fn remove_node(&mut self, id: &str) -> Option<Self::Node> {
        let removed = self.symbols.remove(id)?;
        self.relationships.retain(|_, r| !r.touches(id));
        self.conflicts.remove(id);
        Some(removed)
    }

    fn get_node(&self, id: &str) -> Option<&Self::Node> {
        self.symbols.get(id)
    }

    fn nodes(&self) -> impl Iterator<Item = &Self::Node> {
        self.symbols.values()
    }

    fn edges(&self) -> impl Iterator<Item = &Self::Edge> {
        self.relationships.values()
    }

    fn clear(&mut self) {
        self.symbols.clear();
        self.relationships.clear();
        self.conflicts.clear();
        self.diagnostics.clear();
    }

    fn node_count(&self) -> usize {
        self.symbols.len()
    }

    fn edge_count(&self) -> usize {
        self.relationships.len()
    }
}
