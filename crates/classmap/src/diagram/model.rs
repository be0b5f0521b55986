//! Positioned diagram model
//!
//! Nodes wrap symbols with a screen rectangle, edges wrap relationships with
//! a style derived from their kind. Positions belong to the diagram: once a
//! node is placed, only the user (through the store) moves it.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Serialize, Serializer};
use unicode_width::UnicodeWidthStr;

use crate::core::{
    Database, LayoutConfig, QualifiedName, Relationship, RelationshipKind, Symbol, SymbolKind,
    SyncError,
};
use crate::graph::EdgeKey;

/// Stroke of an edge line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

/// Marker drawn at the target end of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrowHead {
    HollowTriangle,
    OpenArrow,
}

/// Rendering hint for an edge, a pure function of its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeStyle {
    pub line: LineStyle,
    /// Drawn at the supertype, interface or referenced-type end
    pub head: ArrowHead,
}

impl EdgeStyle {
    pub fn for_kind(kind: RelationshipKind) -> Self {
        let (line, head) = match kind {
            RelationshipKind::Inheritance => (LineStyle::Solid, ArrowHead::HollowTriangle),
            RelationshipKind::Implementation => (LineStyle::Dashed, ArrowHead::HollowTriangle),
            RelationshipKind::Association => (LineStyle::Solid, ArrowHead::OpenArrow),
            RelationshipKind::Dependency => (LineStyle::Dotted, ArrowHead::OpenArrow),
        };
        Self { line, head }
    }
}

/// A placed symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramNode {
    pub id: QualifiedName,
    pub label: String,
    pub kind: SymbolKind,
    pub stereotype: Option<String>,
    /// Member lines as displayed, e.g. `+drive(route: Route): Trip`
    pub members: Vec<String>,
    pub is_abstract: bool,
    pub conflicting: bool,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DiagramNode {
    /// Node for `symbol` at the origin, sized for its display data
    pub fn from_symbol(symbol: &Symbol, layout: &LayoutConfig) -> Self {
        let mut node = Self {
            id: symbol.qualified_name.clone(),
            label: String::new(),
            kind: symbol.kind,
            stereotype: None,
            members: Vec::new(),
            is_abstract: false,
            conflicting: false,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        };
        node.refresh(symbol, layout);
        node
    }

    /// Replace display data and size, keeping the position
    pub fn refresh(&mut self, symbol: &Symbol, layout: &LayoutConfig) {
        self.label = symbol.name.clone();
        self.kind = symbol.kind;
        self.stereotype = symbol.kind.stereotype().map(|s| format!("«{}»", s));
        self.members = symbol.members.iter().map(|m| m.display()).collect();
        self.is_abstract = symbol.modifiers.is_abstract;
        self.conflicting = symbol.conflicting;

        let (width, height) = self.measure(layout);
        self.width = width;
        self.height = height;
    }

    fn measure(&self, layout: &LayoutConfig) -> (f64, f64) {
        let header = std::iter::once(self.label.as_str()).chain(self.stereotype.as_deref());
        let widest = header
            .chain(self.members.iter().map(String::as_str))
            .map(UnicodeWidthStr::width)
            .max()
            .unwrap_or(0);

        let header_lines = if self.stereotype.is_some() { 2 } else { 1 };
        let lines = header_lines + self.members.len();

        let width = widest as f64 * layout.char_width + layout.padding * 2.0;
        let height = lines as f64 * layout.line_height + layout.padding * 2.0;
        (width, height)
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Whether this node's rectangle overlaps the given one with positive area
    pub fn intersects(&self, x: f64, y: f64, width: f64, height: f64) -> bool {
        self.x < x + width && x < self.x + self.width && self.y < y + height && y < self.y + self.height
    }
}

/// A styled relationship between two placed nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramEdge {
    pub source: QualifiedName,
    pub target: QualifiedName,
    pub kind: RelationshipKind,
    pub multiplicity: Option<String>,
    pub style: EdgeStyle,
}

impl DiagramEdge {
    pub fn from_relationship(relationship: &Relationship) -> Self {
        Self {
            source: relationship.source.clone(),
            target: relationship.target.clone(),
            kind: relationship.kind,
            multiplicity: relationship.multiplicity.clone(),
            style: EdgeStyle::for_kind(relationship.kind),
        }
    }

    pub fn key(&self) -> EdgeKey {
        (self.source.clone(), self.target.clone())
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// Nodes and edges shown to the rendering layer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagramModel {
    /// Graph version the diagram last caught up with
    pub version: u64,
    #[serde(serialize_with = "values_as_list")]
    nodes: BTreeMap<QualifiedName, DiagramNode>,
    #[serde(serialize_with = "values_as_list")]
    edges: BTreeMap<EdgeKey, DiagramEdge>,
}

fn values_as_list<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    serializer.collect_seq(map.values())
}

impl DiagramModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut DiagramNode> {
        self.nodes.get_mut(id)
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&DiagramEdge> {
        self.edges.get(&(source.to_string(), target.to_string()))
    }

    pub fn remove_edge(&mut self, source: &str, target: &str) -> Option<DiagramEdge> {
        self.edges.remove(&(source.to_string(), target.to_string()))
    }

    /// Store a position chosen by the user
    pub fn set_position(&mut self, id: &str, x: f64, y: f64) -> Result<(), SyncError> {
        let node = self.nodes.get_mut(id).ok_or_else(|| SyncError::unknown_node(id))?;
        node.x = x;
        node.y = y;
        Ok(())
    }

    /// Every node position by id
    pub fn positions(&self) -> BTreeMap<QualifiedName, (f64, f64)> {
        self.nodes
            .values()
            .map(|n| (n.id.clone(), n.position()))
            .collect()
    }

    /// Lowest edge of the lowest node, `None` when empty
    pub fn bottom(&self) -> Option<f64> {
        self.nodes.values().map(|n| n.y + n.height).reduce(f64::max)
    }
}

impl Database for DiagramModel {
    type Node = DiagramNode;
    type Edge = DiagramEdge;

    fn add_node(&mut self, node: Self::Node) -> Result<()> {
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    fn add_edge(&mut self, edge: Self::Edge) -> Result<()> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.nodes.contains_key(endpoint) {
                bail!(
                    "edge {} -> {} references unknown node `{}`",
                    edge.source,
                    edge.target,
                    endpoint
                );
            }
        }
        self.edges.insert(edge.key(), edge);
        Ok(())
    }

    fn remove_node(&mut self, id: &str) -> Option<Self::Node> {
        let removed = self.nodes.remove(id)?;
        self.edges.retain(|_, e| !e.touches(id));
        Some(removed)
    }

    fn get_node(&self, id: &str) -> Option<&Self::Node> {
        self.nodes.get(id)
    }

    fn nodes(&self) -> impl Iterator<Item = &Self::Node> {
        self.nodes.values()
    }

    fn edges(&self) -> impl Iterator<Item = &Self::Edge> {
        self.edges.values()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
