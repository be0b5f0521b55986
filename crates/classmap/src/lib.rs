//! Classmap - Keep a class diagram in sync with TypeScript sources
//!
//! A library that extracts classes, interfaces and enums from TypeScript
//! files, links them into a cross-file entity graph and maintains a
//! positioned diagram that follows every edit without moving the nodes a
//! user already placed.
//!
//! # Quick Start
//!
//! ```rust
//! use classmap::build_graph;
//!
//! let graph = build_graph([
//!     ("animal.ts", "export class Animal {}"),
//!     ("dog.ts", "import { Animal } from './animal';\nclass Dog extends Animal {}"),
//! ]);
//! assert_eq!(graph.symbol_count(), 2);
//! assert_eq!(graph.relationship_count(), 1);
//! ```
//!
//! # Advanced Usage
//!
//! A [`Workspace`](sync::Workspace) keeps the state between edits and
//! publishes each committed diagram through its store:
//!
//! ```rust
//! use classmap::prelude::*;
//! use classmap::render_changes;
//!
//! let mut workspace = Workspace::default();
//! workspace.file_created("animal.ts", "export class Animal { name: string }");
//! let report = workspace.recompute().unwrap();
//! assert_eq!(report.changes.len(), 1);
//!
//! workspace.file_changed("animal.ts", "export class Animal { name: string; legs: number }");
//! let report = workspace.recompute().unwrap();
//! assert_eq!(render_changes(&report.changes), "~ class animal.ts::Animal\n");
//!
//! let diagram = workspace.current_diagram();
//! assert_eq!(diagram.node("animal.ts::Animal").unwrap().members.len(), 2);
//! ```

pub mod core;
pub mod diagram;
pub mod graph;
pub mod plugins;
pub mod sync;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Database, Detector, Diagnostic, Extractor, FileTable, LayoutConfig, NamingScheme,
        Relationship, RelationshipKind, Symbol, SymbolKind, SyncConfig, SyncError,
    };
    pub use crate::diagram::{DiagramModel, DiagramStore, DiagramUpdate, LayoutAdapter};
    pub use crate::graph::{diff, ChangeEvent, ChangeSet, EntityGraph, GraphBuilder};
    pub use crate::plugins::typescript::{TypeScriptDetector, TypeScriptExtractor};
    pub use crate::plugins::PluginRegistry;
    pub use crate::sync::{
        MemorySourceStore, SourceEvent, SourceStore, SyncService, Workspace,
    };
}

/// Extract the declarations of one file
///
/// Files no built-in plugin accepts yield an empty table.
///
/// # Example
/// ```rust
/// use classmap::extract;
///
/// let table = extract("shapes.ts", "export interface Shape { area(): number }");
/// assert_eq!(table.symbols[0].qualified_name, "shapes.ts::Shape");
/// assert!(extract("notes.md", "class Shape {}").symbols.is_empty());
/// ```
pub fn extract(path: &str, text: &str) -> FileTable {
    plugins::PluginRegistry::with_defaults(NamingScheme::default())
        .extract(path, text)
        .unwrap_or_else(|| FileTable::new(path))
}

/// Build version 1 of the entity graph of `(path, text)` pairs
///
/// Uses the default naming scheme and parses files in parallel.
pub fn build_graph<'a>(sources: impl IntoIterator<Item = (&'a str, &'a str)>) -> graph::EntityGraph {
    use rayon::prelude::*;

    let registry = plugins::PluginRegistry::with_defaults(NamingScheme::default());
    let sources: Vec<(&str, &str)> = sources.into_iter().collect();
    let tables: Vec<FileTable> = sources
        .par_iter()
        .filter_map(|(path, text)| registry.extract(path, text))
        .collect();
    graph::GraphBuilder::new(NamingScheme::default()).build(&tables, 1)
}

/// Render a change set one event per line, in canonical order
///
/// # Example
/// ```rust
/// use classmap::{build_graph, render_changes};
/// use classmap::graph::{diff, EntityGraph};
///
/// let next = build_graph([("a.ts", "class A {}")]);
/// let changes = diff(&EntityGraph::default(), &next);
/// assert_eq!(render_changes(&changes), "+ class a.ts::A\n");
/// ```
pub fn render_changes(changes: &graph::ChangeSet) -> String {
    changes.iter().map(|event| format!("{}\n", event)).collect()
}
