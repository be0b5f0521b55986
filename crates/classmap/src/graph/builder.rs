//! Graph builder: per-file tables to one entity graph
//!
//! Symbols are merged by qualified name. Every reference is resolved through
//! [`Resolver`] and the strongest relationship kind per ordered pair wins.
//! Unresolved names are external and produce no relationship.

use std::collections::BTreeMap;

use tracing::{debug, info, span, trace, Level};

use super::entity::{EdgeKey, EntityGraph};
use super::resolve::Resolver;
use crate::core::{
    Database, Diagnostic, FileTable, NamingScheme, QualifiedName, Relationship, RelationshipKind,
    Symbol, SyncConfig,
};

/// Multiplicity label of a single-valued association
pub const ONE: &str = "1";
/// Multiplicity label of an association through a homogeneous container
pub const MANY: &str = "*";

/// Builds [`EntityGraph`] versions from file tables
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    naming: NamingScheme,
    report_unresolved: bool,
}

/// Strongest candidate seen so far for one ordered pair
#[derive(Debug, Clone, Copy)]
struct Candidate {
    kind: RelationshipKind,
    many: bool,
}

impl GraphBuilder {
    pub fn new(naming: NamingScheme) -> Self {
        Self {
            naming,
            report_unresolved: false,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.naming).with_unresolved_warnings(config.report_unresolved)
    }

    /// Emit a `ResolutionWarning` for every reference that names nothing
    pub fn with_unresolved_warnings(mut self, enabled: bool) -> Self {
        self.report_unresolved = enabled;
        self
    }

    /// Merge `tables` into graph version `version`
    ///
    /// The result depends only on the set of tables: input order and the
    /// order of references inside a table never change it.
    pub fn build<'t>(&self, tables: impl IntoIterator<Item = &'t FileTable>, version: u64) -> EntityGraph {
        let files: BTreeMap<&str, &FileTable> =
            tables.into_iter().map(|t| (t.path.as_str(), t)).collect();

        let build_span = span!(Level::INFO, "build_graph", files = files.len(), version);
        let _enter = build_span.enter();

        let mut graph = EntityGraph::new(version);
        self.merge_symbols(&files, &mut graph);

        let resolver = Resolver::new(files.clone(), self.naming);
        let candidates = self.collect_candidates(&files, &resolver, &mut graph);

        for ((source, target), candidate) in candidates {
            let mut relationship = Relationship::new(source, target, candidate.kind);
            if candidate.kind == RelationshipKind::Association {
                relationship = relationship.with_multiplicity(if candidate.many { MANY } else { ONE });
            }
            // endpoints were checked while collecting
            if let Err(error) = graph.add_edge(relationship) {
                debug!(%error, "Dropped relationship");
            }
        }
        graph.sort_diagnostics();

        info!(
            symbols = graph.symbol_count(),
            relationships = graph.relationship_count(),
            "Built entity graph"
        );
        graph
    }

    /// Insert every declaration; duplicate keys become conflicts
    fn merge_symbols(&self, files: &BTreeMap<&str, &FileTable>, graph: &mut EntityGraph) {
        let mut declared: BTreeMap<&str, Vec<&Symbol>> = BTreeMap::new();
        for table in files.values() {
            for symbol in &table.symbols {
                declared
                    .entry(symbol.qualified_name.as_str())
                    .or_default()
                    .push(symbol);
            }
        }

        for (key, declarations) in declared {
            let Some((first, rest)) = declarations.split_first() else {
                continue;
            };
            let mut canonical = (*first).clone();
            if !rest.is_empty() {
                canonical.conflicting = true;
                let mut paths: Vec<String> = Vec::new();
                for symbol in &declarations {
                    if !paths.contains(&symbol.path) {
                        paths.push(symbol.path.clone());
                    }
                }
                debug!(key, declarations = declarations.len(), "Conflicting declarations");
                graph.push_diagnostic(Diagnostic::Conflict {
                    qualified_name: key.to_string(),
                    paths,
                });
                graph.add_conflict(key, declarations.iter().map(|s| (*s).clone()).collect());
            }
            if let Err(error) = graph.add_node(canonical) {
                debug!(%error, "Dropped symbol");
            }
        }
    }

    fn collect_candidates(
        &self,
        files: &BTreeMap<&str, &FileTable>,
        resolver: &Resolver<'_>,
        graph: &mut EntityGraph,
    ) -> BTreeMap<EdgeKey, Candidate> {
        let mut candidates: BTreeMap<EdgeKey, Candidate> = BTreeMap::new();

        for table in files.values() {
            for reference in &table.references {
                if !graph.contains(&reference.source) || graph.is_conflicting(&reference.source) {
                    continue;
                }

                let target: Option<QualifiedName> = resolver
                    .resolve(table, &reference.name)
                    .filter(|key| graph.contains(key));
                let Some(target) = target else {
                    trace!(name = %reference.name, source = %reference.source, "External reference");
                    if self.report_unresolved {
                        graph.push_diagnostic(Diagnostic::ResolutionWarning {
                            path: table.path.clone(),
                            source: reference.source.clone(),
                            name: reference.name.clone(),
                            line: reference.line,
                            column: reference.column,
                        });
                    }
                    continue;
                };
                if graph.is_conflicting(&target) {
                    continue;
                }

                let kind = reference.role.relationship_kind();
                let many = reference.many && kind == RelationshipKind::Association;
                candidates
                    .entry((reference.source.clone(), target))
                    .and_modify(|existing| {
                        if kind.precedence() > existing.kind.precedence() {
                            *existing = Candidate { kind, many };
                        } else if kind == existing.kind {
                            existing.many |= many;
                        }
                    })
                    .or_insert(Candidate { kind, many });
            }
        }
        candidates
    }
}
