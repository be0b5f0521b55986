//! One recomputation run
//!
//! A [`RunInput`] is a self-contained snapshot of the workspace taken when the
//! run begins. Executing it touches no shared state, so it can run on any
//! thread while the workspace keeps accepting edits. The resulting
//! [`RunOutput`] is committed, or discarded as superseded, by the workspace.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, span, Level};

use crate::core::{Diagnostic, FileTable};
use crate::graph::{diff, ChangeSet, EntityGraph, GraphBuilder};
use crate::plugins::PluginRegistry;

/// One file as seen by a run
#[derive(Debug, Clone)]
pub(crate) struct PendingFile {
    pub path: String,
    pub text: Arc<str>,
    /// Table extracted from `text`, if that already happened
    pub latest: Option<Arc<FileTable>>,
    /// Last table extracted without parse errors
    pub good: Option<Arc<FileTable>>,
}

/// A table extracted during a run
#[derive(Debug, Clone)]
pub(crate) struct ParsedFile {
    pub path: String,
    pub text: Arc<str>,
    pub table: Arc<FileTable>,
}

/// Snapshot of everything a run needs
#[derive(Debug)]
pub struct RunInput {
    pub(crate) generation: u64,
    pub(crate) version: u64,
    pub(crate) files: Vec<PendingFile>,
    pub(crate) previous: Arc<EntityGraph>,
    pub(crate) registry: Arc<PluginRegistry>,
    pub(crate) builder: GraphBuilder,
    pub(crate) parallel: bool,
}

/// Result of executing a [`RunInput`]
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub(crate) generation: u64,
    pub(crate) parsed: Vec<ParsedFile>,
    pub graph: Arc<EntityGraph>,
    pub changes: ChangeSet,
}

impl RunOutput {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a successful commit changed
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub generation: u64,
    pub version: u64,
    pub changes: ChangeSet,
    /// Parse errors of current file texts plus graph diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl RunInput {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Extract stale files, build the next graph and diff it
    pub fn execute(self) -> RunOutput {
        let run_span = span!(
            Level::INFO,
            "run",
            generation = self.generation,
            version = self.version
        );
        let _enter = run_span.enter();

        let stale: Vec<&PendingFile> = self.files.iter().filter(|f| f.latest.is_none()).collect();
        let extract = |file: &&PendingFile| ParsedFile {
            path: file.path.clone(),
            text: file.text.clone(),
            table: Arc::new(
                self.registry
                    .extract(&file.path, &file.text)
                    .unwrap_or_else(|| FileTable::new(file.path.clone())),
            ),
        };
        let parsed: Vec<ParsedFile> = if self.parallel {
            stale.par_iter().map(extract).collect()
        } else {
            stale.iter().map(extract).collect()
        };
        debug!(
            files = self.files.len(),
            parsed = parsed.len(),
            "Extracted changed files"
        );

        let mut fresh = parsed.iter();
        let mut effective: Vec<Arc<FileTable>> = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let latest = match &file.latest {
                Some(table) => table.clone(),
                // stale files were parsed in order
                None => match fresh.next() {
                    Some(parsed) => parsed.table.clone(),
                    None => continue,
                },
            };
            effective.push(effective_table(latest, file.good.as_ref()));
        }

        let graph = self
            .builder
            .build(effective.iter().map(|t| t.as_ref()), self.version);
        let changes = diff(&self.previous, &graph);
        info!(events = changes.len(), "Run complete");

        RunOutput {
            generation: self.generation,
            parsed,
            graph: Arc::new(graph),
            changes,
        }
    }
}

/// The table a file contributes: a table with parse errors yields to the
/// last good one, if there is one
pub(crate) fn effective_table(
    latest: Arc<FileTable>,
    good: Option<&Arc<FileTable>>,
) -> Arc<FileTable> {
    match good {
        Some(good) if latest.has_errors() => good.clone(),
        _ => latest,
    }
}
