//! Workspace context
//!
//! A [`Workspace`] owns everything one synchronized workspace needs: source
//! texts, extracted tables, the committed graph and the diagram store. There
//! is no global state, so several workspaces can live side by side.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, span, warn, Level};

use super::pipeline::{effective_table, CommitReport, PendingFile, RunInput, RunOutput};
use super::source::{SourceEvent, SourceStore};
use crate::core::{normalize_path, Diagnostic, FileTable, SyncConfig, SyncError};
use crate::diagram::{DiagramModel, DiagramStore, LayoutAdapter};
use crate::graph::{EntityGraph, GraphBuilder};
use crate::plugins::PluginRegistry;

/// Per-file state
#[derive(Debug, Clone)]
struct FileEntry {
    text: Arc<str>,
    /// Table extracted from `text`
    latest: Option<Arc<FileTable>>,
    /// Last table without parse errors, possibly from an older text
    good: Option<Arc<FileTable>>,
}

impl FileEntry {
    fn new(text: String) -> Self {
        Self {
            text: Arc::from(text),
            latest: None,
            good: None,
        }
    }
}

/// One synchronized workspace
#[derive(Debug)]
pub struct Workspace {
    config: SyncConfig,
    registry: Arc<PluginRegistry>,
    builder: GraphBuilder,
    adapter: LayoutAdapter,
    files: BTreeMap<String, FileEntry>,
    /// Bumped by every source notification
    input_generation: u64,
    committed_generation: u64,
    graph: Arc<EntityGraph>,
    store: DiagramStore,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::with_registry(
            SyncConfig::default(),
            PluginRegistry::with_defaults(SyncConfig::default().naming),
        )
    }
}

impl Workspace {
    /// Workspace with the built-in language plugins
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let registry = PluginRegistry::with_defaults(config.naming);
        Ok(Self::with_registry(config, registry))
    }

    pub fn with_registry(config: SyncConfig, registry: PluginRegistry) -> Self {
        Self {
            builder: GraphBuilder::from_config(&config),
            adapter: LayoutAdapter::new(config.layout.clone()),
            registry: Arc::new(registry),
            config,
            files: BTreeMap::new(),
            input_generation: 0,
            committed_generation: 0,
            graph: Arc::new(EntityGraph::default()),
            store: DiagramStore::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Handle to the committed diagram, shareable with renderers
    pub fn store(&self) -> DiagramStore {
        self.store.clone()
    }

    pub fn current_diagram(&self) -> Arc<DiagramModel> {
        self.store.current_diagram()
    }

    /// Store a user-chosen node position
    pub fn set_node_position(&self, id: &str, x: f64, y: f64) -> Result<(), SyncError> {
        self.store.set_node_position(id, x, y)
    }

    /// Last committed graph
    pub fn graph(&self) -> Arc<EntityGraph> {
        self.graph.clone()
    }

    pub fn input_generation(&self) -> u64 {
        self.input_generation
    }

    pub fn committed_generation(&self) -> u64 {
        self.committed_generation
    }

    /// Whether edits arrived since the last commit
    pub fn is_dirty(&self) -> bool {
        self.input_generation != self.committed_generation
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn file_text(&self, path: &str) -> Option<&str> {
        self.files.get(&normalize_path(path)).map(|e| e.text.as_ref())
    }

    /// Table the file currently contributes to the graph
    pub fn table(&self, path: &str) -> Option<Arc<FileTable>> {
        let entry = self.files.get(&normalize_path(path))?;
        let latest = entry.latest.clone()?;
        Some(effective_table(latest, entry.good.as_ref()))
    }

    fn bump(&mut self) {
        self.input_generation += 1;
    }

    /// New text for an existing or new file
    pub fn file_changed(&mut self, path: &str, content: impl Into<String>) {
        let path = normalize_path(path);
        let content = content.into();
        self.bump();
        match self.files.get_mut(&path) {
            Some(entry) if entry.text.as_ref() == content => {
                debug!(path = %path, "File content unchanged");
            }
            Some(entry) => {
                entry.text = Arc::from(content);
                entry.latest = None;
            }
            None => {
                self.files.insert(path, FileEntry::new(content));
            }
        }
    }

    /// A file appeared in the source store
    ///
    /// Creating a path that is already tracked replaces its text but keeps
    /// its last good table.
    pub fn file_created(&mut self, path: &str, content: impl Into<String>) {
        let path = normalize_path(path);
        debug!(path = %path, "File created");
        self.bump();
        match self.files.get_mut(&path) {
            Some(entry) => {
                entry.text = Arc::from(content.into());
                entry.latest = None;
            }
            None => {
                self.files.insert(path, FileEntry::new(content.into()));
            }
        }
    }

    pub fn file_deleted(&mut self, path: &str) -> Result<(), SyncError> {
        let path = normalize_path(path);
        self.files
            .remove(&path)
            .ok_or_else(|| SyncError::unknown_file(&path))?;
        debug!(path = %path, "File deleted");
        self.bump();
        Ok(())
    }

    /// The text moves with the file; tables are re-extracted
    /// because qualified names may include the path
    pub fn file_moved(&mut self, from: &str, to: &str) -> Result<(), SyncError> {
        let from = normalize_path(from);
        let to = normalize_path(to);
        let entry = self
            .files
            .remove(&from)
            .ok_or_else(|| SyncError::unknown_file(&from))?;
        debug!(from = %from, to = %to, "File moved");
        self.bump();
        self.files.insert(to, FileEntry::new(entry.text.to_string()));
        Ok(())
    }

    pub fn apply_event(&mut self, event: SourceEvent) -> Result<(), SyncError> {
        match event {
            SourceEvent::Changed { path, content } => self.file_changed(&path, content),
            SourceEvent::Created { path, content } => self.file_created(&path, content),
            SourceEvent::Deleted { path } => self.file_deleted(&path)?,
            SourceEvent::Moved { from, to } => self.file_moved(&from, &to)?,
        }
        Ok(())
    }

    /// Read every file of `source` as created files
    pub fn load_from(&mut self, source: &dyn SourceStore) -> Result<usize> {
        let paths = source.list_files()?;
        for path in &paths {
            let content = source.get_file_content(path)?;
            self.file_created(path, content);
        }
        info!(files = paths.len(), "Loaded workspace sources");
        Ok(paths.len())
    }

    /// Snapshot the inputs of a run at the current generation
    pub fn begin_run(&self) -> RunInput {
        RunInput {
            generation: self.input_generation,
            version: self.graph.version() + 1,
            files: self
                .files
                .iter()
                .map(|(path, entry)| PendingFile {
                    path: path.clone(),
                    text: entry.text.clone(),
                    latest: entry.latest.clone(),
                    good: entry.good.clone(),
                })
                .collect(),
            previous: self.graph.clone(),
            registry: self.registry.clone(),
            builder: self.builder,
            parallel: self.config.parallel_parse,
        }
    }

    /// Commit a run's output, unless newer input has arrived since it began
    ///
    /// Superseded output is rejected with [`SyncError::Superseded`] and leaves
    /// the graph and diagram untouched; tables extracted from still-current
    /// texts are kept for the next run.
    pub fn commit(&mut self, output: RunOutput) -> Result<CommitReport, SyncError> {
        let commit_span = span!(Level::DEBUG, "commit_run", generation = output.generation);
        let _enter = commit_span.enter();

        for parsed in &output.parsed {
            let Some(entry) = self.files.get_mut(&parsed.path) else {
                continue;
            };
            if !Arc::ptr_eq(&entry.text, &parsed.text) && entry.text != parsed.text {
                continue;
            }
            if !parsed.table.has_errors() {
                entry.good = Some(parsed.table.clone());
            } else {
                warn!(path = %parsed.path, "Keeping last good table for file with parse errors");
            }
            entry.latest = Some(parsed.table.clone());
        }

        if output.generation != self.input_generation {
            debug!(latest = self.input_generation, "Discarding superseded run");
            return Err(SyncError::Superseded {
                generation: output.generation,
                latest: self.input_generation,
            });
        }

        self.store.commit(&self.adapter, &output.changes, &output.graph);
        self.graph = output.graph;
        self.committed_generation = output.generation;

        info!(
            version = self.graph.version(),
            events = output.changes.len(),
            "Committed run"
        );
        Ok(CommitReport {
            generation: output.generation,
            version: self.graph.version(),
            changes: output.changes,
            diagnostics: self.diagnostics(),
        })
    }

    /// Begin, execute and commit a run on the calling thread
    pub fn recompute(&mut self) -> Result<CommitReport, SyncError> {
        let output = self.begin_run().execute();
        self.commit(output)
    }

    /// Parse errors of the current texts plus diagnostics of the committed graph
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = self
            .files
            .values()
            .filter_map(|entry| entry.latest.as_ref())
            .flat_map(|table| table.diagnostics.iter().cloned())
            .chain(self.graph.diagnostics().iter().cloned())
            .collect();
        diagnostics.sort();
        diagnostics
    }
}
