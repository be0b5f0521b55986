//! File system source store and watcher event translation

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use classmap::core::normalize_path;
use classmap::sync::{SourceEvent, SourceStore};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::Event;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Directory names never descended into
const IGNORED_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "out", "coverage"];

/// Extensions of files handed to the workspace
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// Source files under one root directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(anyhow!("Not a directory: '{}'", root.display()));
        }
        // watcher events carry absolute paths
        let root = fs::canonicalize(&root)
            .map_err(|e| anyhow!("Failed to resolve '{}': {}", root.display(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Workspace path of `path`, if it is a source file under the root
    pub fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if !is_source_file(relative) {
            return None;
        }
        Some(normalize_path(&relative.to_string_lossy()))
    }
}

fn is_ignored_dir(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIRS.contains(&name)
}

fn is_source_file(relative: &Path) -> bool {
    let in_ignored_dir = relative
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .any(|c| is_ignored_dir(&c.as_os_str().to_string_lossy()));
    let has_extension = relative
        .extension()
        .map(|e| SOURCE_EXTENSIONS.contains(&e.to_string_lossy().as_ref()))
        .unwrap_or(false);
    has_extension && !in_ignored_dir
}

impl SourceStore for DirectorySource {
    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !is_ignored_dir(&e.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = entry.map_err(|e| anyhow!("Walk error: {}", e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(path) = self.relative(entry.path()) {
                files.push(path);
            }
        }
        debug!(root = %self.root.display(), files = files.len(), "Listed source files");
        Ok(files)
    }

    fn get_file_content(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        fs::read_to_string(&full)
            .map_err(|e| anyhow!("Failed to read source file '{}': {}", full.display(), e))
    }
}

/// Turn one watcher event into source events
///
/// `known` tracks the files the workspace has seen, so removals of files it
/// never tracked are dropped instead of reported as unknown.
pub fn translate_event(
    source: &DirectorySource,
    event: &Event,
    known: &mut BTreeSet<String>,
) -> Vec<SourceEvent> {
    trace!(kind = ?event.kind, paths = event.paths.len(), "Watcher event");

    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
        if let [from, to] = event.paths.as_slice() {
            match (source.relative(from), source.relative(to)) {
                (Some(from), Some(to)) if known.contains(&from) => {
                    known.remove(&from);
                    known.insert(to.clone());
                    return vec![SourceEvent::Moved { from, to }];
                }
                _ => {}
            }
        }
    }

    let mut events = Vec::new();
    for full in &event.paths {
        let Some(path) = source.relative(full) else {
            continue;
        };
        if full.is_file() {
            match fs::read_to_string(full) {
                Ok(content) => {
                    let event = if known.insert(path.clone()) {
                        SourceEvent::Created { path, content }
                    } else {
                        SourceEvent::Changed { path, content }
                    };
                    events.push(event);
                }
                Err(error) => debug!(path = %path, %error, "Skipped unreadable file"),
            }
        } else if known.remove(&path) {
            events.push(SourceEvent::Deleted { path });
        }
    }
    events
}
