//! Source file collaborators
//!
//! The engine never touches the file system itself. A host hands it file
//! contents through a [`SourceStore`] and forwards edits as [`SourceEvent`]s.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::{normalize_path, SyncError};

/// Read access to the files of a workspace
pub trait SourceStore: Send + Sync {
    /// Every file path in the workspace
    fn list_files(&self) -> Result<Vec<String>>;

    /// Current text of one file
    fn get_file_content(&self, path: &str) -> Result<String>;
}

/// A change notification from the source store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceEvent {
    Changed { path: String, content: String },
    Created { path: String, content: String },
    Deleted { path: String },
    Moved { from: String, to: String },
}

impl SourceEvent {
    /// Paths the event is about
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::Changed { path, .. } | Self::Created { path, .. } | Self::Deleted { path } => {
                vec![path.as_str()]
            }
            Self::Moved { from, to } => vec![from.as_str(), to.as_str()],
        }
    }
}

/// In-memory source store, for tests and hosts that keep buffers themselves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySourceStore {
    files: BTreeMap<String, String>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, content: impl Into<String>) {
        self.files.insert(normalize_path(path), content.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<P: AsRef<str>, C: Into<String>> FromIterator<(P, C)> for MemorySourceStore {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (path, content) in iter {
            store.insert(path.as_ref(), content);
        }
        store
    }
}

impl SourceStore for MemorySourceStore {
    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn get_file_content(&self, path: &str) -> Result<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| SyncError::unknown_file(path).into())
    }
}
