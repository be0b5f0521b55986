//! Workspace synchronization
//!
//! [`Workspace`] holds the state of one synchronized workspace and runs the
//! pipeline on demand. [`SyncService`] drives a workspace from a stream of
//! [`SourceEvent`]s, coalescing bursts of edits into single runs.

mod debounce;
mod pipeline;
mod service;
mod source;
mod workspace;

pub use pipeline::{CommitReport, RunInput, RunOutput};
pub use service::{ServiceStatus, SyncService};
pub use source::{MemorySourceStore, SourceEvent, SourceStore};
pub use workspace::Workspace;
