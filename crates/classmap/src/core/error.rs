//! Core error types for diagram synchronization
//!
//! Most failures inside the pipeline are reported as [`Diagnostic`](super::Diagnostic)
//! values and never abort a run. The errors below are the ones a caller can
//! actually act on.

use thiserror::Error;

/// Core error types for the synchronization engine
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Parse error in {path}: {message} at line {line}, column {column}")]
    ParseError {
        path: String,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Unknown diagram node: {id}")]
    UnknownNode { id: String },

    #[error("Unknown source file: {path}")]
    UnknownFile { path: String },

    #[error("Run {generation} superseded by input generation {latest}")]
    Superseded { generation: u64, latest: u64 },

    #[error("Config error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Create a new parse error
    pub fn parse_error(path: impl Into<String>, message: String, line: usize, column: usize) -> Self {
        Self::ParseError {
            path: path.into(),
            message,
            line,
            column,
        }
    }

    /// Create a new unknown node error
    pub fn unknown_node(id: impl Into<String>) -> Self {
        Self::UnknownNode { id: id.into() }
    }

    /// Create a new unknown file error
    pub fn unknown_file(path: impl Into<String>) -> Self {
        Self::UnknownFile { path: path.into() }
    }

    /// Create a new config error
    pub fn config_error(message: String) -> Self {
        Self::ConfigError { message }
    }

    /// Whether this error only means a newer run will replace the result
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}
