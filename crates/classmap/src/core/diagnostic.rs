//! Non-fatal problems reported by the pipeline
//!
//! Diagnostics never abort a run. They ride along with file tables and
//! committed graphs so a host can surface them next to the diagram.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::SyncError;

/// A non-fatal problem found while extracting or resolving
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    /// Malformed syntax in one file
    ParseError {
        path: String,
        message: String,
        line: usize,
        column: usize,
    },
    /// A reference that names no known declaration
    ResolutionWarning {
        path: String,
        source: String,
        name: String,
        line: usize,
        column: usize,
    },
    /// Several declarations share one qualified name
    Conflict {
        qualified_name: String,
        paths: Vec<String>,
    },
}

impl Diagnostic {
    pub fn parse_error(
        path: impl Into<String>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.into(),
            line,
            column,
        }
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError { .. })
    }

    /// Files this diagnostic is about
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::ParseError { path, .. } | Self::ResolutionWarning { path, .. } => {
                vec![path.as_str()]
            }
            Self::Conflict { paths, .. } => paths.iter().map(String::as_str).collect(),
        }
    }

    /// The equivalent error for hosts that treat parse errors as failures
    pub fn to_error(&self) -> Option<SyncError> {
        match self {
            Self::ParseError {
                path,
                message,
                line,
                column,
            } => Some(SyncError::parse_error(path.clone(), message.clone(), *line, *column)),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError {
                path,
                message,
                line,
                column,
            } => write!(f, "error: {}:{}:{}: {}", path, line, column, message),
            Self::ResolutionWarning {
                path,
                source,
                name,
                line,
                column,
            } => write!(
                f,
                "warning: {}:{}:{}: `{}` referenced from {} is not declared in the workspace",
                path, line, column, name, source
            ),
            Self::Conflict {
                qualified_name,
                paths,
            } => write!(
                f,
                "conflict: `{}` is declared more than once ({})",
                qualified_name,
                paths.join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::parse_error("src/a.ts", "unclosed `{`", 3, 14);
        assert_eq!(d.to_string(), "error: src/a.ts:3:14: unclosed `{`");

        let c = Diagnostic::Conflict {
            qualified_name: "Shape".to_string(),
            paths: vec!["a.ts".to_string(), "b.ts".to_string()],
        };
        assert!(c.to_string().contains("a.ts, b.ts"));
        assert_eq!(c.paths(), vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn test_to_error() {
        let d = Diagnostic::parse_error("src/a.ts", "unclosed `{`", 3, 14);
        assert!(matches!(d.to_error(), Some(SyncError::ParseError { line: 3, .. })));

        let c = Diagnostic::Conflict {
            qualified_name: "Shape".to_string(),
            paths: vec![],
        };
        assert!(c.to_error().is_none());
    }

    #[test]
    fn test_serialize_tagged() {
        let d = Diagnostic::parse_error("a.ts", "oops", 1, 2);
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"kind\":\"parse-error\""));
    }
}
