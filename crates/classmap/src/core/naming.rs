//! Qualified naming and workspace path normalization

use serde::{Deserialize, Serialize};

use super::QualifiedName;

/// How declarations are keyed in the entity graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingScheme {
    /// `<path>::<Name>`; moving a file removes and re-adds its symbols
    #[default]
    FileScoped,
    /// Declared name only; same-named declarations in different files conflict
    Global,
}

impl NamingScheme {
    pub fn qualify(self, path: &str, name: &str) -> QualifiedName {
        match self {
            NamingScheme::FileScoped => format!("{}::{}", path, name),
            NamingScheme::Global => name.to_string(),
        }
    }

    /// Whether keys change when the declaring file moves
    pub fn includes_path(self) -> bool {
        matches!(self, NamingScheme::FileScoped)
    }
}

/// Normalize a workspace path: forward slashes, no `.` segments, `..`
/// folded where possible, no leading `./` or trailing slash.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            s => parts.push(s),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Directory part of a normalized path, `""` for top-level files
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}
