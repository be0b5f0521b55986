//! TypeScript source detector
//!
//! Identifies extractable files by extension. Declaration files and module
//! variants are included; plain JavaScript is not.

use tracing::trace;

use crate::core::Detector;

/// Detector for TypeScript sources
pub struct TypeScriptDetector;

impl TypeScriptDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TypeScriptDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for TypeScriptDetector {
    fn confidence(&self, path: &str, _input: &str) -> f64 {
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let Some((_, extension)) = file_name.rsplit_once('.') else {
            trace!(path, "No extension, not a TypeScript source");
            return 0.0;
        };
        if self.extensions().contains(&extension.to_ascii_lowercase().as_str()) {
            1.0
        } else {
            0.0
        }
    }

    fn language(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts", "cts"]
    }
}
