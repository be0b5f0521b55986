//! Language plugins
//!
//! Each plugin pairs a [`Detector`](crate::core::Detector) with an
//! [`Extractor`](crate::core::Extractor). The registry picks the first
//! plugin whose detector accepts a path.

pub mod typescript;

use std::sync::Arc;

use crate::core::{Detector, Extractor, FileTable, NamingScheme};

/// A detector and the extractor it routes to
#[derive(Clone)]
pub struct LanguagePlugin {
    pub detector: Arc<dyn Detector>,
    pub extractor: Arc<dyn Extractor>,
}

/// Ordered set of language plugins
#[derive(Clone)]
pub struct PluginRegistry {
    plugins: Vec<LanguagePlugin>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Registry with every built-in language
    pub fn with_defaults(naming: NamingScheme) -> Self {
        let mut registry = Self::empty();
        registry.register(
            Arc::new(typescript::TypeScriptDetector::new()),
            Arc::new(typescript::TypeScriptExtractor::new(naming)),
        );
        registry
    }

    pub fn register(&mut self, detector: Arc<dyn Detector>, extractor: Arc<dyn Extractor>) {
        self.plugins.push(LanguagePlugin {
            detector,
            extractor,
        });
    }

    /// Extractor for `path`, if any plugin claims it
    pub fn extractor_for(&self, path: &str, text: &str) -> Option<&Arc<dyn Extractor>> {
        self.plugins
            .iter()
            .find(|p| p.detector.detect(path, text))
            .map(|p| &p.extractor)
    }

    /// Extract `path`, or `None` if no plugin claims it
    pub fn extract(&self, path: &str, text: &str) -> Option<FileTable> {
        self.extractor_for(path, text)
            .map(|extractor| extractor.extract(path, text))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.detector.language()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_routes_typescript() {
        let registry = PluginRegistry::with_defaults(NamingScheme::FileScoped);
        assert_eq!(registry.len(), 1);
        assert!(registry.extractor_for("a.ts", "").is_some());
        assert!(registry.extract("notes.md", "class A {}").is_none());

        let table = registry.extract("a.ts", "class A {}").unwrap();
        assert_eq!(table.symbols.len(), 1);
    }

    #[test]
    fn test_empty_registry() {
        let registry = PluginRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.extract("a.ts", "class A {}").is_none());
    }
}
