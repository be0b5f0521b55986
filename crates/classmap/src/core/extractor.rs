//! Core extractor trait for per-file declaration extraction
//!
//! An extractor turns the text of one file into a [`FileTable`]. It is a pure
//! function of `(path, text)`: no I/O, no shared state, and identical input
//! always yields an identical table. Extraction is best-effort and never
//! fails; problems are reported as diagnostics inside the table.

use serde::{Deserialize, Serialize};

use super::{Diagnostic, ExportBinding, ImportBinding, Reference, Symbol};

/// Everything one file contributes to the entity graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTable {
    pub path: String,
    /// Declarations in source order
    pub symbols: Vec<Symbol>,
    /// Unresolved type references in source order
    pub references: Vec<Reference>,
    pub imports: Vec<ImportBinding>,
    pub exports: Vec<ExportBinding>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileTable {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Whether extraction hit malformed syntax
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_parse_error)
    }

    /// Look up a declaration of this file by its declared name
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Whether `name` is exported from this file, either on the declaration or
    /// through a local `export { .. }` list
    pub fn exports_local(&self, exported: &str) -> Option<&str> {
        for export in &self.exports {
            if let ExportBinding::Local { local, exported: e } = export {
                if e == exported {
                    return Some(local.as_str());
                }
            }
        }
        self.symbols
            .iter()
            .find(|s| s.modifiers.exported && s.name == exported)
            .map(|s| s.name.as_str())
    }

    /// Name of the default-exported declaration, if any
    pub fn default_export(&self) -> Option<&str> {
        if let Some(sym) = self.symbols.iter().find(|s| s.modifiers.is_default) {
            return Some(sym.name.as_str());
        }
        self.exports.iter().find_map(|e| match e {
            ExportBinding::Local { local, exported } if exported == "default" => {
                Some(local.as_str())
            }
            _ => None,
        })
    }
}

/// Core trait for source extractors
///
/// # Example
/// ```
/// use classmap::core::{Extractor, NamingScheme};
/// use classmap::plugins::typescript::TypeScriptExtractor;
///
/// let extractor = TypeScriptExtractor::new(NamingScheme::FileScoped);
/// let table = extractor.extract("src/dog.ts", "class Dog extends Animal {}");
/// assert_eq!(table.symbols.len(), 1);
/// assert_eq!(table.symbols[0].qualified_name, "src/dog.ts::Dog");
/// ```
pub trait Extractor: Send + Sync {
    /// Extract declarations, references and bindings from one file
    fn extract(&self, path: &str, text: &str) -> FileTable;

    /// Get the name of this extractor
    fn name(&self) -> &'static str;

    /// Get the version of this extractor
    fn version(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Modifiers, SymbolKind};

    fn table_with(symbols: Vec<Symbol>, exports: Vec<ExportBinding>) -> FileTable {
        FileTable {
            path: "a.ts".to_string(),
            symbols,
            exports,
            ..Default::default()
        }
    }

    #[test]
    fn test_has_errors() {
        let mut table = FileTable::new("a.ts");
        assert!(!table.has_errors());
        table
            .diagnostics
            .push(Diagnostic::parse_error("a.ts", "unexpected `}`", 1, 1));
        assert!(table.has_errors());
    }

    #[test]
    fn test_exports_local() {
        let mut a = Symbol::new("a.ts::A", "A", SymbolKind::Class, "a.ts");
        a.modifiers = Modifiers {
            exported: true,
            ..Default::default()
        };
        let b = Symbol::new("a.ts::B", "B", SymbolKind::Class, "a.ts");
        let table = table_with(
            vec![a, b],
            vec![ExportBinding::Local {
                local: "B".to_string(),
                exported: "Renamed".to_string(),
            }],
        );

        assert_eq!(table.exports_local("A"), Some("A"));
        assert_eq!(table.exports_local("Renamed"), Some("B"));
        assert_eq!(table.exports_local("B"), None);
    }

    #[test]
    fn test_default_export() {
        let mut a = Symbol::new("a.ts::A", "A", SymbolKind::Class, "a.ts");
        a.modifiers.is_default = true;
        assert_eq!(table_with(vec![a], vec![]).default_export(), Some("A"));

        let b = Symbol::new("a.ts::B", "B", SymbolKind::Class, "a.ts");
        let table = table_with(
            vec![b],
            vec![ExportBinding::Local {
                local: "B".to_string(),
                exported: "default".to_string(),
            }],
        );
        assert_eq!(table.default_export(), Some("B"));
    }
}
