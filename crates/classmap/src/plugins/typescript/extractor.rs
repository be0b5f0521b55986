//! TypeScript extractor
//!
//! Ties the lexer and the declaration parser together behind the
//! [`Extractor`] trait.

use tracing::{debug, span, trace, Level};

use super::lexer::tokenize;
use super::parser::DeclParser;
use crate::core::{normalize_path, Extractor, FileTable, NamingScheme};

/// Extractor for TypeScript sources
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptExtractor {
    naming: NamingScheme,
}

impl TypeScriptExtractor {
    pub fn new(naming: NamingScheme) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> NamingScheme {
        self.naming
    }
}

impl Extractor for TypeScriptExtractor {
    fn extract(&self, path: &str, text: &str) -> FileTable {
        let path = normalize_path(path);
        let extract_span = span!(Level::DEBUG, "extract_file", path = %path, bytes = text.len());
        let _enter = extract_span.enter();

        let lexemes = tokenize(text);
        trace!(token_count = lexemes.len(), "Tokenized");

        let mut parser = DeclParser::new(&path, text, lexemes, self.naming);
        parser.parse_module();
        let table = parser.finish();

        debug!(
            symbols = table.symbols.len(),
            references = table.references.len(),
            imports = table.imports.len(),
            errors = table.diagnostics.len(),
            "Extracted file"
        );
        table
    }

    fn name(&self) -> &'static str {
        "typescript"
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }
}
