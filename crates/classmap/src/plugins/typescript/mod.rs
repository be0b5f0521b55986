//! TypeScript language plugin
//!
//! Extracts classes, interfaces, enums and type aliases together with the
//! type references and module bindings needed to resolve them.

mod declarations;
mod detector;
mod extractor;
mod lexer;
mod parser;
mod types;

pub use detector::TypeScriptDetector;
pub use extractor::TypeScriptExtractor;
pub use lexer::{tokenize, Lexeme, LineIndex, Token};
