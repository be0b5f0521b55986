//! Declaration parser over the token stream
//!
//! A tolerant recursive-descent pass. It recognizes imports, exports and the
//! four declaration forms at module level and skips everything else with
//! balanced-delimiter tracking. Malformed input produces diagnostics and the
//! parser resumes at the next token it understands.

use tracing::trace;

use super::lexer::{Lexeme, Token};
use crate::core::{
    Diagnostic, ExportBinding, FileTable, ImportBinding, ImportedName, Modifiers, NamingScheme,
    QualifiedName, Symbol, SymbolKind,
};

/// Parsing state for one file
pub(super) struct DeclParser<'a> {
    text: &'a str,
    toks: Vec<Lexeme>,
    pos: usize,
    naming: NamingScheme,
    pub(super) table: FileTable,
    /// Declaration that references found now are attributed to
    pub(super) source: Option<QualifiedName>,
    /// Type parameter names visible at the current position
    pub(super) scope: Vec<String>,
}

fn closer_of(open: char) -> char {
    match open {
        '{' => '}',
        '(' => ')',
        '[' => ']',
        _ => '>',
    }
}

impl<'a> DeclParser<'a> {
    pub(super) fn new(path: &str, text: &'a str, lexemes: Vec<Lexeme>, naming: NamingScheme) -> Self {
        let mut table = FileTable::new(path);
        let mut toks = Vec::with_capacity(lexemes.len());
        for lexeme in lexemes {
            match lexeme.token {
                Token::Error(message) => table.diagnostics.push(Diagnostic::parse_error(
                    path,
                    message,
                    lexeme.line,
                    lexeme.column,
                )),
                _ => toks.push(lexeme),
            }
        }

        Self {
            text,
            toks,
            pos: 0,
            naming,
            table,
            source: None,
            scope: Vec::new(),
        }
    }

    pub(super) fn finish(mut self) -> FileTable {
        self.table
            .diagnostics
            .sort_by_key(|d| match d {
                Diagnostic::ParseError { line, column, .. } => (*line, *column),
                _ => (usize::MAX, usize::MAX),
            });
        self.table
    }

    // ----- cursor -----

    pub(super) fn peek(&self) -> Option<&Lexeme> {
        self.toks.get(self.pos)
    }

    pub(super) fn nth(&self, n: usize) -> Option<&Lexeme> {
        self.toks.get(self.pos + n)
    }

    pub(super) fn pos(&self) -> usize {
        self.pos
    }

    pub(super) fn position_of(&self, idx: usize) -> Option<(usize, usize)> {
        self.toks.get(idx).map(|l| (l.line, l.column))
    }

    pub(super) fn bump(&mut self) {
        if self.pos < self.toks.len() {
            self.pos += 1;
        }
    }

    pub(super) fn punct(&self) -> Option<char> {
        match self.peek().map(|l| &l.token) {
            Some(Token::Punct(c)) => Some(*c),
            _ => None,
        }
    }

    pub(super) fn at_punct(&self, c: char) -> bool {
        self.punct() == Some(c)
    }

    pub(super) fn nth_is_punct(&self, n: usize, c: char) -> bool {
        self.nth(n).is_some_and(|l| l.is_punct(c))
    }

    pub(super) fn eat_punct(&mut self, c: char) -> bool {
        if self.at_punct(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(super) fn at_token(&self, token: &Token) -> bool {
        self.peek().is_some_and(|l| l.token == *token)
    }

    pub(super) fn eat_token(&mut self, token: &Token) -> bool {
        if self.at_token(token) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(super) fn current_ident(&self) -> Option<&str> {
        self.peek().and_then(Lexeme::ident)
    }

    pub(super) fn nth_ident(&self, n: usize) -> Option<&str> {
        self.nth(n).and_then(Lexeme::ident)
    }

    pub(super) fn at_word(&self, word: &str) -> bool {
        self.current_ident() == Some(word)
    }

    pub(super) fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(super) fn previous(&self) -> Option<&Lexeme> {
        self.pos.checked_sub(1).and_then(|i| self.toks.get(i))
    }

    fn after_dot(&self) -> bool {
        self.previous().is_some_and(|l| l.is_punct('.'))
    }

    /// Whether the current token starts on a later line than the previous one
    pub(super) fn newline_before(&self) -> bool {
        match (self.previous(), self.peek()) {
            (Some(prev), Some(cur)) => cur.line > prev.line,
            _ => true,
        }
    }

    pub(super) fn error_here(&mut self, message: impl Into<String>) {
        let idx = self.pos.min(self.toks.len().saturating_sub(1));
        self.error_at(idx, message);
    }

    pub(super) fn error_at(&mut self, idx: usize, message: impl Into<String>) {
        let (line, column) = self
            .toks
            .get(idx)
            .map(|l| (l.line, l.column))
            .unwrap_or((1, 1));
        let message = message.into();
        trace!(path = %self.table.path, line, column, %message, "Parse error");
        self.table
            .diagnostics
            .push(Diagnostic::parse_error(&self.table.path, message, line, column));
    }

    /// Skip a delimited group starting at the current opener, reporting
    /// mismatched and unclosed delimiters
    pub(super) fn skip_balanced(&mut self) {
        // (opener, token index)
        let mut stack: Vec<(char, usize)> = Vec::new();
        loop {
            if self.peek().is_none() {
                if let Some(&(open, idx)) = stack.first() {
                    self.error_at(idx, format!("unclosed `{}`", open));
                }
                return;
            }
            match self.punct() {
                Some(c @ ('{' | '(' | '[')) => stack.push((c, self.pos)),
                Some(c @ ('}' | ')' | ']')) => match stack.last() {
                    Some(&(open, _)) if closer_of(open) == c => {
                        stack.pop();
                    }
                    _ => {
                        if let Some(depth) = stack.iter().rposition(|&(o, _)| closer_of(o) == c) {
                            let (open, idx) = stack[depth + 1];
                            self.error_at(idx, format!("unclosed `{}`", open));
                            stack.truncate(depth);
                        } else {
                            self.error_here(format!("unexpected `{}`", c));
                        }
                    }
                },
                _ => {}
            }
            self.bump();
            if stack.is_empty() {
                return;
            }
        }
    }

    /// Advance until one of `stops` or an unmatched closer, skipping groups
    pub(super) fn recover_until(&mut self, stops: &[char]) {
        while self.peek().is_some() {
            match self.punct() {
                Some(c) if stops.contains(&c) => return,
                Some('{' | '(' | '[') => self.skip_balanced(),
                Some('}' | ')' | ']') => return,
                _ => self.bump(),
            }
        }
    }

    /// Source text covered by tokens `[from, to)`, whitespace collapsed
    pub(super) fn source_text(&self, from: usize, to: usize) -> String {
        if from >= to || to > self.toks.len() {
            return String::new();
        }
        let start = self.toks[from].span.start;
        let end = self.toks[to - 1].span.end;
        self.text
            .get(start..end)
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    fn skip_statement(&mut self) {
        let start = self.pos;
        while let Some(lexeme) = self.peek() {
            if lexeme.is_punct(';') {
                self.bump();
                return;
            }
            if self.pos > start && self.newline_before() {
                return;
            }
            match self.punct() {
                Some('{' | '(' | '[') => self.skip_balanced(),
                Some('}' | ')' | ']') => return,
                _ => self.bump(),
            }
        }
    }

    pub(super) fn skip_decorator(&mut self) {
        self.bump();
        loop {
            if self.current_ident().is_some() {
                self.bump();
            }
            if !self.eat_punct('.') {
                break;
            }
        }
        if self.at_punct('(') {
            self.skip_balanced();
        }
    }

    /// Whether a declaration keyword sequence starts `n` tokens ahead
    pub(super) fn starts_declaration(&self, n: usize) -> bool {
        let next_is_name = |k: usize| matches!(self.nth(k).map(|l| &l.token), Some(Token::Ident(_)));
        match self.nth_ident(n) {
            Some("class") => next_is_name(n + 1) || self.nth_is_punct(n + 1, '{'),
            Some("abstract") => self.nth_ident(n + 1) == Some("class"),
            Some("declare") => self.starts_declaration(n + 1),
            Some("interface") | Some("enum") => next_is_name(n + 1),
            Some("const") => self.nth_ident(n + 1) == Some("enum"),
            Some("type") => {
                next_is_name(n + 1)
                    && (self.nth_is_punct(n + 2, '=') || self.nth_is_punct(n + 2, '<'))
            }
            _ => false,
        }
    }

    /// Whether the current token looks like the start of a new module-level
    /// statement on its own line, used to bail out of unclosed bodies
    pub(super) fn at_module_restart(&self) -> bool {
        if !self.newline_before() {
            return false;
        }
        if self.starts_declaration(0) {
            return true;
        }
        match self.current_ident() {
            Some("export") => matches!(self.nth(1).map(|l| &l.token), Some(Token::Ident(_)))
                || self.nth_is_punct(1, '{')
                || self.nth_is_punct(1, '*'),
            Some("import") => matches!(
                self.nth(1).map(|l| &l.token),
                Some(Token::Ident(_)) | Some(Token::Str(_))
            ) || self.nth_is_punct(1, '{')
                || self.nth_is_punct(1, '*'),
            _ => false,
        }
    }

    pub(super) fn new_symbol(&self, name: &str, kind: SymbolKind, line: usize, modifiers: Modifiers) -> Symbol {
        let mut symbol = Symbol::new(
            self.naming.qualify(&self.table.path, name),
            name,
            kind,
            self.table.path.clone(),
        );
        symbol.modifiers = modifiers;
        symbol.line = line;
        symbol
    }

    // ----- module level -----

    pub(super) fn parse_module(&mut self) {
        enum Step {
            Import,
            Export,
            Declaration,
            Group,
            Stray(char),
            Other,
        }

        while self.peek().is_some() {
            let keyword = if self.after_dot() { None } else { self.current_ident() };
            let step = match (keyword, self.punct()) {
                (Some("import"), _) => Step::Import,
                (Some("export"), _) => Step::Export,
                (Some(_), _) if self.starts_declaration(0) => Step::Declaration,
                (_, Some('{' | '(' | '[')) => Step::Group,
                (_, Some(c @ ('}' | ')' | ']'))) => Step::Stray(c),
                _ => Step::Other,
            };
            match step {
                Step::Import => self.parse_import(),
                Step::Export => self.parse_export(),
                Step::Declaration => self.parse_declaration(Modifiers::default()),
                Step::Group => self.skip_balanced(),
                Step::Stray(c) => {
                    self.error_here(format!("unexpected `{}`", c));
                    self.bump();
                }
                Step::Other => self.bump(),
            }
        }
    }

    fn parse_declaration(&mut self, mut modifiers: Modifiers) {
        loop {
            if self.eat_word("declare") {
                continue;
            }
            if self.at_word("abstract") && self.nth_ident(1) == Some("class") {
                modifiers.is_abstract = true;
                self.bump();
                continue;
            }
            break;
        }

        match self.current_ident() {
            Some("class") => self.parse_class(modifiers),
            Some("interface") => self.parse_interface(modifiers),
            Some("enum") => self.parse_enum(modifiers),
            Some("const") => {
                self.bump();
                self.parse_enum(modifiers);
            }
            Some("type") => self.parse_type_alias(modifiers),
            _ => self.bump(),
        }
    }

    /// Comma separated `{ a, b as c, type d }` list of (name, alias) pairs
    fn parse_binding_list(&mut self) -> Vec<(String, String)> {
        let open = self.pos;
        self.bump();
        let mut list = Vec::new();
        loop {
            let name = match self.peek().map(|l| &l.token) {
                None => {
                    self.error_at(open, "unclosed `{`");
                    return list;
                }
                Some(Token::Punct('}')) => {
                    self.bump();
                    return list;
                }
                Some(Token::Punct(',')) => {
                    self.bump();
                    continue;
                }
                Some(Token::Ident(n)) | Some(Token::Str(n)) => n.clone(),
                Some(_) => {
                    self.error_here("unexpected token in binding list");
                    let before = self.pos;
                    self.recover_until(&[',', '}']);
                    if self.pos == before {
                        self.error_at(open, "unclosed `{`");
                        return list;
                    }
                    continue;
                }
            };
            self.bump();

            let name = match self.current_ident() {
                Some(next) if name == "type" && next != "as" => {
                    let next = next.to_string();
                    self.bump();
                    next
                }
                _ => name,
            };
            let alias = if self.eat_word("as") {
                match self.peek().map(|l| &l.token) {
                    Some(Token::Ident(a)) | Some(Token::Str(a)) => {
                        let a = a.clone();
                        self.bump();
                        a
                    }
                    _ => {
                        self.error_here("expected name after `as`");
                        name.clone()
                    }
                }
            } else {
                name.clone()
            };
            list.push((name, alias));
        }
    }

    fn module_specifier(&mut self) -> Option<String> {
        match self.peek().map(|l| &l.token) {
            Some(Token::Str(module)) => {
                let module = module.clone();
                self.bump();
                Some(module)
            }
            _ => {
                self.error_here("expected module specifier");
                None
            }
        }
    }

    fn parse_import(&mut self) {
        self.bump();
        // `import(...)` and `import.meta`
        if self.at_punct('(') || self.at_punct('.') {
            return;
        }
        // `import x = require(...)`
        if self.current_ident().is_some() && self.nth_is_punct(1, '=') {
            self.skip_statement();
            return;
        }
        if self.at_word("type") && self.nth_ident(1) != Some("from") && !self.nth_is_punct(1, ',') {
            self.bump();
        }
        if matches!(self.peek().map(|l| &l.token), Some(Token::Str(_))) {
            self.bump();
            self.eat_punct(';');
            return;
        }

        let mut pending: Vec<(String, ImportedName)> = Vec::new();
        if let Some(alias) = self.current_ident().filter(|w| *w != "from") {
            pending.push((alias.to_string(), ImportedName::Default));
            self.bump();
            self.eat_punct(',');
        }
        if self.eat_punct('*') {
            if !self.eat_word("as") {
                self.error_here("expected `as` after `*`");
                return;
            }
            match self.current_ident() {
                Some(alias) => {
                    pending.push((alias.to_string(), ImportedName::Namespace));
                    self.bump();
                }
                None => {
                    self.error_here("expected namespace name");
                    return;
                }
            }
        } else if self.at_punct('{') {
            for (name, alias) in self.parse_binding_list() {
                let imported = if name == "default" {
                    ImportedName::Default
                } else {
                    ImportedName::Named(name)
                };
                pending.push((alias, imported));
            }
        }

        if !self.eat_word("from") {
            self.error_here("expected `from` in import declaration");
            return;
        }
        let Some(module) = self.module_specifier() else {
            return;
        };
        self.eat_punct(';');

        for (alias, imported) in pending {
            self.table.imports.push(ImportBinding {
                alias,
                imported,
                module: module.clone(),
            });
        }
    }

    fn parse_export(&mut self) {
        self.bump();
        let exported = Modifiers {
            exported: true,
            ..Modifiers::default()
        };

        if self.eat_word("default") {
            if self.starts_declaration(0) {
                self.parse_declaration(Modifiers {
                    is_default: true,
                    ..exported
                });
            } else if let Some(local) = self.current_ident().map(str::to_string) {
                let ends_statement = match self.nth(1) {
                    None => true,
                    Some(next) => next.is_punct(';') || next.line > self.toks[self.pos].line,
                };
                if ends_statement {
                    self.table.exports.push(ExportBinding::Local {
                        local,
                        exported: "default".to_string(),
                    });
                    self.bump();
                    self.eat_punct(';');
                }
            }
            return;
        }

        if self.starts_declaration(0) {
            self.parse_declaration(exported);
            return;
        }

        if self.at_word("type") && self.nth_is_punct(1, '{') {
            self.bump();
        }

        if self.eat_punct('*') {
            if self.eat_word("as") {
                // `export * as ns from ...` only re-exports a namespace object
                self.skip_statement();
                return;
            }
            if !self.eat_word("from") {
                self.error_here("expected `from` after `export *`");
                return;
            }
            if let Some(module) = self.module_specifier() {
                self.table.exports.push(ExportBinding::All { module });
            }
            self.eat_punct(';');
            return;
        }

        if self.at_punct('{') {
            let list = self.parse_binding_list();
            if self.eat_word("from") {
                let Some(module) = self.module_specifier() else {
                    return;
                };
                for (imported, exported) in list {
                    self.table.exports.push(ExportBinding::From {
                        imported,
                        exported,
                        module: module.clone(),
                    });
                }
            } else {
                for (local, exported) in list {
                    self.table.exports.push(ExportBinding::Local { local, exported });
                }
            }
            self.eat_punct(';');
        }
        // `export const`, `export function` and friends are left to the module loop
    }
}
