//! Type expression parsing
//!
//! Walks a type annotation and records every name that could refer to a
//! workspace declaration. Built-in names and type parameters in scope are
//! never recorded.

use super::lexer::Token;
use super::parser::DeclParser;
use crate::core::{Reference, ReferenceRole};

/// Names that never refer to a workspace declaration
const BUILTIN_TYPES: &[&str] = &[
    "any", "unknown", "never", "void", "undefined", "null", "string", "number", "boolean",
    "bigint", "symbol", "object", "this", "true", "false", "Object", "String", "Number",
    "Boolean", "Symbol", "BigInt", "Function", "Date", "RegExp", "Error", "Array",
    "ReadonlyArray", "Set", "ReadonlySet", "WeakSet", "Map", "ReadonlyMap", "WeakMap", "Record",
    "Promise", "PromiseLike", "Iterable", "AsyncIterable", "IterableIterator", "Partial",
    "Required", "Readonly", "Pick", "Omit", "Exclude", "Extract", "NonNullable", "ReturnType",
    "Parameters", "InstanceType", "ConstructorParameters", "Awaited", "ThisType", "Uppercase",
    "Lowercase", "Capitalize", "Uncapitalize", "ArrayBuffer", "DataView", "Uint8Array",
];

/// How a generic wraps its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    /// Not a collection
    None,
    /// Every argument is an element type
    All,
    /// Keyed collection; the value argument is the element type
    Value,
}

fn container_of(name: &str) -> Container {
    match name {
        "Array" | "ReadonlyArray" | "Set" | "ReadonlySet" | "WeakSet" | "Iterable"
        | "AsyncIterable" | "IterableIterator" | "Promise" | "PromiseLike" => Container::All,
        "Map" | "ReadonlyMap" | "WeakMap" | "Record" => Container::Value,
        _ => Container::None,
    }
}

/// Where the type being parsed appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TypeCx {
    /// `None` parses without recording references
    pub role: Option<ReferenceRole>,
    /// Inside a homogeneous container
    pub many: bool,
}

impl TypeCx {
    pub fn role(role: ReferenceRole) -> Self {
        Self {
            role: Some(role),
            many: false,
        }
    }

    pub fn discard() -> Self {
        Self {
            role: None,
            many: false,
        }
    }

    pub fn many(self) -> Self {
        Self { many: true, ..self }
    }
}

impl DeclParser<'_> {
    /// Parse a type and return its source text
    pub(super) fn parse_type_text(&mut self, cx: TypeCx) -> String {
        let start = self.pos();
        self.parse_type(cx);
        self.source_text(start, self.pos())
    }

    /// Parse a union, intersection or conditional type
    pub(super) fn parse_type(&mut self, cx: TypeCx) {
        let _ = self.eat_punct('|') || self.eat_punct('&');
        loop {
            let before = self.pos();
            self.parse_type_operand(cx);
            if self.pos() == before {
                return;
            }
            if self.eat_punct('|') || self.eat_punct('&') {
                continue;
            }
            break;
        }

        // `A extends B ? C : D`
        if self.at_word("extends") {
            self.bump();
            self.parse_type(cx);
            if self.eat_punct('?') {
                self.parse_type(cx);
                if self.eat_punct(':') {
                    self.parse_type(cx);
                }
            }
        }
    }

    fn parse_type_operand(&mut self, cx: TypeCx) {
        loop {
            match self.current_ident() {
                Some("keyof" | "readonly" | "unique" | "asserts") if self.nth(1).is_some() => {
                    self.bump()
                }
                Some("infer") => {
                    self.bump();
                    if self.current_ident().is_some() {
                        self.bump();
                    }
                    return;
                }
                Some("typeof") => {
                    self.bump();
                    self.skip_dotted_name();
                    if self.at_punct('(') {
                        self.skip_balanced();
                    }
                    return;
                }
                _ => break,
            }
        }

        let first_ref = self.table.references.len();
        match self.peek().map(|l| &l.token) {
            Some(Token::Punct('(')) => self.parse_parenthesized(cx),
            Some(Token::Punct('<')) => {
                let scope_len = self.scope.len();
                let params = self.parse_type_params();
                self.scope.extend(params);
                self.parse_parenthesized(cx);
                self.scope.truncate(scope_len);
            }
            Some(Token::Punct('{')) => {
                let mut discarded = Vec::new();
                self.parse_type_members(&mut discarded, Some(cx));
            }
            Some(Token::Punct('[')) => self.parse_tuple(cx),
            Some(Token::Str(_)) | Some(Token::Number(_)) | Some(Token::Template) => self.bump(),
            Some(Token::Punct('-')) if matches!(self.nth(1).map(|l| &l.token), Some(Token::Number(_))) => {
                self.bump();
                self.bump();
            }
            Some(Token::Ident(word)) if word == "new" || word == "abstract" => {
                self.bump();
                self.eat_word("new");
                if self.at_punct('<') {
                    let scope_len = self.scope.len();
                    let params = self.parse_type_params();
                    self.scope.extend(params);
                    self.parse_parenthesized(cx);
                    self.scope.truncate(scope_len);
                } else {
                    self.parse_parenthesized(cx);
                }
            }
            Some(Token::Ident(_)) => self.parse_type_reference(cx),
            _ => return,
        }

        // `T[]` and `T["key"]`
        while self.at_punct('[') && !self.newline_before() {
            if self.nth_is_punct(1, ']') {
                self.bump();
                self.bump();
                for reference in &mut self.table.references[first_ref..] {
                    reference.many = true;
                }
            } else {
                self.skip_balanced();
            }
        }
    }

    fn skip_dotted_name(&mut self) {
        while self.current_ident().is_some() {
            self.bump();
            if !self.eat_punct('.') {
                break;
            }
        }
    }

    fn parse_type_reference(&mut self, cx: TypeCx) {
        let first = self.pos();
        let mut name = String::new();
        while let Some(part) = self.current_ident() {
            name.push_str(part);
            self.bump();
            if self.at_punct('.') && self.nth_ident(1).is_some() {
                name.push('.');
                self.bump();
            } else {
                break;
            }
        }

        // `value is T` type predicate
        if self.at_word("is") && !self.newline_before() {
            self.bump();
            self.parse_type(cx);
            return;
        }

        self.record_reference(&name, first, cx);

        if self.at_punct('<') && !self.newline_before() {
            self.parse_type_arguments(cx, container_of(&name));
        }
    }

    fn parse_type_arguments(&mut self, cx: TypeCx, container: Container) {
        // `extends Base<Payload>` inherits from Base and only uses Payload
        let cx = match cx.role {
            Some(ReferenceRole::Extends | ReferenceRole::Implements) => TypeCx {
                role: Some(ReferenceRole::Parameter),
                ..cx
            },
            _ => cx,
        };
        let open = self.pos();
        self.bump();
        let mut index = 0;
        loop {
            if self.peek().is_none() {
                self.error_at(open, "unclosed `<`");
                return;
            }
            if self.eat_punct('>') {
                return;
            }
            if self.eat_punct(',') {
                index += 1;
                continue;
            }

            let arg_cx = match container {
                Container::All => cx.many(),
                Container::Value if index == 1 => cx.many(),
                _ => cx,
            };
            let before = self.pos();
            self.parse_type(arg_cx);
            if self.pos() == before || !(self.at_punct(',') || self.at_punct('>')) {
                self.error_here("unexpected token in type arguments");
                self.recover_until(&[',', '>']);
                if !(self.at_punct(',') || self.at_punct('>')) {
                    return;
                }
            }
        }
    }

    /// Parenthesized type or function type parameter list, plus the
    /// function's return type when `=>` follows
    fn parse_parenthesized(&mut self, cx: TypeCx) {
        if !self.at_punct('(') {
            self.error_here("expected `(`");
            return;
        }
        let first_ref = self.table.references.len();
        let open = self.pos();
        self.bump();
        loop {
            match self.punct() {
                _ if self.peek().is_none() => {
                    self.error_at(open, "unclosed `(`");
                    return;
                }
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(',') => {
                    self.bump();
                    continue;
                }
                Some('}' | ']') => {
                    self.error_at(open, "unclosed `(`");
                    return;
                }
                _ => {}
            }

            self.eat_token(&Token::Ellipsis);
            self.skip_element_label();
            let before = self.pos();
            self.parse_type(cx);
            // destructured parameter: `{ a, b }: Props`
            if self.eat_punct(':') {
                self.parse_type(cx);
            }
            if self.pos() == before || !(self.at_punct(',') || self.at_punct(')')) {
                self.error_here("unexpected token in parenthesized type");
                self.recover_until(&[',', ')']);
                if !(self.at_punct(',') || self.at_punct(')')) {
                    return;
                }
            }
        }

        if self.eat_token(&Token::Arrow) {
            // a callback's signature types are used, not owned
            for reference in &mut self.table.references[first_ref..] {
                if reference.role == ReferenceRole::FieldType {
                    reference.role = ReferenceRole::Parameter;
                }
            }
            let return_cx = TypeCx {
                role: cx.role.map(|role| match role {
                    ReferenceRole::FieldType => ReferenceRole::Parameter,
                    other => other,
                }),
                ..cx
            };
            self.parse_type(return_cx);
        }
    }

    fn parse_tuple(&mut self, cx: TypeCx) {
        let open = self.pos();
        self.bump();
        loop {
            match self.punct() {
                _ if self.peek().is_none() => {
                    self.error_at(open, "unclosed `[`");
                    return;
                }
                Some(']') => {
                    self.bump();
                    return;
                }
                Some(',') => {
                    self.bump();
                    continue;
                }
                Some('}' | ')') => {
                    self.error_at(open, "unclosed `[`");
                    return;
                }
                _ => {}
            }

            self.eat_token(&Token::Ellipsis);
            self.skip_element_label();
            let before = self.pos();
            self.parse_type(cx);
            self.eat_punct('?');
            if self.pos() == before || !(self.at_punct(',') || self.at_punct(']')) {
                self.error_here("unexpected token in tuple type");
                self.recover_until(&[',', ']']);
                if !(self.at_punct(',') || self.at_punct(']')) {
                    return;
                }
            }
        }
    }

    /// Skip `name:` or `name?:` in parameter lists and labeled tuples
    fn skip_element_label(&mut self) {
        if self.current_ident().is_none() {
            return;
        }
        if self.nth_is_punct(1, ':') {
            self.bump();
            self.bump();
        } else if self.nth_is_punct(1, '?') && self.nth_is_punct(2, ':') {
            self.bump();
            self.bump();
            self.bump();
        }
    }

    fn record_reference(&mut self, name: &str, token: usize, cx: TypeCx) {
        let (Some(role), Some(source)) = (cx.role, self.source.as_ref()) else {
            return;
        };
        let head = name.split('.').next().unwrap_or(name);
        if BUILTIN_TYPES.contains(&name) || self.scope.iter().any(|p| p == head) {
            return;
        }
        let Some((line, column)) = self.position_of(token) else {
            return;
        };
        self.table.references.push(Reference {
            source: source.clone(),
            name: name.to_string(),
            role,
            many: cx.many,
            line,
            column,
        });
    }
}
