//! Class, interface, enum and type alias declarations

use super::lexer::Token;
use super::parser::DeclParser;
use super::types::TypeCx;
use crate::core::{Member, Modifiers, Parameter, ReferenceRole, Symbol, SymbolKind, Visibility};

/// Modifier words that may precede a class member name
fn is_member_modifier(word: &str) -> bool {
    matches!(
        word,
        "public"
            | "protected"
            | "private"
            | "static"
            | "abstract"
            | "readonly"
            | "declare"
            | "override"
            | "accessor"
            | "async"
    )
}

impl DeclParser<'_> {
    /// Whether the token `n` ahead can start a member name
    fn nth_starts_member_name(&self, n: usize) -> bool {
        match self.nth(n).map(|l| &l.token) {
            Some(Token::Ident(_)) | Some(Token::Str(_)) | Some(Token::Number(_)) => true,
            Some(Token::Punct(c)) => matches!(c, '[' | '*'),
            _ => false,
        }
    }

    /// Enter a declaration: references found until `leave` belong to it
    fn enter(&mut self, symbol: &Symbol) -> (Option<String>, usize) {
        let saved = self.source.replace(symbol.qualified_name.clone());
        (saved, self.scope.len())
    }

    fn leave(&mut self, saved: (Option<String>, usize)) {
        self.source = saved.0;
        self.scope.truncate(saved.1);
    }

    fn declared_name(&mut self) -> Option<(String, usize)> {
        let line = self.peek()?.line;
        let name = self.current_ident()?.to_string();
        self.bump();
        Some((name, line))
    }

    pub(super) fn parse_class(&mut self, modifiers: Modifiers) {
        let line = self.peek().map(|l| l.line).unwrap_or(1);
        self.bump();

        let name = match self.current_ident() {
            Some("extends" | "implements") | None => None,
            Some(name) => Some(name.to_string()),
        };
        let Some(name) = name else {
            // class expression
            self.recover_until(&['{']);
            if self.at_punct('{') {
                self.skip_balanced();
            }
            return;
        };
        self.bump();

        let mut symbol = self.new_symbol(&name, SymbolKind::Class, line, modifiers);
        let saved = self.enter(&symbol);
        if self.at_punct('<') {
            symbol.type_parameters = self.parse_type_params();
            self.scope.extend(symbol.type_parameters.iter().cloned());
        }

        loop {
            if self.eat_word("extends") {
                self.parse_heritage(ReferenceRole::Extends);
            } else if self.eat_word("implements") {
                self.parse_heritage(ReferenceRole::Implements);
            } else {
                break;
            }
        }

        if self.at_punct('{') {
            self.parse_class_body(&mut symbol);
        } else {
            self.error_here(format!("expected `{{` after class `{}` header", name));
        }
        self.leave(saved);
        self.table.symbols.push(symbol);
    }

    fn parse_heritage(&mut self, role: ReferenceRole) {
        loop {
            let before = self.pos();
            self.parse_type(TypeCx::role(role));
            if self.pos() == before {
                self.error_here("expected a type name in heritage clause");
                return;
            }
            // mixin call: `extends Timestamped(Base)`
            if self.at_punct('(') {
                self.skip_balanced();
            }
            if !self.eat_punct(',') {
                return;
            }
        }
    }

    fn parse_class_body(&mut self, symbol: &mut Symbol) {
        let open = self.pos();
        self.bump();
        loop {
            match self.punct() {
                _ if self.peek().is_none() => {
                    self.error_at(open, "unclosed `{`");
                    return;
                }
                Some('}') => {
                    self.bump();
                    return;
                }
                Some(';' | ',') => {
                    self.bump();
                    continue;
                }
                Some(c @ (')' | ']')) => {
                    self.error_here(format!("unexpected `{}`", c));
                    self.bump();
                    continue;
                }
                Some('@') => {
                    self.skip_decorator();
                    continue;
                }
                _ => {}
            }
            if self.at_module_restart() {
                self.error_at(open, "unclosed `{`");
                return;
            }

            let before = self.pos();
            self.parse_class_member(symbol);
            if self.pos() == before {
                self.error_here("unexpected token in class body");
                if matches!(self.punct(), Some('{' | '(' | '[')) {
                    self.skip_balanced();
                } else {
                    self.bump();
                }
            }
        }
    }

    fn parse_class_member(&mut self, symbol: &mut Symbol) {
        let mut visibility = Visibility::Public;
        let (mut is_static, mut is_abstract, mut readonly) = (false, false, false);
        while let Some(word) = self.current_ident() {
            if word == "static" && self.nth_is_punct(1, '{') {
                self.bump();
                self.skip_balanced();
                return;
            }
            if !is_member_modifier(word) || !self.nth_starts_member_name(1) {
                break;
            }
            match word {
                "static" => is_static = true,
                "abstract" => is_abstract = true,
                "readonly" => readonly = true,
                other => {
                    if let Some(v) = Visibility::from_keyword(other) {
                        visibility = v;
                    }
                }
            }
            self.bump();
        }
        self.eat_punct('*');

        let accessor = match self.current_ident() {
            Some(word @ ("get" | "set")) if self.nth_starts_member_name(1) => Some(word == "get"),
            _ => None,
        };
        if accessor.is_some() {
            self.bump();
        }

        let Some(name) = self.parse_member_name() else {
            return;
        };
        if name.starts_with('#') {
            visibility = Visibility::Private;
        }
        let optional = self.eat_punct('?');
        self.eat_punct('!');

        let finish = move |member: Member| Member {
            visibility,
            is_static,
            is_abstract,
            readonly,
            optional,
            ..member
        };

        if let Some(is_getter) = accessor {
            let field = self.parse_accessor(name, is_getter);
            if !symbol.members.iter().any(|m| m.name == field.name) {
                symbol.members.push(finish(field));
            }
            return;
        }

        if self.at_punct('(') || self.at_punct('<') {
            let is_constructor = name == "constructor";
            let scope_len = self.scope.len();
            if self.at_punct('<') {
                let params = self.parse_type_params();
                self.scope.extend(params);
            }
            let (parameters, properties) =
                self.parse_params(TypeCx::role(ReferenceRole::Parameter), is_constructor);
            let return_type = if self.eat_punct(':') {
                Some(self.parse_type_text(TypeCx::role(ReferenceRole::ReturnType)))
            } else {
                None
            };
            self.scope.truncate(scope_len);
            self.skip_body_or_semicolon();

            let mut method = Member::method(name);
            method.parameters = parameters;
            method.type_text = return_type;
            symbol.members.push(finish(method));
            symbol.members.extend(properties);
            return;
        }

        let type_text = if self.eat_punct(':') {
            Some(self.parse_type_text(TypeCx::role(ReferenceRole::FieldType)))
        } else {
            None
        };
        if self.eat_punct('=') {
            self.skip_initializer();
        }
        self.eat_punct(';');

        let mut field = Member::field(name);
        field.type_text = type_text;
        symbol.members.push(finish(field));
    }

    /// `get x(): T` and `set x(v: T)` both surface as a field `x: T`
    fn parse_accessor(&mut self, name: String, is_getter: bool) -> Member {
        let mut field = Member::field(name);
        if is_getter {
            self.parse_params(TypeCx::role(ReferenceRole::Parameter), false);
            if self.eat_punct(':') {
                field.type_text = Some(self.parse_type_text(TypeCx::role(ReferenceRole::FieldType)));
            }
        } else {
            let (params, _) = self.parse_params(TypeCx::role(ReferenceRole::FieldType), false);
            field.type_text = params.into_iter().next().and_then(|p| p.type_text);
        }
        self.skip_body_or_semicolon();
        field
    }

    fn skip_body_or_semicolon(&mut self) {
        if self.at_punct('{') {
            self.skip_balanced();
        } else {
            self.eat_punct(';');
        }
    }

    fn parse_member_name(&mut self) -> Option<String> {
        let name = match self.peek().map(|l| &l.token)? {
            Token::Ident(name) | Token::Str(name) | Token::Number(name) => name.clone(),
            Token::Punct('[') => {
                let start = self.pos();
                self.skip_balanced();
                return Some(self.source_text(start, self.pos()));
            }
            _ => return None,
        };
        self.bump();
        Some(name)
    }

    /// Skip a field initializer up to `;`, the closing brace, or a line break
    /// that ends the expression
    fn skip_initializer(&mut self) {
        let start = self.pos();
        while self.peek().is_some() {
            match self.punct() {
                Some(';' | '}' | ')' | ']') => return,
                Some('{' | '(' | '[') => {
                    self.skip_balanced();
                    continue;
                }
                _ => {}
            }
            if self.pos() > start && self.newline_before() && !self.continues_expression() {
                return;
            }
            self.bump();
        }
    }

    fn continues_expression(&self) -> bool {
        let prev_open = self.previous().is_some_and(|l| match &l.token {
            Token::Punct(c) => "=+-*/%&|^!~?:,.<>".contains(*c),
            Token::Arrow => true,
            _ => false,
        });
        let next_joins = self.peek().is_some_and(|l| match &l.token {
            Token::Punct(c) => ".?:=+-*/%&|^<>".contains(*c),
            Token::Arrow => true,
            Token::Ident(word) => matches!(word.as_str(), "as" | "satisfies" | "instanceof" | "in"),
            _ => false,
        });
        prev_open || next_joins
    }

    /// Parameter list; returns parameters and, for constructors, the fields
    /// declared through parameter properties
    pub(super) fn parse_params(&mut self, cx: TypeCx, properties: bool) -> (Vec<Parameter>, Vec<Member>) {
        let mut params = Vec::new();
        let mut fields = Vec::new();
        if !self.at_punct('(') {
            self.error_here("expected `(`");
            return (params, fields);
        }
        let open = self.pos();
        self.bump();
        loop {
            match self.punct() {
                _ if self.peek().is_none() => {
                    self.error_at(open, "unclosed `(`");
                    break;
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
                    break;
                }
                Some('@') => {
                    self.skip_decorator();
                    continue;
                }
                _ => {}
            }

            let before = self.pos();
            let mut visibility = None;
            let mut readonly = false;
            while let Some(word) = self.current_ident() {
                let modifies_next = matches!(
                    self.nth(1).map(|l| &l.token),
                    Some(Token::Ident(_)) | Some(Token::Ellipsis) | Some(Token::Punct('{' | '['))
                );
                if !modifies_next {
                    break;
                }
                match word {
                    "readonly" => readonly = true,
                    "override" => {}
                    other => match Visibility::from_keyword(other) {
                        Some(v) => visibility = Some(v),
                        None => break,
                    },
                }
                self.bump();
            }
            let is_property = properties && (visibility.is_some() || readonly);

            let rest = self.eat_token(&Token::Ellipsis);
            let name = match self.peek().map(|l| &l.token) {
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    self.bump();
                    name
                }
                Some(Token::Punct('{' | '[')) => {
                    let start = self.pos();
                    self.skip_balanced();
                    self.source_text(start, self.pos())
                }
                _ => {
                    self.error_here("expected parameter name");
                    self.recover_until(&[',', ')']);
                    if self.pos() == before && !matches!(self.punct(), Some('}' | ']')) {
                        self.bump();
                    }
                    continue;
                }
            };
            let optional = self.eat_punct('?');

            let param_cx = if is_property && cx.role.is_some() {
                TypeCx::role(ReferenceRole::FieldType)
            } else {
                cx
            };
            let type_text = if self.eat_punct(':') {
                Some(self.parse_type_text(param_cx))
            } else {
                None
            };
            if self.eat_punct('=') {
                self.recover_until(&[',', ')']);
            }
            if !(self.at_punct(',') || self.at_punct(')')) {
                self.error_here("unexpected token in parameter list");
                self.recover_until(&[',', ')']);
            }

            if is_property {
                let mut field = Member::field(name.clone());
                field.visibility = visibility.unwrap_or_default();
                field.readonly = readonly;
                field.optional = optional;
                field.type_text = type_text.clone();
                fields.push(field);
            }
            params.push(Parameter {
                name,
                type_text,
                optional,
                rest,
            });
        }
        (params, fields)
    }

    /// `<T, U extends Base = Default>`; returns the parameter names
    pub(super) fn parse_type_params(&mut self) -> Vec<String> {
        let open = self.pos();
        self.bump();
        let mut names = Vec::new();
        loop {
            if self.peek().is_none() {
                self.error_at(open, "unclosed `<`");
                break;
            }
            if self.eat_punct('>') {
                break;
            }
            if self.eat_punct(',') {
                continue;
            }
            while matches!(self.current_ident(), Some("in" | "out" | "const"))
                && self.nth_ident(1).is_some()
            {
                self.bump();
            }
            match self.current_ident() {
                Some(name) => {
                    names.push(name.to_string());
                    self.bump();
                }
                None => {
                    self.error_here("expected type parameter name");
                    self.recover_until(&[',', '>']);
                    if !(self.at_punct(',') || self.at_punct('>')) {
                        break;
                    }
                    continue;
                }
            }
            if self.eat_word("extends") {
                self.parse_type(TypeCx::discard());
            }
            if self.eat_punct('=') {
                self.parse_type(TypeCx::discard());
            }
            if !(self.at_punct(',') || self.at_punct('>')) {
                self.error_here("unexpected token in type parameters");
                self.recover_until(&[',', '>']);
                if !(self.at_punct(',') || self.at_punct('>')) {
                    break;
                }
            }
        }
        names
    }

    pub(super) fn parse_interface(&mut self, modifiers: Modifiers) {
        self.bump();
        let Some((name, line)) = self.declared_name() else {
            self.error_here("expected interface name");
            return;
        };

        let mut symbol = self.new_symbol(&name, SymbolKind::Interface, line, modifiers);
        let saved = self.enter(&symbol);
        if self.at_punct('<') {
            symbol.type_parameters = self.parse_type_params();
            self.scope.extend(symbol.type_parameters.iter().cloned());
        }
        if self.eat_word("extends") {
            self.parse_heritage(ReferenceRole::Extends);
        }
        if self.at_punct('{') {
            self.parse_type_members(&mut symbol.members, None);
        } else {
            self.error_here(format!("expected `{{` after interface `{}` header", name));
        }
        self.leave(saved);
        self.table.symbols.push(symbol);
    }

    pub(super) fn parse_enum(&mut self, modifiers: Modifiers) {
        self.bump();
        let Some((name, line)) = self.declared_name() else {
            self.error_here("expected enum name");
            return;
        };
        let mut symbol = self.new_symbol(&name, SymbolKind::Enum, line, modifiers);
        if !self.at_punct('{') {
            self.error_here(format!("expected `{{` after enum `{}`", name));
            self.table.symbols.push(symbol);
            return;
        }

        let open = self.pos();
        self.bump();
        loop {
            let variant = match self.peek().map(|l| &l.token) {
                None => {
                    self.error_at(open, "unclosed `{`");
                    break;
                }
                Some(Token::Punct('}')) => {
                    self.bump();
                    break;
                }
                Some(Token::Punct(',')) => {
                    self.bump();
                    continue;
                }
                Some(Token::Ident(v)) | Some(Token::Str(v)) => v.clone(),
                Some(_) => {
                    self.error_here("unexpected token in enum body");
                    if matches!(self.punct(), Some('{' | '(' | '[')) {
                        self.skip_balanced();
                    } else {
                        self.bump();
                    }
                    continue;
                }
            };
            if self.at_module_restart() {
                self.error_at(open, "unclosed `{`");
                break;
            }
            self.bump();
            if self.eat_punct('=') {
                self.recover_until(&[',', '}']);
            }
            symbol.members.push(Member::variant(variant));
        }
        self.table.symbols.push(symbol);
    }

    pub(super) fn parse_type_alias(&mut self, modifiers: Modifiers) {
        self.bump();
        let Some((name, line)) = self.declared_name() else {
            self.error_here("expected type alias name");
            return;
        };
        let mut symbol = self.new_symbol(&name, SymbolKind::TypeAlias, line, modifiers);
        let saved = self.enter(&symbol);
        if self.at_punct('<') {
            symbol.type_parameters = self.parse_type_params();
            self.scope.extend(symbol.type_parameters.iter().cloned());
        }

        if !self.eat_punct('=') {
            self.error_here(format!("expected `=` in type alias `{}`", name));
        } else if self.at_punct('{') {
            self.parse_type_members(&mut symbol.members, None);
            while self.eat_punct('&') || self.eat_punct('|') {
                self.parse_type(TypeCx::discard());
            }
        } else {
            self.parse_type(TypeCx::discard());
        }
        self.eat_punct(';');
        self.leave(saved);
        self.table.symbols.push(symbol);
    }

    /// Members of an interface body or object type literal. With `inline`
    /// set, references take the enclosing type's context and members are
    /// only collected for the caller to discard.
    pub(super) fn parse_type_members(&mut self, members: &mut Vec<Member>, inline: Option<TypeCx>) {
        let open = self.pos();
        self.bump();
        loop {
            match self.punct() {
                _ if self.peek().is_none() => {
                    self.error_at(open, "unclosed `{`");
                    return;
                }
                Some('}') => {
                    self.bump();
                    return;
                }
                Some(';' | ',') => {
                    self.bump();
                    continue;
                }
                Some(c @ (')' | ']')) => {
                    if inline.is_some() {
                        self.error_at(open, "unclosed `{`");
                        return;
                    }
                    self.error_here(format!("unexpected `{}`", c));
                    self.bump();
                    continue;
                }
                _ => {}
            }
            if inline.is_none() && self.at_module_restart() {
                self.error_at(open, "unclosed `{`");
                return;
            }

            let before = self.pos();
            self.parse_type_member(members, inline);
            if self.pos() == before {
                self.error_here("unexpected token in type body");
                if matches!(self.punct(), Some('{' | '(' | '[')) {
                    self.skip_balanced();
                } else {
                    self.bump();
                }
            }
        }
    }

    fn parse_type_member(&mut self, members: &mut Vec<Member>, inline: Option<TypeCx>) {
        let cx_for = |role: ReferenceRole| inline.unwrap_or(TypeCx::role(role));

        // mapped type modifiers: `+readonly`, `-readonly`
        if (self.at_punct('+') || self.at_punct('-')) && self.nth_ident(1) == Some("readonly") {
            self.bump();
        }
        let mut readonly = false;
        if self.at_word("readonly") && self.nth_starts_member_name(1) {
            readonly = true;
            self.bump();
        }

        // call and construct signatures
        if self.at_word("new") && (self.nth_is_punct(1, '(') || self.nth_is_punct(1, '<')) {
            self.bump();
        }
        if self.at_punct('(') || self.at_punct('<') {
            let scope_len = self.scope.len();
            if self.at_punct('<') {
                let params = self.parse_type_params();
                self.scope.extend(params);
            }
            self.parse_params(cx_for(ReferenceRole::Parameter), false);
            if self.eat_punct(':') {
                self.parse_type(cx_for(ReferenceRole::ReturnType));
            }
            self.scope.truncate(scope_len);
            return;
        }

        // index signature `[key: string]: T` or mapped type `[K in keyof T]: V`
        let is_index = self.at_punct('[')
            && self.nth_ident(1).is_some()
            && (self.nth_is_punct(2, ':') || self.nth_ident(2) == Some("in"));
        if is_index {
            let scope_len = self.scope.len();
            if self.nth_ident(2) == Some("in") {
                self.bump();
                if let Some(key) = self.current_ident().map(str::to_string) {
                    self.scope.push(key);
                }
                self.bump();
                self.bump();
                self.parse_type(TypeCx::discard());
                if self.eat_word("as") {
                    self.parse_type(TypeCx::discard());
                }
                self.recover_until(&[']']);
                self.eat_punct(']');
            } else {
                self.skip_balanced();
            }
            if self.at_punct('+') || self.at_punct('-') {
                self.bump();
            }
            self.eat_punct('?');
            if self.eat_punct(':') {
                self.parse_type(cx_for(ReferenceRole::FieldType).many());
            }
            self.scope.truncate(scope_len);
            return;
        }

        let Some(name) = self.parse_member_name() else {
            return;
        };
        let optional = self.eat_punct('?');

        if self.at_punct('(') || self.at_punct('<') {
            let scope_len = self.scope.len();
            if self.at_punct('<') {
                let params = self.parse_type_params();
                self.scope.extend(params);
            }
            let (parameters, _) = self.parse_params(cx_for(ReferenceRole::Parameter), false);
            let return_type = if self.eat_punct(':') {
                Some(self.parse_type_text(cx_for(ReferenceRole::ReturnType)))
            } else {
                None
            };
            self.scope.truncate(scope_len);

            let mut method = Member::method(name);
            method.parameters = parameters;
            method.type_text = return_type;
            method.optional = optional;
            members.push(method);
            return;
        }

        let mut field = Member::field(name);
        if self.eat_punct(':') {
            field.type_text = Some(self.parse_type_text(cx_for(ReferenceRole::FieldType)));
        }
        field.optional = optional;
        field.readonly = readonly;
        members.push(field);
    }
}
