//! Tokenizer for TypeScript-style sources
//!
//! The lexer is total: every input produces a token stream. Characters that
//! belong to no other token become single `Punct` tokens, and unterminated
//! literals or comments become `Error` tokens that the declaration parser
//! turns into diagnostics. Whitespace and comments are dropped.
//!
//! A `/` starts a regular expression literal only where an operand is
//! expected, which the lexer tracks from the previous token.

use chumsky::{
    error::Rich,
    extra::{self, SimpleState},
    primitive::{any, choice, just, none_of},
    span::SimpleSpan,
    IterParser as _, Parser,
};

/// A lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier or keyword; private names keep their `#`
    Ident(String),
    /// Quoted string literal with escapes resolved to the escaped character
    Str(String),
    /// Complete template literal
    Template,
    /// Regular expression literal, flags included
    Regex,
    Number(String),
    /// `=>`
    Arrow,
    /// `...`
    Ellipsis,
    Punct(char),
    Error(String),
}

/// A token with its byte span and 1-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub span: SimpleSpan,
    pub line: usize,
    pub column: usize,
}

impl Lexeme {
    pub fn ident(&self) -> Option<&str> {
        match &self.token {
            Token::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.token == Token::Punct(c)
    }
}

/// Byte offset to line/column conversion
pub struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, starts }
    }

    /// 1-based line and column (in characters) of a byte offset
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let start = self.starts[line];
        let column = self
            .text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset.saturating_sub(start));
        (line + 1, column + 1)
    }
}

/// Lexer state carried between tokens
#[derive(Debug, Clone, Copy)]
struct LexState {
    regex_allowed: bool,
}

type LexExtra<'src> = extra::Full<Rich<'src, char>, SimpleState<LexState>, ()>;

/// Whether a `/` after `token` begins a regular expression rather than a division
fn regex_may_follow(token: &Token) -> bool {
    match token {
        Token::Ident(word) => matches!(
            word.as_str(),
            "return" | "typeof" | "case" | "do" | "else" | "in" | "instanceof" | "new" | "delete"
                | "void" | "throw" | "yield" | "await" | "of"
        ),
        Token::Str(_) | Token::Template | Token::Regex | Token::Number(_) => false,
        Token::Punct(c) => !matches!(*c, ')' | ']'),
        Token::Arrow | Token::Ellipsis | Token::Error(_) => true,
    }
}

fn string_literal<'src>(quote: char) -> impl Parser<'src, &'src str, Token, LexExtra<'src>> + Clone {
    let escape = just('\\').ignore_then(any());
    let body = choice((escape, none_of([quote, '\\', '\n'])))
        .repeated()
        .collect::<String>();

    let closed = just(quote)
        .ignore_then(body.clone())
        .then_ignore(just(quote))
        .map(Token::Str);
    let unterminated = just(quote)
        .then(body)
        .to(Token::Error("unterminated string literal".to_string()));

    closed.or(unterminated)
}

fn template_literal<'src>() -> impl Parser<'src, &'src str, Token, LexExtra<'src>> + Clone {
    let body = choice((just('\\').then(any()).ignored(), none_of("\\`").ignored())).repeated();

    let closed = just('`')
        .then(body.clone())
        .then(just('`'))
        .to(Token::Template);
    let unterminated = just('`')
        .then(body)
        .to(Token::Error("unterminated template literal".to_string()));

    closed.or(unterminated)
}

/// `/body/flags` on a single line; a `/` inside a `[...]` class does not close it
fn regex_literal<'src>() -> impl Parser<'src, &'src str, Token, LexExtra<'src>> + Clone {
    let escape = just('\\').then(none_of('\n')).ignored();
    let class = just('[')
        .then(choice((escape, none_of("]\\\n").ignored())).repeated())
        .then(just(']'))
        .ignored();
    let body = choice((escape, class, none_of("/\\[\n").ignored()))
        .repeated()
        .at_least(1);
    let flags = any().filter(|c: &char| c.is_ascii_alphabetic()).repeated();

    just('/')
        .then(body)
        .then(just('/'))
        .then(flags)
        .try_map_with(|_, e: &mut chumsky::input::MapExtra<'src, '_, &'src str, LexExtra<'src>>| {
            if e.state().regex_allowed {
                Ok(Token::Regex)
            } else {
                Err(Rich::custom(e.span(), "division, not a regular expression"))
            }
        })
}

fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<(Option<Token>, SimpleSpan)>, LexExtra<'src>> {
    let whitespace = any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .at_least(1)
        .ignored();

    let line_comment = just("//")
        .then(any().and_is(just('\n').not()).repeated())
        .ignored();

    let block_comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .ignored();

    let trivia = choice((whitespace, line_comment, block_comment)).to(None::<Token>);

    let unterminated_comment = just("/*")
        .then(any().repeated())
        .to(Token::Error("unterminated block comment".to_string()));

    let ident_start = any().filter(|c: &char| c.is_alphabetic() || *c == '_' || *c == '$');
    let ident_continue = any().filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '$');
    let identifier = just('#')
        .or_not()
        .then(ident_start)
        .then(ident_continue.repeated())
        .to_slice()
        .map(|s: &str| Token::Ident(s.to_string()));

    let number = any()
        .filter(|c: &char| c.is_ascii_digit())
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
                .repeated(),
        )
        .to_slice()
        .map(|s: &str| Token::Number(s.to_string()));

    let operators = choice((just("=>").to(Token::Arrow), just("...").to(Token::Ellipsis)));

    let punct = any().map(Token::Punct);

    let token = choice((
        unterminated_comment,
        string_literal('"'),
        string_literal('\''),
        template_literal(),
        regex_literal(),
        identifier,
        number,
        operators,
        punct,
    ))
    .map(Some);

    trivia
        .or(token)
        .map_with(|tok, e| {
            if let Some(token) = &tok {
                e.state().regex_allowed = regex_may_follow(token);
            }
            (tok, e.span())
        })
        .repeated()
        .collect()
}

/// Tokenize `text`, dropping whitespace and comments
pub fn tokenize(text: &str) -> Vec<Lexeme> {
    let index = LineIndex::new(text);
    let mut state = SimpleState(LexState { regex_allowed: true });
    let (output, errors) = lexer().parse_with_state(text, &mut state).into_output_errors();

    let mut lexemes: Vec<Lexeme> = output
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(tok, span)| {
            tok.map(|token| {
                let (line, column) = index.position(span.start);
                Lexeme {
                    token,
                    span,
                    line,
                    column,
                }
            })
        })
        .collect();

    // The token rule ends in a catch-all, so chumsky errors only appear if
    // that invariant is broken. Surface them rather than losing input.
    for error in errors {
        let span = *error.span();
        let (line, column) = index.position(span.start);
        lexemes.push(Lexeme {
            token: Token::Error(error.to_string()),
            span,
            line,
            column,
        });
    }
    lexemes.sort_by_key(|l| l.span.start);

    lexemes
}
