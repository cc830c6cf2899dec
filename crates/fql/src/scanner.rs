//! Scanner (tokenizer) for filter query text.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::predicate::{CompareOp, LiteralKind, Link};

/// A token produced by the [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// End of input; returned repeatedly once the input is exhausted.
    Eof,
    /// A run of consecutive whitespace characters, collapsed into one token.
    Whitespace,
    /// A comparison operator.
    Op(CompareOp),
    /// A boolean link (`&` or `|`).
    Link(Link),
    /// The negation keyword: the bare word `not`, case-insensitive.
    Not,
    /// A literal with its inferred (or, for quoted forms, forced) kind.
    Literal(LiteralKind),
    /// Malformed input.
    Illegal,
}

impl Token {
    /// True for any literal kind.
    pub fn is_literal(&self) -> bool {
        matches!(self, Token::Literal(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => f.write_str("EOF"),
            Token::Whitespace => f.write_str("WS"),
            Token::Op(op) => op.fmt(f),
            Token::Link(link) => link.fmt(f),
            Token::Not => f.write_str("LNK_NOT"),
            Token::Literal(kind) => kind.fmt(f),
            Token::Illegal => f.write_str("ILLEGAL"),
        }
    }
}

/// Streaming tokenizer over filter query text.
///
/// Reads the input character by character; [`Scanner::scan`] yields the next
/// token and its lexeme. Quote characters are not part of string lexemes, and
/// no token except [`Token::Whitespace`] ever carries surrounding whitespace.
pub struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    empty: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner over `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            empty: input.is_empty(),
        }
    }

    /// True if the scanner was constructed over an empty input, as opposed to
    /// one that has been consumed.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Consumes the next character if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    /// Returns the next token and its lexeme.
    pub fn scan(&mut self) -> (Token, String) {
        let Some(c) = self.chars.next() else {
            return (Token::Eof, String::new());
        };

        match c {
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        (Token::Op(CompareOp::Eq), "===".to_string())
                    } else {
                        (Token::Op(CompareOp::EqCi), "==".to_string())
                    }
                } else {
                    (Token::Illegal, c.to_string())
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        (Token::Op(CompareOp::Neq), "!==".to_string())
                    } else {
                        (Token::Op(CompareOp::NeqCi), "!=".to_string())
                    }
                } else {
                    (Token::Illegal, c.to_string())
                }
            }
            '~' => {
                if self.eat('=') {
                    (Token::Op(CompareOp::Regex), "~=".to_string())
                } else if self.eat('!') {
                    (Token::Op(CompareOp::NotRegex), "~!".to_string())
                } else {
                    (Token::Illegal, c.to_string())
                }
            }
            '>' => {
                if self.eat('=') {
                    (Token::Op(CompareOp::Ge), ">=".to_string())
                } else {
                    (Token::Op(CompareOp::Gt), c.to_string())
                }
            }
            '<' => {
                if self.eat('=') {
                    (Token::Op(CompareOp::Le), "<=".to_string())
                } else {
                    (Token::Op(CompareOp::Lt), c.to_string())
                }
            }
            '&' => (Token::Link(Link::And), c.to_string()),
            '|' => (Token::Link(Link::Or), c.to_string()),
            '"' | '\'' => self.scan_quoted(c),
            c if c.is_whitespace() => self.scan_whitespace(c),
            _ => self.scan_bare(c),
        }
    }

    /// Collapses a whitespace run into a single token.
    fn scan_whitespace(&mut self, first: char) -> (Token, String) {
        let mut lexeme = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            lexeme.push(c);
            self.chars.next();
        }
        (Token::Whitespace, lexeme)
    }

    /// Scans a quoted literal, processing `\\`, `\"` and `\'` escapes. The
    /// quote characters are not part of the lexeme. Single quotes force the
    /// timestamp kind regardless of content.
    fn scan_quoted(&mut self, quote: char) -> (Token, String) {
        let mut lexeme = String::new();
        loop {
            match self.chars.next() {
                None => return (Token::Illegal, lexeme),
                Some(c) if c == quote => break,
                Some('\\') => match self.chars.next() {
                    Some(escaped @ ('\\' | '"' | '\'')) => lexeme.push(escaped),
                    _ => return (Token::Illegal, lexeme),
                },
                Some(c) => lexeme.push(c),
            }
        }
        if quote == '\'' {
            (Token::Literal(LiteralKind::Time), lexeme)
        } else {
            (Token::Literal(LiteralKind::Str), lexeme)
        }
    }

    /// Scans an unquoted lexeme up to the next whitespace or end of input and
    /// infers its kind.
    fn scan_bare(&mut self, first: char) -> (Token, String) {
        let mut lexeme = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                break;
            }
            lexeme.push(c);
            self.chars.next();
        }

        if lexeme.to_lowercase() == "not" {
            return (Token::Not, lexeme);
        }
        (Token::Literal(infer_kind(&lexeme)), lexeme)
    }
}

/// Infers the kind of a bare lexeme: numeric forms first, then booleans,
/// everything else is a string.
fn infer_kind(lexeme: &str) -> LiteralKind {
    if let Some(kind) = numeric_kind(lexeme) {
        return kind;
    }
    if parse_bool(&lexeme.to_lowercase()).is_some() {
        return LiteralKind::Bool;
    }
    LiteralKind::Str
}

/// Numeric inference: an optional leading `-`, then decimal digits and dots.
/// Exactly one dot makes a float, none an integer. A lone `-` is not numeric.
fn numeric_kind(lexeme: &str) -> Option<LiteralKind> {
    let body = lexeme.strip_prefix('-').unwrap_or(lexeme);
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    match body.matches('.').count() {
        0 => Some(LiteralKind::Int),
        1 => Some(LiteralKind::Float),
        _ => None,
    }
}

/// Boolean literal rules, applied to lowercased text.
pub(crate) fn parse_bool(lowered: &str) -> Option<bool> {
    match lowered {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}
