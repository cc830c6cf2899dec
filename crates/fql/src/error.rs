//! Error types for parsing and evaluating filter queries.

use thiserror::Error;

use crate::predicate::CompareOp;
use crate::scanner::Token;

/// Errors produced while parsing filter text.
///
/// Parse errors are fatal to the query: no predicate is produced. The one
/// exception callers commonly special-case is [`ParseError::EmptyQuery`],
/// which signals that no filter text was supplied at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The input was never written; there is nothing to parse. Whitespace-only
    /// input does not raise this — it parses into an empty predicate.
    #[error("query is empty, nothing to parse")]
    EmptyQuery,

    /// The scanner produced a malformed token.
    #[error("illegal token: {lexeme}")]
    IllegalToken {
        /// The offending lexeme.
        lexeme: String,
    },

    /// A token of the wrong class arrived at the current parse position.
    #[error("{expected} expected, got: ({token}|{lexeme})")]
    UnexpectedToken {
        /// The class of token the parser demanded.
        expected: &'static str,
        /// The token that was received.
        token: Token,
        /// Its lexeme.
        lexeme: String,
    },

    /// A zero-length literal was supplied where a key was expected.
    #[error("empty literal not allowed as key")]
    EmptyKey,
}

impl ParseError {
    pub(crate) fn unexpected(expected: &'static str, token: Token, lexeme: String) -> Self {
        ParseError::UnexpectedToken {
            expected,
            token,
            lexeme,
        }
    }
}

/// Errors produced while evaluating a predicate against a record.
///
/// An evaluate error aborts evaluation of the current record only; it says
/// nothing about other records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluateError {
    /// The condition's key names no field of the record.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },

    /// The operator has no meaning for the field's type.
    #[error("operator {operator} unsupported for {kind} check")]
    UnsupportedOperator {
        /// The offending operator.
        operator: CompareOp,
        /// Name of the field type being compared.
        kind: &'static str,
    },

    /// The expression could not be parsed as an integer.
    #[error("invalid integer expression: {literal}")]
    InvalidInteger {
        /// The unparseable lexeme.
        literal: String,
    },

    /// The expression could not be parsed as a float.
    #[error("invalid float expression: {literal}")]
    InvalidFloat {
        /// The unparseable lexeme.
        literal: String,
    },

    /// The expression could not be parsed as a boolean.
    #[error("invalid boolean expression: {literal}")]
    InvalidBoolean {
        /// The unparseable lexeme.
        literal: String,
    },

    /// The expression matched none of the configured timestamp formats.
    #[error("timestamp expression '{literal}' matches no configured format")]
    InvalidTimestamp {
        /// The unparseable lexeme.
        literal: String,
    },

    /// The expression is not a valid regular expression.
    #[error("invalid regular expression: {message}")]
    Regex {
        /// The regex engine's diagnostic.
        message: String,
    },
}
