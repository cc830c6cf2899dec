//! Filter query language for flat, typed records.
//!
//! A query is a whitespace-separated chain of conditions, each comparing one
//! named field of a record against a literal:
//!
//! ```text
//! Title ~= "rust" & not Score >= 5 | Published > '2023-01-01T00:00:00Z'
//! ```
//!
//! # Supported Syntax
//!
//! ## Comparison operators
//! - `==` / `!=` - equal / not equal, case-insensitive for strings
//! - `===` / `!==` - equal / not equal, case-sensitive
//! - `~=` / `~!` - matches / does not match a regular expression
//! - `>` `>=` `<` `<=` - ordered comparison
//!
//! ## Literals
//! - `"..."` - string (escapes: `\\`, `\"`, `\'`)
//! - `'...'` - timestamp; the quotes signal "parse me as an instant"
//! - bare lexemes - kind inferred: integer, float, boolean, or string
//!
//! ## Links
//! - `&` / `|` - AND / OR, combined strictly left to right (no precedence,
//!   no grouping)
//! - `not` - negates the condition that follows it
//!
//! Regular expressions use the [`regex`] crate's syntax.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use fql::FieldValue;
//!
//! let predicate = fql::parse(r#"Title ~= "rust" & Score >= 5"#).unwrap();
//!
//! let mut record = HashMap::new();
//! record.insert("Title".to_string(), FieldValue::from("Why rust?"));
//! record.insert("Score".to_string(), FieldValue::Int(7));
//!
//! assert!(predicate.check_map(&record).unwrap());
//! ```

mod error;
mod evaluator;
mod parser;
mod predicate;
mod scanner;

pub use error::{EvaluateError, ParseError};
pub use evaluator::{FieldValue, Record};
pub use parser::Parser;
pub use predicate::{
    CompareOp, Condition, LiteralKind, Link, Predicate, DEFAULT_DATE_FORMAT,
};
pub use scanner::{Scanner, Token};

/// Parses filter text into a [`Predicate`].
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse(input: &str) -> Result<Predicate, ParseError> {
    Parser::new(input).parse()
}
