//! Parser for filter query text.

use crate::error::ParseError;
use crate::predicate::{Condition, Predicate};
use crate::scanner::{Scanner, Token};

/// Parser turning filter text into a [`Predicate`].
///
/// # Grammar
///
/// ```text
/// predicate  ::= [ condition { condition } ] EOF
/// condition  ::= [ link ] [ "not" ] key operator expression
/// link       ::= "&" | "|"
/// key        ::= literal (non-empty)
/// operator   ::= "==" | "===" | "!=" | "!==" | "~=" | "~!"
///              | ">" | ">=" | "<" | "<="
/// expression ::= literal
/// ```
///
/// The first condition carries no link; evaluation combines conditions
/// strictly left to right. Tokens must be whitespace-separated — there is no
/// grouping and no precedence.
///
/// # Example
///
/// ```
/// use fql::Parser;
///
/// let predicate = Parser::new(r#"Title ~= "rust" & Score >= 5"#).parse().unwrap();
/// assert_eq!(predicate.len(), 2);
/// ```
pub struct Parser<'a> {
    scanner: Scanner<'a>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            scanner: Scanner::new(input),
        }
    }

    /// Parses the input into a predicate.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyQuery`] when the input was never written
    /// (whitespace-only input instead yields an empty predicate),
    /// [`ParseError::IllegalToken`] when the scanner rejects the input, and
    /// [`ParseError::UnexpectedToken`] / [`ParseError::EmptyKey`] when a
    /// condition is malformed.
    pub fn parse(mut self) -> Result<Predicate, ParseError> {
        if self.scanner.is_empty() {
            return Err(ParseError::EmptyQuery);
        }

        let mut predicate = Predicate::new();
        loop {
            let mut link = None;
            let mut negate = false;

            // Key position: link and negation prefixes may repeat before it.
            let key = loop {
                let (token, lexeme) = self.next_significant()?;
                match token {
                    Token::Eof => return Ok(predicate),
                    Token::Link(l) => link = Some(l),
                    Token::Not => negate = true,
                    Token::Literal(_) if lexeme.is_empty() => return Err(ParseError::EmptyKey),
                    Token::Literal(_) => break lexeme,
                    _ => return Err(ParseError::unexpected("key literal", token, lexeme)),
                }
            };

            let (token, lexeme) = self.next_significant()?;
            let operator = match token {
                Token::Eof => return Ok(predicate),
                Token::Op(op) => op,
                _ => return Err(ParseError::unexpected("operator", token, lexeme)),
            };

            let (token, expression) = self.next_significant()?;
            let expr_type = match token {
                Token::Eof => return Ok(predicate),
                Token::Literal(kind) => kind,
                _ => {
                    return Err(ParseError::unexpected(
                        "expression literal",
                        token,
                        expression,
                    ))
                }
            };

            predicate.add(Condition {
                link,
                negate,
                key,
                operator,
                expression,
                expr_type,
            });
        }
    }

    /// Next token with whitespace skipped; illegal tokens become errors.
    fn next_significant(&mut self) -> Result<(Token, String), ParseError> {
        loop {
            let (token, lexeme) = self.scanner.scan();
            match token {
                Token::Whitespace => continue,
                Token::Illegal => return Err(ParseError::IllegalToken { lexeme }),
                _ => return Ok((token, lexeme)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{CompareOp, LiteralKind, Link};

    #[test]
    fn test_parse_empty_input_is_empty_query() {
        assert_eq!(Parser::new("").parse(), Err(ParseError::EmptyQuery));
    }

    #[test]
    fn test_parse_whitespace_only_yields_empty_predicate() {
        let predicate = Parser::new("  \t\n ").parse().unwrap();
        assert!(predicate.is_empty());
    }

    #[test]
    fn test_parse_single_condition() {
        let predicate = Parser::new("age > 18").parse().unwrap();
        assert_eq!(predicate.len(), 1);

        let condition = &predicate.conditions()[0];
        assert_eq!(condition.link, None);
        assert!(!condition.negate);
        assert_eq!(condition.key, "age");
        assert_eq!(condition.operator, CompareOp::Gt);
        assert_eq!(condition.expression, "18");
        assert_eq!(condition.expr_type, LiteralKind::Int);
    }

    #[test]
    fn test_parse_linked_conditions() {
        let predicate = Parser::new(r#"Title ~= "go" & not Score >= 5"#).parse().unwrap();
        assert_eq!(predicate.len(), 2);

        let first = &predicate.conditions()[0];
        assert_eq!(first.link, None);
        assert!(!first.negate);
        assert_eq!(first.operator, CompareOp::Regex);
        assert_eq!(first.expr_type, LiteralKind::Str);

        let second = &predicate.conditions()[1];
        assert_eq!(second.link, Some(Link::And));
        assert!(second.negate);
        assert_eq!(second.key, "Score");
        assert_eq!(second.operator, CompareOp::Ge);
        assert_eq!(second.expression, "5");
        assert_eq!(second.expr_type, LiteralKind::Int);
    }

    #[test]
    fn test_parse_or_link() {
        let predicate = Parser::new("a == 1 | b == 2").parse().unwrap();
        assert_eq!(predicate.conditions()[1].link, Some(Link::Or));
    }

    #[test]
    fn test_parse_timestamp_expression() {
        let predicate = Parser::new("Published > '2023-01-01T00:00:00Z'")
            .parse()
            .unwrap();
        assert_eq!(predicate.conditions()[0].expr_type, LiteralKind::Time);
        assert_eq!(predicate.conditions()[0].expression, "2023-01-01T00:00:00Z");
    }

    #[test]
    fn test_parse_illegal_token() {
        assert_eq!(
            Parser::new("a = b").parse(),
            Err(ParseError::IllegalToken {
                lexeme: "=".to_string()
            })
        );
    }

    #[test]
    fn test_parse_operator_in_key_position() {
        let err = Parser::new("== b").parse().unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken {
                expected: "key literal",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_missing_operator() {
        let err = Parser::new("a b c").parse().unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                expected: "operator",
                token: Token::Literal(LiteralKind::Str),
                lexeme: "b".to_string(),
            }
        );
        assert_eq!(err.to_string(), "operator expected, got: (LITERAL|b)");
    }

    #[test]
    fn test_parse_link_in_expression_position() {
        let err = Parser::new("a == &").parse().unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken {
                expected: "expression literal",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_empty_key() {
        assert_eq!(Parser::new(r#""" == x"#).parse(), Err(ParseError::EmptyKey));
    }

    #[test]
    fn test_parse_trailing_partial_condition_is_dropped() {
        // Input ending mid-condition parses to the completed conditions only.
        let predicate = Parser::new("a == 1 & b >=").parse().unwrap();
        assert_eq!(predicate.len(), 1);
    }

    #[test]
    fn test_parse_repeated_prefixes() {
        // Repeated links keep the last one; `not` may precede or follow it.
        let predicate = Parser::new("a == 1 | & not b == 2").parse().unwrap();
        assert_eq!(predicate.conditions()[1].link, Some(Link::And));
        assert!(predicate.conditions()[1].negate);
    }

    #[test]
    fn test_parse_empty_expression_string_is_allowed() {
        let predicate = Parser::new(r#"a === """#).parse().unwrap();
        assert_eq!(predicate.conditions()[0].expression, "");
        assert_eq!(predicate.conditions()[0].expr_type, LiteralKind::Str);
    }
}
