//! Conditions and the predicate container.

use std::fmt;

/// Timestamp parse format every new [`Predicate`] accepts: RFC 3339 with a
/// mandatory offset (`Z` or `±HH:MM`), as a chrono format string.
pub const DEFAULT_DATE_FORMAT: &str = "%+";

/// Boolean combiner attaching a condition to its predecessor's running result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// The `&` link.
    And,
    /// The `|` link.
    Or,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Link::And => "LNK_AND",
            Link::Or => "LNK_OR",
        })
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==` equal, case-insensitive.
    EqCi,
    /// `===` equal.
    Eq,
    /// `!=` not equal, case-insensitive.
    NeqCi,
    /// `!==` not equal.
    Neq,
    /// `~=` matches regular expression.
    Regex,
    /// `~!` does not match regular expression.
    NotRegex,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::EqCi => "OP_EQI",
            CompareOp::Eq => "OP_EQ",
            CompareOp::NeqCi => "OP_NEQI",
            CompareOp::Neq => "OP_NEQ",
            CompareOp::Regex => "OP_RX",
            CompareOp::NotRegex => "OP_RXN",
            CompareOp::Gt => "OP_GT",
            CompareOp::Ge => "OP_GE",
            CompareOp::Lt => "OP_LT",
            CompareOp::Le => "OP_LE",
        })
    }
}

/// The kind inferred (or forced, for quoted forms) for a literal lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// Free text: double-quoted, or a bare lexeme matching nothing narrower.
    Str,
    /// Decimal integer, optional leading `-`.
    Int,
    /// Decimal number with exactly one `.`.
    Float,
    /// `true`/`false`/`t`/`f`, case-insensitive.
    Bool,
    /// Single-quoted lexeme; parsed as an instant at evaluation time.
    Time,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LiteralKind::Str => "LITERAL",
            LiteralKind::Int => "INTEGER",
            LiteralKind::Float => "FLOAT",
            LiteralKind::Bool => "BOOLEAN",
            LiteralKind::Time => "TIME",
        })
    }
}

/// One atomic comparison of a predicate.
///
/// A well-formed condition has a non-empty `key`; `link` is `None` only for
/// the first condition of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// How this condition combines with the running evaluation result.
    pub link: Option<Link>,
    /// Whether the per-condition boolean is inverted before combination.
    pub negate: bool,
    /// The record field name to look up (exact case).
    pub key: String,
    /// The comparison to apply.
    pub operator: CompareOp,
    /// The literal to compare against, in raw textual form.
    pub expression: String,
    /// The kind inferred for `expression`.
    pub expr_type: LiteralKind,
}

/// A parsed filter query: an ordered list of [`Condition`]s plus the set of
/// accepted timestamp parse formats.
///
/// Conditions are evaluated strictly left to right; there is no operator
/// precedence and no grouping. An empty predicate evaluates to `false` —
/// callers that want "no filter means pass everything" gate on
/// [`Predicate::is_empty`] before evaluating.
#[derive(Debug, Clone)]
pub struct Predicate {
    conditions: Vec<Condition>,
    date_formats: Vec<String>,
}

impl Predicate {
    /// Creates an empty predicate accepting RFC 3339 timestamps.
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            date_formats: vec![DEFAULT_DATE_FORMAT.to_string()],
        }
    }

    /// Appends a condition.
    pub fn add(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// The conditions in evaluation order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True if the predicate holds no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Appends an accepted timestamp parse format (a chrono format string).
    /// Formats are tried in insertion order; the first that parses wins.
    pub fn add_date_format(&mut self, format: impl Into<String>) {
        self.date_formats.push(format.into());
    }

    pub(crate) fn date_formats(&self) -> &[String] {
        &self.date_formats
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical text form: conditions in order, each rendered as
/// `<key> <OPERATOR>[<negate>] <expression> (<EXPR_TYPE>)`, preceded from the
/// second onward by ` <LINK> `.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                match condition.link {
                    Some(link) => write!(f, " {link} ")?,
                    None => f.write_str(" ")?,
                }
            }
            write!(
                f,
                "{} {}[{}] {} ({})",
                condition.key,
                condition.operator,
                condition.negate,
                condition.expression,
                condition.expr_type
            )?;
        }
        Ok(())
    }
}

/// Structural equality via the canonical text form. The date-format list does
/// not participate.
impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.to_string() == other.to_string()
    }
}

impl Eq for Predicate {}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(key: &str, operator: CompareOp, expression: &str, expr_type: LiteralKind) -> Condition {
        Condition {
            link: None,
            negate: false,
            key: key.to_string(),
            operator,
            expression: expression.to_string(),
            expr_type,
        }
    }

    #[test]
    fn test_display_single_condition() {
        let mut predicate = Predicate::new();
        predicate.add(condition("age", CompareOp::Gt, "18", LiteralKind::Int));

        assert_eq!(predicate.to_string(), "age OP_GT[false] 18 (INTEGER)");
    }

    #[test]
    fn test_display_linked_conditions() {
        let mut predicate = Predicate::new();
        predicate.add(condition("Title", CompareOp::Regex, "go", LiteralKind::Str));
        predicate.add(Condition {
            link: Some(Link::And),
            negate: true,
            key: "Score".to_string(),
            operator: CompareOp::Ge,
            expression: "5".to_string(),
            expr_type: LiteralKind::Int,
        });

        assert_eq!(
            predicate.to_string(),
            "Title OP_RX[false] go (LITERAL) LNK_AND Score OP_GE[true] 5 (INTEGER)"
        );
    }

    #[test]
    fn test_display_empty_predicate() {
        assert_eq!(Predicate::new().to_string(), "");
    }

    #[test]
    fn test_equality_is_structural() {
        let mut a = Predicate::new();
        a.add(condition("k", CompareOp::EqCi, "v", LiteralKind::Str));
        let mut b = Predicate::new();
        b.add(condition("k", CompareOp::EqCi, "v", LiteralKind::Str));

        assert_eq!(a, b);

        b.add(condition("k2", CompareOp::EqCi, "v", LiteralKind::Str));
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_ignores_date_formats() {
        let a = Predicate::new();
        let mut b = Predicate::new();
        b.add_date_format("%Y-%m-%d");

        assert_eq!(a, b);
    }

    #[test]
    fn test_len_and_is_empty() {
        let mut predicate = Predicate::new();
        assert!(predicate.is_empty());
        assert_eq!(predicate.len(), 0);

        predicate.add(condition("k", CompareOp::Lt, "1", LiteralKind::Int));
        assert!(!predicate.is_empty());
        assert_eq!(predicate.len(), 1);
    }

    #[test]
    fn test_operator_names() {
        let names: Vec<String> = [
            CompareOp::EqCi,
            CompareOp::Eq,
            CompareOp::NeqCi,
            CompareOp::Neq,
            CompareOp::Regex,
            CompareOp::NotRegex,
            CompareOp::Gt,
            CompareOp::Ge,
            CompareOp::Lt,
            CompareOp::Le,
        ]
        .iter()
        .map(|op| op.to_string())
        .collect();

        assert_eq!(
            names,
            vec![
                "OP_EQI", "OP_EQ", "OP_NEQI", "OP_NEQ", "OP_RX", "OP_RXN", "OP_GT", "OP_GE",
                "OP_LT", "OP_LE"
            ]
        );
    }
}
