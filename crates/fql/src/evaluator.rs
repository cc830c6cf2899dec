//! Evaluation of parsed predicates against typed records.
//!
//! A record is a flat bag of named, typed fields. Callers either hand the
//! evaluator a map of [`FieldValue`]s or implement [`Record`] on their own
//! type to expose fields by name.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

use crate::error::EvaluateError;
use crate::predicate::{CompareOp, Condition, LiteralKind, Link, Predicate};
use crate::scanner;

/// A typed field value inside a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text.
    Str(String),
    /// Signed integer; narrower widths are promoted by the caller.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Floating point.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// An instant in time.
    Timestamp(DateTime<FixedOffset>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Uint(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value.fixed_offset())
    }
}

/// A record with named fields that can be looked up at evaluation time.
///
/// Lookup is exact-case. Returning `None` makes the evaluator fail the
/// record with [`EvaluateError::KeyNotFound`]; fields of types the filter
/// language cannot compare should simply be absent.
pub trait Record {
    /// Looks up a field by name.
    fn field(&self, name: &str) -> Option<FieldValue>;
}

impl Record for HashMap<String, FieldValue> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.get(name).cloned()
    }
}

impl Predicate {
    /// Evaluates the predicate against a map; keys are matched exact-case.
    ///
    /// Returns `false` when the predicate holds no conditions — callers that
    /// treat an empty predicate as pass-through gate on
    /// [`Predicate::is_empty`] first.
    pub fn check_map(&self, map: &HashMap<String, FieldValue>) -> Result<bool, EvaluateError> {
        self.check_struct(map)
    }

    /// Like [`Predicate::check_map`], but keys are matched case-insensitively.
    pub fn check_map_insensitive(
        &self,
        map: &HashMap<String, FieldValue>,
    ) -> Result<bool, EvaluateError> {
        let mut result = false;
        for condition in self.conditions() {
            let wanted = condition.key.to_lowercase();
            let value = map
                .iter()
                .find(|(key, _)| key.to_lowercase() == wanted)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| EvaluateError::KeyNotFound {
                    key: condition.key.clone(),
                })?;
            let outcome = self.check_value(condition, &value)?;
            result = combine(result, condition, outcome);
        }
        Ok(result)
    }

    /// Evaluates the predicate against any [`Record`]; lookup is exact-case.
    pub fn check_struct<R: Record + ?Sized>(&self, record: &R) -> Result<bool, EvaluateError> {
        let mut result = false;
        for condition in self.conditions() {
            let value = record
                .field(&condition.key)
                .ok_or_else(|| EvaluateError::KeyNotFound {
                    key: condition.key.clone(),
                })?;
            let outcome = self.check_value(condition, &value)?;
            result = combine(result, condition, outcome);
        }
        Ok(result)
    }

    fn check_value(&self, condition: &Condition, value: &FieldValue) -> Result<bool, EvaluateError> {
        match value {
            FieldValue::Str(s) => check_string(condition, s),
            FieldValue::Int(i) => check_int(condition, *i),
            FieldValue::Uint(u) => check_uint(condition, *u),
            FieldValue::Float(f) => check_float(condition, *f),
            FieldValue::Bool(b) => check_bool(condition, *b),
            FieldValue::Timestamp(t) => check_timestamp(condition, *t, self.date_formats()),
        }
    }
}

/// Folds a per-condition outcome into the running result: negation first,
/// then strict left-to-right combination through the condition's link.
fn combine(running: bool, condition: &Condition, outcome: bool) -> bool {
    let outcome = if condition.negate { !outcome } else { outcome };
    match condition.link {
        Some(Link::And) => running && outcome,
        Some(Link::Or) => running || outcome,
        None => outcome,
    }
}

/// String comparison. The expression is taken verbatim; case-insensitive
/// variants lowercase both sides. Ordered comparisons keep the expression as
/// the left operand. Regex operators compile the expression and test for a
/// match anywhere in the field.
fn check_string(condition: &Condition, field: &str) -> Result<bool, EvaluateError> {
    let expression = condition.expression.as_str();
    match condition.operator {
        CompareOp::Eq => Ok(expression == field),
        CompareOp::Neq => Ok(expression != field),
        CompareOp::EqCi => Ok(expression.to_lowercase() == field.to_lowercase()),
        CompareOp::NeqCi => Ok(expression.to_lowercase() != field.to_lowercase()),
        CompareOp::Gt => Ok(expression > field),
        CompareOp::Ge => Ok(expression >= field),
        CompareOp::Lt => Ok(expression < field),
        CompareOp::Le => Ok(expression <= field),
        CompareOp::Regex | CompareOp::NotRegex => {
            let regex = Regex::new(expression).map_err(|e| EvaluateError::Regex {
                message: e.to_string(),
            })?;
            let matched = regex.is_match(field);
            if condition.operator == CompareOp::Regex {
                Ok(matched)
            } else {
                Ok(!matched)
            }
        }
    }
}

fn check_int(condition: &Condition, field: i64) -> Result<bool, EvaluateError> {
    if condition.expr_type != LiteralKind::Int {
        return check_string(condition, &field.to_string());
    }
    let expression: i64 =
        condition
            .expression
            .parse()
            .map_err(|_| EvaluateError::InvalidInteger {
                literal: condition.expression.clone(),
            })?;
    compare_ordered(condition, field, expression, "integer")
}

fn check_uint(condition: &Condition, field: u64) -> Result<bool, EvaluateError> {
    if condition.expr_type != LiteralKind::Int {
        return check_string(condition, &field.to_string());
    }
    let expression: u64 =
        condition
            .expression
            .parse()
            .map_err(|_| EvaluateError::InvalidInteger {
                literal: condition.expression.clone(),
            })?;
    compare_ordered(condition, field, expression, "unsigned integer")
}

fn check_float(condition: &Condition, field: f64) -> Result<bool, EvaluateError> {
    if condition.expr_type != LiteralKind::Float {
        return check_string(condition, &format!("{field:.6}"));
    }
    let expression: f64 =
        condition
            .expression
            .parse()
            .map_err(|_| EvaluateError::InvalidFloat {
                literal: condition.expression.clone(),
            })?;
    compare_ordered(condition, field, expression, "float")
}

fn check_bool(condition: &Condition, field: bool) -> Result<bool, EvaluateError> {
    if condition.expr_type != LiteralKind::Bool {
        return check_string(condition, if field { "true" } else { "false" });
    }
    let expression = scanner::parse_bool(&condition.expression.to_lowercase()).ok_or_else(|| {
        EvaluateError::InvalidBoolean {
            literal: condition.expression.clone(),
        }
    })?;
    match condition.operator {
        CompareOp::Eq | CompareOp::EqCi => Ok(field == expression),
        CompareOp::Neq | CompareOp::NeqCi => Ok(field != expression),
        _ => Err(EvaluateError::UnsupportedOperator {
            operator: condition.operator,
            kind: "bool",
        }),
    }
}

fn check_timestamp(
    condition: &Condition,
    field: DateTime<FixedOffset>,
    formats: &[String],
) -> Result<bool, EvaluateError> {
    if condition.expr_type != LiteralKind::Time {
        return check_string(condition, &field.to_string());
    }
    let expression = parse_timestamp(&condition.expression, formats).ok_or_else(|| {
        EvaluateError::InvalidTimestamp {
            literal: condition.expression.clone(),
        }
    })?;
    compare_ordered(condition, field, expression, "time")
}

/// Ordered-type comparison shared by the numeric and timestamp paths. Both
/// equality pairs mean plain equality here; regex operators have no meaning.
fn compare_ordered<T: PartialOrd>(
    condition: &Condition,
    field: T,
    expression: T,
    kind: &'static str,
) -> Result<bool, EvaluateError> {
    match condition.operator {
        CompareOp::Eq | CompareOp::EqCi => Ok(field == expression),
        CompareOp::Neq | CompareOp::NeqCi => Ok(field != expression),
        CompareOp::Gt => Ok(field > expression),
        CompareOp::Ge => Ok(field >= expression),
        CompareOp::Lt => Ok(field < expression),
        CompareOp::Le => Ok(field <= expression),
        CompareOp::Regex | CompareOp::NotRegex => Err(EvaluateError::UnsupportedOperator {
            operator: condition.operator,
            kind,
        }),
    }
}

/// Tries each configured format in order; the first success wins. A format
/// without an offset is taken as UTC, and one without a time of day as
/// midnight UTC.
fn parse_timestamp(literal: &str, formats: &[String]) -> Option<DateTime<FixedOffset>> {
    for format in formats {
        if let Ok(t) = DateTime::parse_from_str(literal, format) {
            return Some(t);
        }
        if let Ok(t) = NaiveDateTime::parse_from_str(literal, format) {
            return Some(t.and_utc().fixed_offset());
        }
        if let Ok(d) = NaiveDate::parse_from_str(literal, format) {
            return Some(d.and_time(NaiveTime::MIN).and_utc().fixed_offset());
        }
    }
    None
}
