//! Runtime values produced by expression evaluation.
//!
//! Tuples store text; a `Value` is what a field or literal becomes once its
//! declared type has been applied.

use crate::numeric::{self, Decimal};
use crate::types::DataType;
use core::cmp::Ordering;
use core::fmt;

/// A value produced while evaluating an expression against a tuple.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Result of a comparison or logical operator.
    Bool(bool),
    /// A numeric field or literal.
    Number(Decimal),
    /// A text field or string literal.
    Text(String),
    /// A field declared numeric whose text failed to parse.
    Unparsed(String),
}

impl Value {
    /// Interprets the text of a field according to its declared type.
    pub fn from_field(text: &str, data_type: DataType) -> Self {
        if data_type.is_numeric() {
            match numeric::parse_decimal(text) {
                Some(d) => Value::Number(d),
                None => Value::Unparsed(text.to_string()),
            }
        } else {
            Value::Text(text.to_string())
        }
    }

    /// Returns the boolean if this is a Bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number if this is a Number.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the value as a number, parsing text when it looks numeric.
    pub fn coerce_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(d) => Some(*d),
            Value::Text(s) => numeric::parse_decimal(s),
            Value::Bool(_) | Value::Unparsed(_) => None,
        }
    }

    /// Returns true for a numeric field that failed to parse.
    #[inline]
    pub fn is_unparsed(&self) -> bool {
        matches!(self, Value::Unparsed(_))
    }

    /// Type-aware comparison.
    ///
    /// Two numbers compare numerically. If either side is text the comparison
    /// is lexicographic, with a number rendered as field text first, so a
    /// Varchar field is never read as a number. Returns `None` for an unparsed
    /// field or a boolean against a non-boolean.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Unparsed(_), _) | (_, Value::Unparsed(_)) => None,
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Bool(_), _) | (_, Value::Bool(_)) => None,
            (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.as_str().cmp(b.as_str())),
            (Value::Text(a), Value::Number(b)) => {
                Some(a.as_str().cmp(numeric::format_plain(*b).as_str()))
            }
            (Value::Number(a), Value::Text(b)) => {
                Some(numeric::format_plain(*a).as_str().cmp(b.as_str()))
            }
        }
    }

    /// Renders the value as tuple field text.
    pub fn to_field(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Number(d) => numeric::format_plain(*d),
            Value::Text(s) | Value::Unparsed(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_field())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Decimal::from(i))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
