//! GROUP BY, ORDER BY and JOIN clause definitions.

use crate::ast::token::parse_expr;
use crate::ast::Expr;
use core::fmt;
use pipedb_core::{Error, Result};

/// Aggregate functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    Sum,
    Min,
    Max,
    Count,
    CountDistinct,
    Avg,
}

impl AggregateFunc {
    /// Resolves a textual function name.
    ///
    /// Accepts any letter case and the legacy spellings `count(distinct`,
    /// `count distinct` and `count_distinct`.
    pub fn parse(name: &str) -> Result<Self> {
        let normalized: String = name
            .trim()
            .trim_end_matches('(')
            .to_ascii_lowercase()
            .split(|c: char| c.is_whitespace() || c == '(' || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        match normalized.as_str() {
            "sum" => Ok(AggregateFunc::Sum),
            "min" => Ok(AggregateFunc::Min),
            "max" => Ok(AggregateFunc::Max),
            "count" => Ok(AggregateFunc::Count),
            "count distinct" => Ok(AggregateFunc::CountDistinct),
            "avg" | "average" => Ok(AggregateFunc::Avg),
            _ => Err(Error::invalid_plan(format!(
                "unknown aggregate function {name:?}"
            ))),
        }
    }

    /// Returns true for the functions that produce integer counts.
    pub fn is_count(self) -> bool {
        matches!(self, AggregateFunc::Count | AggregateFunc::CountDistinct)
    }

    /// Lowercase SQL name used in output column names.
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunc::Sum => "sum",
            AggregateFunc::Min => "min",
            AggregateFunc::Max => "max",
            AggregateFunc::Count | AggregateFunc::CountDistinct => "count",
            AggregateFunc::Avg => "avg",
        }
    }
}

/// Argument of an aggregate function.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregateArg {
    /// `*`
    Wildcard,
    /// A column reference or arithmetic expression.
    Expr(Expr),
}

impl fmt::Display for AggregateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateArg::Wildcard => f.write_str("*"),
            AggregateArg::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

/// One requested aggregation.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateSpec {
    pub func: AggregateFunc,
    pub arg: AggregateArg,
    /// Output column name; derived from the function and argument when unset.
    pub alias: Option<String>,
}

impl AggregateSpec {
    /// Creates an aggregation.
    pub fn new(func: AggregateFunc, arg: AggregateArg) -> Self {
        Self {
            func,
            arg,
            alias: None,
        }
    }

    /// Creates an aggregation over a single column.
    pub fn column(func: AggregateFunc, column: impl Into<String>) -> Self {
        Self::new(func, AggregateArg::Expr(Expr::column(column)))
    }

    /// Creates `COUNT(*)`.
    pub fn count_star() -> Self {
        Self::new(AggregateFunc::Count, AggregateArg::Wildcard)
    }

    /// Sets the output column name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Parses `func(arg)` text such as `sum(t.b)`, `count(*)` or
    /// `count(distinct t.b)`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let open = text
            .find('(')
            .ok_or_else(|| Error::invalid_plan(format!("{text:?} is not an aggregate call")))?;
        if !text.ends_with(')') {
            return Err(Error::invalid_plan(format!(
                "{text:?} is missing its closing parenthesis"
            )));
        }
        let mut func = AggregateFunc::parse(&text[..open])?;
        let mut inner = text[open + 1..text.len() - 1].trim();

        let lowered = inner.to_ascii_lowercase();
        if lowered.starts_with("distinct ") || lowered.starts_with("distinct(") {
            if func != AggregateFunc::Count {
                return Err(Error::invalid_plan(format!(
                    "DISTINCT is only supported with COUNT, got {text:?}"
                )));
            }
            func = AggregateFunc::CountDistinct;
            inner = inner["distinct".len()..].trim();
        }

        let arg = if inner == "*" {
            AggregateArg::Wildcard
        } else {
            AggregateArg::Expr(parse_expr(inner)?)
        };
        Ok(Self::new(func, arg))
    }

    /// Returns the output column name.
    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match self.func {
            AggregateFunc::CountDistinct => format!("count(distinct {})", self.arg),
            func => format!("{}({})", func.name(), self.arg),
        }
    }
}

/// Sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One ORDER BY key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

impl SortKey {
    /// Creates a sort key.
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Creates an ascending key.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Creates a descending key.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Parses `column [ASC|DESC]`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split_whitespace();
        let column = parts
            .next()
            .ok_or_else(|| Error::invalid_plan("empty ORDER BY entry"))?;
        let order = match parts.next().map(str::to_ascii_uppercase).as_deref() {
            None | Some("ASC") => SortOrder::Asc,
            Some("DESC") => SortOrder::Desc,
            Some(other) => {
                return Err(Error::invalid_plan(format!(
                    "unknown sort direction {other:?} in {text:?}"
                )))
            }
        };
        if parts.next().is_some() {
            return Err(Error::invalid_plan(format!(
                "unexpected trailing input in ORDER BY entry {text:?}"
            )));
        }
        Ok(Self::new(column, order))
    }
}

/// An equi-join condition between two qualified columns.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JoinCondition {
    pub left: String,
    pub right: String,
}

impl JoinCondition {
    /// Creates a join condition.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Parses `a.x = b.y`.
    pub fn parse(text: &str) -> Result<Self> {
        let (left, right) = text
            .split_once('=')
            .ok_or_else(|| Error::invalid_plan(format!("{text:?} is not an equi-join condition")))?;
        let (left, right) = (left.trim(), right.trim());
        if left.is_empty() || right.is_empty() {
            return Err(Error::invalid_plan(format!(
                "{text:?} is missing a join column"
            )));
        }
        Ok(Self::new(left, right))
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}
