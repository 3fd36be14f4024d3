//! Filter executor.

use crate::ast::{Expr, Token};
use crate::eval::Program;
use crate::executor::Relation;
use pipedb_core::Result;
use tracing::debug;

/// Filter executor - keeps the rows a predicate accepts.
///
/// Without a predicate every row passes. Evaluation errors, including a
/// column the schema does not have, abort the whole call.
#[derive(Clone, Debug, Default)]
pub struct FilterExecutor {
    program: Option<Program>,
}

impl FilterExecutor {
    /// Creates a new filter executor from an expression tree.
    pub fn new(predicate: &Expr) -> Result<Self> {
        Ok(Self {
            program: Some(Program::from_expr(predicate)?),
        })
    }

    /// Creates a filter from an infix token sequence.
    pub fn from_tokens(tokens: &[Token]) -> Result<Self> {
        Ok(Self {
            program: Some(Program::from_tokens(tokens)?),
        })
    }

    /// Creates a filter from infix predicate text.
    pub fn parse(input: &str) -> Result<Self> {
        Ok(Self {
            program: Some(Program::parse(input)?),
        })
    }

    /// A filter that keeps every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Executes the filter on the input relation.
    pub fn execute(&self, input: Relation) -> Result<Relation> {
        let Some(program) = &self.program else {
            return Ok(input);
        };
        let bound = program.bind(input.schema())?;

        let before = input.len();
        let name = input.name().to_string();
        let schema = input.schema().clone();
        let mut rows = Vec::new();
        for row in input {
            if bound.matches(&row)? {
                rows.push(row);
            }
        }
        debug!(relation = %name, before, after = rows.len(), "filter");

        Ok(Relation::assemble(name, schema, rows))
    }
}

/// Selects the rows of `relation` for which `predicate` holds.
///
/// `None` selects every row.
pub fn select(relation: Relation, predicate: Option<&Expr>) -> Result<Relation> {
    match predicate {
        Some(expr) => FilterExecutor::new(expr)?.execute(relation),
        None => Ok(relation),
    }
}
