//! Project executor.

use crate::ast::Expr;
use crate::eval::Program;
use crate::executor::Relation;
use pipedb_core::schema::{Column, Schema};
use pipedb_core::{Error, Result, Tuple};
use std::rc::Rc;

/// One output column of a projection.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectItem {
    /// Expression producing the column.
    pub expr: Expr,
    /// Output name. Defaults to the column name or the expression text.
    pub alias: Option<String>,
}

impl ProjectItem {
    /// Projects a column under its own name.
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            expr: Expr::column(name),
            alias: None,
        }
    }

    /// Projects an expression under an explicit name.
    pub fn expr(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }

    /// Renames the output column.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

enum Output<'p> {
    /// Copy a field verbatim.
    Field(usize),
    Computed(crate::eval::BoundProgram<'p>),
}

/// Project executor - computes the output columns of each row.
///
/// A bare column keeps its declared type and raw text. Other expressions are
/// evaluated per row: arithmetic yields Decimal columns, comparisons and text
/// yield Varchar.
pub struct ProjectExecutor {
    items: Vec<ProjectItem>,
    programs: Vec<Program>,
}

impl ProjectExecutor {
    /// Creates a new project executor.
    pub fn new(items: Vec<ProjectItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::invalid_plan("a projection needs at least one column"));
        }
        let programs = items
            .iter()
            .map(|item| Program::from_expr(&item.expr))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items, programs })
    }

    /// Projects the named columns.
    pub fn columns(names: &[&str]) -> Result<Self> {
        Self::new(names.iter().map(|n| ProjectItem::column(*n)).collect())
    }

    /// Executes the projection on the input relation.
    pub fn execute(&self, input: Relation) -> Result<Relation> {
        let mut columns = Vec::with_capacity(self.items.len());
        let mut outputs = Vec::with_capacity(self.items.len());

        for (item, program) in self.items.iter().zip(&self.programs) {
            let bound = program.bind(input.schema())?;
            match (item.expr.as_column(), bound.column_position()) {
                (Some(_), Some(position)) => {
                    let source = input.schema().column(position).ok_or_else(|| {
                        Error::column_not_found(input.name(), format!("#{position}"))
                    })?;
                    columns.push(match &item.alias {
                        Some(alias) => Column::new(alias.as_str(), source.data_type()),
                        None => source.clone(),
                    });
                    outputs.push(Output::Field(position));
                }
                _ => {
                    let name = item
                        .alias
                        .clone()
                        .unwrap_or_else(|| item.expr.to_string());
                    columns.push(Column::new(name, bound.result_type()));
                    outputs.push(Output::Computed(bound));
                }
            }
        }

        let rows = input
            .iter()
            .map(|row| {
                let fields = outputs
                    .iter()
                    .map(|output| match output {
                        Output::Field(position) => row
                            .get(*position)
                            .map(str::to_string)
                            .ok_or_else(|| Error::column_not_found(input.name(), format!("#{position}"))),
                        Output::Computed(bound) => bound.eval(row).map(|v| v.to_field()),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Rc::new(Tuple::new(fields)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Relation::assemble(input.name(), Schema::new(columns), rows))
    }
}
