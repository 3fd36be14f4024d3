//! Aggregate executor.

use crate::ast::{AggregateArg, AggregateFunc, AggregateSpec};
use crate::eval::{BoundProgram, Program};
use crate::executor::Relation;
use hashbrown::HashSet;
use indexmap::IndexMap;
use pipedb_core::numeric::{self, Decimal};
use pipedb_core::schema::{Column, Schema};
use pipedb_core::{DataType, Error, Result, Tuple, DELIMITER};
use std::rc::Rc;
use tracing::debug;

/// Composite value of the group-by columns of one row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey(Box<[String]>);

impl GroupKey {
    /// Returns the key components.
    pub fn values(&self) -> &[String] {
        &self.0
    }
}

/// Running state of one aggregate within one group.
#[derive(Clone, Debug)]
enum Accumulator {
    Sum(Decimal),
    Avg { sum: Decimal, count: u64 },
    Min(Option<Decimal>),
    Max(Option<Decimal>),
    Count(u64),
    CountDistinct(HashSet<String>),
}

impl Accumulator {
    fn new(func: AggregateFunc) -> Self {
        match func {
            AggregateFunc::Sum => Accumulator::Sum(Decimal::ZERO),
            AggregateFunc::Avg => Accumulator::Avg {
                sum: Decimal::ZERO,
                count: 0,
            },
            AggregateFunc::Min => Accumulator::Min(None),
            AggregateFunc::Max => Accumulator::Max(None),
            AggregateFunc::Count => Accumulator::Count(0),
            AggregateFunc::CountDistinct => Accumulator::CountDistinct(HashSet::new()),
        }
    }

    fn update(&mut self, input: &Input<'_>, row: &Tuple) -> Result<()> {
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::CountDistinct(seen) => {
                seen.insert(input.text(row)?);
            }
            Accumulator::Sum(sum) => *sum = numeric::checked_add(*sum, input.number(row)?)?,
            Accumulator::Avg { sum, count } => {
                *sum = numeric::checked_add(*sum, input.number(row)?)?;
                *count += 1;
            }
            Accumulator::Min(min) => {
                let value = input.number(row)?;
                *min = Some(min.map_or(value, |m| m.min(value)));
            }
            Accumulator::Max(max) => {
                let value = input.number(row)?;
                *max = Some(max.map_or(value, |m| m.max(value)));
            }
        }
        Ok(())
    }

    fn finalize(&self) -> Result<String> {
        let text = match self {
            Accumulator::Count(n) => n.to_string(),
            Accumulator::CountDistinct(seen) => seen.len().to_string(),
            Accumulator::Sum(sum) => numeric::format_scaled(*sum),
            Accumulator::Avg { count: 0, .. } => numeric::format_scaled(Decimal::ZERO),
            Accumulator::Avg { sum, count } => {
                numeric::format_scaled(numeric::checked_div(*sum, Decimal::from(*count))?)
            }
            Accumulator::Min(v) | Accumulator::Max(v) => {
                numeric::format_scaled(v.unwrap_or(Decimal::ZERO))
            }
        };
        Ok(text)
    }
}

/// Where an aggregate reads its per-row input from.
enum Input<'p> {
    /// `*`: the whole row.
    Row,
    /// A bare column: the raw field text.
    Column { position: usize, name: String },
    /// A computed expression, evaluated per row.
    Expr(BoundProgram<'p>),
}

impl Input<'_> {
    fn text(&self, row: &Tuple) -> Result<String> {
        match self {
            Input::Row => Ok(row.fields().join(DELIMITER.to_string().as_str())),
            Input::Column { position, name } => row
                .get(*position)
                .map(str::to_string)
                .ok_or_else(|| Error::column_not_found("tuple", name.as_str())),
            Input::Expr(program) => program.eval(row).map(|v| v.to_field()),
        }
    }

    fn number(&self, row: &Tuple) -> Result<Decimal> {
        match self {
            Input::Row => Err(Error::invalid_plan("only COUNT accepts *")),
            Input::Column { position, name } => {
                let text = row
                    .get(*position)
                    .ok_or_else(|| Error::column_not_found("tuple", name.as_str()))?;
                numeric::parse_field(name, text)
            }
            Input::Expr(program) => {
                let value = program.eval(row)?;
                value
                    .coerce_number()
                    .ok_or_else(|| Error::malformed_number("aggregate expression", value.to_field()))
            }
        }
    }
}

/// Aggregate executor - groups rows and computes aggregate functions.
///
/// Groups are emitted in the order their first row was seen. Without
/// GROUP BY columns the whole input is one group, so an empty input still
/// yields one row of zeros.
pub struct AggregateExecutor {
    /// Group by column names.
    group_by: Vec<String>,
    /// Aggregates to compute.
    aggregates: Vec<AggregateSpec>,
}

impl AggregateExecutor {
    /// Creates a new aggregate executor.
    pub fn new(group_by: Vec<String>, aggregates: Vec<AggregateSpec>) -> Self {
        Self {
            group_by,
            aggregates,
        }
    }

    /// Creates an aggregate executor with no grouping.
    pub fn no_group(aggregates: Vec<AggregateSpec>) -> Self {
        Self::new(Vec::new(), aggregates)
    }

    /// Parses textual aggregate calls such as `sum(t.b)` or `count(*)`.
    pub fn parse(group_by: &[&str], aggregates: &[&str]) -> Result<Self> {
        Ok(Self::new(
            group_by.iter().map(|c| c.to_string()).collect(),
            aggregates
                .iter()
                .map(|a| AggregateSpec::parse(a))
                .collect::<Result<_>>()?,
        ))
    }

    /// Returns the schema the aggregation produces for `input`.
    pub fn output_schema(&self, input: &Schema) -> Result<Schema> {
        let mut columns = Vec::with_capacity(self.group_by.len() + self.aggregates.len());
        for name in &self.group_by {
            let position = input.resolve(name)?;
            columns.extend(input.column(position).cloned());
        }
        for spec in &self.aggregates {
            let data_type = if spec.func.is_count() {
                DataType::Integer
            } else {
                DataType::Decimal
            };
            columns.push(Column::new(spec.output_name(), data_type));
        }
        Ok(Schema::new(columns))
    }

    /// Executes the aggregation on the input relation.
    pub fn execute(&self, input: Relation) -> Result<Relation> {
        let schema = self.output_schema(input.schema())?;
        let group_positions = self
            .group_by
            .iter()
            .map(|name| input.schema().resolve(name))
            .collect::<Result<Vec<_>>>()?;

        // Compiled once, bound once, replayed per row.
        let programs = self
            .aggregates
            .iter()
            .map(|spec| self.compile(spec))
            .collect::<Result<Vec<_>>>()?;
        let inputs = programs
            .iter()
            .map(|program| match program {
                None => Ok(Input::Row),
                Some(program) => {
                    let bound = program.bind(input.schema())?;
                    Ok(match bound.column_position() {
                        Some(position) => Input::Column {
                            position,
                            name: program.columns()[0].clone(),
                        },
                        None => Input::Expr(bound),
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let fresh = || -> Vec<Accumulator> {
            self.aggregates
                .iter()
                .map(|spec| Accumulator::new(spec.func))
                .collect()
        };

        let mut groups: IndexMap<GroupKey, Vec<Accumulator>> = IndexMap::new();
        if group_positions.is_empty() {
            groups.insert(GroupKey(Box::new([])), fresh());
        }

        for row in input.iter() {
            let key = group_positions
                .iter()
                .map(|&p| {
                    row.get(p).map(str::to_string).ok_or_else(|| {
                        Error::column_not_found(input.name(), format!("#{p}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let accumulators = groups
                .entry(GroupKey(key.into_boxed_slice()))
                .or_insert_with(fresh);
            for (acc, source) in accumulators.iter_mut().zip(&inputs) {
                acc.update(source, row)?;
            }
        }

        debug!(
            relation = input.name(),
            rows = input.len(),
            groups = groups.len(),
            "aggregation finished"
        );

        let rows = groups
            .into_iter()
            .map(|(key, accumulators)| {
                let mut fields = key.0.into_vec();
                for acc in &accumulators {
                    fields.push(acc.finalize()?);
                }
                Ok(Rc::new(Tuple::new(fields)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Relation::assemble(input.name(), schema, rows))
    }

    fn compile(&self, spec: &AggregateSpec) -> Result<Option<Program>> {
        match &spec.arg {
            AggregateArg::Wildcard if spec.func.is_count() => Ok(None),
            AggregateArg::Wildcard => Err(Error::invalid_plan(format!(
                "{} does not accept *",
                spec.func.name().to_ascii_uppercase()
            ))),
            AggregateArg::Expr(expr) => Program::from_expr(expr).map(Some),
        }
    }
}
