//! Plan runner - executes a SELECT pipeline over explicit relations.
//!
//! Stages run in a fixed order, each handing a fresh [`Relation`] to the
//! next: selection, join, aggregation, sort, projection. With a single input
//! the selection runs first; with several it runs on the join result, where
//! every qualified column is available.

use crate::ast::{AggregateSpec, Expr, JoinCondition, SortKey};
use crate::executor::{
    join_all, AggregateExecutor, FilterExecutor, ProjectExecutor, ProjectItem, Relation,
    SortExecutor,
};
use pipedb_core::{Error, Result, SpillConfig};
use tracing::{debug, info};

/// A SELECT statement's pipeline, with its inputs.
#[derive(Clone, Debug, Default)]
pub struct QueryPlan {
    /// Input relations, already aliased.
    pub relations: Vec<Relation>,
    /// Equi-join conditions between the inputs.
    pub join_conditions: Vec<JoinCondition>,
    /// WHERE predicate.
    pub filter: Option<Expr>,
    pub group_by: Vec<String>,
    pub aggregates: Vec<AggregateSpec>,
    pub order_by: Vec<SortKey>,
    /// Output columns. Empty keeps every column.
    pub projection: Vec<ProjectItem>,
}

impl QueryPlan {
    /// Creates a plan reading `relation`.
    pub fn scan(relation: Relation) -> Self {
        Self {
            relations: vec![relation],
            ..Self::default()
        }
    }

    /// Adds an input joined on `condition`.
    pub fn join(mut self, relation: Relation, condition: JoinCondition) -> Self {
        self.relations.push(relation);
        self.join_conditions.push(condition);
        self
    }

    /// Adds an extra join condition.
    pub fn on(mut self, condition: JoinCondition) -> Self {
        self.join_conditions.push(condition);
        self
    }

    /// Sets the WHERE predicate.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Sets the GROUP BY columns.
    pub fn group_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an aggregate.
    pub fn aggregate(mut self, spec: AggregateSpec) -> Self {
        self.aggregates.push(spec);
        self
    }

    /// Adds an ORDER BY key.
    pub fn order_by(mut self, key: SortKey) -> Self {
        self.order_by.push(key);
        self
    }

    /// Sets the output columns.
    pub fn project(mut self, items: Vec<ProjectItem>) -> Self {
        self.projection = items;
        self
    }

    fn is_aggregate(&self) -> bool {
        !self.aggregates.is_empty() || !self.group_by.is_empty()
    }
}

/// Runs [`QueryPlan`]s with one spill configuration.
#[derive(Clone, Debug, Default)]
pub struct PlanRunner {
    config: SpillConfig,
}

impl PlanRunner {
    /// Creates a runner whose join and sort stages use `config`.
    pub fn new(config: SpillConfig) -> Self {
        Self { config }
    }

    /// Returns the spill configuration.
    pub fn config(&self) -> &SpillConfig {
        &self.config
    }

    /// Executes a plan.
    pub fn run(&self, plan: QueryPlan) -> Result<Relation> {
        let aggregated = plan.is_aggregate();
        let QueryPlan {
            relations,
            join_conditions,
            filter,
            group_by,
            aggregates,
            order_by,
            projection,
        } = plan;

        info!(
            inputs = relations.len(),
            conditions = join_conditions.len(),
            filtered = filter.is_some(),
            aggregated,
            sort_keys = order_by.len(),
            "running plan"
        );

        let filter = match &filter {
            Some(expr) => FilterExecutor::new(expr)?,
            None => FilterExecutor::all(),
        };

        let mut relation = match relations.len() {
            0 => return Err(Error::invalid_plan("a query needs at least one relation")),
            1 => {
                let mut relations = relations;
                let relation = relations
                    .pop()
                    .ok_or_else(|| Error::invalid_plan("a query needs at least one relation"))?;
                if !join_conditions.is_empty() {
                    return Err(Error::invalid_plan(
                        "join conditions given for a single relation",
                    ));
                }
                filter.execute(relation)?
            }
            _ => {
                let joined = join_all(relations, &join_conditions, &self.config)?;
                filter.execute(joined)?
            }
        };
        debug!(relation = relation.name(), rows = relation.len(), "selection done");

        if aggregated {
            relation = AggregateExecutor::new(group_by, aggregates).execute(relation)?;
        }
        if !order_by.is_empty() {
            relation = SortExecutor::new(order_by, self.config.clone()).execute(relation)?;
        }
        if !projection.is_empty() {
            relation = ProjectExecutor::new(projection)?.execute(relation)?;
        }
        Ok(relation)
    }
}
