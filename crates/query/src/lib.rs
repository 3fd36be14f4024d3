//! pipedb Query - Relational operators for the pipedb executor.
//!
//! This crate provides the query execution engine including:
//!
//! - `ast`: Expression trees, the token form, and aggregate, sort and join clauses
//! - `eval`: Postfix programs compiled from expressions and replayed per tuple
//! - `executor`: Operators (filter, project, join, aggregate, sort), the
//!   spill helpers, and the plan runner that chains them
//!
//! # Example
//!
//! ```rust
//! use pipedb_core::schema::Schema;
//! use pipedb_core::{DataType, SpillConfig, Tuple};
//! use pipedb_query::ast::{AggregateSpec, Expr, SortKey};
//! use pipedb_query::executor::{PlanRunner, QueryPlan, Relation};
//!
//! let schema = Schema::qualified(
//!     "t",
//!     &[("grp", DataType::Varchar), ("v", DataType::Integer)],
//! );
//! let rows = vec![
//!     Tuple::from_strs(&["A", "10"]),
//!     Tuple::from_strs(&["A", "20"]),
//!     Tuple::from_strs(&["B", "30"]),
//! ];
//! let relation = Relation::from_rows("t", schema, rows).unwrap();
//!
//! let plan = QueryPlan::scan(relation)
//!     .filter(Expr::gt(Expr::column("t.v"), Expr::int(5)))
//!     .group_by(["t.grp"])
//!     .aggregate(AggregateSpec::parse("sum(t.v)").unwrap())
//!     .order_by(SortKey::desc("t.grp"));
//!
//! let result = PlanRunner::new(SpillConfig::default()).run(plan).unwrap();
//! assert_eq!(result.column("t.grp").unwrap(), vec!["B", "A"]);
//! ```

pub mod ast;
pub mod eval;
pub mod executor;
