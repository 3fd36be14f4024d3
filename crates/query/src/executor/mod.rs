//! Query executor module.

mod aggregate;
mod filter;
pub mod join;
mod project;
mod relation;
mod runner;
mod sort;
pub mod spill;

pub use aggregate::{AggregateExecutor, GroupKey};
pub use filter::{select, FilterExecutor};
pub use join::{join_all, GraceHashJoin, HashJoin, JoinExecutor};
pub use project::{ProjectExecutor, ProjectItem};
pub use relation::Relation;
pub use runner::{PlanRunner, QueryPlan};
pub use sort::{SortExecutor, MERGE_FAN_IN};
pub use spill::ScratchSpace;
