//! JOIN algorithm implementations.
//!
//! [`JoinExecutor`] picks the algorithm: an in-memory [`HashJoin`] when the
//! build side fits the memory budget, a [`GraceHashJoin`] over bucket files
//! when it does not and a scratch directory is configured, and otherwise
//! whatever the [`OverflowPolicy`] says.

mod grace;
mod hash;
mod multi;

pub use grace::{bucket_count, GraceHashJoin, MAX_BUCKETS, MIN_BUCKETS};
pub use hash::{HashJoin, JoinSide};
pub use multi::join_all;

use crate::executor::Relation;
use pipedb_core::schema::Schema;
use pipedb_core::{Error, OverflowPolicy, Result, SpillConfig};
use tracing::{debug, info, warn};

/// Equi-join of two relations on one column each.
#[derive(Clone, Debug)]
pub struct JoinExecutor {
    left_key: String,
    right_key: String,
    config: SpillConfig,
}

impl JoinExecutor {
    /// Creates a join on `left_key = right_key`.
    pub fn new(
        left_key: impl Into<String>,
        right_key: impl Into<String>,
        config: SpillConfig,
    ) -> Self {
        Self {
            left_key: left_key.into(),
            right_key: right_key.into(),
            config,
        }
    }

    /// Creates a join with the default spill configuration.
    pub fn in_memory(left_key: impl Into<String>, right_key: impl Into<String>) -> Self {
        Self::new(left_key, right_key, SpillConfig::default())
    }

    /// Executes the join.
    ///
    /// The output schema is the left schema followed by the right schema, and
    /// the output relation is named `<left>_<right>`.
    pub fn execute(&self, left: Relation, right: Relation) -> Result<Relation> {
        let left_pos = left.schema().resolve(&self.left_key)?;
        let right_pos = right.schema().resolve(&self.right_key)?;
        let schema = Schema::concat(left.schema(), right.schema());
        let name = format!("{}_{}", left.name(), right.name());

        let build = if left.len() <= right.len() {
            &left
        } else {
            &right
        };
        let build_bytes = build.estimated_bytes();
        let budget = self.config.memory_budget;

        let left_side = JoinSide {
            name: left.name(),
            rows: left.rows(),
            key: left_pos,
            arity: left.schema().len(),
        };
        let right_side = JoinSide {
            name: right.name(),
            rows: right.rows(),
            key: right_pos,
            arity: right.schema().len(),
        };

        let rows = if self.config.fits(build_bytes) {
            debug!(
                build = build.name(),
                build_rows = build.len(),
                left_rows = left.len(),
                right_rows = right.len(),
                "in-memory hash join"
            );
            HashJoin::new().execute(left_side, right_side)?
        } else if let Some(dir) = self.config.spill_dir() {
            let grace = GraceHashJoin::for_budget(build_bytes, budget);
            info!(
                build = build.name(),
                build_bytes,
                budget,
                buckets = grace.buckets(),
                "join build side exceeds memory budget, partitioning to disk"
            );
            grace.execute(left_side, right_side, dir)?
        } else {
            match self.config.overflow {
                OverflowPolicy::InMemory => {
                    warn!(
                        build = build.name(),
                        build_bytes,
                        budget,
                        "join build side exceeds memory budget and no scratch directory is set, joining in memory"
                    );
                    HashJoin::new().execute(left_side, right_side)?
                }
                OverflowPolicy::Fail => {
                    return Err(Error::ResourceExhausted {
                        operator: "join",
                        required: build_bytes,
                        budget,
                    })
                }
            }
        };

        Ok(Relation::assemble(name, schema, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipedb_core::{DataType, Tuple};

    fn emp() -> Relation {
        let schema = Schema::qualified(
            "emp",
            &[
                ("id", DataType::Integer),
                ("name", DataType::Varchar),
                ("dept_id", DataType::Integer),
            ],
        );
        Relation::from_rows(
            "emp",
            schema,
            vec![
                Tuple::from_strs(&["1", "Alice", "10"]),
                Tuple::from_strs(&["2", "Bob", "20"]),
                Tuple::from_strs(&["3", "Carol", "10"]),
                Tuple::from_strs(&["4", "Dan", "30"]),
            ],
        )
        .unwrap()
    }

    fn dept() -> Relation {
        let schema = Schema::qualified(
            "dept",
            &[("id", DataType::Integer), ("title", DataType::Varchar)],
        );
        Relation::from_rows(
            "dept",
            schema,
            vec![
                Tuple::from_strs(&["10", "Eng"]),
                Tuple::from_strs(&["20", "Ops"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_join_schema_and_rows() {
        let result = JoinExecutor::in_memory("emp.dept_id", "dept.id")
            .execute(emp(), dept())
            .unwrap();
        assert_eq!(result.name(), "emp_dept");
        assert_eq!(
            result.schema().names(),
            vec!["emp.id", "emp.name", "emp.dept_id", "dept.id", "dept.title"]
        );
        assert_eq!(result.len(), 3);
        assert_eq!(result.schema().resolve("dept.title").unwrap(), 4);
        assert!(result.iter().all(|t| t.get(2) == t.get(3)));
    }

    #[test]
    fn test_join_with_empty_relation() {
        let empty = Relation::new("dept", dept().schema().clone());
        let result = JoinExecutor::in_memory("emp.dept_id", "dept.id")
            .execute(emp(), empty)
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.schema().len(), 5);
    }

    #[test]
    fn test_unknown_key_column() {
        let err = JoinExecutor::in_memory("emp.missing", "dept.id")
            .execute(emp(), dept())
            .unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
    }

    #[test]
    fn test_over_budget_without_scratch_dir() {
        let config = SpillConfig::new(1).overflow(OverflowPolicy::Fail);
        let err = JoinExecutor::new("emp.dept_id", "dept.id", config)
            .execute(emp(), dept())
            .unwrap_err();
        assert!(err.is_resource_error());

        let config = SpillConfig::new(1);
        let result = JoinExecutor::new("emp.dept_id", "dept.id", config)
            .execute(emp(), dept())
            .unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_over_budget_spills() {
        let dir = tempfile::tempdir().unwrap();
        let config = SpillConfig::new(1).scratch_dir(dir.path());
        let result = JoinExecutor::new("emp.dept_id", "dept.id", config)
            .execute(emp(), dept())
            .unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
