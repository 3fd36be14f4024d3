//! In-memory hash join.

use hashbrown::HashMap;
use pipedb_core::{Error, Result, Tuple};
use std::rc::Rc;

/// One input of a join: its rows and the position of its key column.
#[derive(Clone, Copy, Debug)]
pub struct JoinSide<'a> {
    /// Relation name, used in error messages.
    pub name: &'a str,
    /// Rows of the relation.
    pub rows: &'a [Rc<Tuple>],
    /// Position of the join key column.
    pub key: usize,
    /// Number of columns of the relation.
    pub arity: usize,
}

impl<'a> JoinSide<'a> {
    /// Reads the join key of a row.
    #[inline]
    pub fn key_of<'t>(&self, row: &'t Tuple) -> Result<&'t str> {
        row.get(self.key).ok_or_else(|| Error::JoinKeyMissing {
            relation: self.name.to_string(),
            position: self.key,
        })
    }
}

/// Hash join executor.
///
/// Implements the classic hash join algorithm:
/// 1. Build phase: create a hash table from the relation with fewer rows
/// 2. Probe phase: scan the other relation once and probe the hash table
///
/// Keys compare by their raw text. Output rows always carry the left
/// relation's fields first, whichever side was built.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashJoin;

impl HashJoin {
    /// Creates a hash join executor.
    pub fn new() -> Self {
        Self
    }

    /// Joins two sides, appending the output rows to `out`.
    pub fn execute_into(
        &self,
        left: JoinSide<'_>,
        right: JoinSide<'_>,
        out: &mut Vec<Rc<Tuple>>,
    ) -> Result<()> {
        let build_left = left.rows.len() <= right.rows.len();
        let (build, probe) = if build_left {
            (left, right)
        } else {
            (right, left)
        };

        // Build phase: borrowed keys, no per-row allocation
        let mut table: HashMap<&str, Vec<usize>> = HashMap::with_capacity(build.rows.len());
        for (idx, row) in build.rows.iter().enumerate() {
            table.entry(build.key_of(row)?).or_default().push(idx);
        }

        // Probe phase
        for probe_row in probe.rows {
            let Some(matches) = table.get(probe.key_of(probe_row)?) else {
                continue;
            };
            for &idx in matches {
                let build_row = &build.rows[idx];
                let joined = if build_left {
                    Tuple::concat(build_row, probe_row)
                } else {
                    Tuple::concat(probe_row, build_row)
                };
                out.push(Rc::new(joined));
            }
        }
        Ok(())
    }

    /// Joins two sides.
    pub fn execute(&self, left: JoinSide<'_>, right: JoinSide<'_>) -> Result<Vec<Rc<Tuple>>> {
        let mut out = Vec::new();
        self.execute_into(left, right, &mut out)?;
        Ok(out)
    }
}
