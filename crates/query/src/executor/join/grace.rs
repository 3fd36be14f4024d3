//! Grace hash join: partition both inputs to disk, then join bucket pairs.

use super::hash::{HashJoin, JoinSide};
use crate::executor::spill::{ScratchSpace, SpillFile};
use pipedb_core::{Result, Tuple};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, trace};

/// Fewest buckets a spilling join uses.
pub const MIN_BUCKETS: usize = 2;
/// Most buckets a spilling join uses; bounds the number of open files.
pub const MAX_BUCKETS: usize = 256;

/// Picks a power-of-two bucket count so that each bucket of the build side
/// is expected to fit `budget`.
pub fn bucket_count(build_bytes: usize, budget: usize) -> usize {
    build_bytes
        .div_ceil(budget.max(1))
        .next_power_of_two()
        .clamp(MIN_BUCKETS, MAX_BUCKETS)
}

#[inline]
fn bucket_of(key: &str, buckets: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % buckets
}

/// Disk-partitioned hash join.
///
/// Both inputs are split into the same number of bucket files with one hash
/// function over the join key, so matching rows always land in buckets with
/// the same index. Bucket pairs are then joined in memory in index order.
#[derive(Clone, Copy, Debug)]
pub struct GraceHashJoin {
    buckets: usize,
}

impl GraceHashJoin {
    /// Creates a grace join with a fixed bucket count.
    pub fn new(buckets: usize) -> Self {
        Self {
            buckets: buckets.max(1),
        }
    }

    /// Creates a grace join sized for a build side of `build_bytes`.
    pub fn for_budget(build_bytes: usize, budget: usize) -> Self {
        Self::new(bucket_count(build_bytes, budget))
    }

    /// Returns the bucket count.
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// Joins two sides, writing bucket files under `scratch_dir`.
    ///
    /// The bucket files live in a directory of their own that is removed
    /// before this returns, whether the join succeeded or not.
    pub fn execute(
        &self,
        left: JoinSide<'_>,
        right: JoinSide<'_>,
        scratch_dir: &Path,
    ) -> Result<Vec<Rc<Tuple>>> {
        let scratch = ScratchSpace::create(scratch_dir, "pipedb-join-")?;
        debug!(
            buckets = self.buckets,
            dir = %scratch.path().display(),
            "partitioning join inputs"
        );

        let left_buckets = self.partition(&scratch, "left", left)?;
        let right_buckets = self.partition(&scratch, "right", right)?;

        let join = HashJoin::new();
        let mut out = Vec::new();
        for (bucket, (l, r)) in left_buckets.iter().zip(&right_buckets).enumerate() {
            if l.rows() == 0 || r.rows() == 0 {
                continue;
            }
            let left_rows: Vec<Rc<Tuple>> =
                l.read_all(left.arity)?.into_iter().map(Rc::new).collect();
            let right_rows: Vec<Rc<Tuple>> =
                r.read_all(right.arity)?.into_iter().map(Rc::new).collect();

            let before = out.len();
            join.execute_into(
                JoinSide {
                    rows: &left_rows,
                    ..left
                },
                JoinSide {
                    rows: &right_rows,
                    ..right
                },
                &mut out,
            )?;
            trace!(bucket, rows = out.len() - before, "joined bucket pair");
        }

        scratch.close()?;
        Ok(out)
    }

    fn partition(
        &self,
        scratch: &ScratchSpace,
        label: &str,
        side: JoinSide<'_>,
    ) -> Result<Vec<SpillFile>> {
        let mut writers = (0..self.buckets)
            .map(|bucket| scratch.writer(&format!("{label}-{bucket}")))
            .collect::<Result<Vec<_>>>()?;

        for row in side.rows {
            let bucket = bucket_of(side.key_of(row)?, self.buckets);
            writers[bucket].write(row)?;
        }

        writers.into_iter().map(|w| w.finish()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize, modulo: usize) -> Vec<Rc<Tuple>> {
        (0..n)
            .map(|i| {
                Rc::new(Tuple::new(vec![
                    (i % modulo).to_string(),
                    format!("v{i}"),
                ]))
            })
            .collect()
    }

    fn side<'a>(name: &'a str, rows: &'a [Rc<Tuple>]) -> JoinSide<'a> {
        JoinSide {
            name,
            rows,
            key: 0,
            arity: 2,
        }
    }

    fn sorted(mut rows: Vec<Rc<Tuple>>) -> Vec<Rc<Tuple>> {
        rows.sort();
        rows
    }

    #[test]
    fn test_bucket_count() {
        assert_eq!(bucket_count(0, 1024), MIN_BUCKETS);
        assert_eq!(bucket_count(3000, 1024), 4);
        assert_eq!(bucket_count(4096, 1024), 4);
        assert_eq!(bucket_count(4097, 1024), 8);
        assert_eq!(bucket_count(usize::MAX / 2, 1), MAX_BUCKETS);
        assert_eq!(bucket_count(10, 0), 16);
    }

    #[test]
    fn test_grace_matches_in_memory() {
        let left = rows(50, 7);
        let right = rows(30, 5);
        let dir = tempfile::tempdir().unwrap();

        let grace = GraceHashJoin::new(4)
            .execute(side("l", &left), side("r", &right), dir.path())
            .unwrap();
        let memory = HashJoin::new()
            .execute(side("l", &left), side("r", &right))
            .unwrap();

        assert!(!memory.is_empty());
        assert_eq!(sorted(grace), sorted(memory));
    }

    #[test]
    fn test_bucket_files_are_removed() {
        let left = rows(20, 3);
        let right = rows(20, 3);
        let dir = tempfile::tempdir().unwrap();

        GraceHashJoin::new(8)
            .execute(side("l", &left), side("r", &right), dir.path())
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_bucket_files_are_removed_on_error() {
        let left = vec![Rc::new(Tuple::from_strs(&["1", "bad|field"]))];
        let right = rows(5, 3);
        let dir = tempfile::tempdir().unwrap();

        let result = GraceHashJoin::new(2).execute(side("l", &left), side("r", &right), dir.path());
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
