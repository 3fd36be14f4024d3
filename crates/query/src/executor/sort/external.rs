//! Run files and the k-way merge behind the spilling sort.

use super::{sort_chunk, Directed, Keyed, ResolvedKeys};
use crate::executor::spill::{ScratchSpace, SpillFile, TupleReader};
use core::cmp::{Ordering, Reverse};
use pipedb_core::{Error, Result, Tuple};
use std::collections::BinaryHeap;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, trace};

/// Most runs merged at once. More runs are merged in several passes.
pub const MERGE_FAN_IN: usize = 64;

/// Sorted run files of one sort call.
pub(super) struct Runs {
    scratch: ScratchSpace,
    files: Vec<SpillFile>,
    arity: usize,
    next_id: usize,
}

impl Runs {
    pub(super) fn create(dir: &Path, arity: usize) -> Result<Self> {
        let scratch = ScratchSpace::create(dir, "pipedb-sort-")?;
        debug!(dir = %scratch.path().display(), "sort input exceeds memory budget, writing runs");
        Ok(Self {
            scratch,
            files: Vec::new(),
            arity,
            next_id: 0,
        })
    }

    /// Sorts a chunk and writes it as the next run.
    pub(super) fn write_run(&mut self, mut chunk: Vec<Keyed>) -> Result<()> {
        sort_chunk(&mut chunk);
        let mut writer = self.scratch.writer(&format!("run-{}", self.next_id))?;
        self.next_id += 1;
        for keyed in &chunk {
            writer.write(&keyed.row)?;
        }
        let file = writer.finish()?;
        trace!(run = self.files.len(), rows = file.rows(), "wrote sorted run");
        self.files.push(file);
        Ok(())
    }

    /// Merges every run into the final row order and removes the scratch
    /// directory.
    pub(super) fn merge(mut self, keys: &ResolvedKeys) -> Result<Vec<Rc<Tuple>>> {
        info!(runs = self.files.len(), "merging sorted runs");

        while self.files.len() > MERGE_FAN_IN {
            let mut next = Vec::with_capacity(self.files.len().div_ceil(MERGE_FAN_IN));
            for group in self.files.chunks(MERGE_FAN_IN) {
                let mut writer = self.scratch.writer(&format!("run-{}", self.next_id))?;
                self.next_id += 1;
                merge_runs(group, self.arity, keys, |row| writer.write(&row))?;
                next.push(writer.finish()?);
            }
            debug!(from = self.files.len(), to = next.len(), "merge pass");

            let merged = std::mem::replace(&mut self.files, next);
            for file in merged {
                fs::remove_file(file.path()).map_err(|e| Error::spill_file(file.path(), e))?;
            }
        }

        let mut out = Vec::with_capacity(self.files.iter().map(SpillFile::rows).sum());
        merge_runs(&self.files, self.arity, keys, |row| {
            out.push(Rc::new(row));
            Ok(())
        })?;
        self.scratch.close()?;
        Ok(out)
    }
}

/// The smallest unread row of one run.
struct Head {
    key: Vec<Directed>,
    run: usize,
    row: Tuple,
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head {}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal keys come out in run order, which keeps the sort stable.
        self.key
            .cmp(&other.key)
            .then_with(|| self.run.cmp(&other.run))
    }
}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn advance(
    reader: &mut TupleReader,
    run: usize,
    keys: &ResolvedKeys,
) -> Result<Option<Reverse<Head>>> {
    match reader.next() {
        Some(row) => {
            let row = row?;
            Ok(Some(Reverse(Head {
                key: keys.extract(&row)?,
                run,
                row,
            })))
        }
        None => Ok(None),
    }
}

/// Merges sorted runs, handing each row to `emit` in key order.
fn merge_runs<F>(files: &[SpillFile], arity: usize, keys: &ResolvedKeys, mut emit: F) -> Result<()>
where
    F: FnMut(Tuple) -> Result<()>,
{
    let mut readers = files
        .iter()
        .map(|f| f.reader(arity))
        .collect::<Result<Vec<_>>>()?;

    let mut heap = BinaryHeap::with_capacity(readers.len());
    for (run, reader) in readers.iter_mut().enumerate() {
        if let Some(head) = advance(reader, run, keys)? {
            heap.push(head);
        }
    }

    while let Some(Reverse(head)) = heap.pop() {
        let run = head.run;
        emit(head.row)?;
        if let Some(next) = advance(&mut readers[run], run, keys)? {
            heap.push(next);
        }
    }
    Ok(())
}
