//! Scratch files for the spilling join and sort paths.
//!
//! Every spilling call owns one [`ScratchSpace`]: a fresh directory created
//! under the configured scratch directory. The directory and everything in
//! it is removed when the space is dropped, so bucket and run files disappear
//! on every exit path, including errors. [`ScratchSpace::close`] does the same
//! on success but reports a failed delete.

use pipedb_core::{Error, Result, Tuple};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A per-call scratch directory.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Creates a fresh directory named `<prefix><random>` inside `parent`,
    /// creating `parent` first if needed.
    pub fn create(parent: &Path, prefix: &str) -> Result<Self> {
        fs::create_dir_all(parent).map_err(|e| Error::spill_file(parent, e))?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .map_err(|e| Error::spill_file(parent, e))?;
        Ok(Self { dir })
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a tuple file named `name` inside the space.
    pub fn writer(&self, name: &str) -> Result<TupleWriter> {
        TupleWriter::create(self.dir.path().join(name))
    }

    /// Removes the directory, reporting failures.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| Error::spill_file(path, e))
    }
}

/// A finished scratch file.
#[derive(Clone, Debug)]
pub struct SpillFile {
    path: PathBuf,
    rows: usize,
}

impl SpillFile {
    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of tuples written.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Opens the file for reading tuples of `arity` fields.
    pub fn reader(&self, arity: usize) -> Result<TupleReader> {
        let file = File::open(&self.path).map_err(|e| Error::spill_file(&self.path, e))?;
        Ok(TupleReader {
            path: self.path.clone(),
            lines: BufReader::new(file).lines(),
            arity,
        })
    }

    /// Reads the whole file back.
    pub fn read_all(&self, arity: usize) -> Result<Vec<Tuple>> {
        let mut rows = Vec::with_capacity(self.rows);
        for row in self.reader(arity)? {
            rows.push(row?);
        }
        Ok(rows)
    }
}

/// Buffered writer of `|`-delimited tuple lines.
#[derive(Debug)]
pub struct TupleWriter {
    path: PathBuf,
    inner: BufWriter<File>,
    rows: usize,
}

impl TupleWriter {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: PathBuf) -> Result<Self> {
        let file = File::create(&path).map_err(|e| Error::spill_file(&path, e))?;
        Ok(Self {
            path,
            inner: BufWriter::new(file),
            rows: 0,
        })
    }

    /// Appends one tuple.
    pub fn write(&mut self, tuple: &Tuple) -> Result<()> {
        let line = tuple.encode()?;
        writeln!(self.inner, "{line}").map_err(|e| Error::spill_file(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes and closes the file.
    pub fn finish(mut self) -> Result<SpillFile> {
        self.inner
            .flush()
            .map_err(|e| Error::spill_file(&self.path, e))?;
        Ok(SpillFile {
            path: self.path,
            rows: self.rows,
        })
    }
}

/// Iterator over the tuples of a scratch file.
#[derive(Debug)]
pub struct TupleReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    arity: usize,
}

impl Iterator for TupleReader {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        Some(
            line.map_err(|e| Error::spill_file(&self.path, e))
                .and_then(|line| Tuple::decode(&line, self.arity)),
        )
    }
}
