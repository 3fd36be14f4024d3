//! Sort executor.
//!
//! Rows are decorated with their parsed sort keys and stable-sorted. Input
//! that outgrows the memory budget is cut into chunks, each chunk is sorted
//! and written as a run file, and the runs are merged back in key order (see
//! [`external`]).

mod external;

pub use external::MERGE_FAN_IN;

use crate::ast::{SortKey, SortOrder};
use crate::executor::Relation;
use core::cmp::Ordering;
use external::Runs;
use pipedb_core::numeric::{self, Decimal};
use pipedb_core::schema::Schema;
use pipedb_core::{DataType, Error, OverflowPolicy, Result, SpillConfig, Tuple};
use std::rc::Rc;
use tracing::{debug, warn};

/// Comparable form of one key field.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Number(Decimal),
    Text(String),
}

/// A key field together with its direction.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Directed {
    value: SortValue,
    desc: bool,
}

impl Ord for Directed {
    fn cmp(&self, other: &Self) -> Ordering {
        let ordering = self.value.cmp(&other.value);
        if self.desc {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl PartialOrd for Directed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A row with its extracted sort key.
#[derive(Debug)]
struct Keyed {
    key: Vec<Directed>,
    row: Rc<Tuple>,
}

/// One resolved key column.
#[derive(Clone, Debug)]
struct KeyColumn {
    name: String,
    position: usize,
    data_type: DataType,
    desc: bool,
}

/// Sort keys resolved against one schema.
#[derive(Clone, Debug)]
struct ResolvedKeys(Vec<KeyColumn>);

impl ResolvedKeys {
    fn resolve(keys: &[SortKey], schema: &Schema) -> Result<Self> {
        keys.iter()
            .map(|key| {
                let (position, data_type) = schema.resolve_typed(&key.column)?;
                Ok(KeyColumn {
                    name: key.column.clone(),
                    position,
                    data_type,
                    desc: key.order == SortOrder::Desc,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(ResolvedKeys)
    }

    /// Extracts the composite key of a row. Numeric columns must parse.
    fn extract(&self, row: &Tuple) -> Result<Vec<Directed>> {
        self.0
            .iter()
            .map(|column| {
                let text = row
                    .get(column.position)
                    .ok_or_else(|| Error::column_not_found("tuple", column.name.as_str()))?;
                let value = if column.data_type.is_numeric() {
                    SortValue::Number(numeric::parse_field(&column.name, text)?)
                } else {
                    SortValue::Text(text.to_string())
                };
                Ok(Directed {
                    value,
                    desc: column.desc,
                })
            })
            .collect()
    }
}

fn sort_chunk(chunk: &mut [Keyed]) {
    // Stable: rows with equal keys keep their input order.
    chunk.sort_by(|a, b| a.key.cmp(&b.key));
}

/// Sort executor - sorts rows by a list of keys.
///
/// Numeric columns compare as decimals and text columns lexicographically;
/// the first key that differs decides. Equal rows keep their input order.
pub struct SortExecutor {
    keys: Vec<SortKey>,
    config: SpillConfig,
}

impl SortExecutor {
    /// Creates a new sort executor.
    pub fn new(keys: Vec<SortKey>, config: SpillConfig) -> Self {
        Self { keys, config }
    }

    /// Creates a sort executor with the default spill configuration.
    pub fn in_memory(keys: Vec<SortKey>) -> Self {
        Self::new(keys, SpillConfig::default())
    }

    /// Parses ORDER BY entries such as `t.a` or `t.b DESC`.
    pub fn parse(keys: &[&str], config: SpillConfig) -> Result<Self> {
        let keys = keys
            .iter()
            .map(|k| SortKey::parse(k))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(keys, config))
    }

    /// Returns the sort keys.
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Sorts a relation.
    pub fn execute(&self, input: Relation) -> Result<Relation> {
        let name = input.name().to_string();
        let schema = input.schema().clone();
        self.sort_rows(name, schema, input.into_iter().map(Ok))
    }

    /// Sorts a stream of tuples without materializing it first.
    ///
    /// Only the current chunk is held in memory while reading; once the
    /// stream is exhausted the runs are merged into the result relation.
    pub fn execute_stream<I>(&self, name: &str, schema: Schema, rows: I) -> Result<Relation>
    where
        I: IntoIterator<Item = Result<Tuple>>,
    {
        let arity = schema.len();
        let rows = rows.into_iter().map(|row| {
            let row = row?;
            if row.len() != arity {
                return Err(Error::invalid_tuple(format!(
                    "tuple with {} fields does not fit a schema of {arity} columns",
                    row.len()
                )));
            }
            Ok(Rc::new(row))
        });
        self.sort_rows(name.to_string(), schema, rows)
    }

    fn sort_rows<I>(&self, name: String, schema: Schema, rows: I) -> Result<Relation>
    where
        I: Iterator<Item = Result<Rc<Tuple>>>,
    {
        let keys = ResolvedKeys::resolve(&self.keys, &schema)?;
        let budget = self.config.memory_budget;

        let mut chunk: Vec<Keyed> = Vec::new();
        let mut chunk_bytes = 0usize;
        let mut runs: Option<Runs> = None;
        let mut unbounded = false;

        for row in rows {
            let row = row?;
            chunk_bytes += row.estimated_bytes();
            chunk.push(Keyed {
                key: keys.extract(&row)?,
                row,
            });
            if unbounded || self.config.fits(chunk_bytes) {
                continue;
            }

            match self.config.spill_dir() {
                Some(dir) => {
                    if runs.is_none() {
                        runs = Some(Runs::create(dir, schema.len())?);
                    }
                    if let Some(runs) = runs.as_mut() {
                        runs.write_run(std::mem::take(&mut chunk))?;
                    }
                    chunk_bytes = 0;
                }
                None => match self.config.overflow {
                    OverflowPolicy::InMemory => {
                        warn!(
                            relation = %name,
                            budget,
                            "sort input exceeds memory budget and no scratch directory is set, sorting in memory"
                        );
                        unbounded = true;
                    }
                    OverflowPolicy::Fail => {
                        return Err(Error::ResourceExhausted {
                            operator: "sort",
                            required: chunk_bytes,
                            budget,
                        })
                    }
                },
            }
        }

        let rows = match runs {
            None => {
                debug!(relation = %name, rows = chunk.len(), "in-memory sort");
                sort_chunk(&mut chunk);
                chunk.into_iter().map(|k| k.row).collect()
            }
            Some(mut runs) => {
                if !chunk.is_empty() {
                    runs.write_run(chunk)?;
                }
                runs.merge(&keys)?
            }
        };

        Ok(Relation::assemble(name, schema, rows))
    }
}
