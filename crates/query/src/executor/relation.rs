//! Relation type consumed and produced by every operator.

use pipedb_core::schema::Schema;
use pipedb_core::{Error, Result, Tuple};
use std::io::{BufRead, Write};
use std::rc::Rc;

/// A named, schema-bearing sequence of tuples.
///
/// Rows are reference counted so that aliasing a relation (for a self-join)
/// shares row storage with the original. Operators never mutate rows; they
/// build new tuples and a new `Relation`.
#[derive(Clone, Debug)]
pub struct Relation {
    name: String,
    schema: Schema,
    rows: Vec<Rc<Tuple>>,
}

impl Relation {
    /// Creates an empty relation.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    /// Creates a relation from owned tuples, checking every tuple's arity.
    pub fn from_rows(name: impl Into<String>, schema: Schema, rows: Vec<Tuple>) -> Result<Self> {
        Self::from_shared(name, schema, rows.into_iter().map(Rc::new).collect())
    }

    /// Creates a relation from shared tuples, checking every tuple's arity.
    pub fn from_shared(
        name: impl Into<String>,
        schema: Schema,
        rows: Vec<Rc<Tuple>>,
    ) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|t| t.len() != schema.len()) {
            return Err(Error::invalid_tuple(format!(
                "tuple with {} fields does not fit a schema of {} columns",
                bad.len(),
                schema.len()
            )));
        }
        Ok(Self::assemble(name, schema, rows))
    }

    /// Builds a relation whose rows an operator has already shaped to `schema`.
    pub(crate) fn assemble(name: impl Into<String>, schema: Schema, rows: Vec<Rc<Tuple>>) -> Self {
        debug_assert!(rows.iter().all(|t| t.len() == schema.len()));
        Self {
            name: name.into(),
            schema,
            rows,
        }
    }

    /// Returns the relation name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the rows.
    #[inline]
    pub fn rows(&self) -> &[Rc<Tuple>] {
        &self.rows
    }

    /// Returns the number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the relation has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over the rows.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.rows.iter().map(|row| row.as_ref())
    }

    /// Consumes the relation, returning its rows.
    pub fn into_rows(self) -> Vec<Rc<Tuple>> {
        self.rows
    }

    /// Returns the same rows under a new alias.
    ///
    /// The schema is requalified to `alias` (and its column index rebuilt);
    /// row storage is shared with `self`.
    pub fn alias(&self, alias: &str) -> Self {
        Self {
            name: alias.to_string(),
            schema: self.schema.requalify(alias),
            rows: self.rows.clone(),
        }
    }

    /// Replaces the schema wholesale.
    pub fn with_schema(self, schema: Schema) -> Result<Self> {
        if schema.len() != self.schema.len() {
            return Err(Error::invalid_plan(format!(
                "cannot give {} a schema of {} columns, it has {}",
                self.name,
                schema.len(),
                self.schema.len()
            )));
        }
        Ok(Self { schema, ..self })
    }

    /// Renames the relation without touching its schema.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Estimated in-memory footprint of the rows in bytes.
    pub fn estimated_bytes(&self) -> usize {
        self.rows.iter().map(|t| t.estimated_bytes()).sum()
    }

    /// Returns every value of one column.
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let position = self.schema.resolve(name)?;
        self.rows
            .iter()
            .map(|t| {
                t.get(position)
                    .ok_or_else(|| Error::column_not_found(self.name.as_str(), name))
            })
            .collect()
    }

    /// Reads `|`-delimited lines into a relation.
    ///
    /// Blank lines are skipped for schemas of two or more columns, where they
    /// cannot be valid tuples.
    pub fn read_from<R: BufRead>(reader: R, name: impl Into<String>, schema: Schema) -> Result<Self> {
        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() && schema.len() > 1 {
                continue;
            }
            rows.push(Rc::new(Tuple::decode(&line, schema.len())?));
        }
        Ok(Self::assemble(name, schema, rows))
    }

    /// Writes the rows as `|`-delimited lines.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for row in &self.rows {
            writeln!(writer, "{}", row.encode()?)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.rows.len() == other.rows.len()
            && self.rows.iter().zip(&other.rows).all(|(a, b)| a == b)
    }
}

impl IntoIterator for Relation {
    type Item = Rc<Tuple>;
    type IntoIter = std::vec::IntoIter<Rc<Tuple>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Relation {
    type Item = &'a Rc<Tuple>;
    type IntoIter = std::slice::Iter<'a, Rc<Tuple>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
