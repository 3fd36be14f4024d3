//! Schema module for pipedb.
//!
//! A `Schema` is an ordered list of columns together with the case-insensitive
//! `ColumnIndex` built from it. Every way of producing a new schema (aliasing,
//! concatenation after a join, projection) rebuilds the index, so the two can
//! never drift apart.

mod column;
mod index;

pub use column::Column;
pub use index::ColumnIndex;

use crate::error::Result;
use crate::types::DataType;

/// Ordered column list with its column index.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    columns: Vec<Column>,
    index: ColumnIndex,
}

impl Schema {
    /// Creates a schema and builds its column index.
    pub fn new(columns: Vec<Column>) -> Self {
        let index = ColumnIndex::build(&columns);
        Self { columns, index }
    }

    /// Creates a schema whose columns are all qualified by `qualifier`.
    pub fn qualified(qualifier: &str, columns: &[(&str, DataType)]) -> Self {
        Self::new(
            columns
                .iter()
                .map(|(name, ty)| Column::qualified(qualifier, name, *ty))
                .collect(),
        )
    }

    /// Returns the columns.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column index.
    #[inline]
    pub fn index(&self) -> &ColumnIndex {
        &self.index
    }

    /// Returns the number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a column by position.
    pub fn column(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    /// Resolves a column reference to its position.
    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.index.resolve(name, &self.columns)
    }

    /// Resolves a column reference to its position and declared type.
    pub fn resolve_typed(&self, name: &str) -> Result<(usize, DataType)> {
        let position = self.resolve(name)?;
        Ok((position, self.columns[position].data_type()))
    }

    /// Returns the column names in order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Returns a copy of this schema with every column requalified to `alias`.
    pub fn requalify(&self, alias: &str) -> Self {
        Self::new(self.columns.iter().map(|c| c.requalify(alias)).collect())
    }

    /// Concatenates two schemas, left columns first.
    pub fn concat(left: &Schema, right: &Schema) -> Self {
        let mut columns = Vec::with_capacity(left.len() + right.len());
        columns.extend(left.columns.iter().cloned());
        columns.extend(right.columns.iter().cloned());
        Self::new(columns)
    }

    /// Returns the schema made of the named columns, in the given order.
    pub fn project(&self, names: &[&str]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| self.resolve(name).map(|p| self.columns[p].clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(columns))
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}
