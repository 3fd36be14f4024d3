//! Case-insensitive column index.

use super::Column;
use crate::error::{Error, Result};
use hashbrown::HashMap;

/// Maps qualified column names to their 0-based position.
///
/// Built from a column list and never edited afterwards; a schema change
/// produces a new index.
#[derive(Clone, Debug, Default)]
pub struct ColumnIndex {
    /// Lowercased full name to position.
    by_name: HashMap<String, usize>,
    /// Lowercased base name to every position carrying it.
    by_base: HashMap<String, Vec<usize>>,
}

impl ColumnIndex {
    /// Builds the index for a column list.
    pub fn build(columns: &[Column]) -> Self {
        let mut by_name = HashMap::with_capacity(columns.len());
        let mut by_base: HashMap<String, Vec<usize>> = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            // First occurrence wins for duplicate names.
            by_name
                .entry(column.name().to_ascii_lowercase())
                .or_insert(position);
            by_base
                .entry(column.base_name().to_ascii_lowercase())
                .or_default()
                .push(position);
        }
        Self { by_name, by_base }
    }

    /// Looks up a fully qualified name, ignoring case.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Resolves a column reference.
    ///
    /// A qualified name must match exactly (ignoring case). A bare name
    /// resolves when exactly one column carries it.
    pub fn resolve(&self, name: &str, columns: &[Column]) -> Result<usize> {
        if let Some(position) = self.get(name) {
            return Ok(position);
        }
        if name.contains('.') {
            return Err(Error::column_not_found(describe(columns), name));
        }
        match self.by_base.get(&name.to_ascii_lowercase()) {
            Some(positions) if positions.len() == 1 => Ok(positions[0]),
            Some(positions) => Err(Error::AmbiguousColumn {
                column: name.to_string(),
                candidates: positions
                    .iter()
                    .map(|&p| columns[p].name().to_string())
                    .collect(),
            }),
            None => Err(Error::column_not_found(describe(columns), name)),
        }
    }

    /// Returns the number of indexed names.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn describe(columns: &[Column]) -> String {
    let mut qualifiers: Vec<&str> = columns.iter().filter_map(Column::qualifier).collect();
    qualifiers.dedup();
    if qualifiers.is_empty() {
        "schema".into()
    } else {
        qualifiers.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("a.id", DataType::Integer),
            Column::new("a.name", DataType::Varchar),
            Column::new("b.id", DataType::Integer),
        ]
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let cols = columns();
        let index = ColumnIndex::build(&cols);
        assert_eq!(index.get("A.NAME"), Some(1));
        assert_eq!(index.resolve("b.Id", &cols).unwrap(), 2);
    }

    #[test]
    fn test_bare_name_resolution() {
        let cols = columns();
        let index = ColumnIndex::build(&cols);
        assert_eq!(index.resolve("name", &cols).unwrap(), 1);
        assert!(matches!(
            index.resolve("id", &cols),
            Err(Error::AmbiguousColumn { .. })
        ));
    }

    #[test]
    fn test_missing_column() {
        let cols = columns();
        let index = ColumnIndex::build(&cols);
        assert!(matches!(
            index.resolve("a.salary", &cols),
            Err(Error::ColumnNotFound { .. })
        ));
        assert!(matches!(
            index.resolve("salary", &cols),
            Err(Error::ColumnNotFound { .. })
        ));
    }
}
