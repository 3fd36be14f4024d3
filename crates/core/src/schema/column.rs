//! Column definition for pipedb schemas.

use crate::types::DataType;

/// A column of a relation schema.
///
/// Names are qualified (`alias.column`) once a relation has been aliased or
/// joined; a freshly loaded relation may still carry bare names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    /// Column name, usually `relation.column`.
    name: String,
    /// Declared type.
    data_type: DataType,
}

impl Column {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    /// Creates a column named `qualifier.name`.
    pub fn qualified(qualifier: &str, name: &str, data_type: DataType) -> Self {
        Self::new(format!("{qualifier}.{name}"), data_type)
    }

    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the part of the name before the last `.`, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(q, _)| q)
    }

    /// Returns the part of the name after the last `.`.
    pub fn base_name(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, base)| base)
            .unwrap_or(&self.name)
    }

    /// Returns this column requalified to `alias`.
    pub fn requalify(&self, alias: &str) -> Self {
        Self::qualified(alias, self.base_name(), self.data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_parts() {
        let col = Column::new("emp.salary", DataType::Decimal);
        assert_eq!(col.name(), "emp.salary");
        assert_eq!(col.qualifier(), Some("emp"));
        assert_eq!(col.base_name(), "salary");
        assert_eq!(col.data_type(), DataType::Decimal);

        let bare = Column::new("salary", DataType::Decimal);
        assert_eq!(bare.qualifier(), None);
        assert_eq!(bare.base_name(), "salary");
    }

    #[test]
    fn test_requalify() {
        let col = Column::new("emp.salary", DataType::Decimal);
        let renamed = col.requalify("e2");
        assert_eq!(renamed.name(), "e2.salary");
        assert_eq!(renamed.data_type(), DataType::Decimal);
    }
}
