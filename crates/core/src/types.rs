//! Data type definitions for pipedb.
//!
//! Every field of a tuple is stored as text; the declared type decides how the
//! text is compared and whether it takes part in arithmetic.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Declared column types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Whole numbers.
    Integer,
    /// Fixed-precision decimal numbers.
    Decimal,
    /// Text, compared lexicographically.
    Varchar,
}

impl DataType {
    /// Parses a DDL type name.
    ///
    /// Length and precision suffixes such as `varchar(32)` or `decimal(10,2)`
    /// are accepted and ignored.
    pub fn parse(name: &str) -> Option<Self> {
        let base = name
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "int" | "integer" | "bigint" | "smallint" | "long" => Some(DataType::Integer),
            "decimal" | "numeric" | "float" | "double" | "real" => Some(DataType::Decimal),
            "varchar" | "char" | "text" | "string" => Some(DataType::Varchar),
            _ => None,
        }
    }

    /// Returns whether values of this type compare and aggregate as numbers.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => f.write_str("INTEGER"),
            DataType::Decimal => f.write_str("DECIMAL"),
            DataType::Varchar => f.write_str("VARCHAR"),
        }
    }
}
