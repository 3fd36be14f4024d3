//! Error types for pipedb operator calls.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipedb operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for pipedb operator calls.
///
/// Every variant is a local failure of a single operator call. Operators never
/// return a partial relation alongside one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced column is absent from the schema.
    #[error("column {column} not found in {relation}")]
    ColumnNotFound { relation: String, column: String },

    /// A bare column name matches more than one qualified column.
    #[error("column reference {column} is ambiguous: {candidates:?}")]
    AmbiguousColumn {
        column: String,
        candidates: Vec<String>,
    },

    /// A field declared numeric does not parse as a number.
    #[error("malformed numeric value {value:?} in column {column}")]
    MalformedNumber { column: String, value: String },

    /// A tuple lacks the configured join column.
    #[error("tuple in {relation} has no join key at position {position}")]
    JoinKeyMissing { relation: String, position: usize },

    /// Memory budget exceeded and spilling is not possible.
    #[error("{operator} needs ~{required} bytes but the budget is {budget} bytes and no scratch directory is configured")]
    ResourceExhausted {
        operator: &'static str,
        required: usize,
        budget: usize,
    },

    /// Scratch file I/O failure.
    #[error("spill I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Scratch file I/O failure on a known path.
    #[error("spill I/O failed on {path}: {source}")]
    SpillFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed expression or token stream.
    #[error("invalid expression: {message}")]
    InvalidExpression { message: String },

    /// Division by zero during expression evaluation.
    #[error("division by zero")]
    DivisionByZero,

    /// Decimal arithmetic left the representable range.
    #[error("numeric overflow in {operation}")]
    NumericOverflow { operation: &'static str },

    /// A tuple that cannot be encoded or decoded.
    #[error("invalid tuple: {message}")]
    InvalidTuple { message: String },

    /// A plan that cannot be executed as given.
    #[error("invalid plan: {message}")]
    InvalidPlan { message: String },
}

impl Error {
    /// Creates a column not found error.
    pub fn column_not_found(relation: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            relation: relation.into(),
            column: column.into(),
        }
    }

    /// Creates a malformed number error.
    pub fn malformed_number(column: impl Into<String>, value: impl Into<String>) -> Self {
        Error::MalformedNumber {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Creates an invalid expression error.
    pub fn invalid_expression(message: impl Into<String>) -> Self {
        Error::InvalidExpression {
            message: message.into(),
        }
    }

    /// Creates an invalid tuple error.
    pub fn invalid_tuple(message: impl Into<String>) -> Self {
        Error::InvalidTuple {
            message: message.into(),
        }
    }

    /// Creates an invalid plan error.
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Error::InvalidPlan {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the scratch file it happened on.
    pub fn spill_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::SpillFile {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors caused by the memory budget.
    pub fn is_resource_error(&self) -> bool {
        matches!(self, Error::ResourceExhausted { .. })
    }

    /// Returns true for errors caused by scratch file I/O.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::Io(_) | Error::SpillFile { .. })
    }
}
