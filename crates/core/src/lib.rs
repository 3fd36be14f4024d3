//! pipedb Core - Core types and schema definitions for the pipedb executor.
//!
//! This crate provides the foundational types shared by every operator:
//!
//! - `DataType`: Declared column types (Integer, Decimal, Varchar)
//! - `Value`: Runtime values produced by expression evaluation
//! - `Tuple`: A row of text fields, with the `|` line codec
//! - `schema`: Qualified columns and the case-insensitive column index
//! - `SpillConfig`: Memory budget and scratch directory for spilling operators
//! - `Error`: Error taxonomy for operator calls
//!
//! # Example
//!
//! ```rust
//! use pipedb_core::{DataType, Tuple};
//! use pipedb_core::schema::{Column, Schema};
//!
//! let schema = Schema::new(vec![
//!     Column::new("emp.id", DataType::Integer),
//!     Column::new("emp.name", DataType::Varchar),
//! ]);
//!
//! let tuple = Tuple::decode("1|Alice", schema.len()).unwrap();
//!
//! assert_eq!(schema.resolve("EMP.NAME").unwrap(), 1);
//! assert_eq!(tuple.get(1), Some("Alice"));
//! ```

mod config;
mod error;
pub mod numeric;
pub mod schema;
mod tuple;
mod types;
mod value;

pub use config::{OverflowPolicy, SpillConfig};
pub use error::{Error, Result};
pub use tuple::{Tuple, DELIMITER};
pub use types::DataType;
pub use value::Value;
