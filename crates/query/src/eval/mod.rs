//! Expression evaluation.
//!
//! Expressions are compiled once into a postfix [`Program`]; AND and OR
//! become conditional jumps so the right operand is skipped once the left one
//! decides the outcome. A program is bound to a schema before a scan and then
//! replayed per tuple with a value stack.

mod like;
mod program;

pub use like::LikePattern;
pub use program::{BoundProgram, Program};
