//! AST module for expressions and query clauses.

mod clause;
mod expr;
mod token;

pub use clause::{AggregateArg, AggregateFunc, AggregateSpec, JoinCondition, SortKey, SortOrder};
pub use expr::{BinaryOp, Expr};
pub use token::{parse_expr, parse_tokens, to_postfix, tokenize, Bracket, Token};
