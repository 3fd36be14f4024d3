//! Compiled postfix programs.

use super::like::LikePattern;
use crate::ast::{parse_expr, parse_tokens, BinaryOp, Expr, Token};
use core::cmp::Ordering;
use pipedb_core::numeric::{self, Decimal};
use pipedb_core::schema::Schema;
use pipedb_core::{DataType, Error, Result, Tuple, Value};
use std::borrow::Cow;

/// One postfix instruction.
#[derive(Clone, Debug, PartialEq)]
enum Instr {
    /// Push a column value interpreted by its declared type.
    Column(usize),
    /// Push a column's raw field text.
    ColumnText(usize),
    Literal(Value),
    /// Pop two operands, push the result.
    Binary(BinaryOp),
    /// Pop one operand, push whether it matches.
    Like(LikePattern),
    /// Pop a boolean. If false, push it back and skip the next `n` instructions.
    JumpIfFalse(usize),
    /// Pop a boolean. If true, push it back and skip the next `n` instructions.
    JumpIfTrue(usize),
    /// Check that the right operand of AND/OR produced a boolean.
    AssertBool(BinaryOp),
}

/// An expression compiled to postfix form.
///
/// Column references are recorded by name and resolved against a schema by
/// [`Program::bind`], so one program can be replayed against every tuple of a
/// scan, or against relations with different layouts.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    instrs: Vec<Instr>,
    columns: Vec<String>,
}

impl Program {
    /// Compiles an expression tree.
    pub fn from_expr(expr: &Expr) -> Result<Self> {
        let mut compiler = Compiler::default();
        compiler.emit(expr)?;
        Ok(Self {
            instrs: compiler.instrs,
            columns: compiler.columns,
        })
    }

    /// Compiles an infix token sequence.
    pub fn from_tokens(tokens: &[Token]) -> Result<Self> {
        Self::from_expr(&parse_tokens(tokens)?)
    }

    /// Compiles infix expression text.
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_expr(&parse_expr(input)?)
    }

    /// Returns the distinct column names the program reads, in first-use order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of postfix instructions.
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Resolves every column reference against `schema`.
    pub fn bind(&self, schema: &Schema) -> Result<BoundProgram<'_>> {
        let slots = self
            .columns
            .iter()
            .map(|name| schema.resolve_typed(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(BoundProgram {
            program: self,
            slots,
        })
    }
}

#[derive(Default)]
struct Compiler {
    instrs: Vec<Instr>,
    columns: Vec<String>,
}

impl Compiler {
    fn slot(&mut self, name: &str) -> usize {
        match self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)) {
            Some(slot) => slot,
            None => {
                self.columns.push(name.to_string());
                self.columns.len() - 1
            }
        }
    }

    fn emit(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Column(name) => {
                let slot = self.slot(name);
                self.instrs.push(Instr::Column(slot));
            }
            Expr::Literal(value) => self.instrs.push(Instr::Literal(value.clone())),
            Expr::Binary {
                left,
                op: op @ (BinaryOp::And | BinaryOp::Or),
                right,
            } => {
                self.emit(left)?;
                let jump_at = self.instrs.len();
                self.instrs.push(Instr::JumpIfFalse(0));
                self.emit(right)?;
                self.instrs.push(Instr::AssertBool(*op));
                let skip = self.instrs.len() - jump_at - 1;
                self.instrs[jump_at] = if *op == BinaryOp::And {
                    Instr::JumpIfFalse(skip)
                } else {
                    Instr::JumpIfTrue(skip)
                };
            }
            Expr::Binary {
                left,
                op: BinaryOp::Like,
                right,
            } => {
                self.emit_text(left)?;
                self.emit_text(right)?;
                self.instrs.push(Instr::Binary(BinaryOp::Like));
            }
            Expr::Binary { left, op, right } => {
                self.emit(left)?;
                self.emit(right)?;
                self.instrs.push(Instr::Binary(*op));
            }
            Expr::Like { expr, pattern } => {
                self.emit_text(expr)?;
                self.instrs.push(Instr::Like(LikePattern::compile(pattern)?));
            }
        }
        Ok(())
    }

    // LIKE matches the stored text, not the parsed number.
    fn emit_text(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Column(name) => {
                let slot = self.slot(name);
                self.instrs.push(Instr::ColumnText(slot));
                Ok(())
            }
            other => self.emit(other),
        }
    }
}

/// A program whose columns are resolved to positions of one schema.
#[derive(Clone, Debug)]
pub struct BoundProgram<'p> {
    program: &'p Program,
    slots: Vec<(usize, DataType)>,
}

impl<'p> BoundProgram<'p> {
    /// Evaluates the program against one tuple.
    pub fn eval(&self, tuple: &Tuple) -> Result<Value> {
        let instrs = &self.program.instrs;
        let mut stack: Vec<Value> = Vec::with_capacity(instrs.len());
        let mut pc = 0;

        while pc < instrs.len() {
            match &instrs[pc] {
                Instr::Column(slot) => {
                    let (text, data_type) = self.field(tuple, *slot)?;
                    stack.push(Value::from_field(text, data_type));
                }
                Instr::ColumnText(slot) => {
                    let (text, _) = self.field(tuple, *slot)?;
                    stack.push(Value::Text(text.to_string()));
                }
                Instr::Literal(value) => stack.push(value.clone()),
                Instr::Binary(op) => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    stack.push(apply(*op, left, right)?);
                }
                Instr::Like(pattern) => {
                    let value = pop(&mut stack)?;
                    stack.push(Value::Bool(pattern.is_match(&text_of(&value))));
                }
                Instr::JumpIfFalse(skip) => {
                    if !expect_bool(pop(&mut stack)?, BinaryOp::And)? {
                        stack.push(Value::Bool(false));
                        pc += skip;
                    }
                }
                Instr::JumpIfTrue(skip) => {
                    if expect_bool(pop(&mut stack)?, BinaryOp::Or)? {
                        stack.push(Value::Bool(true));
                        pc += skip;
                    }
                }
                Instr::AssertBool(op) => {
                    let value = expect_bool(pop(&mut stack)?, *op)?;
                    stack.push(Value::Bool(value));
                }
            }
            pc += 1;
        }

        match (stack.pop(), stack.is_empty()) {
            (Some(value), true) => Ok(value),
            (None, _) => Err(Error::invalid_expression("empty program")),
            (Some(_), false) => Err(Error::invalid_expression(
                "program left more than one value on the stack",
            )),
        }
    }

    /// Evaluates the program as a predicate.
    pub fn matches(&self, tuple: &Tuple) -> Result<bool> {
        match self.eval(tuple)? {
            Value::Bool(b) => Ok(b),
            other => Err(Error::invalid_expression(format!(
                "predicate produced {other:?} instead of a boolean"
            ))),
        }
    }

    /// Returns the field position when the program is a bare column reference.
    pub fn column_position(&self) -> Option<usize> {
        match self.program.instrs.as_slice() {
            [Instr::Column(slot)] | [Instr::ColumnText(slot)] => Some(self.slots[*slot].0),
            _ => None,
        }
    }

    /// Declared type of the values this program produces.
    ///
    /// A bare column keeps its type, arithmetic and numeric literals are
    /// Decimal, everything else (booleans, text) is Varchar.
    pub fn result_type(&self) -> DataType {
        match self.program.instrs.as_slice() {
            [Instr::Column(slot)] => self.slots[*slot].1,
            [.., Instr::Binary(op)] if op.is_arithmetic() => DataType::Decimal,
            [Instr::Literal(Value::Number(_))] => DataType::Decimal,
            _ => DataType::Varchar,
        }
    }

    fn field<'t>(&self, tuple: &'t Tuple, slot: usize) -> Result<(&'t str, DataType)> {
        let (position, data_type) = self.slots[slot];
        tuple
            .get(position)
            .map(|text| (text, data_type))
            .ok_or_else(|| Error::column_not_found("tuple", &self.program.columns[slot]))
    }
}

fn pop(stack: &mut Vec<Value>) -> Result<Value> {
    stack
        .pop()
        .ok_or_else(|| Error::invalid_expression("operator is missing an operand"))
}

fn expect_bool(value: Value, op: BinaryOp) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        Error::invalid_expression(format!(
            "{} expects boolean operands, got {value:?}",
            op.symbol()
        ))
    })
}

fn text_of(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Text(s) | Value::Unparsed(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_field()),
    }
}

fn operand(value: Value, op: BinaryOp) -> Result<Decimal> {
    match value {
        Value::Number(d) => Ok(d),
        Value::Text(s) | Value::Unparsed(s) => numeric::parse_decimal(&s)
            .ok_or_else(|| Error::malformed_number(format!("operand of {}", op.symbol()), s)),
        Value::Bool(b) => Err(Error::invalid_expression(format!(
            "{} expects numeric operands, got {b}",
            op.symbol()
        ))),
    }
}

fn apply(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    let result = match op {
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => {
            // Operands that cannot be compared make the comparison false.
            let ordering = left.compare(&right);
            Value::Bool(match (op, ordering) {
                (_, None) => false,
                (BinaryOp::Eq, Some(o)) => o == Ordering::Equal,
                (BinaryOp::Ne, Some(o)) => o != Ordering::Equal,
                (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                (BinaryOp::Le, Some(o)) => o != Ordering::Greater,
                (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                (_, Some(o)) => o != Ordering::Less,
            })
        }
        BinaryOp::And => Value::Bool(expect_bool(left, op)? & expect_bool(right, op)?),
        BinaryOp::Or => Value::Bool(expect_bool(left, op)? | expect_bool(right, op)?),
        BinaryOp::Add => Value::Number(numeric::checked_add(operand(left, op)?, operand(right, op)?)?),
        BinaryOp::Sub => Value::Number(numeric::checked_sub(operand(left, op)?, operand(right, op)?)?),
        BinaryOp::Mul => Value::Number(numeric::checked_mul(operand(left, op)?, operand(right, op)?)?),
        BinaryOp::Div => Value::Number(numeric::checked_div(operand(left, op)?, operand(right, op)?)?),
        BinaryOp::Like => {
            let pattern = LikePattern::compile(&text_of(&right))?;
            Value::Bool(pattern.is_match(&text_of(&left)))
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::tokenize;

    fn schema() -> Schema {
        Schema::qualified(
            "t",
            &[
                ("a", DataType::Integer),
                ("b", DataType::Decimal),
                ("name", DataType::Varchar),
                ("code", DataType::Varchar),
            ],
        )
    }

    fn row(a: &str, b: &str, name: &str, code: &str) -> Tuple {
        Tuple::from_strs(&[a, b, name, code])
    }

    fn eval(text: &str, tuple: &Tuple) -> Result<Value> {
        let program = Program::parse(text)?;
        let schema = schema();
        let bound = program.bind(&schema)?;
        bound.eval(tuple)
    }

    #[test]
    fn test_arithmetic() {
        let t = row("7", "2.5", "x", "y");
        assert_eq!(
            eval("t.a * t.b + 1", &t).unwrap(),
            Value::Number(Decimal::new(185, 1))
        );
        assert_eq!(
            eval("(t.a - 1) / 4", &t).unwrap(),
            Value::Number(Decimal::new(15, 1))
        );
    }

    #[test]
    fn test_comparison_uses_declared_type() {
        let t = row("9", "0", "9", "10");
        // Integer column: numeric
        assert_eq!(eval("t.a < 10", &t).unwrap(), Value::Bool(true));
        // Varchar columns: lexicographic
        assert_eq!(eval("t.name < t.code", &t).unwrap(), Value::Bool(false));
        // A Varchar column stays text against a numeric literal
        assert_eq!(eval("t.name < 10", &t).unwrap(), Value::Bool(false));
        assert_eq!(eval("t.code = 10", &t).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_unparsed_comparison_is_false() {
        let t = row("abc", "0", "x", "y");
        assert_eq!(eval("t.a = 1", &t).unwrap(), Value::Bool(false));
        assert_eq!(eval("t.a <> 1", &t).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_unparsed_arithmetic_fails() {
        let t = row("abc", "0", "x", "y");
        assert!(matches!(
            eval("t.a + 1", &t),
            Err(Error::MalformedNumber { .. })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        let t = row("1", "0", "x", "y");
        assert!(matches!(eval("t.a / t.b", &t), Err(Error::DivisionByZero)));
    }

    #[test]
    fn test_and_or_short_circuit() {
        let t = row("1", "0", "x", "y");
        // The right operand would divide by zero.
        assert_eq!(
            eval("t.a = 1 OR t.a / t.b > 1", &t).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval("t.a = 2 AND t.a / t.b > 1", &t).unwrap(),
            Value::Bool(false)
        );
        assert!(eval("t.a = 1 AND t.a / t.b > 1", &t).is_err());
    }

    #[test]
    fn test_nested_logic() {
        let t = row("5", "3", "bob", "z");
        assert_eq!(
            eval("(t.a > 1 AND t.b < 2) OR t.name = 'bob'", &t).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval("t.a > 1 AND (t.b < 2 OR t.name = 'alice')", &t).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_like_on_raw_text() {
        let t = row("10", "10.50", "Alice", "y");
        assert_eq!(eval("t.name LIKE 'A%'", &t).unwrap(), Value::Bool(true));
        assert_eq!(eval("t.b LIKE '%.50'", &t).unwrap(), Value::Bool(true));
        assert_eq!(eval("t.name LIKE t.code", &t).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_logical_operand_must_be_boolean() {
        let t = row("1", "0", "x", "y");
        assert!(matches!(
            eval("t.a AND t.a = 1", &t),
            Err(Error::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_bind_missing_column() {
        let program = Program::parse("t.salary > 1").unwrap();
        assert!(matches!(
            program.bind(&schema()),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_matches_requires_boolean() {
        let program = Program::parse("t.a + 1").unwrap();
        let schema = schema();
        let bound = program.bind(&schema).unwrap();
        assert!(bound.matches(&row("1", "0", "x", "y")).is_err());
    }

    #[test]
    fn test_token_and_tree_forms_agree() {
        let tokens = tokenize("t.a >= 2 AND t.name <> 'x'").unwrap();
        let from_tokens = Program::from_tokens(&tokens).unwrap();
        let from_tree = Program::from_expr(&Expr::and(
            Expr::ge(Expr::column("t.a"), Expr::int(2)),
            Expr::ne(Expr::column("t.name"), Expr::string("x")),
        ))
        .unwrap();
        assert_eq!(from_tokens, from_tree);
        assert_eq!(from_tree.columns(), &["t.a".to_string(), "t.name".to_string()]);
    }

    #[test]
    fn test_column_position_and_result_type() {
        let schema = schema();
        let program = Program::parse("t.b").unwrap();
        let bound = program.bind(&schema).unwrap();
        assert_eq!(bound.column_position(), Some(1));
        assert_eq!(bound.result_type(), DataType::Decimal);

        let program = Program::parse("t.a * 2").unwrap();
        let bound = program.bind(&schema).unwrap();
        assert_eq!(bound.column_position(), None);
        assert_eq!(bound.result_type(), DataType::Decimal);

        let program = Program::parse("t.a > 2").unwrap();
        assert_eq!(program.bind(&schema).unwrap().result_type(), DataType::Varchar);
    }

    #[test]
    fn test_bare_column_names_resolve() {
        let t = row("3", "0", "x", "y");
        assert_eq!(eval("a + 1", &t).unwrap(), Value::Number(Decimal::from(4)));
    }
}
