//! Infix token form of expressions.
//!
//! Older call sites hand the executor a flat token sequence instead of an
//! expression tree. `tokenize` produces that sequence from text; the
//! evaluator converts it to postfix once.

use crate::ast::{BinaryOp, Expr};
use pipedb_core::{Error, Result, Value};

/// Grouping bracket kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bracket {
    /// `(` and `)`.
    Round,
    /// `[` and `]`.
    Square,
}

/// One token of an infix expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Column reference, possibly qualified.
    Ident(String),
    /// Numeric literal text.
    Number(String),
    /// Quoted string literal, unescaped.
    Str(String),
    /// Binary operator, including the keywords AND, OR and LIKE.
    Op(BinaryOp),
    /// Opening bracket.
    Open(Bracket),
    /// Closing bracket.
    Close(Bracket),
}

impl Token {
    /// Creates an identifier token.
    pub fn ident(name: impl Into<String>) -> Self {
        Token::Ident(name.into())
    }

    /// Creates a number token.
    pub fn number(text: impl Into<String>) -> Self {
        Token::Number(text.into())
    }

    /// Creates a string token.
    pub fn string(text: impl Into<String>) -> Self {
        Token::Str(text.into())
    }

    fn is_operand_end(&self) -> bool {
        matches!(
            self,
            Token::Ident(_) | Token::Number(_) | Token::Str(_) | Token::Close(_)
        )
    }
}

/// Splits an infix expression into tokens.
///
/// A `-` directly followed by a digit starts a negative number when it
/// cannot be a binary minus (at the start, after an operator or an opening
/// bracket).
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::Open(Bracket::Round));
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close(Bracket::Round));
                i += 1;
            }
            '[' => {
                tokens.push(Token::Open(Bracket::Square));
                i += 1;
            }
            ']' => {
                tokens.push(Token::Close(Bracket::Square));
                i += 1;
            }
            '\'' => {
                let (text, next) = read_string(&chars, i)?;
                tokens.push(Token::Str(text));
                i = next;
            }
            '-' if chars.get(i + 1).is_some_and(|d| d.is_ascii_digit() || *d == '.')
                && !tokens.last().is_some_and(Token::is_operand_end) =>
            {
                let (text, next) = read_number(&chars, i + 1);
                tokens.push(Token::Number(format!("-{text}")));
                i = next;
            }
            c if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) => {
                let (text, next) = read_number(&chars, i);
                tokens.push(Token::Number(text));
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::Op(BinaryOp::And),
                    "OR" => Token::Op(BinaryOp::Or),
                    "LIKE" => Token::Op(BinaryOp::Like),
                    _ => Token::Ident(word),
                });
            }
            _ => {
                let (op, width) = read_operator(&chars, i)?;
                tokens.push(Token::Op(op));
                i += width;
            }
        }
    }

    Ok(tokens)
}

/// Reorders infix tokens into postfix (shunting-yard).
///
/// Operators of equal precedence associate to the left. The output holds no
/// brackets.
pub fn to_postfix(tokens: &[Token]) -> Result<Vec<Token>> {
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<&Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Ident(_) | Token::Number(_) | Token::Str(_) => output.push(token.clone()),
            Token::Op(op) => {
                while let Some(Token::Op(top)) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(Token::Op(*top));
                    stack.pop();
                }
                stack.push(token);
            }
            Token::Open(_) => stack.push(token),
            Token::Close(kind) => loop {
                match stack.pop() {
                    Some(Token::Op(op)) => output.push(Token::Op(*op)),
                    Some(Token::Open(open)) if open == kind => break,
                    Some(Token::Open(_)) => {
                        return Err(Error::invalid_expression("mismatched bracket kinds"))
                    }
                    _ => return Err(Error::invalid_expression("unbalanced closing bracket")),
                }
            },
        }
    }

    while let Some(token) = stack.pop() {
        match token {
            Token::Op(op) => output.push(Token::Op(*op)),
            _ => return Err(Error::invalid_expression("unbalanced opening bracket")),
        }
    }
    Ok(output)
}

/// Builds an expression tree from infix tokens.
pub fn parse_tokens(tokens: &[Token]) -> Result<Expr> {
    let mut stack: Vec<Expr> = Vec::new();
    for token in to_postfix(tokens)? {
        match token {
            Token::Ident(name) => stack.push(Expr::column(name)),
            Token::Number(text) => stack.push(Expr::number(&text)?),
            Token::Str(text) => stack.push(Expr::string(text)),
            Token::Op(op) => {
                let (left, right) = match (stack.pop(), stack.pop()) {
                    (Some(right), Some(left)) => (left, right),
                    _ => {
                        return Err(Error::invalid_expression(format!(
                            "operator {} is missing an operand",
                            op.symbol()
                        )))
                    }
                };
                stack.push(match (op, right) {
                    (BinaryOp::Like, Expr::Literal(Value::Text(pattern))) => {
                        Expr::like(left, pattern)
                    }
                    (op, right) => Expr::binary(left, op, right),
                });
            }
            Token::Open(_) | Token::Close(_) => {
                return Err(Error::invalid_expression("bracket left after reordering"))
            }
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(expr), true) => Ok(expr),
        (None, _) => Err(Error::invalid_expression("empty expression")),
        (Some(_), false) => Err(Error::invalid_expression("operand without an operator")),
    }
}

/// Tokenizes and parses an infix expression.
pub fn parse_expr(input: &str) -> Result<Expr> {
    parse_tokens(&tokenize(input)?)
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '\'' {
            // '' is an escaped quote
            if chars.get(i + 1) == Some(&'\'') {
                text.push('\'');
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        text.push(chars[i]);
        i += 1;
    }
    Err(Error::invalid_expression("unterminated string literal"))
}

fn read_number(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }
    // Optional exponent: e, E, e+, e-
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    (chars[start..i].iter().collect(), i)
}

fn read_operator(chars: &[char], i: usize) -> Result<(BinaryOp, usize)> {
    let next = chars.get(i + 1).copied();
    let op = match (chars[i], next) {
        ('<', Some('=')) => (BinaryOp::Le, 2),
        ('<', Some('>')) => (BinaryOp::Ne, 2),
        ('>', Some('=')) => (BinaryOp::Ge, 2),
        ('!', Some('=')) => (BinaryOp::Ne, 2),
        ('=', Some('=')) => (BinaryOp::Eq, 2),
        ('<', _) => (BinaryOp::Lt, 1),
        ('>', _) => (BinaryOp::Gt, 1),
        ('=', _) => (BinaryOp::Eq, 1),
        ('+', _) => (BinaryOp::Add, 1),
        ('-', _) => (BinaryOp::Sub, 1),
        ('*', _) => (BinaryOp::Mul, 1),
        ('/', _) => (BinaryOp::Div, 1),
        (c, _) => {
            return Err(Error::invalid_expression(format!(
                "unexpected character {c:?} at offset {i}"
            )))
        }
    };
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_comparison() {
        let tokens = tokenize("t.a >= 10 AND t.name LIKE 'A%'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::ident("t.a"),
                Token::Op(BinaryOp::Ge),
                Token::number("10"),
                Token::Op(BinaryOp::And),
                Token::ident("t.name"),
                Token::Op(BinaryOp::Like),
                Token::string("A%"),
            ]
        );
    }

    #[test]
    fn test_tokenize_brackets_and_arithmetic() {
        let tokens = tokenize("[t.a + 2] * (t.b - 1)").unwrap();
        assert_eq!(tokens.len(), 11);
        assert_eq!(tokens[0], Token::Open(Bracket::Square));
        assert_eq!(tokens[4], Token::Close(Bracket::Square));
        assert_eq!(tokens[5], Token::Op(BinaryOp::Mul));
    }

    #[test]
    fn test_negative_number_versus_minus() {
        let tokens = tokenize("t.a - 1").unwrap();
        assert_eq!(tokens[1], Token::Op(BinaryOp::Sub));
        assert_eq!(tokens[2], Token::number("1"));

        let tokens = tokenize("t.a > -1.5").unwrap();
        assert_eq!(tokens[2], Token::number("-1.5"));
    }

    #[test]
    fn test_string_escape() {
        let tokens = tokenize("t.name = 'O''Brien'").unwrap();
        assert_eq!(tokens[2], Token::string("O'Brien"));
        assert!(tokenize("t.name = 'open").is_err());
    }

    #[test]
    fn test_operator_spellings() {
        let tokens = tokenize("a <> b != c == d <= e").unwrap();
        assert_eq!(tokens[1], Token::Op(BinaryOp::Ne));
        assert_eq!(tokens[3], Token::Op(BinaryOp::Ne));
        assert_eq!(tokens[5], Token::Op(BinaryOp::Eq));
        assert_eq!(tokens[7], Token::Op(BinaryOp::Le));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(tokenize("t.a # 1").is_err());
    }

    #[test]
    fn test_exponent_number() {
        let tokens = tokenize("1.5e3 + x").unwrap();
        assert_eq!(tokens[0], Token::number("1.5e3"));
    }

    #[test]
    fn test_postfix_order() {
        let tokens = tokenize("a + b * c").unwrap();
        let postfix = to_postfix(&tokens).unwrap();
        assert_eq!(
            postfix,
            vec![
                Token::ident("a"),
                Token::ident("b"),
                Token::ident("c"),
                Token::Op(BinaryOp::Mul),
                Token::Op(BinaryOp::Add),
            ]
        );

        let tokens = tokenize("a - b - c").unwrap();
        let postfix = to_postfix(&tokens).unwrap();
        assert_eq!(
            postfix,
            vec![
                Token::ident("a"),
                Token::ident("b"),
                Token::Op(BinaryOp::Sub),
                Token::ident("c"),
                Token::Op(BinaryOp::Sub),
            ]
        );
    }

    #[test]
    fn test_brackets_override_precedence() {
        let expr = parse_expr("[a + b] * (c - 1)").unwrap();
        assert_eq!(
            expr,
            Expr::mul(
                Expr::add(Expr::column("a"), Expr::column("b")),
                Expr::sub(Expr::column("c"), Expr::int(1)),
            )
        );
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert!(parse_expr("(a + b").is_err());
        assert!(parse_expr("a + b)").is_err());
        assert!(parse_expr("(a + b]").is_err());
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_expr("t.a + t.b * 2 > 10 OR t.c LIKE 'x%'").unwrap();
        let expected = Expr::or(
            Expr::gt(
                Expr::add(
                    Expr::column("t.a"),
                    Expr::mul(Expr::column("t.b"), Expr::int(2)),
                ),
                Expr::int(10),
            ),
            Expr::like(Expr::column("t.c"), "x%"),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("a +").is_err());
        assert!(parse_expr("a b").is_err());
    }
}
