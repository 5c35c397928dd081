//! Spreadsheet-style column formulas: `=A + B * 2`.
//!
//! A formula is arithmetic over column references and literals. References
//! are written as the bare header text and resolved against the table's
//! headers, longest match first, so headers containing spaces work.

use crate::error::CoreError;
use crate::header::ColumnHeader;
use crate::table::Table;
use crate::value::CellValue;

/// What an empty formula means.
pub const EMPTY_FORMULA: &str = "=0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div => 40,
            BinaryOp::Add | BinaryOp::Sub => 30,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    fn apply(self, left: &CellValue, right: &CellValue) -> Result<CellValue, CoreError> {
        if left.is_missing() || right.is_missing() {
            return Ok(CellValue::Null);
        }
        let value = match (left, right) {
            (CellValue::Integer(a), CellValue::Integer(b)) => match self {
                BinaryOp::Add => CellValue::Integer(a.wrapping_add(*b)),
                BinaryOp::Sub => CellValue::Integer(a.wrapping_sub(*b)),
                BinaryOp::Mul => CellValue::Integer(a.wrapping_mul(*b)),
                BinaryOp::Div => CellValue::Float(*a as f64 / *b as f64),
            },
            (CellValue::Text(a), CellValue::Text(b)) if self == BinaryOp::Add => CellValue::Text(format!("{a}{b}")),
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => CellValue::Float(match self {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                }),
                _ => {
                    return Err(CoreError::InvalidData(format!(
                        "unsupported operand types for {}: {left:?} and {right:?}",
                        self.symbol()
                    )));
                }
            },
        };
        Ok(match value {
            CellValue::Float(x) if x.is_nan() => CellValue::Null,
            other => other,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(CellValue),
    Column(ColumnHeader),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Every column the expression reads, in order of appearance.
    pub fn columns(&self) -> Vec<&ColumnHeader> {
        match self {
            Expr::Literal(_) => Vec::new(),
            Expr::Column(header) => vec![header],
            Expr::Negate(inner) => inner.columns(),
            Expr::Binary { left, right, .. } => {
                let mut columns = left.columns();
                columns.extend(right.columns());
                columns
            }
        }
    }

    /// One value per row of `table`.
    pub fn evaluate(&self, table: &Table) -> Result<Vec<CellValue>, CoreError> {
        match self {
            Expr::Literal(value) => Ok(vec![value.clone(); table.num_rows()]),
            Expr::Column(header) => Ok(table.column(header)?.values().to_vec()),
            Expr::Negate(inner) => inner
                .evaluate(table)?
                .into_iter()
                .map(|value| match value {
                    CellValue::Null => Ok(CellValue::Null),
                    CellValue::Integer(n) => Ok(CellValue::Integer(n.wrapping_neg())),
                    CellValue::Float(x) => Ok(CellValue::Float(-x)),
                    other => Err(CoreError::InvalidData(format!("bad operand type for unary -: {other:?}"))),
                })
                .collect(),
            Expr::Binary { op, left, right } => {
                let left = left.evaluate(table)?;
                let right = right.evaluate(table)?;
                left.iter().zip(&right).map(|(a, b)| op.apply(a, b)).collect()
            }
        }
    }
}

/// Trim the formula, give it a leading `=`, and turn an empty one into `=0`.
pub fn normalize_formula(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('=').unwrap_or(trimmed).trim();
    if body.is_empty() {
        EMPTY_FORMULA.to_string()
    } else {
        format!("={body}")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Value(CellValue),
    Column(ColumnHeader),
    Op(BinaryOp),
    LParen,
    RParen,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn tokenize(body: &str, headers: &[ColumnHeader]) -> Result<Vec<Token>, CoreError> {
    let mut named: Vec<(&str, &ColumnHeader)> = headers
        .iter()
        .filter_map(|header| header.as_text().map(|text| (text, header)))
        .filter(|(text, _)| !text.is_empty())
        .collect();
    named.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut tokens = Vec::new();
    let mut rest = body;
    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }
        let reference = named.iter().find(|(text, _)| {
            rest.starts_with(text) && !rest[text.len()..].chars().next().is_some_and(is_word_char)
        });
        if let Some((text, header)) = reference {
            tokens.push(Token::Column((*header).clone()));
            rest = &rest[text.len()..];
            continue;
        }
        let (token, len) = match c {
            '+' => (Token::Op(BinaryOp::Add), 1),
            '-' => (Token::Op(BinaryOp::Sub), 1),
            '*' => (Token::Op(BinaryOp::Mul), 1),
            '/' => (Token::Op(BinaryOp::Div), 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '"' => {
                let end = rest[1..]
                    .find('"')
                    .ok_or_else(|| CoreError::InvalidData("unterminated string".into()))?;
                (Token::Value(CellValue::text(&rest[1..=end])), end + 2)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let len = rest
                    .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
                    .unwrap_or(rest.len());
                let digits = &rest[..len];
                let value = match digits.parse::<i64>() {
                    Ok(n) => CellValue::Integer(n),
                    Err(_) => CellValue::Float(
                        digits
                            .parse::<f64>()
                            .map_err(|_| CoreError::InvalidData(format!("{digits} is not a number")))?,
                    ),
                };
                (Token::Value(value), len)
            }
            _ => {
                let word: String = rest.chars().take_while(|ch| is_word_char(*ch)).collect();
                let word = if word.is_empty() { c.to_string() } else { word };
                return Err(CoreError::NotFound(format!("column {word}")));
            }
        };
        tokens.push(token);
        rest = &rest[len..];
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, CoreError> {
        let mut lhs = self.parse_prefix()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if op.precedence() < min_bp {
                break;
            }
            self.next();
            let rhs = self.parse_expression(op.precedence() + 1)?;
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, CoreError> {
        match self.next() {
            Some(Token::Value(value)) => Ok(Expr::Literal(value)),
            Some(Token::Column(header)) => Ok(Expr::Column(header)),
            Some(Token::Op(BinaryOp::Sub)) => Ok(Expr::Negate(Box::new(self.parse_expression(50)?))),
            Some(Token::Op(BinaryOp::Add)) => self.parse_expression(50),
            Some(Token::LParen) => {
                let inner = self.parse_expression(0)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(CoreError::InvalidData("missing closing parenthesis".into())),
                }
            }
            Some(token) => Err(CoreError::InvalidData(format!("unexpected {token:?}"))),
            None => Err(CoreError::InvalidData("formula ends too early".into())),
        }
    }
}

/// Parse a formula written against `headers`.
pub fn parse_formula(formula: &str, headers: &[ColumnHeader]) -> Result<Expr, CoreError> {
    let normalized = normalize_formula(formula);
    let body = &normalized[1..];
    let mut parser = Parser {
        tokens: tokenize(body, headers)?,
        pos: 0,
    };
    let expr = parser.parse_expression(0)?;
    if let Some(token) = parser.peek() {
        return Err(CoreError::InvalidData(format!("unexpected {token:?}")));
    }
    Ok(expr)
}
