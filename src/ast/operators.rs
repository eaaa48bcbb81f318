use std::fmt;

use crate::ast::TokenKind;

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Sub,
    /// Multiplication (`*`)
    Mul,
    /// Division (`/`), always produces a float
    Div,
    /// Integer division (`\`)
    IntDiv,
    /// Modulo (`%`), integers only
    Mod,
}

/// Ordering comparisons, numeric operands only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Equality operators, defined on every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityOp {
    Equal,
    NotEqual,
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// A binary operator as recognised by the expression parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Arith(ArithOp),
    Compare(CompareOp),
    Equality(EqualityOp),
    Logic(LogicOp),
}

impl BinOp {
    pub fn from_token(kind: TokenKind) -> Option<BinOp> {
        use TokenKind::*;
        let op = match kind {
            Add => BinOp::Arith(ArithOp::Add),
            Sub => BinOp::Arith(ArithOp::Sub),
            Mul => BinOp::Arith(ArithOp::Mul),
            Div => BinOp::Arith(ArithOp::Div),
            IntDiv => BinOp::Arith(ArithOp::IntDiv),
            Mod => BinOp::Arith(ArithOp::Mod),
            Lss => BinOp::Compare(CompareOp::Less),
            Leq => BinOp::Compare(CompareOp::LessEqual),
            Gtr => BinOp::Compare(CompareOp::Greater),
            Geq => BinOp::Compare(CompareOp::GreaterEqual),
            Eq => BinOp::Equality(EqualityOp::Equal),
            Neq => BinOp::Equality(EqualityOp::NotEqual),
            And => BinOp::Logic(LogicOp::And),
            Or => BinOp::Logic(LogicOp::Or),
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::IntDiv => "\\",
            ArithOp::Mod => "%",
        };
        f.write_str(s)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
        };
        f.write_str(s)
    }
}
