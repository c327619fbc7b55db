//! Language-neutral predicate tree.
//!
//! `Expr` is the intermediate form produced by the surface compiler and
//! consumed by the tree lowerer. It serializes with serde, and lowering a
//! deserialized expression yields a definition equivalent to lowering the
//! original.

use crate::error::{Error, Result};
use crate::path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators between two scalar operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Numeric intrinsics and arithmetic functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuncName {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Abs,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Pow,
    Log,
    Ln,
    Exp,
    Ceil,
    Floor,
    Round,
    Radians,
    Degrees,
    Date,
}

impl FuncName {
    /// Parse a canonical function name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "add" => Ok(FuncName::Add),
            "sub" => Ok(FuncName::Sub),
            "mul" => Ok(FuncName::Mul),
            "div" => Ok(FuncName::Div),
            "mod" => Ok(FuncName::Mod),
            "neg" => Ok(FuncName::Neg),
            "abs" => Ok(FuncName::Abs),
            "sqrt" => Ok(FuncName::Sqrt),
            "sin" => Ok(FuncName::Sin),
            "cos" => Ok(FuncName::Cos),
            "tan" => Ok(FuncName::Tan),
            "asin" => Ok(FuncName::Asin),
            "acos" => Ok(FuncName::Acos),
            "atan" => Ok(FuncName::Atan),
            "atan2" => Ok(FuncName::Atan2),
            "pow" => Ok(FuncName::Pow),
            "log" => Ok(FuncName::Log),
            "ln" => Ok(FuncName::Ln),
            "exp" => Ok(FuncName::Exp),
            "ceil" => Ok(FuncName::Ceil),
            "floor" => Ok(FuncName::Floor),
            "round" => Ok(FuncName::Round),
            "radians" => Ok(FuncName::Radians),
            "degrees" => Ok(FuncName::Degrees),
            "date" => Ok(FuncName::Date),
            other => Err(Error::not_found(format!("unknown function '{}'", other))),
        }
    }

    /// Get the canonical name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FuncName::Add => "add",
            FuncName::Sub => "sub",
            FuncName::Mul => "mul",
            FuncName::Div => "div",
            FuncName::Mod => "mod",
            FuncName::Neg => "neg",
            FuncName::Abs => "abs",
            FuncName::Sqrt => "sqrt",
            FuncName::Sin => "sin",
            FuncName::Cos => "cos",
            FuncName::Tan => "tan",
            FuncName::Asin => "asin",
            FuncName::Acos => "acos",
            FuncName::Atan => "atan",
            FuncName::Atan2 => "atan2",
            FuncName::Pow => "pow",
            FuncName::Log => "log",
            FuncName::Ln => "ln",
            FuncName::Exp => "exp",
            FuncName::Ceil => "ceil",
            FuncName::Floor => "floor",
            FuncName::Round => "round",
            FuncName::Radians => "radians",
            FuncName::Degrees => "degrees",
            FuncName::Date => "date",
        }
    }

    /// Number of arguments the function takes.
    pub fn arity(&self) -> usize {
        match self {
            FuncName::Add
            | FuncName::Sub
            | FuncName::Mul
            | FuncName::Div
            | FuncName::Mod
            | FuncName::Atan2
            | FuncName::Pow => 2,
            _ => 1,
        }
    }
}

/// How a LIKE pattern should be compiled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LikePattern {
    /// Plain pattern for the standard regex backend
    Regex(String),
    /// PCRE-shaped pattern (slash-delimited literal, delimiters stripped);
    /// needs the backtracking backend for look-around and backreferences
    Pcre(String),
}

impl LikePattern {
    /// The raw pattern text.
    pub fn pattern(&self) -> &str {
        match self {
            LikePattern::Regex(p) | LikePattern::Pcre(p) => p,
        }
    }
}

/// A predicate expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Conjunction over two or more children
    And(Vec<Expr>),
    /// Disjunction over two or more children
    Or(Vec<Expr>),
    /// Logical negation
    Not(Box<Expr>),
    /// Scalar comparison
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Field is present in the document (null counts as present)
    Exists(FieldPath),
    /// Field is absent from the document
    NotExists(FieldPath),
    /// Regular-expression containment test
    Like { lhs: Box<Expr>, pattern: LikePattern },
    /// Function application over scalar arguments
    Func { name: FuncName, args: Vec<Expr> },
    /// Field reference (scalar position)
    Field(FieldPath),
    /// Literal value (scalar position)
    Value(Value),
    /// Constant-true predicate
    True,
    /// Constant-false predicate
    False,
}

impl Expr {
    /// Create a comparison expression.
    pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Create a negation.
    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    /// Create a function application.
    pub fn func(name: FuncName, args: Vec<Expr>) -> Self {
        Expr::Func { name, args }
    }

    /// Whether this expression is a predicate (boolean position) as
    /// opposed to a scalar operand.
    pub fn is_predicate(&self) -> bool {
        !matches!(self, Expr::Func { .. } | Expr::Field(_) | Expr::Value(_))
    }
}
