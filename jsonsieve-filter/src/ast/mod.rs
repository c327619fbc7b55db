//! Surface AST for the filter language.
//!
//! One tagged enum per syntactic category. The AST is transient: the
//! parser produces it, the lowering pass consumes it, and nothing holds
//! onto it afterwards.

use std::sync::Arc;

/// A boolean condition.
///
/// Precedence is already resolved by the parser: `NOT` binds tighter than
/// `AND`, which binds tighter than `OR`, and parentheses group.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Disjunction
    Or(Box<Condition>, Box<Condition>),
    /// Conjunction
    And(Box<Condition>, Box<Condition>),
    /// Negation
    Not(Box<Condition>),
    /// A single testable operand
    Operand(Operand),
}

impl Condition {
    /// Create a disjunction.
    pub fn or(left: Condition, right: Condition) -> Self {
        Condition::Or(Box::new(left), Box::new(right))
    }

    /// Create a conjunction.
    pub fn and(left: Condition, right: Condition) -> Self {
        Condition::And(Box::new(left), Box::new(right))
    }

    /// Create a negation.
    pub fn not(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }
}

/// A single testable operand.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// Boolean literal in logical position
    Bool(bool),
    /// `REGEXP_CONTAINS(arg, "pattern")`
    RegexpContains { arg: FuncArg, pattern: Literal },
    /// `EXISTS(field)`
    Exists(Field),
    /// `lhs IS [NOT] NULL|MISSING`
    Check { lhs: Scalar, op: CheckOp },
    /// `lhs <compare-op> rhs`
    Compare {
        lhs: Scalar,
        op: CompareOp,
        rhs: Scalar,
    },
}

/// The IS-checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckOp {
    Null,
    NotNull,
    Missing,
    NotMissing,
}

/// Comparison operators as written in the surface syntax.
///
/// `=` and `==` both arrive as `Eq`; `!=` and `<>` both arrive as `Ne`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A scalar expression usable on either side of a comparison.
///
/// The variants are shared between LHS and RHS; only the parser's
/// disambiguation priority differs (a quoted string is a field segment on
/// the left, a literal value on the right).
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Constant function application
    Func(ConstFunc),
    /// Boolean literal in operand position
    Bool(bool),
    /// Field reference, possibly negated and/or combined with math
    Field(Field),
    /// Literal value
    Literal(Literal),
}

/// A field reference with optional negation and trailing arithmetic.
///
/// Covers the surface form `[-] path[.path...] [op value]`, e.g.
/// `-price + 10`.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Leading `-`
    pub neg: bool,
    /// Path segments separated by `.`
    pub path: Vec<OnePath>,
    /// Trailing arithmetic against a numeric literal
    pub math: Option<(MathOp, Literal)>,
}

impl Field {
    /// A plain, unadorned path.
    pub fn plain(path: Vec<OnePath>) -> Self {
        Self {
            neg: false,
            path,
            math: None,
        }
    }

    /// Whether this field is a bare path with no negation or math.
    pub fn is_plain(&self) -> bool {
        !self.neg && self.math.is_none()
    }
}

/// One dot-separated step of a path, with optional array indexes.
#[derive(Clone, Debug, PartialEq)]
pub struct OnePath {
    pub key: PathKey,
    /// Trailing `[int]` accessors, in order
    pub indexes: Vec<usize>,
}

/// How one path step names its member.
#[derive(Clone, Debug, PartialEq)]
pub enum PathKey {
    /// Bare identifier, quoted string, or raw string
    Name(Arc<str>),
    /// `META()` path function
    Meta,
}

impl PathKey {
    /// The member name this key selects.
    pub fn name(&self) -> &str {
        match self {
            PathKey::Name(s) => s.as_ref(),
            PathKey::Meta => "META()",
        }
    }
}

/// Arithmetic operators in field math.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// A literal value.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(Arc<str>),
}

/// A constant function application (`ABS(x)`, `POW(a, b)`, `PI()`).
#[derive(Clone, Debug, PartialEq)]
pub struct ConstFunc {
    pub name: ConstFuncName,
    pub args: Vec<FuncArg>,
}

/// An argument to a constant or boolean function.
#[derive(Clone, Debug, PartialEq)]
pub enum FuncArg {
    Func(Box<ConstFunc>),
    Field(Field),
    Literal(Literal),
}

/// Names of the constant functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstFuncName {
    Pi,
    E,
    Abs,
    Acos,
    Asin,
    Atan,
    Ceil,
    Cos,
    Date,
    Degrees,
    Exp,
    Floor,
    Log,
    Ln,
    Sin,
    Tan,
    Radians,
    Round,
    Sqrt,
    Atan2,
    Pow,
}

impl ConstFuncName {
    /// Number of arguments the function takes.
    pub fn arity(&self) -> usize {
        match self {
            ConstFuncName::Pi | ConstFuncName::E => 0,
            ConstFuncName::Atan2 | ConstFuncName::Pow => 2,
            _ => 1,
        }
    }
}
