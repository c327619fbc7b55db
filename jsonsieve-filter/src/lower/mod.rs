//! Lowering the surface AST into the engine's expression IR.
//!
//! This is where surface sugar is normalized: IS-checks become equality or
//! existence tests, field negation and trailing arithmetic compose into
//! function applications, regex patterns are classified for their backend,
//! and ISO-8601-shaped single-segment "fields" are rescued into string
//! values (the grammar would otherwise classify a quoted `2021-01-02` as a
//! path).

use crate::ast::{
    CheckOp, CompareOp as AstCompareOp, Condition, ConstFunc, ConstFuncName, Field, FuncArg,
    Literal, MathOp, Operand, PathKey, Scalar,
};
use jsonsieve_core::error::{Error, Result};
use jsonsieve_core::ir::{CompareOp, Expr, FuncName, LikePattern};
use jsonsieve_core::path::{FieldPath, PathSegment};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

static ISO8601_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());
static ISO8601_YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap());
static ISO8601_COMPLETE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").unwrap());

/// Lower a parsed condition into the engine IR.
pub fn lower(condition: &Condition) -> Result<Expr> {
    match condition {
        Condition::Or(left, right) => Ok(Expr::Or(vec![lower(left)?, lower(right)?])),
        Condition::And(left, right) => Ok(Expr::And(vec![lower(left)?, lower(right)?])),
        Condition::Not(inner) => Ok(Expr::not(lower(inner)?)),
        Condition::Operand(operand) => lower_operand(operand),
    }
}

fn lower_operand(operand: &Operand) -> Result<Expr> {
    match operand {
        Operand::Bool(true) => Ok(Expr::True),
        Operand::Bool(false) => Ok(Expr::False),

        Operand::Exists(field) => Ok(Expr::Exists(plain_path(field, "EXISTS")?)),

        Operand::Check { lhs, op } => {
            let lhs = lower_scalar(lhs)?;
            match op {
                CheckOp::Null => Ok(Expr::compare(CompareOp::Eq, lhs, Expr::Value(Value::Null))),
                CheckOp::NotNull => Ok(Expr::not(Expr::compare(
                    CompareOp::Eq,
                    lhs,
                    Expr::Value(Value::Null),
                ))),
                CheckOp::Missing => Ok(Expr::NotExists(path_of(lhs, "IS MISSING")?)),
                CheckOp::NotMissing => Ok(Expr::Exists(path_of(lhs, "IS NOT MISSING")?)),
            }
        }

        Operand::Compare { lhs, op, rhs } => Ok(Expr::compare(
            lower_compare_op(*op),
            lower_scalar(lhs)?,
            lower_scalar(rhs)?,
        )),

        Operand::RegexpContains { arg, pattern } => {
            let lhs = lower_func_arg(arg)?;
            let Literal::Str(pattern) = pattern else {
                return Err(Error::malformed_regex("pattern must be a string literal"));
            };
            Ok(Expr::Like {
                lhs: Box::new(lhs),
                pattern: classify_pattern(pattern),
            })
        }
    }
}

/// Classify a pattern for its backend: slash-delimited literals are
/// PCRE-shaped, everything else goes to the standard backend.
fn classify_pattern(pattern: &str) -> LikePattern {
    if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        LikePattern::Pcre(pattern[1..pattern.len() - 1].to_string())
    } else {
        LikePattern::Regex(pattern.to_string())
    }
}

fn lower_compare_op(op: AstCompareOp) -> CompareOp {
    match op {
        AstCompareOp::Eq => CompareOp::Eq,
        AstCompareOp::Ne => CompareOp::Ne,
        AstCompareOp::Lt => CompareOp::Lt,
        AstCompareOp::Le => CompareOp::Le,
        AstCompareOp::Gt => CompareOp::Gt,
        AstCompareOp::Ge => CompareOp::Ge,
    }
}

fn lower_scalar(scalar: &Scalar) -> Result<Expr> {
    match scalar {
        Scalar::Func(func) => lower_const_func(func),
        Scalar::Bool(b) => Ok(Expr::Value(json!(*b))),
        Scalar::Field(field) => lower_field(field),
        Scalar::Literal(lit) => Ok(Expr::Value(literal_value(lit))),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => json!(n),
        Literal::Float(f) => json!(f),
        Literal::Str(s) => json!(s.as_ref()),
    }
}

/// Lower a field reference, composing negation and trailing arithmetic:
/// negation wraps the field, the arithmetic op wraps the (possibly
/// negated) field and the literal.
fn lower_field(field: &Field) -> Result<Expr> {
    if let Some(date) = iso8601_special_value(field) {
        return Ok(date);
    }

    let base = Expr::Field(field_path(field));

    let inner = if field.neg {
        Expr::func(FuncName::Neg, vec![base])
    } else {
        base
    };

    match &field.math {
        Some((op, value)) => Ok(Expr::func(
            math_func(*op),
            vec![inner, Expr::Value(literal_value(value))],
        )),
        None => Ok(inner),
    }
}

/// The grammar captures any quoted string as a path segment, so an
/// ISO-8601 year, year-month, or complete date would otherwise become a
/// one-segment field. Rescue it into a string value instead.
fn iso8601_special_value(field: &Field) -> Option<Expr> {
    if !field.is_plain() || field.path.len() != 1 || !field.path[0].indexes.is_empty() {
        return None;
    }
    let PathKey::Name(name) = &field.path[0].key else {
        return None;
    };
    let is_date = ISO8601_YEAR.is_match(name)
        || ISO8601_YEAR_MONTH.is_match(name)
        || ISO8601_COMPLETE_DATE.is_match(name);
    is_date.then(|| Expr::Value(json!(name.as_ref())))
}

fn field_path(field: &Field) -> FieldPath {
    let mut path = FieldPath::default();
    for step in &field.path {
        match &step.key {
            PathKey::Name(name) => path.push_key(name.clone()),
            PathKey::Meta => path.push_key("META()"),
        }
        for idx in &step.indexes {
            path.push_index(*idx);
        }
    }
    path
}

/// Require a bare field path (no negation, no arithmetic).
fn plain_path(field: &Field, context: &str) -> Result<FieldPath> {
    if !field.is_plain() {
        return Err(Error::parse(format!(
            "{} requires a plain field path",
            context
        )));
    }
    Ok(field_path(field))
}

/// Require that a lowered scalar is a bare field reference.
fn path_of(expr: Expr, context: &str) -> Result<FieldPath> {
    match expr {
        Expr::Field(path) => Ok(path),
        _ => Err(Error::parse(format!(
            "{} requires a field path",
            context
        ))),
    }
}

fn math_func(op: MathOp) -> FuncName {
    match op {
        MathOp::Add => FuncName::Add,
        MathOp::Sub => FuncName::Sub,
        MathOp::Mul => FuncName::Mul,
        MathOp::Div => FuncName::Div,
        MathOp::Mod => FuncName::Mod,
    }
}

fn lower_const_func(func: &ConstFunc) -> Result<Expr> {
    // The zero-argument constants fold immediately
    match func.name {
        ConstFuncName::Pi => return Ok(Expr::Value(json!(std::f64::consts::PI))),
        ConstFuncName::E => return Ok(Expr::Value(json!(std::f64::consts::E))),
        _ => {}
    }

    let name = const_func_name(func.name);
    let args = func
        .args
        .iter()
        .map(lower_func_arg)
        .collect::<Result<Vec<_>>>()?;
    Ok(Expr::func(name, args))
}

fn lower_func_arg(arg: &FuncArg) -> Result<Expr> {
    match arg {
        FuncArg::Func(func) => lower_const_func(func),
        FuncArg::Field(field) => lower_field(field),
        FuncArg::Literal(lit) => Ok(Expr::Value(literal_value(lit))),
    }
}

fn const_func_name(name: ConstFuncName) -> FuncName {
    match name {
        ConstFuncName::Abs => FuncName::Abs,
        ConstFuncName::Acos => FuncName::Acos,
        ConstFuncName::Asin => FuncName::Asin,
        ConstFuncName::Atan => FuncName::Atan,
        ConstFuncName::Ceil => FuncName::Ceil,
        ConstFuncName::Cos => FuncName::Cos,
        ConstFuncName::Date => FuncName::Date,
        ConstFuncName::Degrees => FuncName::Degrees,
        ConstFuncName::Exp => FuncName::Exp,
        ConstFuncName::Floor => FuncName::Floor,
        ConstFuncName::Log => FuncName::Log,
        ConstFuncName::Ln => FuncName::Ln,
        ConstFuncName::Sin => FuncName::Sin,
        ConstFuncName::Tan => FuncName::Tan,
        ConstFuncName::Radians => FuncName::Radians,
        ConstFuncName::Round => FuncName::Round,
        ConstFuncName::Sqrt => FuncName::Sqrt,
        ConstFuncName::Atan2 => FuncName::Atan2,
        ConstFuncName::Pow => FuncName::Pow,
        // Folded above
        ConstFuncName::Pi | ConstFuncName::E => unreachable!("constant functions fold"),
    }
}
