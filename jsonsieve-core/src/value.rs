//! Comparable value model over JSON scalars.
//!
//! Comparisons use two-valued logic: anything undefined (cross-type
//! comparison, NaN, missing operand, arithmetic overflow) yields `None`
//! here and becomes `false` at the leaf that asked.

use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// A JSON scalar normalized for comparison.
///
/// Arrays and objects do not participate in comparisons; converting one
/// yields `None` upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparableValue {
    Long(i64),
    Double(f64),
    Str(Arc<str>),
    Bool(bool),
    Null,
}

impl ComparableValue {
    /// Numeric view, promoting `Long` to `Double`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ComparableValue::Long(n) => Some(*n as f64),
            ComparableValue::Double(d) => Some(*d),
            _ => None,
        }
    }
}

/// Arithmetic operators usable between two numeric operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Convert a JSON scalar to its comparable form.
pub fn json_to_comparable(val: &Value) -> Option<ComparableValue> {
    match val {
        Value::Null => Some(ComparableValue::Null),
        Value::Bool(b) => Some(ComparableValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ComparableValue::Long(i))
            } else {
                n.as_f64().map(ComparableValue::Double)
            }
        }
        Value::String(s) => Some(ComparableValue::Str(Arc::from(s.as_str()))),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Three-way comparison between two comparable values.
///
/// Numbers compare across `Long`/`Double`. Everything else compares only
/// within its own type; `None` means the pair is not comparable.
pub fn compare_values(a: &ComparableValue, b: &ComparableValue) -> Option<Ordering> {
    use ComparableValue::*;
    match (a, b) {
        (Long(x), Long(y)) => Some(x.cmp(y)),
        (Double(x), Double(y)) => x.partial_cmp(y),
        (Long(x), Double(y)) => (*x as f64).partial_cmp(y),
        (Double(x), Long(y)) => x.partial_cmp(&(*y as f64)),
        (Str(x), Str(y)) => Some(x.cmp(y)),
        (Bool(x), Bool(y)) => Some(x.cmp(y)),
        (Null, Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Evaluate a binary arithmetic operation.
///
/// `Long op Long` stays integral (checked); mixed operands promote to
/// `Double`. Division or modulo by zero is undefined.
pub fn eval_arithmetic(
    op: ArithmeticOp,
    left: ComparableValue,
    right: ComparableValue,
) -> Option<ComparableValue> {
    use ComparableValue::*;
    match (left, right) {
        (Long(a), Long(b)) => {
            let result = match op {
                ArithmeticOp::Add => a.checked_add(b)?,
                ArithmeticOp::Sub => a.checked_sub(b)?,
                ArithmeticOp::Mul => a.checked_mul(b)?,
                ArithmeticOp::Div => {
                    if b == 0 {
                        return None;
                    }
                    a.checked_div(b)?
                }
                ArithmeticOp::Mod => {
                    if b == 0 {
                        return None;
                    }
                    a.checked_rem(b)?
                }
            };
            Some(Long(result))
        }
        (Double(a), Double(b)) => {
            let result = match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Sub => a - b,
                ArithmeticOp::Mul => a * b,
                ArithmeticOp::Div => {
                    if b == 0.0 {
                        return None;
                    }
                    a / b
                }
                ArithmeticOp::Mod => {
                    if b == 0.0 {
                        return None;
                    }
                    a % b
                }
            };
            if result.is_nan() {
                return None;
            }
            Some(Double(result))
        }
        // Mixed numeric operands promote to Double
        (Long(a), b @ Double(_)) => eval_arithmetic(op, Double(a as f64), b),
        (a @ Double(_), Long(b)) => eval_arithmetic(op, a, Double(b as f64)),
        // Non-numeric operands cannot do arithmetic
        _ => None,
    }
}
