//! Leaf predicates and their per-document evaluation.
//!
//! A leaf decides one terminal comparison against a document. Evaluation
//! never fails: a missing field, a cross-type comparison, or undefined
//! arithmetic makes the leaf false and the tree state propagates from
//! there.

use crate::error::{Error, Result};
use crate::ir::{CompareOp, FuncName, LikePattern};
use crate::path::FieldPath;
use crate::value::{self, ArithmeticOp, ComparableValue};
use lru::LruCache;
use regex::RegexBuilder;
use serde_json::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::sync::Arc;

// Thread-local cache of compiled regexes. Patterns are constant across a
// compiled filter, so repeated compiles of the same definition hit the
// cache. Regex::clone is cheap (Arc internally).
thread_local! {
    static REGEX_CACHE: RefCell<LruCache<String, regex::Regex>> =
        RefCell::new(LruCache::new(NonZeroUsize::new(32).unwrap()));
}

/// Build a regex through the thread-local cache.
fn build_regex(pattern: &str) -> Result<regex::Regex> {
    let cached = REGEX_CACHE.with(|cache| cache.borrow_mut().get(pattern).cloned());
    if let Some(re) = cached {
        return Ok(re);
    }

    let re = RegexBuilder::new(pattern)
        .build()
        .map_err(|e| Error::malformed_regex(e.to_string()))?;

    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().put(pattern.to_string(), re.clone());
    });

    Ok(re)
}

/// A pattern compiled for its backend.
#[derive(Clone, Debug)]
pub enum CompiledPattern {
    /// Standard regex backend
    Regex(regex::Regex),
    /// Backtracking backend for PCRE-shaped patterns (look-around,
    /// backreferences)
    Pcre(Arc<fancy_regex::Regex>),
}

impl CompiledPattern {
    /// Compile a pattern, selecting the backend from its shape.
    pub fn compile(pattern: &LikePattern) -> Result<Self> {
        match pattern {
            LikePattern::Regex(p) => build_regex(p).map(CompiledPattern::Regex),
            LikePattern::Pcre(p) => fancy_regex::Regex::new(p)
                .map(|re| CompiledPattern::Pcre(Arc::new(re)))
                .map_err(|e| Error::malformed_regex(e.to_string())),
        }
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            CompiledPattern::Regex(re) => re.is_match(text),
            // A backtracking overrun at match time counts as no-match;
            // evaluation must not fail
            CompiledPattern::Pcre(re) => re.is_match(text).unwrap_or(false),
        }
    }
}

/// A scalar operand inside a leaf predicate.
#[derive(Clone, Debug)]
pub enum Operand {
    /// Field reference resolved against the document
    Field(FieldPath),
    /// Literal value
    Const(Value),
    /// Function application over scalar arguments
    Func { name: FuncName, args: Vec<Operand> },
}

/// The comparison a leaf performs.
#[derive(Clone, Debug)]
pub enum LeafTest {
    /// Scalar comparison between two operands
    Compare {
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Field is present (null counts as present)
    Exists(FieldPath),
    /// Field is absent
    NotExists(FieldPath),
    /// Regular-expression containment over a string operand
    Like {
        lhs: Operand,
        pattern: CompiledPattern,
    },
    /// Constant verdict
    Const(bool),
}

/// One leaf predicate: its node index in the tree and the test it runs.
#[derive(Clone, Debug)]
pub struct LeafSpec {
    node: usize,
    test: LeafTest,
}

impl LeafSpec {
    /// Create a spec bound to a tree node.
    pub fn new(node: usize, test: LeafTest) -> Self {
        Self { node, test }
    }

    /// Index of the tree node this leaf decides.
    pub fn node(&self) -> usize {
        self.node
    }

    /// The test this leaf runs.
    pub fn test(&self) -> &LeafTest {
        &self.test
    }

    /// Decide this leaf against a document.
    pub fn evaluate(&self, doc: &Value) -> bool {
        match &self.test {
            LeafTest::Const(truth) => *truth,
            LeafTest::Exists(path) => path.lookup(doc).is_some(),
            LeafTest::NotExists(path) => path.lookup(doc).is_none(),
            LeafTest::Compare { op, lhs, rhs } => {
                let (Some(left), Some(right)) = (eval_operand(lhs, doc), eval_operand(rhs, doc))
                else {
                    return false;
                };
                match value::compare_values(&left, &right) {
                    Some(ordering) => match op {
                        CompareOp::Eq => ordering == Ordering::Equal,
                        CompareOp::Ne => ordering != Ordering::Equal,
                        CompareOp::Lt => ordering == Ordering::Less,
                        CompareOp::Le => ordering != Ordering::Greater,
                        CompareOp::Gt => ordering == Ordering::Greater,
                        CompareOp::Ge => ordering != Ordering::Less,
                    },
                    None => false,
                }
            }
            LeafTest::Like { lhs, pattern } => match eval_operand(lhs, doc) {
                Some(ComparableValue::Str(s)) => pattern.is_match(&s),
                _ => false,
            },
        }
    }
}

/// Evaluate an operand to a comparable value; `None` means undefined.
fn eval_operand(operand: &Operand, doc: &Value) -> Option<ComparableValue> {
    match operand {
        Operand::Field(path) => path.lookup(doc).and_then(value::json_to_comparable),
        Operand::Const(v) => value::json_to_comparable(v),
        Operand::Func { name, args } => eval_func(*name, args, doc),
    }
}

/// Evaluate a numeric intrinsic. Arity was fixed at lowering; a mismatch
/// here is a compiler bug.
fn eval_func(name: FuncName, args: &[Operand], doc: &Value) -> Option<ComparableValue> {
    assert_eq!(
        args.len(),
        name.arity(),
        "function {} applied to {} arguments",
        name.as_str(),
        args.len()
    );

    match name {
        FuncName::Add | FuncName::Sub | FuncName::Mul | FuncName::Div | FuncName::Mod => {
            let op = match name {
                FuncName::Add => ArithmeticOp::Add,
                FuncName::Sub => ArithmeticOp::Sub,
                FuncName::Mul => ArithmeticOp::Mul,
                FuncName::Div => ArithmeticOp::Div,
                _ => ArithmeticOp::Mod,
            };
            let left = eval_operand(&args[0], doc)?;
            let right = eval_operand(&args[1], doc)?;
            value::eval_arithmetic(op, left, right)
        }
        FuncName::Neg => match eval_operand(&args[0], doc)? {
            ComparableValue::Long(n) => n.checked_neg().map(ComparableValue::Long),
            ComparableValue::Double(d) => Some(ComparableValue::Double(-d)),
            _ => None,
        },
        FuncName::Abs => match eval_operand(&args[0], doc)? {
            ComparableValue::Long(n) => n.checked_abs().map(ComparableValue::Long),
            ComparableValue::Double(d) => Some(ComparableValue::Double(d.abs())),
            _ => None,
        },
        FuncName::Ceil => eval_rounding(&args[0], doc, f64::ceil),
        FuncName::Floor => eval_rounding(&args[0], doc, f64::floor),
        FuncName::Round => eval_rounding(&args[0], doc, f64::round),
        FuncName::Sqrt => eval_unary_f64(&args[0], doc, f64::sqrt),
        FuncName::Sin => eval_unary_f64(&args[0], doc, f64::sin),
        FuncName::Cos => eval_unary_f64(&args[0], doc, f64::cos),
        FuncName::Tan => eval_unary_f64(&args[0], doc, f64::tan),
        FuncName::Asin => eval_unary_f64(&args[0], doc, f64::asin),
        FuncName::Acos => eval_unary_f64(&args[0], doc, f64::acos),
        FuncName::Atan => eval_unary_f64(&args[0], doc, f64::atan),
        FuncName::Exp => eval_unary_f64(&args[0], doc, f64::exp),
        FuncName::Ln => eval_unary_f64(&args[0], doc, f64::ln),
        FuncName::Log => eval_unary_f64(&args[0], doc, f64::log10),
        FuncName::Radians => eval_unary_f64(&args[0], doc, f64::to_radians),
        FuncName::Degrees => eval_unary_f64(&args[0], doc, f64::to_degrees),
        FuncName::Atan2 => {
            let y = eval_operand(&args[0], doc)?.as_f64()?;
            let x = eval_operand(&args[1], doc)?.as_f64()?;
            finite_or_inf(y.atan2(x))
        }
        FuncName::Pow => {
            let base = eval_operand(&args[0], doc)?.as_f64()?;
            let exponent = eval_operand(&args[1], doc)?.as_f64()?;
            finite_or_inf(base.powf(exponent))
        }
        // Dates stay as ISO-8601 strings and compare lexicographically
        FuncName::Date => match eval_operand(&args[0], doc)? {
            s @ ComparableValue::Str(_) => Some(s),
            _ => None,
        },
    }
}

/// Unary float intrinsic; NaN results are undefined.
fn eval_unary_f64(
    operand: &Operand,
    doc: &Value,
    f: impl Fn(f64) -> f64,
) -> Option<ComparableValue> {
    let x = eval_operand(operand, doc)?.as_f64()?;
    finite_or_inf(f(x))
}

/// Rounding intrinsics keep integers integral.
fn eval_rounding(
    operand: &Operand,
    doc: &Value,
    f: impl Fn(f64) -> f64,
) -> Option<ComparableValue> {
    match eval_operand(operand, doc)? {
        n @ ComparableValue::Long(_) => Some(n),
        ComparableValue::Double(d) => finite_or_inf(f(d)),
        _ => None,
    }
}

fn finite_or_inf(x: f64) -> Option<ComparableValue> {
    if x.is_nan() {
        None
    } else {
        Some(ComparableValue::Double(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compare_leaf(op: CompareOp, lhs: Operand, rhs: Operand) -> LeafSpec {
        LeafSpec::new(0, LeafTest::Compare { op, lhs, rhs })
    }

    #[test]
    fn test_compare_field_to_const() {
        let leaf = compare_leaf(
            CompareOp::Eq,
            Operand::Field(FieldPath::key("a")),
            Operand::Const(json!(1)),
        );
        assert!(leaf.evaluate(&json!({"a": 1})));
        assert!(!leaf.evaluate(&json!({"a": 2})));
        assert!(!leaf.evaluate(&json!({})));
    }

    #[test]
    fn test_compare_missing_is_false_for_every_op() {
        for op in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
        ] {
            let leaf = compare_leaf(
                op,
                Operand::Field(FieldPath::key("missing")),
                Operand::Const(json!(1)),
            );
            assert!(!leaf.evaluate(&json!({"a": 1})), "op {:?}", op);
        }
    }

    #[test]
    fn test_compare_type_mismatch_is_false() {
        let leaf = compare_leaf(
            CompareOp::Ne,
            Operand::Field(FieldPath::key("a")),
            Operand::Const(json!(1)),
        );
        // a is a string, 1 is a number: not comparable, so even != is false
        assert!(!leaf.evaluate(&json!({"a": "x"})));
    }

    #[test]
    fn test_null_compares_equal_to_null() {
        let leaf = compare_leaf(
            CompareOp::Eq,
            Operand::Field(FieldPath::key("a")),
            Operand::Const(json!(null)),
        );
        assert!(leaf.evaluate(&json!({"a": null})));
        assert!(!leaf.evaluate(&json!({})));
        assert!(!leaf.evaluate(&json!({"a": 1})));
    }

    #[test]
    fn test_exists() {
        let present = LeafSpec::new(0, LeafTest::Exists(FieldPath::key("a")));
        assert!(present.evaluate(&json!({"a": null})));
        assert!(!present.evaluate(&json!({})));

        let absent = LeafSpec::new(0, LeafTest::NotExists(FieldPath::key("a")));
        assert!(absent.evaluate(&json!({})));
        assert!(!absent.evaluate(&json!({"a": null})));
    }

    #[test]
    fn test_like() {
        let pattern = CompiledPattern::compile(&LikePattern::Regex("^foo".into())).unwrap();
        let leaf = LeafSpec::new(
            0,
            LeafTest::Like {
                lhs: Operand::Field(FieldPath::key("name")),
                pattern,
            },
        );
        assert!(leaf.evaluate(&json!({"name": "foobar"})));
        assert!(!leaf.evaluate(&json!({"name": "barfoo"})));
        assert!(!leaf.evaluate(&json!({"name": 7})));
        assert!(!leaf.evaluate(&json!({})));
    }

    #[test]
    fn test_like_pcre_lookahead() {
        let pattern =
            CompiledPattern::compile(&LikePattern::Pcre("^(?!bar)\\w+$".into())).unwrap();
        let leaf = LeafSpec::new(
            0,
            LeafTest::Like {
                lhs: Operand::Field(FieldPath::key("name")),
                pattern,
            },
        );
        assert!(leaf.evaluate(&json!({"name": "foo"})));
        assert!(!leaf.evaluate(&json!({"name": "barfly"})));
    }

    #[test]
    fn test_bad_pattern_is_compile_error() {
        assert!(matches!(
            CompiledPattern::compile(&LikePattern::Regex("(unclosed".into())),
            Err(Error::MalformedRegex(_))
        ));
        // Look-around is a compile error on the standard backend but fine
        // on the PCRE one
        assert!(CompiledPattern::compile(&LikePattern::Regex("^(?!bar)".into())).is_err());
        assert!(CompiledPattern::compile(&LikePattern::Pcre("^(?!bar)".into())).is_ok());
    }

    #[test]
    fn test_func_arithmetic_chain() {
        // add(neg(price), 10) > 5
        let lhs = Operand::Func {
            name: FuncName::Add,
            args: vec![
                Operand::Func {
                    name: FuncName::Neg,
                    args: vec![Operand::Field(FieldPath::key("price"))],
                },
                Operand::Const(json!(10)),
            ],
        };
        let leaf = compare_leaf(CompareOp::Gt, lhs, Operand::Const(json!(5)));
        assert!(leaf.evaluate(&json!({"price": 3})));
        assert!(!leaf.evaluate(&json!({"price": 6})));
        assert!(!leaf.evaluate(&json!({})));
    }

    #[test]
    fn test_func_intrinsics() {
        let leaf = compare_leaf(
            CompareOp::Eq,
            Operand::Func {
                name: FuncName::Pow,
                args: vec![
                    Operand::Field(FieldPath::key("r")),
                    Operand::Const(json!(2)),
                ],
            },
            Operand::Const(json!(4)),
        );
        assert!(leaf.evaluate(&json!({"r": 2})));

        let atan2 = compare_leaf(
            CompareOp::Gt,
            Operand::Func {
                name: FuncName::Atan2,
                args: vec![
                    Operand::Field(FieldPath::key("y")),
                    Operand::Field(FieldPath::key("x")),
                ],
            },
            Operand::Const(json!(0)),
        );
        assert!(atan2.evaluate(&json!({"y": 1, "x": 1})));
    }

    #[test]
    fn test_func_undefined_domain_is_false() {
        // sqrt of a negative number is undefined, not an error
        let leaf = compare_leaf(
            CompareOp::Ge,
            Operand::Func {
                name: FuncName::Sqrt,
                args: vec![Operand::Field(FieldPath::key("a"))],
            },
            Operand::Const(json!(0)),
        );
        assert!(!leaf.evaluate(&json!({"a": -1})));
        assert!(leaf.evaluate(&json!({"a": 4})));
    }

    #[test]
    fn test_date_passthrough() {
        let leaf = compare_leaf(
            CompareOp::Gt,
            Operand::Func {
                name: FuncName::Date,
                args: vec![Operand::Field(FieldPath::key("updated"))],
            },
            Operand::Const(json!("2021-01-01")),
        );
        assert!(leaf.evaluate(&json!({"updated": "2021-06-15"})));
        assert!(!leaf.evaluate(&json!({"updated": "2020-12-31"})));
        assert!(!leaf.evaluate(&json!({"updated": 20210615})));
    }

    #[test]
    fn test_rounding_keeps_integers() {
        let leaf = compare_leaf(
            CompareOp::Eq,
            Operand::Func {
                name: FuncName::Ceil,
                args: vec![Operand::Field(FieldPath::key("a"))],
            },
            Operand::Const(json!(3)),
        );
        assert!(leaf.evaluate(&json!({"a": 3})));
        assert!(leaf.evaluate(&json!({"a": 2.1})));
    }
}
