//! # jsonsieve core
//!
//! Execution engine for compiled boolean filters over JSON documents.
//!
//! This crate provides:
//! - `tree::BinTree`: a flat, pre-order decision tree with index-linked
//!   nodes, plus `tree::state::BinTreeState` for per-evaluation
//!   three-valued resolution with short-circuit propagation
//! - `ir::Expr`: the language-neutral predicate tree produced by the
//!   surface compiler
//! - `tree::lower`: lowering `Expr` into a `MatchDef` (tree + ordered
//!   leaf predicates)
//! - `matcher::Matcher`: document matching, and `matcher::Evaluation` for
//!   callers that stream leaf verdicts themselves
//!
//! ## Quick start
//!
//! Build an `ir::Expr`, lower it with `lower(..)`, and hand the resulting
//! definition to a `Matcher`:
//!
//! ```
//! use jsonsieve_core::ir::{CompareOp, Expr};
//! use jsonsieve_core::path::FieldPath;
//! use jsonsieve_core::{lower, Matcher, OrMode};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let expr = Expr::compare(
//!     CompareOp::Eq,
//!     Expr::Field(FieldPath::key("a")),
//!     Expr::Value(json!(1)),
//! );
//! let def = Arc::new(lower(&expr, OrMode::ShortCircuit).unwrap());
//! let matcher = Matcher::new(def);
//! assert!(matcher.matches(&json!({"a": 1})));
//! ```

pub mod error;
pub mod ir;
pub mod leaf;
pub mod matcher;
pub mod path;
pub mod tree;
pub mod value;

pub use error::{Error, Result};
pub use matcher::{Evaluation, Matcher};
pub use tree::lower::{lower, MatchDef, OrMode};
