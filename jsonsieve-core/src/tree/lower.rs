//! Lowering a predicate expression into a decision tree plus leaf specs.
//!
//! N-ary connectives normalize to left-leaning binary trees (the shape the
//! evaluator assumes), nodes take pre-order indices, and every terminal
//! comparison becomes a `Leaf` node paired with a `LeafSpec` in leaf-index
//! order. The emitted tree is validated before it leaves this module.

use super::{BinTree, BinTreeNode, NodeKind};
use crate::error::{Error, Result};
use crate::ir::Expr;
use crate::leaf::{CompiledPattern, LeafSpec, LeafTest, Operand};
use std::sync::Arc;
use tracing::debug;

/// Whether emitted inclusive-or nodes may short-circuit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrMode {
    /// Standard `Or`: resolve as soon as one side decides the outcome
    #[default]
    ShortCircuit,
    /// `Neor`: both children must resolve first. Used when the containing
    /// scope is a loop iteration and partial verdicts must not escape.
    Exhaustive,
}

/// A compiled predicate: the decision tree and its leaf predicates.
///
/// Immutable once built; share it by `Arc` between the matcher and any
/// number of concurrent evaluations, each owning its own tree state.
#[derive(Clone, Debug)]
pub struct MatchDef {
    tree: Arc<BinTree>,
    leaves: Vec<LeafSpec>,
}

impl MatchDef {
    /// The decision tree.
    pub fn tree(&self) -> &Arc<BinTree> {
        &self.tree
    }

    /// Leaf predicates in leaf-index order.
    pub fn leaves(&self) -> &[LeafSpec] {
        &self.leaves
    }
}

/// Lower a predicate expression into a match definition.
pub fn lower(expr: &Expr, mode: OrMode) -> Result<MatchDef> {
    let mut lowerer = TreeLowerer {
        nodes: Vec::new(),
        leaves: Vec::new(),
        mode,
    };
    lowerer.emit(expr, 0)?;

    let tree = BinTree::from_nodes(lowerer.nodes);
    tree.validate()?;
    debug!(
        nodes = tree.len(),
        leaves = lowerer.leaves.len(),
        "lowered filter expression"
    );

    Ok(MatchDef {
        tree: Arc::new(tree),
        leaves: lowerer.leaves,
    })
}

struct TreeLowerer {
    nodes: Vec<BinTreeNode>,
    leaves: Vec<LeafSpec>,
    mode: OrMode,
}

impl TreeLowerer {
    fn push(&mut self, kind: NodeKind, parent: usize) -> usize {
        let index = self.nodes.len();
        self.nodes.push(BinTreeNode::new(kind, parent, 0, 0));
        index
    }

    /// Emit `expr` under `parent`, returning the new node's index.
    fn emit(&mut self, expr: &Expr, parent: usize) -> Result<usize> {
        match expr {
            Expr::And(children) => self.emit_nary(NodeKind::And, children, parent),
            Expr::Or(children) => {
                let kind = match self.mode {
                    OrMode::ShortCircuit => NodeKind::Or,
                    OrMode::Exhaustive => NodeKind::Neor,
                };
                self.emit_nary(kind, children, parent)
            }
            Expr::Not(inner) => {
                let index = self.push(NodeKind::Not, parent);
                let left = self.emit(inner, index)?;
                self.nodes[index].left = left;
                Ok(index)
            }
            Expr::Compare { .. }
            | Expr::Exists(_)
            | Expr::NotExists(_)
            | Expr::Like { .. }
            | Expr::True
            | Expr::False => self.emit_leaf(expr, parent),
            Expr::Func { name, .. } => Err(Error::malformed_tree(format!(
                "function '{}' is not a predicate",
                name.as_str()
            ))),
            Expr::Field(path) => Err(Error::malformed_tree(format!(
                "field '{}' is not a predicate",
                path
            ))),
            Expr::Value(_) => Err(Error::malformed_tree("literal is not a predicate")),
        }
    }

    /// Emit an n-ary connective as a left-leaning binary tree:
    /// `[a, b, c]` becomes `kind(kind(a, b), c)`.
    fn emit_nary(&mut self, kind: NodeKind, children: &[Expr], parent: usize) -> Result<usize> {
        match children {
            [] => Err(Error::malformed_tree(format!(
                "{} connective with no children",
                kind
            ))),
            [only] => self.emit(only, parent),
            [rest @ .., last] => {
                let index = self.push(kind, parent);
                let left = self.emit_nary(kind, rest, index)?;
                let right = self.emit(last, index)?;
                self.nodes[index].left = left;
                self.nodes[index].right = right;
                Ok(index)
            }
        }
    }

    fn emit_leaf(&mut self, expr: &Expr, parent: usize) -> Result<usize> {
        let index = self.push(NodeKind::Leaf, parent);
        let test = self.leaf_test(expr)?;
        self.leaves.push(LeafSpec::new(index, test));
        Ok(index)
    }

    fn leaf_test(&self, expr: &Expr) -> Result<LeafTest> {
        match expr {
            Expr::Compare { op, lhs, rhs } => Ok(LeafTest::Compare {
                op: *op,
                lhs: self.operand(lhs)?,
                rhs: self.operand(rhs)?,
            }),
            Expr::Exists(path) => Ok(LeafTest::Exists(path.clone())),
            Expr::NotExists(path) => Ok(LeafTest::NotExists(path.clone())),
            Expr::Like { lhs, pattern } => Ok(LeafTest::Like {
                lhs: self.operand(lhs)?,
                pattern: CompiledPattern::compile(pattern)?,
            }),
            Expr::True => Ok(LeafTest::Const(true)),
            Expr::False => Ok(LeafTest::Const(false)),
            _ => Err(Error::malformed_tree("expression is not a leaf predicate")),
        }
    }

    fn operand(&self, expr: &Expr) -> Result<Operand> {
        match expr {
            Expr::Field(path) => Ok(Operand::Field(path.clone())),
            Expr::Value(v) => Ok(Operand::Const(v.clone())),
            Expr::Func { name, args } => {
                if args.len() != name.arity() {
                    return Err(Error::malformed_tree(format!(
                        "function '{}' takes {} arguments, got {}",
                        name.as_str(),
                        name.arity(),
                        args.len()
                    )));
                }
                let args = args
                    .iter()
                    .map(|a| self.operand(a))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Operand::Func { name: *name, args })
            }
            _ => Err(Error::malformed_tree(
                "predicate in scalar operand position",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CompareOp, FuncName, LikePattern};
    use crate::path::FieldPath;
    use serde_json::json;

    fn leaf_eq(name: &str, value: serde_json::Value) -> Expr {
        Expr::compare(
            CompareOp::Eq,
            Expr::Field(FieldPath::key(name)),
            Expr::Value(value),
        )
    }

    #[test]
    fn test_single_leaf() {
        let def = lower(&leaf_eq("a", json!(1)), OrMode::ShortCircuit).unwrap();
        assert_eq!(def.tree().len(), 1);
        assert_eq!(def.leaves().len(), 1);
        assert_eq!(def.leaves()[0].node(), 0);
    }

    #[test]
    fn test_nary_and_left_leaning() {
        let expr = Expr::And(vec![
            leaf_eq("a", json!(1)),
            leaf_eq("b", json!(2)),
            leaf_eq("c", json!(3)),
        ]);
        let def = lower(&expr, OrMode::ShortCircuit).unwrap();

        // and(and(a, b), c): two interior nodes, three leaves
        assert_eq!(def.tree().len(), 5);
        assert_eq!(def.tree().node(0).kind, NodeKind::And);
        assert_eq!(def.tree().node(1).kind, NodeKind::And);
        assert_eq!(def.tree().node(2).kind, NodeKind::Leaf);
        assert_eq!(def.tree().node(3).kind, NodeKind::Leaf);
        assert_eq!(def.tree().node(4).kind, NodeKind::Leaf);

        // Leaves appear in pre-order (left-to-right source order)
        assert_eq!(
            def.leaves().iter().map(|l| l.node()).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
    }

    #[test]
    fn test_not_wraps_subtree() {
        let expr = Expr::not(Expr::Or(vec![
            leaf_eq("a", json!(1)),
            leaf_eq("b", json!(2)),
        ]));
        let def = lower(&expr, OrMode::ShortCircuit).unwrap();
        assert_eq!(def.tree().node(0).kind, NodeKind::Not);
        assert_eq!(def.tree().node(1).kind, NodeKind::Or);
        assert_eq!(def.tree().node(0).right, 0);
    }

    #[test]
    fn test_or_mode_selects_neor() {
        let expr = Expr::Or(vec![leaf_eq("a", json!(1)), leaf_eq("b", json!(2))]);

        let sc = lower(&expr, OrMode::ShortCircuit).unwrap();
        assert_eq!(sc.tree().node(0).kind, NodeKind::Or);

        let ex = lower(&expr, OrMode::Exhaustive).unwrap();
        assert_eq!(ex.tree().node(0).kind, NodeKind::Neor);
    }

    #[test]
    fn test_single_child_connective_collapses() {
        let expr = Expr::And(vec![leaf_eq("a", json!(1))]);
        let def = lower(&expr, OrMode::ShortCircuit).unwrap();
        assert_eq!(def.tree().len(), 1);
        assert_eq!(def.tree().node(0).kind, NodeKind::Leaf);
    }

    #[test]
    fn test_empty_connective_rejected() {
        assert!(lower(&Expr::And(vec![]), OrMode::ShortCircuit).is_err());
    }

    #[test]
    fn test_scalar_at_root_rejected() {
        assert!(matches!(
            lower(&Expr::Field(FieldPath::key("a")), OrMode::ShortCircuit),
            Err(Error::MalformedTree(_))
        ));
        assert!(lower(&Expr::Value(json!(1)), OrMode::ShortCircuit).is_err());
    }

    #[test]
    fn test_bad_regex_surfaces() {
        let expr = Expr::Like {
            lhs: Box::new(Expr::Field(FieldPath::key("a"))),
            pattern: LikePattern::Regex("(oops".into()),
        };
        assert!(matches!(
            lower(&expr, OrMode::ShortCircuit),
            Err(Error::MalformedRegex(_))
        ));
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let expr = Expr::compare(
            CompareOp::Eq,
            Expr::func(FuncName::Add, vec![Expr::Value(json!(1))]),
            Expr::Value(json!(2)),
        );
        assert!(lower(&expr, OrMode::ShortCircuit).is_err());
    }

    #[test]
    fn test_constant_predicates_become_leaves() {
        let expr = Expr::Or(vec![Expr::False, Expr::True]);
        let def = lower(&expr, OrMode::ShortCircuit).unwrap();
        assert_eq!(def.leaves().len(), 2);
    }
}
