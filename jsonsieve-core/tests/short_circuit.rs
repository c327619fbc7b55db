//! Exhaustive checks of short-circuit soundness over small trees.
//!
//! For every full leaf assignment of each fixture tree, feeding verdicts
//! through the state machinery must agree with a plain recursive
//! evaluation of the tree, regardless of feed order, and a verdict reached
//! early must match the verdict under every completion of the unmarked
//! leaves.

use jsonsieve_core::tree::state::BinTreeState;
use jsonsieve_core::tree::{BinTree, BinTreeNode, NodeKind};
use std::sync::Arc;

/// Plain recursive truth of the tree under a full leaf assignment, where
/// `leaf_values` maps leaf node indices (in pre-order) to verdicts.
fn reference_verdict(tree: &BinTree, index: usize, leaf_values: &[(usize, bool)]) -> bool {
    let node = tree.node(index);
    match node.kind {
        NodeKind::Leaf => {
            leaf_values
                .iter()
                .find(|(i, _)| *i == index)
                .expect("assignment covers every leaf")
                .1
        }
        NodeKind::Or | NodeKind::Neor => {
            reference_verdict(tree, node.left, leaf_values)
                || reference_verdict(tree, node.right, leaf_values)
        }
        NodeKind::And => {
            reference_verdict(tree, node.left, leaf_values)
                && reference_verdict(tree, node.right, leaf_values)
        }
        NodeKind::Not => !reference_verdict(tree, node.left, leaf_values),
        NodeKind::Loop => reference_verdict(tree, node.left, leaf_values),
    }
}

fn leaf_indices(tree: &BinTree) -> Vec<usize> {
    (0..tree.len())
        .filter(|&i| tree.node(i).kind == NodeKind::Leaf)
        .collect()
}

/// Run every full assignment through the state machinery in the given
/// feed order and compare with the reference evaluation.
fn check_tree(tree: Arc<BinTree>, feed_order: &[usize]) {
    tree.validate().unwrap();
    let leaves = leaf_indices(&tree);
    assert_eq!(feed_order.len(), leaves.len());

    for bits in 0..(1u32 << leaves.len()) {
        let assignment: Vec<(usize, bool)> = leaves
            .iter()
            .enumerate()
            .map(|(pos, &leaf)| (leaf, bits & (1 << pos) != 0))
            .collect();

        let mut state = BinTreeState::new(tree.clone());
        let mut early_verdict = None;

        for &leaf in feed_order {
            if state.is_resolved(0) && early_verdict.is_none() {
                early_verdict = Some(state.is_true(0));
            }
            if state.is_resolved(leaf) {
                continue;
            }
            let truth = assignment.iter().find(|(i, _)| *i == leaf).unwrap().1;
            state.mark_node(leaf, truth);
        }
        state.resolve();

        let expected = reference_verdict(&tree, 0, &assignment);
        assert_eq!(
            state.is_true(0),
            expected,
            "assignment {:b} under feed order {:?}",
            bits,
            feed_order
        );

        // A verdict reached before all leaves were fed must already equal
        // the final verdict under this (and therefore any) completion
        if let Some(early) = early_verdict {
            assert_eq!(early, expected, "early verdict diverged at {:b}", bits);
        }
    }
}

/// `(a OR b) AND NOT c`
fn or_and_not_tree() -> Arc<BinTree> {
    Arc::new(BinTree::from_nodes(vec![
        BinTreeNode::new(NodeKind::And, 0, 1, 4),
        BinTreeNode::new(NodeKind::Or, 0, 2, 3),
        BinTreeNode::leaf(1),
        BinTreeNode::leaf(1),
        BinTreeNode::new(NodeKind::Not, 0, 5, 0),
        BinTreeNode::leaf(4),
    ]))
}

/// `(a NEOR b) AND c`
fn neor_and_tree() -> Arc<BinTree> {
    Arc::new(BinTree::from_nodes(vec![
        BinTreeNode::new(NodeKind::And, 0, 1, 4),
        BinTreeNode::new(NodeKind::Neor, 0, 2, 3),
        BinTreeNode::leaf(1),
        BinTreeNode::leaf(1),
        BinTreeNode::leaf(0),
    ]))
}

/// `NOT (a AND (b OR c))`
fn not_and_or_tree() -> Arc<BinTree> {
    Arc::new(BinTree::from_nodes(vec![
        BinTreeNode::new(NodeKind::Not, 0, 1, 0),
        BinTreeNode::new(NodeKind::And, 0, 2, 3),
        BinTreeNode::leaf(1),
        BinTreeNode::new(NodeKind::Or, 1, 4, 5),
        BinTreeNode::leaf(3),
        BinTreeNode::leaf(3),
    ]))
}

#[test]
fn or_and_not_all_assignments_in_document_order() {
    check_tree(or_and_not_tree(), &[2, 3, 5]);
}

#[test]
fn or_and_not_all_assignments_in_reverse_order() {
    check_tree(or_and_not_tree(), &[5, 3, 2]);
}

#[test]
fn neor_and_all_assignments() {
    check_tree(neor_and_tree(), &[2, 3, 4]);
    check_tree(neor_and_tree(), &[4, 2, 3]);
}

#[test]
fn not_and_or_all_assignments() {
    check_tree(not_and_or_tree(), &[2, 4, 5]);
    check_tree(not_and_or_tree(), &[5, 4, 2]);
}

#[test]
fn neor_never_resolves_on_one_child() {
    let tree = neor_and_tree();
    for first in [true, false] {
        let mut state = BinTreeState::new(tree.clone());
        state.mark_node(2, first);
        assert!(
            !state.is_resolved(1),
            "neor resolved after one child ({})",
            first
        );
    }
}

#[test]
fn reset_replays_to_the_same_verdict() {
    let tree = or_and_not_tree();
    let mut state = BinTreeState::new(tree.clone());

    state.mark_node(2, true);
    state.mark_node(5, false);
    state.resolve();
    let first = state.is_true(0);

    state.reset();
    state.mark_node(2, true);
    state.mark_node(5, false);
    state.resolve();
    assert_eq!(state.is_true(0), first);

    let mut fresh = BinTreeState::new(tree);
    fresh.mark_node(2, true);
    fresh.mark_node(5, false);
    fresh.resolve();
    assert_eq!(fresh.is_true(0), first);
}
