//! Per-evaluation three-valued state over a decision tree.
//!
//! One evaluation owns one state; the tree itself is shared and immutable.
//! Nodes resolve bottom-up: marking a leaf may cascade its parent, the
//! parent's parent, and so on toward the root, while everything made
//! irrelevant by a decision is flagged `Resolved` rather than `False` so
//! "proven false" and "we stopped caring" stay distinguishable.

use super::{BinTree, NodeKind};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Resolution state of one node during an evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeState {
    /// Not yet decided this evaluation
    #[default]
    Unknown,
    /// Skipped via short-circuit; logically irrelevant. Counts as
    /// non-true toward the parent, unlike a proven `False`.
    Resolved,
    True,
    False,
}

/// Mutable evaluation state for one pass over a document.
///
/// Carries one [`NodeState`] per tree node plus the stall index that fences
/// upward propagation for iteration scopes.
pub struct BinTreeState {
    tree: Arc<BinTree>,
    data: Vec<NodeState>,
    stall_index: usize,
}

impl BinTreeState {
    /// Create an all-`Unknown` state for `tree`.
    pub fn new(tree: Arc<BinTree>) -> Self {
        let data = vec![NodeState::Unknown; tree.len()];
        Self {
            tree,
            data,
            stall_index: 0,
        }
    }

    /// The tree this state evaluates.
    pub fn tree(&self) -> &Arc<BinTree> {
        &self.tree
    }

    /// The state of one node.
    pub fn node_state(&self, index: usize) -> NodeState {
        self.data[index]
    }

    /// Whether a node has left `Unknown`.
    pub fn is_resolved(&self, index: usize) -> bool {
        self.data[index] != NodeState::Unknown
    }

    /// Whether a node resolved to true.
    pub fn is_true(&self, index: usize) -> bool {
        self.data[index] == NodeState::True
    }

    /// Copy another evaluation's state into this one.
    ///
    /// Panics when the two states belong to different trees.
    pub fn copy_from(&mut self, other: &BinTreeState) {
        assert!(
            Arc::ptr_eq(&self.tree, &other.tree),
            "cannot copy state from a different tree"
        );
        self.data.copy_from_slice(&other.data);
    }

    /// Install a new stall index, returning the previous one so callers can
    /// restore it on scope exit (stack discipline).
    ///
    /// While stalled, [`BinTreeState::mark_node`] stops propagating at the
    /// stalled node, so an iterator can decide each iteration independently
    /// without prematurely resolving the enclosing operators.
    pub fn set_stall_index(&mut self, index: usize) -> usize {
        std::mem::replace(&mut self.stall_index, index)
    }

    /// Force the tree to a full verdict by resolving every still-unknown
    /// node with `false`, deepest first.
    ///
    /// Used at end-of-document when no further leaf verdicts will arrive.
    /// Walking from the last index backward visits children before parents
    /// given the pre-order layout; the loop leaves as soon as the root is
    /// decided. Idempotent.
    pub fn resolve(&mut self) {
        if self.is_resolved(0) {
            return;
        }

        for index in (0..self.data.len()).rev() {
            if self.data[index] == NodeState::Unknown {
                self.mark_node(index, false);
            }
            if self.data[0] != NodeState::Unknown {
                break;
            }
        }
    }

    /// Return every node to `Unknown` and clear the stall.
    pub fn reset(&mut self) {
        self.stall_index = 0;
        self.data.fill(NodeState::Unknown);
    }

    /// Return the node at `index` and its entire subtree to `Unknown`.
    ///
    /// Used to replay a subtree over successive elements of an array; the
    /// caller also clears the enclosing loop node when iteration finishes.
    pub fn reset_node(&mut self, index: usize) {
        self.data[index] = NodeState::Unknown;

        let node = *self.tree.node(index);
        if node.kind.has_left() {
            self.reset_node(node.left);
        }
        if node.kind.has_right() {
            self.reset_node(node.right);
        }
    }

    /// Mark still-unknown descendants of a freshly decided node as
    /// `Resolved`: once the node's verdict is set, its subtree can no
    /// longer influence anything.
    fn resolve_descendants(&mut self, index: usize) {
        let node = *self.tree.node(index);
        if node.kind.has_left() && self.data[node.left] == NodeState::Unknown {
            self.data[node.left] = NodeState::Resolved;
            self.resolve_descendants(node.left);
        }
        if node.kind.has_right() && self.data[node.right] == NodeState::Unknown {
            self.data[node.right] = NodeState::Resolved;
            self.resolve_descendants(node.right);
        }
    }

    /// Re-evaluate an interior node against its children's states, marking
    /// it when they determine a verdict.
    ///
    /// Panics on a leaf: leaves are decided by the evaluator, never
    /// re-derived.
    fn check_node(&mut self, index: usize) {
        let node = *self.tree.node(index);
        match node.kind {
            NodeKind::Leaf => panic!("cannot check leaf node {}", index),
            NodeKind::Or => {
                let left = self.data[node.left];
                let right = self.data[node.right];
                if left == NodeState::True || right == NodeState::True {
                    self.mark_node(index, true);
                } else if left == NodeState::False && right == NodeState::False {
                    self.mark_node(index, false);
                }
            }
            NodeKind::Neor => {
                // Both children must resolve before the node does
                let left = self.data[node.left];
                let right = self.data[node.right];
                if left != NodeState::Unknown && right != NodeState::Unknown {
                    let truth = left == NodeState::True || right == NodeState::True;
                    self.mark_node(index, truth);
                }
            }
            NodeKind::And => {
                let left = self.data[node.left];
                let right = self.data[node.right];
                if left == NodeState::True && right == NodeState::True {
                    self.mark_node(index, true);
                } else if left == NodeState::False || right == NodeState::False {
                    self.mark_node(index, false);
                }
            }
            NodeKind::Not => match self.data[node.left] {
                NodeState::True => self.mark_node(index, false),
                NodeState::False => self.mark_node(index, true),
                _ => {}
            },
            NodeKind::Loop => match self.data[node.left] {
                NodeState::True => self.mark_node(index, true),
                NodeState::False => self.mark_node(index, false),
                _ => {}
            },
        }
    }

    /// Record a verdict for a node and propagate upward.
    ///
    /// The node must be `Unknown`; marking a decided node is a bug in the
    /// caller and panics. After setting the verdict, still-unknown
    /// descendants become `Resolved`, then the parent is re-checked,
    /// cascading toward the root unless this node is the root or the
    /// current stall index.
    pub fn mark_node(&mut self, index: usize, value: bool) {
        assert!(
            self.data[index] == NodeState::Unknown,
            "node {} is already resolved",
            index
        );

        trace!(node = index, value, "mark");
        self.data[index] = if value {
            NodeState::True
        } else {
            NodeState::False
        };
        self.resolve_descendants(index);

        // The root has nowhere to propagate
        if index == 0 {
            return;
        }

        // Propagation is fenced at the stall index
        if index == self.stall_index {
            return;
        }

        let parent = self.tree.node(index).parent;
        self.check_node(parent);
    }

    fn fmt_item(&self, f: &mut fmt::Formatter<'_>, item: usize, depth: usize) -> fmt::Result {
        let node = self.tree.node(item);
        let verdict = match self.data[item] {
            NodeState::Unknown => "",
            NodeState::Resolved => " = undefined",
            NodeState::True => " = true",
            NodeState::False => " = false",
        };
        writeln!(
            f,
            "{:indent$}[{}] {}{}",
            "",
            item,
            node.kind,
            verdict,
            indent = depth * 2
        )?;
        if node.left != 0 {
            self.fmt_item(f, node.left, depth + 1)?;
        }
        if node.right != 0 {
            self.fmt_item(f, node.right, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for BinTreeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tree.is_empty() {
            return Ok(());
        }
        self.fmt_item(f, 0, 0)
    }
}
