//! Matcher facade binding a compiled definition to documents.

use crate::tree::lower::MatchDef;
use crate::tree::state::BinTreeState;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// Evaluates documents against one compiled filter definition.
///
/// The definition is immutable and shared; every [`Matcher::matches`] call
/// owns its own tree state, so a cloned matcher can serve concurrent
/// callers without coordination.
#[derive(Clone)]
pub struct Matcher {
    def: Arc<MatchDef>,
}

impl Matcher {
    /// Bind a matcher to a compiled definition.
    pub fn new(def: Arc<MatchDef>) -> Self {
        Self { def }
    }

    /// The definition this matcher runs.
    pub fn definition(&self) -> &Arc<MatchDef> {
        &self.def
    }

    /// True iff the document satisfies the filter.
    ///
    /// Leaves are evaluated in leaf-index order; leaves whose subtree was
    /// already short-circuited away are skipped, and the walk stops as soon
    /// as the root verdict is determined.
    pub fn matches(&self, doc: &Value) -> bool {
        let mut eval = Evaluation::new(self.def.clone());

        for ordinal in 0..self.def.leaves().len() {
            if eval.is_resolved() {
                break;
            }
            let leaf = &self.def.leaves()[ordinal];
            if eval.state.is_resolved(leaf.node()) {
                continue;
            }
            let verdict = leaf.evaluate(doc);
            trace!(leaf = ordinal, verdict, "leaf decided");
            eval.feed_leaf(ordinal, verdict);
        }

        eval.finalize()
    }
}

/// One in-flight evaluation.
///
/// For callers that produce leaf verdicts themselves (for example from a
/// streaming document scanner): feed verdicts in any order, probe
/// [`Evaluation::is_resolved`] to stop early, and [`Evaluation::finalize`]
/// when no further input will arrive.
pub struct Evaluation {
    def: Arc<MatchDef>,
    state: BinTreeState,
}

impl Evaluation {
    /// Start a fresh evaluation of `def`.
    pub fn new(def: Arc<MatchDef>) -> Self {
        let state = BinTreeState::new(def.tree().clone());
        Self { def, state }
    }

    /// Report the verdict for the leaf at `ordinal` (its position in
    /// `MatchDef::leaves`).
    ///
    /// A leaf whose subtree has already been short-circuited is ignored:
    /// its contribution can no longer matter.
    pub fn feed_leaf(&mut self, ordinal: usize, truth: bool) {
        let node = self.def.leaves()[ordinal].node();
        if self.state.is_resolved(node) {
            return;
        }
        self.state.mark_node(node, truth);
    }

    /// True once the root verdict is determined; callers may stop feeding.
    pub fn is_resolved(&self) -> bool {
        self.state.is_resolved(0)
    }

    /// Coerce anything still undecided to false and report the verdict.
    pub fn finalize(&mut self) -> bool {
        self.state.resolve();
        self.state.is_true(0)
    }

    /// Return the evaluation to its initial all-unknown state.
    pub fn reset(&mut self) {
        self.state.reset();
    }
}
