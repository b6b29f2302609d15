//! Diffing strategies and patch application for mirrorstore.
//!
//! Two interchangeable strategies compute the delta between state
//! snapshots:
//!
//! - [`shallow_diff`] compares top-level keys only; any change to a
//!   nested mapping is reported as a whole-value update.
//! - [`deep_diff`] recurses into nested mappings, producing minimal
//!   nested deltas; [`deep_diff_with`] additionally takes a predicate
//!   that can opt subtrees out of recursion by path or shape.
//!
//! [`apply_patch`] is the inverse: it reconstructs the current
//! snapshot from the previous snapshot plus a delta.
//!
//! The [`DiffStrategy`] trait is the seam the synchronization engine
//! diffs through; any `Fn(&StateMap, &StateMap) -> Delta` obeying the
//! same contract works as a caller-supplied strategy.

pub mod deep;
pub mod patch;
pub mod shallow;

pub use deep::{deep_diff, deep_diff_with, DescendPredicate};
pub use patch::apply_patch;
pub use shallow::shallow_diff;

use mirror_state::{Delta, StateMap};
use std::sync::Arc;

/// A pluggable diffing strategy.
///
/// Contract: `diff(current, previous)` returns the delta that, applied
/// to `previous`, yields `current`; it returns an empty delta when the
/// snapshots are structurally equal.
pub trait DiffStrategy: Send + Sync {
    fn diff(&self, current: &StateMap, previous: &StateMap) -> Delta;
}

impl<F> DiffStrategy for F
where
    F: Fn(&StateMap, &StateMap) -> Delta + Send + Sync,
{
    fn diff(&self, current: &StateMap, previous: &StateMap) -> Delta {
        self(current, previous)
    }
}

/// The shallow strategy (the engine's default).
#[derive(Clone, Copy, Debug, Default)]
pub struct ShallowDiff;

impl DiffStrategy for ShallowDiff {
    fn diff(&self, current: &StateMap, previous: &StateMap) -> Delta {
        shallow_diff(current, previous)
    }
}

/// The deep strategy, optionally carrying a descend predicate.
#[derive(Clone, Default)]
pub struct DeepDiff {
    should_descend: Option<Arc<DescendPredicate>>,
}

impl DeepDiff {
    pub fn new() -> Self {
        Self {
            should_descend: None,
        }
    }

    /// Restrict recursion with a predicate evaluated at every level.
    pub fn with_predicate(
        predicate: impl Fn(&mirror_state::Value, &mirror_state::Value, &[String]) -> bool
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            should_descend: Some(Arc::new(predicate)),
        }
    }
}

impl DiffStrategy for DeepDiff {
    fn diff(&self, current: &StateMap, previous: &StateMap) -> Delta {
        match &self.should_descend {
            Some(predicate) => deep_diff_with(current, previous, predicate.as_ref()),
            None => deep_diff(current, previous),
        }
    }
}
