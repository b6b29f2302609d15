//! Deltas: ordered sequences of patches between two state snapshots.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// An ordered sequence of patches.
///
/// Produced by a diffing strategy and consumed by the patch applier.
/// Changed and added keys come first (in the current snapshot's key
/// order), followed by removed keys. Order only matters for
/// deterministic replay; applying a delta is order-independent across
/// distinct keys.
pub type Delta = Vec<Patch>;

/// A single change to one key of a mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Patch {
    /// The key was set (or changed) to a new whole value.
    Updated { key: String, value: Value },
    /// The key holds a nested mapping whose own keys changed; recurse
    /// with the nested delta.
    KeysUpdated { key: String, delta: Delta },
    /// The key is no longer present.
    Removed { key: String },
}

impl Patch {
    /// The parent-mapping key this patch targets.
    pub fn key(&self) -> &str {
        match self {
            Patch::Updated { key, .. } => key,
            Patch::KeysUpdated { key, .. } => key,
            Patch::Removed { key } => key,
        }
    }
}
