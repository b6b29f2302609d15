//! Patch application: reconstruct a snapshot from a base plus a delta.

use mirror_state::{Delta, Patch, StateMap, Value};

/// Apply a delta to a base snapshot, producing the new snapshot.
///
/// Pure: `base` is never mutated. This is the semantic inverse of the
/// deep diffing strategy: `apply_patch(prev, deep_diff(cur, prev))`
/// equals `cur` structurally.
///
/// A [`Patch::KeysUpdated`] aimed at a key whose current value is
/// absent or not a mapping recurses against an empty mapping, so the
/// result is the mapping described by the nested delta's update
/// leaves. A well-paired diff never produces that case (type changes
/// escape to whole-value updates), but a malformed delta still applies
/// deterministically instead of failing.
pub fn apply_patch(base: &StateMap, delta: &Delta) -> StateMap {
    let mut next = base.clone();

    for patch in delta {
        match patch {
            Patch::Updated { key, value } => {
                next.insert(key.clone(), value.clone());
            }
            Patch::KeysUpdated { key, delta } => {
                let child = match next.get(key) {
                    Some(Value::Mapping(child)) => apply_patch(child, delta),
                    _ => apply_patch(&StateMap::new(), delta),
                };
                next.insert(key.clone(), Value::Mapping(child));
            }
            Patch::Removed { key } => {
                next.remove(key);
            }
        }
    }

    next
}
