//! Deep diffing: recursive descent into nested mappings.

use mirror_state::{Delta, Patch, StateMap, Value};

/// Decides whether the deep diff may descend into a changed subtree.
///
/// Receives the current value, the previous value, and the full key
/// path from the root. Returning `false` stops recursion at this
/// subtree and reports it as a whole-value update. The predicate is
/// stateless and re-evaluated at every level of the descent.
pub type DescendPredicate = dyn Fn(&Value, &Value, &[String]) -> bool + Send + Sync;

/// Compute the delta between two snapshots, recursing into nested
/// mappings.
pub fn deep_diff(current: &StateMap, previous: &StateMap) -> Delta {
    diff_mappings(current, previous, None, &mut Vec::new())
}

/// [`deep_diff`] with a predicate that can opt specific subtrees out
/// of recursion (by path or by value shape).
pub fn deep_diff_with(
    current: &StateMap,
    previous: &StateMap,
    should_descend: &DescendPredicate,
) -> Delta {
    diff_mappings(current, previous, Some(should_descend), &mut Vec::new())
}

fn diff_mappings(
    current: &StateMap,
    previous: &StateMap,
    should_descend: Option<&DescendPredicate>,
    path: &mut Vec<String>,
) -> Delta {
    let mut delta = Delta::new();

    for (key, value) in current {
        let prev_value = previous.get(key);
        if prev_value == Some(value) {
            continue;
        }

        path.push(key.clone());
        delta.push(diff_value(key, value, prev_value, should_descend, path));
        path.pop();
    }

    for key in previous.keys() {
        if !current.contains_key(key) {
            delta.push(Patch::Removed { key: key.clone() });
        }
    }

    delta
}

/// Classify one changed key: descend into the subtree when both sides
/// are mappings and the predicate (if any) allows it, otherwise escape
/// to a whole-value update. Arrays and mapping↔non-mapping type
/// changes always escape.
fn diff_value(
    key: &str,
    value: &Value,
    prev_value: Option<&Value>,
    should_descend: Option<&DescendPredicate>,
    path: &mut Vec<String>,
) -> Patch {
    let (child, prev_child, prev_value) = match (value, prev_value) {
        (Value::Mapping(child), Some(prev @ Value::Mapping(prev_child))) => {
            (child, prev_child, prev)
        }
        _ => {
            return Patch::Updated {
                key: key.to_string(),
                value: value.clone(),
            }
        }
    };

    if let Some(predicate) = should_descend {
        if !predicate(value, prev_value, path) {
            return Patch::Updated {
                key: key.to_string(),
                value: value.clone(),
            };
        }
    }

    Patch::KeysUpdated {
        key: key.to_string(),
        delta: diff_mappings(child, prev_child, should_descend, path),
    }
}
