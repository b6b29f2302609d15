//! Shallow diffing: top-level keys only.

use mirror_state::{Delta, Patch, StateMap};

/// Compute the delta between two snapshots, comparing top-level keys
/// only.
///
/// Any key whose value differs, including a nested mapping with a
/// single changed leaf, is reported as a whole-value
/// [`Patch::Updated`]. Keys present in `previous` but absent in
/// `current` are reported as [`Patch::Removed`]. O(keys),
/// deterministic.
pub fn shallow_diff(current: &StateMap, previous: &StateMap) -> Delta {
    let mut delta = Delta::new();

    for (key, value) in current {
        if previous.get(key) != Some(value) {
            delta.push(Patch::Updated {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }

    for key in previous.keys() {
        if !current.contains_key(key) {
            delta.push(Patch::Removed { key: key.clone() });
        }
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_state::Value;

    fn map(entries: Vec<(&str, Value)>) -> StateMap {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_identical_snapshots_yield_empty_delta() {
        let state = map(vec![
            ("a", Value::from(1)),
            ("b", Value::Mapping(map(vec![("x", Value::from(2))]))),
        ]);
        assert!(shallow_diff(&state, &state).is_empty());
    }

    #[test]
    fn test_nested_change_becomes_whole_value_update() {
        let prev = map(vec![(
            "a",
            Value::Mapping(map(vec![("x", Value::from(1))])),
        )]);
        let cur = map(vec![(
            "a",
            Value::Mapping(map(vec![("x", Value::from(2))])),
        )]);

        let delta = shallow_diff(&cur, &prev);
        assert_eq!(
            delta,
            vec![Patch::Updated {
                key: "a".to_string(),
                value: Value::Mapping(map(vec![("x", Value::from(2))])),
            }]
        );
    }

    #[test]
    fn test_removed_key() {
        let prev = map(vec![("a", Value::from(1)), ("b", Value::from(2))]);
        let cur = map(vec![("a", Value::from(1))]);

        let delta = shallow_diff(&cur, &prev);
        assert_eq!(
            delta,
            vec![Patch::Removed {
                key: "b".to_string()
            }]
        );
    }

    #[test]
    fn test_added_key() {
        let prev = map(vec![]);
        let cur = map(vec![("fresh", Value::from("hi"))]);

        let delta = shallow_diff(&cur, &prev);
        assert_eq!(
            delta,
            vec![Patch::Updated {
                key: "fresh".to_string(),
                value: Value::from("hi"),
            }]
        );
    }
}
