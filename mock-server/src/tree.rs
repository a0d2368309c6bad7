//! In-memory JSON tree addressed by path segments.
//!
//! Mirrors the storage rules of the real service: `null` deletes, and an
//! object left without children disappears with it.

use serde_json::{Map, Value};

/// Value at `path`, or `null` when nothing is stored there.
pub fn get(root: &Value, path: &[String]) -> Value {
    let mut node = root;
    for segment in path {
        match node.get(segment.as_str()) {
            Some(child) => node = child,
            None => return Value::Null,
        }
    }
    node.clone()
}

/// Store `value` at `path`, creating intermediate objects. Writing `null`
/// removes the node and any ancestors it leaves empty.
pub fn set(node: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = prune(value);
        return;
    };
    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = &mut *node else {
        return;
    };
    let child = map.entry(head.clone()).or_insert(Value::Null);
    set(child, rest, value);
    if child.is_null() {
        map.remove(head);
    }
    if map.is_empty() {
        *node = Value::Null;
    }
}

/// Replace every object child with `true`, keeping primitives.
pub fn shallow(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| {
                    let child = if child.is_object() { Value::Bool(true) } else { child };
                    (key, child)
                })
                .collect(),
        ),
        other => other,
    }
}

fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| (key, prune(child)))
                .filter(|(_, child)| !child.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}
