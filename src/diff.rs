use serde_json::{Map, Value};

fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Collects `(path, old, new)` for every leaf that differs. Arrays are
/// compared index by index; keys missing from `current` are not reported.
pub(crate) fn diff_json(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<(String, Value, Value)>,
) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = child_path(path_prefix, key);
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None if curr_val.is_object() => {
                        diff_json(&Value::Object(Map::new()), curr_val, &path, changes)
                    }
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
        }
        (Value::Array(prev_arr), Value::Array(curr_arr)) => {
            for (idx, curr_val) in curr_arr.iter().enumerate() {
                let path = child_path(path_prefix, &idx.to_string());
                match prev_arr.get(idx) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_changes() {
        let a = json!({"result_code": "0", "result_data": [{"devices": []}]});
        let mut changes = Vec::new();
        diff_json(&a, &a, "", &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn nested_device_field_change() {
        let prev = json!({"result_data": [{"devices": [{"id": "a", "online": "1"}]}]});
        let curr = json!({"result_data": [{"devices": [{"id": "a", "online": "0"}]}]});
        let mut changes = Vec::new();
        diff_json(&prev, &curr, "", &mut changes);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, "result_data.0.devices.0.online");
        assert_eq!(changes[0].1, json!("1"));
        assert_eq!(changes[0].2, json!("0"));
    }

    #[test]
    fn new_array_element_reported() {
        let prev = json!([{"id": "a"}]);
        let curr = json!([{"id": "a"}, {"id": "b"}]);
        let mut changes = Vec::new();
        diff_json(&prev, &curr, "", &mut changes);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, "1");
        assert_eq!(changes[0].1, Value::Null);
    }

    #[test]
    fn new_key_reported_with_null_old() {
        let prev = json!({"a": 1});
        let curr = json!({"a": 1, "b": 2});
        let mut changes = Vec::new();
        diff_json(&prev, &curr, "", &mut changes);
        assert_eq!(changes, vec![("b".to_string(), Value::Null, json!(2))]);
    }
}
