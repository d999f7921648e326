//! Conversion of FeatureScript typed values into plain JSON.
//!
//! Evaluation responses encode script values as tagged objects, either
//! `{"btType": "...BTFSValueMap", "value": [...]}` or the older
//! `{"typeName": "BTFSValueMap", "message": {"value": [...]}}`. Values
//! without a tag are returned unchanged.

use serde_json::{Map, Value};

pub fn fs_value_to_json(value: &Value) -> Value {
    let Some(tag) = type_tag(value) else {
        return value.clone();
    };

    let body = value.get("message").unwrap_or(value);
    let inner = body.get("value");

    match tag {
        "BTFSValueMap" => {
            let mut map = Map::new();
            for entry in inner.and_then(Value::as_array).into_iter().flatten() {
                let entry = entry.get("message").unwrap_or(entry);
                let key = match entry.get("key").map(fs_value_to_json) {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => continue,
                };
                let value = entry.get("value").map(fs_value_to_json).unwrap_or(Value::Null);
                map.insert(key, value);
            }
            Value::Object(map)
        }
        "BTFSValueArray" => Value::Array(
            inner
                .and_then(Value::as_array)
                .map(|items| items.iter().map(fs_value_to_json).collect())
                .unwrap_or_default(),
        ),
        "BTFSValueUndefined" => Value::Null,
        _ => inner.map(fs_value_to_json).unwrap_or(Value::Null),
    }
}

/// Short type name, e.g. `BTFSValueMap` for
/// `com.belmonttech.serialize.fsvalue.BTFSValueMap`.
fn type_tag(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    let tag = obj
        .get("btType")
        .or_else(|| obj.get("typeName"))
        .and_then(Value::as_str)?;
    Some(tag.rsplit('.').next().unwrap_or(tag))
}
