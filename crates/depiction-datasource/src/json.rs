//! Entity payload helpers.
//!
//! Payloads are JSON objects. A handful of field names are reserved:
//! `id` (the entity [`Guid`]), `dontSaveToScene`, and `transform.parent`
//! (the parent entity's id, used to rebuild hierarchies on load).

use crate::error::DatasourceError;
use crate::guid::Guid;
use serde_json::{Map, Value};

pub const ID_FIELD: &str = "id";
pub const DONT_SAVE_TO_SCENE_FIELD: &str = "dontSaveToScene";
pub const TRANSFORM_FIELD: &str = "transform";
pub const PARENT_FIELD: &str = "parent";
pub const GEO_COORDINATE_FIELD: &str = "geoCoordinate";

/// Overlay `layer` onto `target`.
///
/// Fields present in `layer` win; when both sides hold an object under the
/// same key the objects are merged recursively. Fields only present in
/// `target` are left untouched. A non-object `layer` replaces `target`.
pub fn merge(target: &mut Value, layer: &Value) {
    match (target, layer) {
        (Value::Object(target), Value::Object(layer)) => {
            for (key, value) in layer {
                if let Some(existing) = target.get_mut(key)
                    && existing.is_object()
                    && value.is_object()
                {
                    merge(existing, value);
                    continue;
                }
                target.insert(key.clone(), value.clone());
            }
        }
        (target, layer) => *target = layer.clone(),
    }
}

/// `result` merged over `fallback`: the result wins field by field.
pub fn merge_with_fallback(result: &Value, fallback: &Value) -> Value {
    let mut merged = fallback.clone();
    merge(&mut merged, result);
    merged
}

/// The declared `id`, if present.
///
/// A present but malformed id is an error rather than `None`, so a typo
/// never silently turns into a fresh entity.
pub fn payload_id(json: &Value) -> Result<Option<Guid>, DatasourceError> {
    match json.get(ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Guid::parse(s).map(Some),
        Some(other) => Err(DatasourceError::InvalidPayload(format!(
            "`{ID_FIELD}` must be a string, got {other}"
        ))),
    }
}

pub fn parent_id(json: &Value) -> Result<Option<Guid>, DatasourceError> {
    match json
        .get(TRANSFORM_FIELD)
        .and_then(|transform| transform.get(PARENT_FIELD))
    {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Guid::parse(s).map(Some),
        Some(other) => Err(DatasourceError::InvalidPayload(format!(
            "`{TRANSFORM_FIELD}.{PARENT_FIELD}` must be a string, got {other}"
        ))),
    }
}

pub fn dont_save_to_scene(json: &Value) -> Option<bool> {
    json.get(DONT_SAVE_TO_SCENE_FIELD).and_then(Value::as_bool)
}

pub fn set_id(json: &mut Value, id: Guid) -> Result<(), DatasourceError> {
    object_mut(json)?.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    Ok(())
}

/// Write `transform.parent` unless a parent is already declared.
///
/// Returns whether the field was injected.
pub fn inject_parent(json: &mut Value, parent: Guid) -> Result<bool, DatasourceError> {
    if parent_id(json)?.is_some() {
        return Ok(false);
    }
    let object = object_mut(json)?;
    let transform = object
        .entry(TRANSFORM_FIELD)
        .or_insert_with(|| Value::Object(Map::new()));
    if !transform.is_object() {
        *transform = Value::Object(Map::new());
    }
    if let Value::Object(transform) = transform {
        transform.insert(PARENT_FIELD.to_string(), Value::String(parent.to_string()));
    }
    Ok(true)
}

pub fn object_mut(json: &mut Value) -> Result<&mut Map<String, Value>, DatasourceError> {
    match json {
        Value::Object(map) => Ok(map),
        other => Err(DatasourceError::InvalidPayload(format!(
            "entity payload must be an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_wins_and_nested_objects_merge() {
        let result = json!({"name": "tile", "transform": {"position": [1, 2, 3]}});
        let fallback = json!({
            "name": "fallback",
            "color": "red",
            "transform": {"position": [0, 0, 0], "parent": "keep"}
        });
        let merged = merge_with_fallback(&result, &fallback);
        assert_eq!(
            merged,
            json!({
                "name": "tile",
                "color": "red",
                "transform": {"position": [1, 2, 3], "parent": "keep"}
            })
        );
    }

    #[test]
    fn non_object_layer_replaces() {
        let mut target = json!({"a": {"b": 1}});
        merge(&mut target, &json!({"a": 5}));
        assert_eq!(target, json!({"a": 5}));
    }

    #[test]
    fn inject_parent_only_when_absent() {
        let parent = Guid::from_u128(1);
        let other = Guid::from_u128(2);

        let mut child = json!({"id": Guid::from_u128(3).to_string()});
        assert!(inject_parent(&mut child, parent).unwrap());
        assert_eq!(parent_id(&child).unwrap(), Some(parent));

        let mut declared = json!({"transform": {"parent": other.to_string()}});
        assert!(!inject_parent(&mut declared, parent).unwrap());
        assert_eq!(parent_id(&declared).unwrap(), Some(other));
    }

    #[test]
    fn malformed_id_is_an_error() {
        assert!(payload_id(&json!({"id": 42})).is_err());
        assert!(payload_id(&json!({"id": "nope"})).is_err());
        assert_eq!(payload_id(&json!({})).unwrap(), None);
    }
}
