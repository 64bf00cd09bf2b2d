//! Field readers and structural checks shared by every entity variant.
//!
//! Readers are lenient: a missing or malformed optional member yields an
//! empty/`None` default. Checks are strict and name the offending field.

use super::node::{Interface, Interfaces};
use crate::primitives::VIRTUAL_SOURCE_PROPERTY;
use crate::types::{EntityId, EntityKind, MetaProperties, Properties, PropertyValue, ValidationError};
use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

// =============================================================================
// READERS
// =============================================================================

pub(crate) fn id(obj: &Object, key: &str) -> Option<EntityId> {
    obj.get(key).and_then(Value::as_str).map(EntityId::from)
}

pub(crate) fn string(obj: &Object, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn properties(obj: &Object) -> Properties {
    properties_of(obj.get("properties"))
}

pub(crate) fn properties_of(value: Option<&Value>) -> Properties {
    let Some(Value::Object(map)) = value else {
        return Properties::new();
    };
    map.iter()
        .filter_map(|(k, v)| PropertyValue::from_json(v).map(|pv| (k.clone(), pv)))
        .collect()
}

pub(crate) fn meta_properties(obj: &Object) -> MetaProperties {
    let Some(Value::Object(map)) = obj.get("metaProperties") else {
        return MetaProperties::new();
    };
    map.iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

pub(crate) fn interfaces(obj: &Object) -> Interfaces {
    let Some(Value::Object(map)) = obj.get("interfaces") else {
        return Interfaces::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let entry = value.as_object()?;
            let interface = Interface {
                kind: string(entry, "type").unwrap_or_default(),
                properties: properties_of(entry.get("properties")),
            };
            Some((key.clone(), interface))
        })
        .collect()
}

// =============================================================================
// WRITERS
// =============================================================================

pub(crate) fn id_to_json(id: Option<&EntityId>) -> Value {
    id.map_or(Value::Null, |id| Value::String(id.as_str().to_string()))
}

pub(crate) fn properties_to_json(properties: &Properties) -> Value {
    Value::Object(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

pub(crate) fn meta_properties_to_json(meta: &MetaProperties) -> Value {
    Value::Object(
        meta.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

pub(crate) fn interfaces_to_json(interfaces: &Interfaces) -> Value {
    Value::Object(
        interfaces
            .iter()
            .map(|(key, interface)| {
                let mut entry = Object::new();
                entry.insert("type".to_string(), Value::String(interface.kind.clone()));
                entry.insert(
                    "properties".to_string(),
                    properties_to_json(&interface.properties),
                );
                (key.clone(), Value::Object(entry))
            })
            .collect(),
    )
}

/// Start a wire object with the members every variant shares.
pub(crate) fn header(id: &EntityId, kind: EntityKind) -> Object {
    let mut obj = Object::new();
    obj.insert("id".to_string(), Value::String(id.as_str().to_string()));
    obj.insert("type".to_string(), Value::String(kind.as_str().to_string()));
    obj
}

// =============================================================================
// STRUCTURAL CHECKS
// =============================================================================

pub(crate) fn as_object(value: &Value) -> Result<&Object, ValidationError> {
    value.as_object().ok_or(ValidationError::NotAnObject)
}

/// `field` must be present and hold a string or `null`.
pub(crate) fn require_nullable_id(
    obj: &Object,
    kind: EntityKind,
    field: &'static str,
) -> Result<(), ValidationError> {
    match obj.get(field) {
        None => Err(ValidationError::MissingField { kind, field }),
        Some(Value::String(_) | Value::Null) => Ok(()),
        Some(_) => Err(ValidationError::WrongType {
            kind,
            field,
            expected: "a string or null",
        }),
    }
}

pub(crate) fn require_string(
    obj: &Object,
    kind: EntityKind,
    field: &'static str,
) -> Result<(), ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField { kind, field }),
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(ValidationError::WrongType {
            kind,
            field,
            expected: "a string",
        }),
    }
}

pub(crate) fn require_object(
    obj: &Object,
    kind: EntityKind,
    field: &'static str,
) -> Result<(), ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField { kind, field }),
        Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(ValidationError::WrongType {
            kind,
            field,
            expected: "an object",
        }),
    }
}

pub(crate) fn require_array(
    obj: &Object,
    kind: EntityKind,
    field: &'static str,
) -> Result<(), ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField { kind, field }),
        Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(ValidationError::WrongType {
            kind,
            field,
            expected: "an array",
        }),
    }
}

/// `id` may be absent (the store generates one) but never a non-string.
pub(crate) fn check_id(obj: &Object, kind: EntityKind) -> Result<(), ValidationError> {
    match obj.get("id") {
        None | Some(Value::Null | Value::String(_)) => Ok(()),
        Some(_) => Err(ValidationError::WrongType {
            kind,
            field: "id",
            expected: "a string",
        }),
    }
}

/// Virtual kinds need a non-null `properties.virtualsrc`.
pub(crate) fn require_virtual_source(obj: &Object, kind: EntityKind) -> Result<(), ValidationError> {
    let source = obj
        .get("properties")
        .and_then(Value::as_object)
        .and_then(|props| props.get(VIRTUAL_SOURCE_PROPERTY));
    match source {
        None | Some(Value::Null) => Err(ValidationError::MissingField {
            kind,
            field: "properties.virtualsrc",
        }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Object {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn properties_reader_drops_unsupported_values() {
        let o = obj(json!({"properties": {"name": "a", "nested": {"x": 1}, "n": null}}));
        let props = properties(&o);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("name"), Some(&PropertyValue::from("a")));
    }

    #[test]
    fn readers_default_when_members_are_missing() {
        let o = obj(json!({}));
        assert!(properties(&o).is_empty());
        assert!(meta_properties(&o).is_empty());
        assert!(interfaces(&o).is_empty());
        assert!(id(&o, "parent").is_none());
    }

    #[test]
    fn nullable_id_accepts_null_but_not_numbers() {
        let kind = EntityKind::Node;
        assert!(require_nullable_id(&obj(json!({"parent": null})), kind, "parent").is_ok());
        assert!(require_nullable_id(&obj(json!({"parent": "p"})), kind, "parent").is_ok());
        assert_eq!(
            require_nullable_id(&obj(json!({})), kind, "parent"),
            Err(ValidationError::MissingField {
                kind,
                field: "parent"
            })
        );
        assert!(require_nullable_id(&obj(json!({"parent": 4})), kind, "parent").is_err());
    }

    #[test]
    fn virtual_source_must_be_non_null() {
        let kind = EntityKind::VirtualNode;
        assert!(require_virtual_source(&obj(json!({"properties": {"virtualsrc": "q"}})), kind).is_ok());
        assert!(require_virtual_source(&obj(json!({"properties": {"virtualsrc": null}})), kind).is_err());
        assert!(require_virtual_source(&obj(json!({})), kind).is_err());
    }
}
