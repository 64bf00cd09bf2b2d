//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the hyperknowledge store:
//! - Entity identifiers (`EntityId`) and kind tags (`EntityKind`)
//! - Property values (`PropertyValue`, `Properties`, `MetaProperties`)
//! - Error types (`ValidationError`, `HkError`)
//!
//! ## Ordering Guarantees
//!
//! Identifiers and kinds implement `Ord` so every index in the store can use
//! `BTreeMap`/`BTreeSet` and iterate in a reproducible order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIER
// =============================================================================

/// Identifier of an entity, unique across every kind within one store.
///
/// The implicit root container has no identifier; places where the root is
/// a valid answer use `Option<EntityId>` with `None` meaning root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an identifier from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// ENTITY KIND
// =============================================================================

/// Discriminator of the closed set of entity variants.
///
/// The string form is the `type` field of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "node")]
    Node,
    #[serde(rename = "context")]
    Context,
    #[serde(rename = "virtualnode")]
    VirtualNode,
    #[serde(rename = "virtualcontext")]
    VirtualContext,
    #[serde(rename = "ref")]
    Reference,
    #[serde(rename = "connector")]
    Connector,
    #[serde(rename = "link")]
    Link,
    #[serde(rename = "virtuallink")]
    VirtualLink,
    #[serde(rename = "trail")]
    Trail,
}

impl EntityKind {
    /// Every kind, in the fixed lookup order used by snapshots and metrics.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Node,
        EntityKind::Context,
        EntityKind::Link,
        EntityKind::Connector,
        EntityKind::Reference,
        EntityKind::Trail,
        EntityKind::VirtualNode,
        EntityKind::VirtualContext,
        EntityKind::VirtualLink,
    ];

    /// The wire-format `type` tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Context => "context",
            EntityKind::VirtualNode => "virtualnode",
            EntityKind::VirtualContext => "virtualcontext",
            EntityKind::Reference => "ref",
            EntityKind::Connector => "connector",
            EntityKind::Link => "link",
            EntityKind::VirtualLink => "virtuallink",
            EntityKind::Trail => "trail",
        }
    }

    /// Containers can hold child entities.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, EntityKind::Context | EntityKind::VirtualContext)
    }

    /// Virtual kinds mirror externally sourced, read-only data.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(
            self,
            EntityKind::VirtualNode | EntityKind::VirtualContext | EntityKind::VirtualLink
        )
    }

    /// Connectors are schema objects and are never filed under a parent.
    #[must_use]
    pub fn is_contained(&self) -> bool {
        !matches!(self, EntityKind::Connector)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownType(s.to_string()))
    }
}

// =============================================================================
// PROPERTY VALUES
// =============================================================================

/// A property value: a primitive or an array of primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Convert a JSON value, returning `None` for objects, nulls and nested
    /// arrays.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(Self::primitive_from_json)
                .collect::<Option<Vec<_>>>()
                .map(PropertyValue::Array),
            other => Self::primitive_from_json(other),
        }
    }

    fn primitive_from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(PropertyValue::Integer)
                .or_else(|| n.as_f64().map(PropertyValue::Float)),
            Value::String(s) => Some(PropertyValue::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Project to JSON. Non-finite floats become `null`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Integer(i) => Value::from(*i),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Array(items) => {
                Value::Array(items.iter().map(PropertyValue::to_json).collect())
            }
        }
    }

    /// Borrow the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean payload, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

/// Property bag of an entity.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Per-property annotations (datatype URIs, provenance tags).
pub type MetaProperties = BTreeMap<String, String>;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Structural validation failures raised before a JSON object becomes an
/// `Entity`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The candidate is not a JSON object.
    #[error("Entity must be a JSON object")]
    NotAnObject,

    /// The `type` discriminator is missing or not a string.
    #[error("Entity has no type")]
    MissingType,

    /// The `type` discriminator names no known kind.
    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    /// A required field is absent.
    #[error("{kind} is missing required field '{field}'")]
    MissingField {
        kind: EntityKind,
        field: &'static str,
    },

    /// A field is present with the wrong JSON shape.
    #[error("{kind} field '{field}' must be {expected}")]
    WrongType {
        kind: EntityKind,
        field: &'static str,
        expected: &'static str,
    },

    /// A connector's `className` is not one of the enumerated codes.
    #[error("Unknown connector class: {0}")]
    InvalidClassName(String),
}

/// Errors that can occur in store, builder and snapshot operations.
///
/// - No silent failures: rejected input surfaces here as well as in the log
/// - The store never panics; every error is recoverable
#[derive(Debug, Error)]
pub enum HkError {
    /// The input failed structural validation.
    #[error("Invalid entity: {0}")]
    Validation(#[from] ValidationError),

    /// The requested entity is not in the store.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An update tried to change the kind of an existing entity.
    #[error("Entity {id} is a {expected}, not a {found}")]
    KindMismatch {
        id: EntityId,
        expected: EntityKind,
        found: EntityKind,
    },

    /// A bind operation targeted something other than a link.
    #[error("Entity {0} is not a link")]
    NotALink(EntityId),

    /// An action operation targeted something other than a trail.
    #[error("Entity {0} is not a trail")]
    NotATrail(EntityId),

    /// A parent id resolves to an entity that cannot hold children.
    #[error("Entity {0} is not a container")]
    NotAContainer(EntityId),

    /// A fine-grained mutation targeted a virtual (read-only) entity.
    #[error("Entity {0} is read-only")]
    ReadOnly(EntityId),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A configuration file could not be used.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_tags_roundtrip_through_from_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>(), Ok(kind));
        }
        assert_eq!(
            "hyperedge".parse::<EntityKind>(),
            Err(ValidationError::UnknownType("hyperedge".to_string()))
        );
    }

    #[test]
    fn only_connectors_are_uncontained() {
        let uncontained: Vec<_> = EntityKind::ALL
            .into_iter()
            .filter(|k| !k.is_contained())
            .collect();
        assert_eq!(uncontained, vec![EntityKind::Connector]);
    }

    #[test]
    fn property_value_keeps_integers_apart_from_floats() {
        assert_eq!(
            PropertyValue::from_json(&json!(3)),
            Some(PropertyValue::Integer(3))
        );
        assert_eq!(
            PropertyValue::from_json(&json!(3.5)),
            Some(PropertyValue::Float(3.5))
        );
    }

    #[test]
    fn property_value_rejects_objects_and_nested_arrays() {
        assert!(PropertyValue::from_json(&json!({"a": 1})).is_none());
        assert!(PropertyValue::from_json(&json!([[1], 2])).is_none());
        assert!(PropertyValue::from_json(&Value::Null).is_none());
    }

    #[test]
    fn property_value_array_of_primitives() {
        let value = PropertyValue::from_json(&json!(["a", 1, true])).expect("array");
        assert_eq!(value.to_json(), json!(["a", 1, true]));
    }

    #[test]
    fn entity_id_borrows_as_str() {
        let mut map = BTreeMap::new();
        map.insert(EntityId::from("alice"), 1);
        assert_eq!(map.get("alice"), Some(&1));
    }
}
