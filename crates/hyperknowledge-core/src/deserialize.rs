//! # Type Dispatch
//!
//! The single table mapping the wire `type` tag to a structural check and a
//! constructor. Everything that turns JSON into entities goes through here:
//! the store's `add_entity`, snapshots and change events.

use crate::entity::fields::{self, Object};
use crate::entity::{Connector, Entity, Link, Node, Reference, Trail};
use crate::types::{EntityId, EntityKind, ValidationError};
use serde_json::Value;

/// Result of deserializing a single object or an array of objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Deserialized {
    One(Entity),
    Many {
        entities: Vec<Entity>,
        /// Index in the input array and the reason each element was dropped.
        rejected: Vec<(usize, ValidationError)>,
    },
}

/// Check that `value` is a structurally valid entity and return its kind.
///
/// A missing `id` is accepted here; whoever stores the entity assigns one.
pub fn validate(value: &Value) -> Result<EntityKind, ValidationError> {
    let obj = fields::as_object(value)?;
    let kind = kind_of(obj)?;
    kind.validate_object(obj)?;
    Ok(kind)
}

impl EntityKind {
    /// Validate `value` as an entity of exactly this kind.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let obj = fields::as_object(value)?;
        let found = kind_of(obj)?;
        if found != *self {
            return Err(ValidationError::WrongType {
                kind: found,
                field: "type",
                expected: self.as_str(),
            });
        }
        self.validate_object(obj)
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    fn validate_object(&self, obj: &Object) -> Result<(), ValidationError> {
        match self {
            EntityKind::Node
            | EntityKind::Context
            | EntityKind::VirtualNode
            | EntityKind::VirtualContext => Node::check(obj, *self),
            EntityKind::Reference => Reference::check(obj),
            EntityKind::Connector => Connector::check(obj),
            EntityKind::Link | EntityKind::VirtualLink => Link::check(obj, *self),
            EntityKind::Trail => Trail::check(obj),
        }
    }
}

pub(crate) fn kind_of(obj: &Object) -> Result<EntityKind, ValidationError> {
    obj.get("type")
        .and_then(Value::as_str)
        .ok_or(ValidationError::MissingType)?
        .parse()
}

/// Validate and build an entity, using `fallback_id` when `id` is absent.
pub(crate) fn entity_from_value(
    value: &Value,
    fallback_id: impl FnOnce() -> EntityId,
) -> Result<Entity, ValidationError> {
    let kind = validate(value)?;
    let obj = fields::as_object(value)?;
    let id = fields::id(obj, "id").unwrap_or_else(fallback_id);
    Ok(Entity::from_object(id, obj, kind))
}

fn standalone(value: &Value) -> Result<Entity, ValidationError> {
    let kind = validate(value)?;
    let obj = fields::as_object(value)?;
    let id = fields::id(obj, "id").ok_or(ValidationError::MissingField { kind, field: "id" })?;
    Ok(Entity::from_object(id, obj, kind))
}

/// Turn a JSON object or array into entities.
///
/// Outside a store there is nothing to generate ids from, so every entity
/// must carry one. Invalid array elements are reported in `rejected` and
/// logged; the rest of the array still deserializes.
pub fn deserialize(value: &Value) -> Result<Deserialized, ValidationError> {
    let Value::Array(items) = value else {
        return standalone(value).map(Deserialized::One);
    };

    let mut entities = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match standalone(item) {
            Ok(entity) => entities.push(entity),
            Err(err) => {
                tracing::warn!(index, error = %err, "Rejected entity in batch");
                rejected.push((index, err));
            }
        }
    }
    Ok(Deserialized::Many { entities, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_is_reported() {
        assert_eq!(
            validate(&json!({"id": "x", "type": "hyperedge"})),
            Err(ValidationError::UnknownType("hyperedge".to_string()))
        );
        assert_eq!(validate(&json!({"id": "x"})), Err(ValidationError::MissingType));
        assert_eq!(validate(&json!("node")), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn kind_validate_checks_the_tag() {
        let node = json!({"id": "n", "type": "node", "parent": null});
        assert!(EntityKind::Node.is_valid(&node));
        assert!(!EntityKind::Context.is_valid(&node));
    }

    #[test]
    fn object_deserializes_to_one() {
        let value = json!({"id": "n", "type": "node", "parent": "ctx"});
        match deserialize(&value).expect("valid") {
            Deserialized::One(entity) => {
                assert_eq!(entity.id().as_str(), "n");
                assert_eq!(entity.parent().map(EntityId::as_str), Some("ctx"));
            }
            Deserialized::Many { .. } => unreachable!("object yields one entity"),
        }
    }

    #[test]
    fn array_reports_rejected_elements() {
        let value = json!([
            {"id": "a", "type": "node", "parent": null},
            {"id": "b", "type": "mystery"},
            {"type": "node", "parent": null},
            {"id": "c", "type": "connector", "className": "facts", "roles": {}}
        ]);
        let Deserialized::Many { entities, rejected } = deserialize(&value).expect("array") else {
            unreachable!("array yields many");
        };
        assert_eq!(entities.len(), 2);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].0, 1);
        assert_eq!(
            rejected[1],
            (
                2,
                ValidationError::MissingField {
                    kind: EntityKind::Node,
                    field: "id"
                }
            )
        );
    }
}
