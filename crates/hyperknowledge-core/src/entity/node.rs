//! Nodes, contexts and references.

use super::fields::{self, Object};
use crate::primitives::{
    DATASOURCE_TYPE_PROPERTY, READONLY_PROPERTY, VIRTUAL_SOURCE_PROPERTY,
};
use crate::types::{EntityId, EntityKind, MetaProperties, Properties, PropertyValue, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An addressable sub-region (anchor) of a node's content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    /// Interface type, e.g. `"spatial"` or `"temporal"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Properties,
}

impl Interface {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: Properties::new(),
        }
    }
}

/// Interfaces keyed by anchor name.
pub type Interfaces = BTreeMap<String, Interface>;

// =============================================================================
// NODE / CONTEXT
// =============================================================================

/// A node of the graph.
///
/// The same shape backs nodes, contexts and their virtual counterparts; the
/// `Entity` variant decides which one it is.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: EntityId,
    /// Enclosing container; `None` is the root.
    pub parent: Option<EntityId>,
    pub properties: Properties,
    pub meta_properties: MetaProperties,
    pub interfaces: Interfaces,
}

/// A container of child entities.
pub type Context = Node;

impl Node {
    pub fn new(id: impl Into<EntityId>, parent: Option<EntityId>) -> Self {
        Self {
            id: id.into(),
            parent,
            properties: Properties::new(),
            meta_properties: MetaProperties::new(),
            interfaces: Interfaces::new(),
        }
    }

    /// Create a read-only node mirroring data at `virtual_source`.
    pub fn new_virtual(
        id: impl Into<EntityId>,
        parent: Option<EntityId>,
        virtual_source: impl Into<String>,
    ) -> Self {
        let mut node = Self::new(id, parent);
        mark_virtual(&mut node.properties, Some(virtual_source.into()));
        node
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_interface(mut self, key: impl Into<String>, interface: Interface) -> Self {
        self.interfaces.insert(key.into(), interface);
        self
    }

    /// Locator of the external data this entity mirrors, if virtual.
    pub fn virtual_source(&self) -> Option<&str> {
        virtual_source(&self.properties)
    }

    pub fn datasource_type(&self) -> Option<&str> {
        self.properties
            .get(DATASOURCE_TYPE_PROPERTY)
            .and_then(PropertyValue::as_str)
    }

    /// Whether `value` is a valid node, context or virtual variant of either.
    pub fn is_valid(value: &Value) -> bool {
        crate::deserialize::validate(value).is_ok_and(|kind| {
            matches!(
                kind,
                EntityKind::Node
                    | EntityKind::Context
                    | EntityKind::VirtualNode
                    | EntityKind::VirtualContext
            )
        })
    }

    pub(crate) fn check(obj: &Object, kind: EntityKind) -> Result<(), ValidationError> {
        fields::check_id(obj, kind)?;
        fields::require_nullable_id(obj, kind, "parent")?;
        if kind.is_virtual() {
            fields::require_virtual_source(obj, kind)?;
        }
        Ok(())
    }

    pub(crate) fn from_object(id: EntityId, obj: &Object, kind: EntityKind) -> Self {
        let mut node = Self {
            id,
            parent: fields::id(obj, "parent"),
            properties: fields::properties(obj),
            meta_properties: fields::meta_properties(obj),
            interfaces: fields::interfaces(obj),
        };
        if kind.is_virtual() {
            mark_virtual(&mut node.properties, None);
        }
        node
    }

    pub(crate) fn to_json(&self, kind: EntityKind) -> Value {
        let mut obj = fields::header(&self.id, kind);
        obj.insert("parent".to_string(), fields::id_to_json(self.parent.as_ref()));
        obj.insert("properties".to_string(), fields::properties_to_json(&self.properties));
        obj.insert(
            "metaProperties".to_string(),
            fields::meta_properties_to_json(&self.meta_properties),
        );
        obj.insert("interfaces".to_string(), fields::interfaces_to_json(&self.interfaces));
        Value::Object(obj)
    }
}

// =============================================================================
// REFERENCE
// =============================================================================

/// Re-exposes another entity inside `parent` without duplicating it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub id: EntityId,
    pub parent: Option<EntityId>,
    /// The referenced entity.
    pub reference: EntityId,
    pub properties: Properties,
    pub meta_properties: MetaProperties,
    pub interfaces: Interfaces,
}

impl Reference {
    pub fn new(
        id: impl Into<EntityId>,
        reference: impl Into<EntityId>,
        parent: Option<EntityId>,
    ) -> Self {
        Self {
            id: id.into(),
            parent,
            reference: reference.into(),
            properties: Properties::new(),
            meta_properties: MetaProperties::new(),
            interfaces: Interfaces::new(),
        }
    }

    pub fn is_valid(value: &Value) -> bool {
        crate::deserialize::validate(value).is_ok_and(|kind| kind == EntityKind::Reference)
    }

    pub(crate) fn check(obj: &Object) -> Result<(), ValidationError> {
        let kind = EntityKind::Reference;
        fields::check_id(obj, kind)?;
        fields::require_nullable_id(obj, kind, "parent")?;
        fields::require_string(obj, kind, "ref")
    }

    pub(crate) fn from_object(id: EntityId, obj: &Object) -> Self {
        Self {
            id,
            parent: fields::id(obj, "parent"),
            reference: fields::id(obj, "ref").unwrap_or_else(|| EntityId::from("")),
            properties: fields::properties(obj),
            meta_properties: fields::meta_properties(obj),
            interfaces: fields::interfaces(obj),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = fields::header(&self.id, EntityKind::Reference);
        obj.insert("parent".to_string(), fields::id_to_json(self.parent.as_ref()));
        obj.insert("ref".to_string(), Value::String(self.reference.as_str().to_string()));
        obj.insert("properties".to_string(), fields::properties_to_json(&self.properties));
        obj.insert(
            "metaProperties".to_string(),
            fields::meta_properties_to_json(&self.meta_properties),
        );
        obj.insert("interfaces".to_string(), fields::interfaces_to_json(&self.interfaces));
        Value::Object(obj)
    }
}

// =============================================================================
// VIRTUAL FLAGS
// =============================================================================

/// Force the read-only flag and, when given, the virtual source locator.
pub(crate) fn mark_virtual(properties: &mut Properties, source: Option<String>) {
    properties.insert(READONLY_PROPERTY.to_string(), PropertyValue::Bool(true));
    if let Some(source) = source {
        properties.insert(VIRTUAL_SOURCE_PROPERTY.to_string(), PropertyValue::String(source));
    }
}

pub(crate) fn virtual_source(properties: &Properties) -> Option<&str> {
    properties
        .get(VIRTUAL_SOURCE_PROPERTY)
        .and_then(PropertyValue::as_str)
}
