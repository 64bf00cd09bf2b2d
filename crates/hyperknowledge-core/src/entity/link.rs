//! # Links and Binds
//!
//! A `Link` instantiates a connector by binding components to its roles.
//! Binds form a three-level multi-map:
//!
//! ```text
//! role -> component id -> [anchor, anchor, ...]
//! ```
//!
//! Roles and components keep insertion order. The anchor list is a
//! multiset: binding the same `(role, component, anchor)` twice records it
//! twice, and removing one anchor drops a single occurrence.

use super::fields::{self, Object};
use super::node::{mark_virtual, virtual_source};
use crate::primitives::DEFAULT_ANCHOR;
use crate::types::{EntityId, EntityKind, MetaProperties, Properties, ValidationError};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// Anchor name inside a component; `"λ"` is the whole entity.
pub type Anchor = String;

/// Role name -> component id, used by anchor-agnostic bind lookups.
pub type BindSpec = BTreeMap<String, EntityId>;

// =============================================================================
// BINDS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binds(IndexMap<String, IndexMap<EntityId, Vec<Anchor>>>);

impl Binds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `anchor` to the list for `(role, component)`.
    pub fn add(&mut self, role: impl Into<String>, component: EntityId, anchor: impl Into<Anchor>) {
        self.0
            .entry(role.into())
            .or_default()
            .entry(component)
            .or_default()
            .push(anchor.into());
    }

    /// Remove `component` from every role it is bound under.
    ///
    /// With an anchor, only one occurrence of that anchor is dropped per role.
    /// Empty component and role entries are pruned. Returns whether anything
    /// was removed.
    pub fn remove(&mut self, component: &EntityId, anchor: Option<&str>) -> bool {
        let mut removed = false;
        for components in self.0.values_mut() {
            match anchor {
                None => {
                    removed |= components.shift_remove(component).is_some();
                }
                Some(anchor) => {
                    let Some(anchors) = components.get_mut(component) else {
                        continue;
                    };
                    if let Some(pos) = anchors.iter().position(|a| a == anchor) {
                        anchors.remove(pos);
                        removed = true;
                    }
                    if anchors.is_empty() {
                        components.shift_remove(component);
                    }
                }
            }
        }
        self.0.retain(|_, components| !components.is_empty());
        removed
    }

    /// Every role in `spec` is present with its component bound.
    pub fn has_binds(&self, spec: &BindSpec) -> bool {
        spec.iter().all(|(role, component)| {
            self.0
                .get(role)
                .is_some_and(|components| components.contains_key(component))
        })
    }

    /// Every `(role, component)` pair of `other` is bound here.
    pub fn covers(&self, other: &Binds) -> bool {
        other.0.iter().all(|(role, components)| {
            self.0.get(role).is_some_and(|mine| {
                components.keys().all(|component| mine.contains_key(component))
            })
        })
    }

    /// Role names in insertion order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Components bound under `role`, in insertion order.
    pub fn components_of(&self, role: &str) -> impl Iterator<Item = &EntityId> {
        self.0.get(role).into_iter().flat_map(IndexMap::keys)
    }

    /// Every bound component once, in first-seen order.
    pub fn components(&self) -> Vec<&EntityId> {
        let mut seen = Vec::new();
        for component in self.0.values().flat_map(IndexMap::keys) {
            if !seen.contains(&component) {
                seen.push(component);
            }
        }
        seen
    }

    pub fn anchors(&self, role: &str, component: &EntityId) -> &[Anchor] {
        self.0
            .get(role)
            .and_then(|components| components.get(component))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn binds_component(&self, component: &EntityId) -> bool {
        self.0.values().any(|components| components.contains_key(component))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Enumerate the Cartesian product of the components bound under
    /// `roles`, in role order and per-role insertion order.
    ///
    /// Empty `roles` invokes `callback` once with `[]`; a role with no
    /// binds yields no invocations.
    pub fn for_each_cross_bind<F>(&self, roles: &[&str], mut callback: F)
    where
        F: FnMut(&[&EntityId]),
    {
        let mut current = Vec::with_capacity(roles.len());
        self.cross_bind(roles, &mut current, &mut callback);
    }

    fn cross_bind<'a, F>(&'a self, roles: &[&str], current: &mut Vec<&'a EntityId>, callback: &mut F)
    where
        F: FnMut(&[&EntityId]),
    {
        let Some((role, rest)) = roles.split_first() else {
            callback(current.as_slice());
            return;
        };
        let Some(components) = self.0.get(*role) else {
            return;
        };
        for component in components.keys() {
            current.push(component);
            self.cross_bind(rest, current, callback);
            current.pop();
        }
    }

    /// Lenient read: a bare string anchor counts as one anchor, any other
    /// non-array value as the default anchor.
    pub fn from_json(value: Option<&Value>) -> Self {
        let mut binds = Binds::new();
        let Some(Value::Object(roles)) = value else {
            return binds;
        };
        for (role, components) in roles {
            let Value::Object(components) = components else {
                continue;
            };
            for (component, anchors) in components {
                let component = EntityId::from(component.as_str());
                match anchors {
                    Value::Array(list) => {
                        for anchor in list.iter().filter_map(Value::as_str) {
                            binds.add(role.as_str(), component.clone(), anchor);
                        }
                    }
                    Value::String(anchor) => binds.add(role.as_str(), component, anchor.as_str()),
                    _ => binds.add(role.as_str(), component, DEFAULT_ANCHOR),
                }
            }
        }
        binds
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(role, components)| {
                    let components = components
                        .iter()
                        .map(|(component, anchors)| {
                            let anchors = anchors.iter().cloned().map(Value::String).collect();
                            (component.as_str().to_string(), Value::Array(anchors))
                        })
                        .collect();
                    (role.clone(), Value::Object(components))
                })
                .collect(),
        )
    }
}

// =============================================================================
// LINK
// =============================================================================

/// An instance of a connector binding components to its roles.
///
/// The same struct backs links and virtual links.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: EntityId,
    /// Connector this link instantiates; `None` once the connector is gone.
    pub connector: Option<EntityId>,
    pub parent: Option<EntityId>,
    pub binds: Binds,
    pub properties: Properties,
    pub meta_properties: MetaProperties,
}

impl Link {
    pub fn new(id: impl Into<EntityId>, connector: Option<EntityId>, parent: Option<EntityId>) -> Self {
        Self {
            id: id.into(),
            connector,
            parent,
            binds: Binds::new(),
            properties: Properties::new(),
            meta_properties: MetaProperties::new(),
        }
    }

    pub fn new_virtual(
        id: impl Into<EntityId>,
        connector: Option<EntityId>,
        parent: Option<EntityId>,
        virtual_source: impl Into<String>,
    ) -> Self {
        let mut link = Self::new(id, connector, parent);
        mark_virtual(&mut link.properties, Some(virtual_source.into()));
        link
    }

    /// Builder-style bind on the default anchor.
    pub fn with_bind(mut self, role: impl Into<String>, component: impl Into<EntityId>) -> Self {
        self.binds.add(role, component.into(), DEFAULT_ANCHOR);
        self
    }

    pub fn virtual_source(&self) -> Option<&str> {
        virtual_source(&self.properties)
    }

    pub fn is_valid(value: &Value) -> bool {
        crate::deserialize::validate(value)
            .is_ok_and(|kind| matches!(kind, EntityKind::Link | EntityKind::VirtualLink))
    }

    pub(crate) fn check(obj: &Object, kind: EntityKind) -> Result<(), ValidationError> {
        fields::check_id(obj, kind)?;
        fields::require_nullable_id(obj, kind, "connector")?;
        fields::require_nullable_id(obj, kind, "parent")?;
        fields::require_object(obj, kind, "binds")?;
        if kind.is_virtual() {
            fields::require_virtual_source(obj, kind)?;
        }
        Ok(())
    }

    pub(crate) fn from_object(id: EntityId, obj: &Object, kind: EntityKind) -> Self {
        let mut link = Self {
            id,
            connector: fields::id(obj, "connector"),
            parent: fields::id(obj, "parent"),
            binds: Binds::from_json(obj.get("binds")),
            properties: fields::properties(obj),
            meta_properties: fields::meta_properties(obj),
        };
        if kind.is_virtual() {
            mark_virtual(&mut link.properties, None);
        }
        link
    }

    pub(crate) fn to_json(&self, kind: EntityKind) -> Value {
        let mut obj = fields::header(&self.id, kind);
        obj.insert("connector".to_string(), fields::id_to_json(self.connector.as_ref()));
        obj.insert("parent".to_string(), fields::id_to_json(self.parent.as_ref()));
        obj.insert("binds".to_string(), self.binds.to_json());
        obj.insert("properties".to_string(), fields::properties_to_json(&self.properties));
        obj.insert(
            "metaProperties".to_string(),
            fields::meta_properties_to_json(&self.meta_properties),
        );
        Value::Object(obj)
    }
}
