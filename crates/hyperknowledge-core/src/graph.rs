//! # Graph Store
//!
//! The in-memory hyperknowledge store.
//!
//! Entities live in one arena keyed by id. Every relation between them is
//! mirrored in a derived index that is kept consistent on each insert,
//! update and removal:
//!
//! | Index | Key | Members |
//! |---|---|---|
//! | `context_map` | container id, or `None` for root | child ids |
//! | `virtual_context_map` | virtual container id | child ids |
//! | `link_map` / `virtual_link_map` | connector id | link ids |
//! | `ref_map` | referenced id | reference ids |
//! | `binds_map` | entity id | adjacent ids (symmetric) |
//! | `orphans` | absent parent id | child ids |
//! | `relationless` | absent component id | link ids binding it |
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering.

use crate::deserialize;
use crate::entity::fields;
use crate::entity::node::mark_virtual;
use crate::entity::{Action, BindSpec, Entity, Link, Reference};
use crate::primitives::{MAX_ID_ATTEMPTS, SHORT_ID_LENGTH};
use crate::types::{EntityId, EntityKind, HkError, PropertyValue, ValidationError};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

type Index = BTreeMap<EntityId, BTreeSet<EntityId>>;

// =============================================================================
// OUTCOMES
// =============================================================================

/// Outcome of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    Inserted(EntityId),
    Updated(EntityId),
}

impl Upsert {
    pub fn id(&self) -> &EntityId {
        match self {
            Upsert::Inserted(id) | Upsert::Updated(id) => id,
        }
    }
}

/// A resolved container or entity; `Root` is the implicit top-level context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    Root,
    Entity(&'a Entity),
}

impl<'a> EntityRef<'a> {
    pub fn id(&self) -> Option<&'a EntityId> {
        match self {
            EntityRef::Root => None,
            EntityRef::Entity(entity) => Some(entity.id()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Root => EntityKind::Context,
            EntityRef::Entity(entity) => entity.kind(),
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind().is_container()
    }
}

/// The relation keys of an entity, captured before a change so indices can
/// be diffed afterwards.
#[derive(Debug, Clone, Default)]
struct Footprint {
    connector: Option<EntityId>,
    virtual_link: bool,
    components: BTreeSet<EntityId>,
    reference: Option<EntityId>,
}

impl Footprint {
    fn of(entity: &Entity) -> Self {
        let link = entity.as_link();
        Self {
            connector: link.and_then(|l| l.connector.clone()),
            virtual_link: entity.kind() == EntityKind::VirtualLink,
            components: link
                .map(|l| l.binds.components().into_iter().cloned().collect())
                .unwrap_or_default(),
            reference: entity.as_reference().map(|r| r.reference.clone()),
        }
    }
}

fn index_insert(index: &mut Index, key: &EntityId, value: &EntityId) {
    index.entry(key.clone()).or_default().insert(value.clone());
}

fn index_remove(index: &mut Index, key: &EntityId, value: &EntityId) {
    if let Some(set) = index.get_mut(key) {
        set.remove(value);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

// =============================================================================
// HYPERGRAPH
// =============================================================================

/// The hyperknowledge store.
///
/// Single owner, synchronous, last write wins. Wrap it in a mutex to share.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperGraph {
    entities: BTreeMap<EntityId, Entity>,
    by_kind: BTreeMap<EntityKind, BTreeSet<EntityId>>,
    /// The root key (`None`) is always present.
    context_map: BTreeMap<Option<EntityId>, BTreeSet<EntityId>>,
    virtual_context_map: Index,
    link_map: Index,
    virtual_link_map: Index,
    ref_map: Index,
    binds_map: Index,
    orphans: Index,
    relationless: Index,
}

impl Default for HyperGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperGraph {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            by_kind: BTreeMap::new(),
            context_map: BTreeMap::from([(None, BTreeSet::new())]),
            virtual_context_map: Index::new(),
            link_map: Index::new(),
            virtual_link_map: Index::new(),
            ref_map: Index::new(),
            binds_map: Index::new(),
            orphans: Index::new(),
            relationless: Index::new(),
        }
    }

    // ===== LOOKUP =====

    pub fn has_id(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.by_kind.get(&kind).map_or(0, BTreeSet::len)
    }

    /// Every entity, ordered by id.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id))
    }

    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Resolve a parent reference; `None` is the implicit root.
    pub fn resolve(&self, id: Option<&EntityId>) -> Option<EntityRef<'_>> {
        match id {
            None => Some(EntityRef::Root),
            Some(id) => self.entities.get(id).map(EntityRef::Entity),
        }
    }

    /// Draw a short id not yet used in this store.
    pub fn generate_id(&self) -> EntityId {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(SHORT_ID_LENGTH)
                .collect();
            let candidate = EntityId::from(candidate);
            if !self.has_id(&candidate) {
                return candidate;
            }
        }
        EntityId::from(uuid::Uuid::new_v4().simple().to_string())
    }

    // ===== CONTAINMENT =====

    /// Children filed under `parent` (`None` for root). Empty when unknown.
    pub fn get_children(&self, parent: Option<&EntityId>) -> Vec<&Entity> {
        let children = match parent {
            None => self.context_map.get(&None),
            Some(p) => self
                .context_map
                .get(&Some(p.clone()))
                .or_else(|| self.virtual_context_map.get(p)),
        };
        self.collect(children)
    }

    /// Children waiting for the absent container `parent`.
    pub fn get_orphans(&self, parent: &EntityId) -> Vec<&Entity> {
        self.collect(self.orphans.get(parent))
    }

    pub fn is_orphan(&self, id: &EntityId) -> bool {
        self.entities
            .get(id)
            .and_then(Entity::parent)
            .and_then(|p| self.orphans.get(p))
            .is_some_and(|set| set.contains(id))
    }

    /// Number of entities filed under absent parents.
    pub fn orphan_count(&self) -> usize {
        self.orphans.values().map(BTreeSet::len).sum()
    }

    // ===== RELATIONS =====

    /// Entities adjacent to `id` through links, skipping stale ids.
    pub fn get_neighbors(&self, id: &EntityId) -> Vec<&Entity> {
        self.collect(self.binds_map.get(id))
    }

    /// Links and virtual links instantiating `connector`.
    pub fn links_of(&self, connector: &EntityId) -> Vec<&Link> {
        self.link_map
            .get(connector)
            .into_iter()
            .chain(self.virtual_link_map.get(connector))
            .flatten()
            .filter_map(|id| self.entities.get(id).and_then(Entity::as_link))
            .collect()
    }

    /// Whether some link of `connector` binds every role in `spec`.
    pub fn has_bind(&self, connector: &EntityId, spec: &BindSpec) -> bool {
        self.links_of(connector)
            .into_iter()
            .any(|link| link.binds.has_binds(spec))
    }

    /// The reference to `target` filed under `parent`, if any.
    pub fn get_reference(&self, target: &EntityId, parent: Option<&EntityId>) -> Option<&Reference> {
        self.references_to(target)
            .into_iter()
            .find(|r| r.parent.as_ref() == parent)
    }

    pub fn has_reference(&self, target: &EntityId, parent: Option<&EntityId>) -> bool {
        self.get_reference(target, parent).is_some()
    }

    pub fn references_to(&self, target: &EntityId) -> Vec<&Reference> {
        self.ref_map
            .get(target)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id).and_then(Entity::as_reference))
            .collect()
    }

    /// Links waiting for `component` to be added.
    pub fn pending_binds(&self, component: &EntityId) -> Vec<&EntityId> {
        self.relationless
            .get(component)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    /// Total number of deferred (link, absent component) pairs.
    pub fn pending_bind_count(&self) -> usize {
        self.relationless.values().map(BTreeSet::len).sum()
    }

    /// Number of distinct adjacency pairs, self-binds included.
    pub fn adjacency_count(&self) -> usize {
        self.binds_map
            .iter()
            .map(|(a, set)| set.range(a.clone()..).count())
            .sum()
    }

    fn collect(&self, ids: Option<&BTreeSet<EntityId>>) -> Vec<&Entity> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    // ===== JSON UPSERT =====

    /// Add an entity from its wire form, or update it if the id is known.
    ///
    /// A missing id is generated. Rejected input is logged and returned.
    pub fn add_entity(&mut self, value: &Value) -> Result<Upsert, HkError> {
        let result = self.add_entity_inner(value);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Rejected entity");
        }
        result
    }

    fn add_entity_inner(&mut self, value: &Value) -> Result<Upsert, HkError> {
        let known = value
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| self.entities.contains_key(id));
        if known {
            return self.set_entity(value).map(Upsert::Updated);
        }
        let entity = deserialize::entity_from_value(value, || self.generate_id())?;
        self.add_new(entity).map(Upsert::Inserted)
    }

    pub fn add_entities(&mut self, values: &[Value]) -> Vec<Result<Upsert, HkError>> {
        values.iter().map(|value| self.add_entity(value)).collect()
    }

    /// Update an existing entity in place from its wire form.
    ///
    /// `properties` is replaced; `metaProperties`, `parent` and the
    /// kind-specific members are replaced only when present.
    pub fn set_entity(&mut self, value: &Value) -> Result<EntityId, HkError> {
        let kind = deserialize::validate(value)?;
        let obj = fields::as_object(value)?;
        let id = fields::id(obj, "id").ok_or(ValidationError::MissingField { kind, field: "id" })?;
        let current = self
            .entities
            .get(&id)
            .ok_or_else(|| HkError::EntityNotFound(id.clone()))?;
        if current.kind() != kind {
            return Err(HkError::KindMismatch {
                id,
                expected: current.kind(),
                found: kind,
            });
        }
        let mut merged = current.clone();
        merged.merge_object(obj);
        self.replace(merged)
    }

    // ===== TYPED UPSERT =====

    /// Insert `entity`, or replace the stored entity with the same id.
    pub fn insert(&mut self, entity: Entity) -> Result<Upsert, HkError> {
        if self.has_id(entity.id()) {
            return self.update(entity).map(Upsert::Updated);
        }
        self.add_new(entity).map(Upsert::Inserted)
    }

    /// Replace an existing entity of the same kind.
    pub fn update(&mut self, mut entity: Entity) -> Result<EntityId, HkError> {
        let id = entity.id().clone();
        let current = self
            .entities
            .get(&id)
            .ok_or_else(|| HkError::EntityNotFound(id.clone()))?;
        if current.kind() != entity.kind() {
            return Err(HkError::KindMismatch {
                id,
                expected: current.kind(),
                found: entity.kind(),
            });
        }
        if entity.is_virtual() {
            mark_virtual(entity.properties_mut(), None);
        }
        self.replace(entity)
    }

    fn add_new(&mut self, mut entity: Entity) -> Result<EntityId, HkError> {
        self.check_parent(&entity)?;
        // Children waiting on this id expect a container.
        if !entity.is_container() && self.orphans.contains_key(entity.id()) {
            return Err(HkError::NotAContainer(entity.id().clone()));
        }
        if entity.is_virtual() {
            mark_virtual(entity.properties_mut(), None);
        }
        let id = entity.id().clone();
        let kind = entity.kind();
        let parent = entity.parent().cloned();

        self.entities.insert(id.clone(), entity);
        self.by_kind.entry(kind).or_default().insert(id.clone());
        if kind.is_contained() {
            self.file(&id, parent.as_ref());
        }
        if kind.is_container() {
            self.adopt_orphans(&id, kind);
        }
        self.reindex_relations(&id, &Footprint::default());
        self.attach_deferred(&id);
        Ok(id)
    }

    fn replace(&mut self, entity: Entity) -> Result<EntityId, HkError> {
        self.check_parent(&entity)?;
        let id = entity.id().clone();
        let new_parent = entity.parent().cloned();
        let contained = entity.is_contained();

        let old = self.entities.insert(id.clone(), entity);
        let before = old.as_ref().map(Footprint::of).unwrap_or_default();
        let old_parent = old.as_ref().and_then(Entity::parent);
        if contained && old_parent != new_parent.as_ref() {
            self.unfile(&id, old_parent);
            self.file(&id, new_parent.as_ref());
        }
        self.reindex_relations(&id, &before);
        Ok(id)
    }

    /// A parent that exists must be able to hold children.
    fn check_parent(&self, entity: &Entity) -> Result<(), HkError> {
        let Some(parent) = entity.parent() else {
            return Ok(());
        };
        match self.entities.get(parent) {
            Some(existing) if !existing.is_container() => {
                Err(HkError::NotAContainer(parent.clone()))
            }
            _ => Ok(()),
        }
    }

    // ===== REMOVAL =====

    /// Remove an entity and unwind every index it takes part in.
    pub fn remove_entity(&mut self, id: &EntityId) -> Result<Entity, HkError> {
        let entity = self
            .entities
            .remove(id)
            .ok_or_else(|| HkError::EntityNotFound(id.clone()))?;
        let kind = entity.kind();
        index_remove_kind(&mut self.by_kind, kind, id);

        if kind.is_contained() {
            self.unfile(id, entity.parent());
        }
        match kind {
            EntityKind::Connector => self.detach_links(id),
            EntityKind::Context | EntityKind::VirtualContext => self.release_children(id),
            _ => {}
        }
        self.purge_adjacency(id);
        self.reindex_relations(id, &Footprint::of(&entity));
        Ok(entity)
    }

    fn detach_links(&mut self, connector: &EntityId) {
        let links: BTreeSet<EntityId> = self
            .link_map
            .remove(connector)
            .into_iter()
            .chain(self.virtual_link_map.remove(connector))
            .flatten()
            .collect();
        for id in &links {
            if let Some(link) = self.entities.get_mut(id).and_then(Entity::as_link_mut) {
                link.connector = None;
            }
        }
        tracing::debug!(connector = %connector, links = links.len(), "Detached links");
    }

    /// Drop every edge of a removed entity; links still binding it wait in
    /// `relationless` for it to come back.
    fn purge_adjacency(&mut self, id: &EntityId) {
        let Some(neighbors) = self.binds_map.remove(id) else {
            return;
        };
        for neighbor in &neighbors {
            index_remove(&mut self.binds_map, neighbor, id);
            if self.link_binds(neighbor, id) {
                index_insert(&mut self.relationless, id, neighbor);
            }
        }
    }

    // ===== PARENT FILING =====

    fn file(&mut self, id: &EntityId, parent: Option<&EntityId>) {
        let Some(p) = parent else {
            self.context_map.entry(None).or_default().insert(id.clone());
            return;
        };
        match self.entities.get(p).map(Entity::kind) {
            Some(EntityKind::Context) => {
                self.context_map
                    .entry(Some(p.clone()))
                    .or_default()
                    .insert(id.clone());
            }
            Some(EntityKind::VirtualContext) => index_insert(&mut self.virtual_context_map, p, id),
            _ => index_insert(&mut self.orphans, p, id),
        }
    }

    /// Remove `id` from every set its parent could have filed it in.
    fn unfile(&mut self, id: &EntityId, parent: Option<&EntityId>) {
        let key = parent.cloned();
        if let Some(set) = self.context_map.get_mut(&key) {
            set.remove(id);
            if set.is_empty() && key.is_some() {
                self.context_map.remove(&key);
            }
        }
        if let Some(p) = parent {
            index_remove(&mut self.virtual_context_map, p, id);
            index_remove(&mut self.orphans, p, id);
        }
    }

    fn adopt_orphans(&mut self, id: &EntityId, kind: EntityKind) {
        let Some(children) = self.orphans.remove(id) else {
            return;
        };
        tracing::debug!(container = %id, children = children.len(), "Adopted orphans");
        if kind == EntityKind::VirtualContext {
            self.virtual_context_map
                .entry(id.clone())
                .or_default()
                .extend(children);
        } else {
            self.context_map
                .entry(Some(id.clone()))
                .or_default()
                .extend(children);
        }
    }

    fn release_children(&mut self, id: &EntityId) {
        let children: BTreeSet<EntityId> = self
            .context_map
            .remove(&Some(id.clone()))
            .into_iter()
            .chain(self.virtual_context_map.remove(id))
            .flatten()
            .collect();
        if children.is_empty() {
            return;
        }
        tracing::debug!(container = %id, children = children.len(), "Orphaned children");
        self.orphans.entry(id.clone()).or_default().extend(children);
    }

    // ===== RELATION INDICES =====

    fn reindex_relations(&mut self, id: &EntityId, before: &Footprint) {
        let after = self.entities.get(id).map(Footprint::of).unwrap_or_default();

        if before.connector != after.connector || before.virtual_link != after.virtual_link {
            if let Some(connector) = &before.connector {
                index_remove(self.link_index(before.virtual_link), connector, id);
            }
            if let Some(connector) = &after.connector {
                index_insert(self.link_index(after.virtual_link), connector, id);
            }
        }

        if before.reference != after.reference {
            if let Some(target) = &before.reference {
                index_remove(&mut self.ref_map, target, id);
            }
            if let Some(target) = &after.reference {
                index_insert(&mut self.ref_map, target, id);
            }
        }

        if before.components != after.components {
            let touched: BTreeSet<EntityId> = before
                .components
                .union(&after.components)
                .cloned()
                .collect();
            for component in &touched {
                index_remove(&mut self.relationless, component, id);
            }
            for component in &after.components {
                if !self.entities.contains_key(component) {
                    index_insert(&mut self.relationless, component, id);
                }
            }
            for component in &touched {
                self.sync_adjacency(id, component);
            }
        }
    }

    fn link_index(&mut self, virtual_link: bool) -> &mut Index {
        if virtual_link {
            &mut self.virtual_link_map
        } else {
            &mut self.link_map
        }
    }

    /// Turn binds that were waiting on `id` into adjacency.
    fn attach_deferred(&mut self, id: &EntityId) {
        let Some(links) = self.relationless.remove(id) else {
            return;
        };
        tracing::debug!(component = %id, links = links.len(), "Attached deferred binds");
        for link in &links {
            self.sync_adjacency(link, id);
        }
    }

    /// Record `a <-> b` iff both exist and one of them is a link binding
    /// the other; drop the edge otherwise.
    fn sync_adjacency(&mut self, a: &EntityId, b: &EntityId) {
        let justified = self.has_id(a)
            && self.has_id(b)
            && (self.link_binds(a, b) || self.link_binds(b, a));
        if justified {
            index_insert(&mut self.binds_map, a, b);
            index_insert(&mut self.binds_map, b, a);
        } else {
            index_remove(&mut self.binds_map, a, b);
            index_remove(&mut self.binds_map, b, a);
        }
    }

    fn link_binds(&self, link: &EntityId, component: &EntityId) -> bool {
        self.entities
            .get(link)
            .and_then(Entity::as_link)
            .is_some_and(|l| l.binds.binds_component(component))
    }

    // ===== ENTITY-LEVEL MUTATORS =====

    fn writable(&mut self, id: &EntityId) -> Result<&mut Entity, HkError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| HkError::EntityNotFound(id.clone()))?;
        if entity.is_virtual() {
            return Err(HkError::ReadOnly(id.clone()));
        }
        Ok(entity)
    }

    fn writable_link(&mut self, id: &EntityId) -> Result<(&mut Link, Footprint), HkError> {
        if self.get_entity(id).is_some_and(|e| e.as_link().is_none()) {
            return Err(HkError::NotALink(id.clone()));
        }
        let entity = self.writable(id)?;
        let before = Footprint::of(entity);
        let link = entity
            .as_link_mut()
            .ok_or_else(|| HkError::NotALink(id.clone()))?;
        Ok((link, before))
    }

    /// Bind `component` under `role` of `link` at `anchor`.
    pub fn add_bind(
        &mut self,
        link: &EntityId,
        role: &str,
        component: &EntityId,
        anchor: &str,
    ) -> Result<(), HkError> {
        let (target, before) = self.writable_link(link)?;
        target.binds.add(role, component.clone(), anchor);
        self.reindex_relations(link, &before);
        Ok(())
    }

    /// Unbind `component` from `link`; see `Binds::remove`.
    pub fn remove_bind(
        &mut self,
        link: &EntityId,
        component: &EntityId,
        anchor: Option<&str>,
    ) -> Result<bool, HkError> {
        let (target, before) = self.writable_link(link)?;
        let removed = target.binds.remove(component, anchor);
        self.reindex_relations(link, &before);
        Ok(removed)
    }

    pub fn set_property(
        &mut self,
        id: &EntityId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<Option<PropertyValue>, HkError> {
        let entity = self.writable(id)?;
        Ok(entity.properties_mut().insert(key.into(), value.into()))
    }

    pub fn remove_property(&mut self, id: &EntityId, key: &str) -> Result<Option<PropertyValue>, HkError> {
        let entity = self.writable(id)?;
        Ok(entity.properties_mut().remove(key))
    }

    pub fn set_meta_property(
        &mut self,
        id: &EntityId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, HkError> {
        let entity = self.writable(id)?;
        Ok(entity.meta_properties_mut().insert(key.into(), value.into()))
    }

    pub fn add_action(&mut self, trail: &EntityId, action: Action) -> Result<(), HkError> {
        let entity = self.writable(trail)?;
        let target = entity
            .as_trail_mut()
            .ok_or_else(|| HkError::NotATrail(trail.clone()))?;
        target.add_action(action);
        Ok(())
    }

    // ===== SNAPSHOTS =====

    /// Serialize the store to its JSON snapshot.
    pub fn serialize(&self) -> Result<String, HkError> {
        crate::formats::snapshot::to_string(self, false)
    }

    /// Rebuild a store from a JSON snapshot.
    pub fn deserialize(snapshot: &str) -> Result<Self, HkError> {
        crate::formats::snapshot::from_str(snapshot)
    }
}

fn index_remove_kind(by_kind: &mut BTreeMap<EntityKind, BTreeSet<EntityId>>, kind: EntityKind, id: &EntityId) {
    if let Some(ids) = by_kind.get_mut(&kind) {
        ids.remove(id);
        if ids.is_empty() {
            by_kind.remove(&kind);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
