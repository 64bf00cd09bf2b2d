//! # Graph Builder
//!
//! A facade over `HyperGraph` for assembling graphs from higher-level
//! statements ("alice knows bob", "dog isa animal").
//!
//! The builder:
//! - creates missing parent contexts at the root on demand
//! - never creates an id marked as preserved
//! - elides links already covered by an existing link of the same connector

use crate::entity::{Binds, Connector, ConnectorClass, Entity, Link, Node, Reference, RoleType};
use crate::graph::HyperGraph;
use crate::primitives::{
    CHILD_ROLE, DEFAULT_ANCHOR, INHERITANCE_CONNECTOR, OBJECT_ROLE, PARENT_ROLE, SUBJECT_ROLE,
};
use crate::types::{EntityId, EntityKind, HkError};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of a build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Built {
    /// A new entity was added.
    Created(EntityId),
    /// An equivalent entity already existed and was reused.
    Existing(EntityId),
    /// The id is preserved and absent; nothing was created.
    Preserved(EntityId),
}

impl Built {
    pub fn id(&self) -> &EntityId {
        match self {
            Built::Created(id) | Built::Existing(id) | Built::Preserved(id) => id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Built::Created(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    graph: HyperGraph,
    preserved: BTreeSet<EntityId>,
    /// Connector id -> links created or found for it.
    link_cache: BTreeMap<EntityId, Vec<EntityId>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue building on an existing store.
    pub fn from_graph(graph: HyperGraph) -> Self {
        let mut link_cache: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
        for entity in graph.entities_of(EntityKind::Link) {
            if let Some(connector) = entity.as_link().and_then(|l| l.connector.as_ref()) {
                link_cache
                    .entry(connector.clone())
                    .or_default()
                    .push(entity.id().clone());
            }
        }
        Self {
            graph,
            preserved: BTreeSet::new(),
            link_cache,
        }
    }

    /// Mark `id` so the builder never creates it.
    pub fn preserve(&mut self, id: impl Into<EntityId>) {
        self.preserved.insert(id.into());
    }

    pub fn is_preserved(&self, id: &EntityId) -> bool {
        self.preserved.contains(id)
    }

    pub fn graph(&self) -> &HyperGraph {
        &self.graph
    }

    pub fn into_graph(self) -> HyperGraph {
        self.graph
    }

    // ===== CONTAINMENT =====

    pub fn add_context(
        &mut self,
        id: impl Into<EntityId>,
        parent: Option<&EntityId>,
    ) -> Result<Built, HkError> {
        self.build(Entity::Context(Node::new(id, parent.cloned())))
    }

    pub fn add_node(
        &mut self,
        id: impl Into<EntityId>,
        parent: Option<&EntityId>,
    ) -> Result<Built, HkError> {
        self.build(Entity::Node(Node::new(id, parent.cloned())))
    }

    /// Expose `target` inside `parent`, reusing an existing reference.
    ///
    /// A missing target is created as a root node unless preserved.
    pub fn add_reference(
        &mut self,
        target: &EntityId,
        parent: Option<&EntityId>,
    ) -> Result<Built, HkError> {
        if let Some(existing) = self.graph.get_reference(target, parent) {
            return Ok(Built::Existing(existing.id.clone()));
        }
        if !self.graph.has_id(target) && !self.is_preserved(target) {
            self.graph.insert(Entity::Node(Node::new(target.clone(), None)))?;
        }
        let id = self.graph.generate_id();
        self.build(Entity::from(Reference::new(id, target.clone(), parent.cloned())))
    }

    // ===== RELATIONS =====

    pub fn add_connector(
        &mut self,
        id: impl Into<EntityId>,
        class_name: ConnectorClass,
        roles: &[(&str, RoleType)],
    ) -> Result<Built, HkError> {
        let mut connector = Connector::new(id, class_name);
        for (name, role_type) in roles {
            connector.add_role(*name, *role_type);
        }
        self.build(Entity::from(connector))
    }

    /// Add a link of `connector` with `binds`, unless an existing link of
    /// that connector already covers them.
    ///
    /// A missing connector is created as a `facts` connector whose roles are
    /// the bind roles.
    pub fn add_link(
        &mut self,
        connector: &EntityId,
        binds: Binds,
        parent: Option<&EntityId>,
    ) -> Result<Built, HkError> {
        if let Some(existing) = self.check_redundancy(connector, &binds) {
            return Ok(Built::Existing(existing));
        }
        if !self.graph.has_id(connector) && !self.is_preserved(connector) {
            let roles: Vec<(&str, RoleType)> =
                binds.roles().map(|role| (role, RoleType::None)).collect();
            self.add_connector(connector.clone(), ConnectorClass::Facts, &roles)?;
        }
        self.ensure_parent(parent)?;

        let mut link = Link::new(self.graph.generate_id(), Some(connector.clone()), parent.cloned());
        link.binds = binds;
        let id = self.graph.insert(Entity::Link(link))?.id().clone();
        self.link_cache
            .entry(connector.clone())
            .or_default()
            .push(id.clone());
        Ok(Built::Created(id))
    }

    /// Assert `subject predicate object` as a binary fact.
    ///
    /// Missing subject and object nodes are created under `parent`.
    pub fn add_fact(
        &mut self,
        subject: &EntityId,
        predicate: &EntityId,
        object: &EntityId,
        parent: Option<&EntityId>,
    ) -> Result<Built, HkError> {
        if !self.graph.has_id(predicate) {
            self.add_connector(
                predicate.clone(),
                ConnectorClass::Facts,
                &[(SUBJECT_ROLE, RoleType::Subject), (OBJECT_ROLE, RoleType::Object)],
            )?;
        }
        for component in [subject, object] {
            if !self.graph.has_id(component) {
                self.add_node(component.clone(), parent)?;
            }
        }
        let mut binds = Binds::new();
        binds.add(SUBJECT_ROLE, subject.clone(), DEFAULT_ANCHOR);
        binds.add(OBJECT_ROLE, object.clone(), DEFAULT_ANCHOR);
        self.add_link(predicate, binds, parent)
    }

    /// Assert that `child` is a kind of `parent_entity`.
    pub fn add_inheritance(
        &mut self,
        child: &EntityId,
        parent_entity: &EntityId,
        parent: Option<&EntityId>,
    ) -> Result<Built, HkError> {
        let connector = EntityId::from(INHERITANCE_CONNECTOR);
        if !self.graph.has_id(&connector) {
            self.add_connector(
                connector.clone(),
                ConnectorClass::Hierarchy,
                &[(CHILD_ROLE, RoleType::Child), (PARENT_ROLE, RoleType::Parent)],
            )?;
        }
        let mut binds = Binds::new();
        binds.add(CHILD_ROLE, child.clone(), DEFAULT_ANCHOR);
        binds.add(PARENT_ROLE, parent_entity.clone(), DEFAULT_ANCHOR);
        self.add_link(&connector, binds, parent)
    }

    /// Id of a known link of `connector` whose binds cover `binds`.
    pub fn check_redundancy(&self, connector: &EntityId, binds: &Binds) -> Option<EntityId> {
        self.link_cache.get(connector)?.iter().find_map(|id| {
            let link = self.graph.get_entity(id)?.as_link()?;
            (link.connector.as_ref() == Some(connector) && link.binds.covers(binds))
                .then(|| id.clone())
        })
    }

    // ===== INTERNALS =====

    fn build(&mut self, entity: Entity) -> Result<Built, HkError> {
        let id = entity.id().clone();
        if let Some(existing) = self.graph.get_entity(&id) {
            if existing.kind() != entity.kind() {
                return Err(HkError::KindMismatch {
                    id,
                    expected: existing.kind(),
                    found: entity.kind(),
                });
            }
            return Ok(Built::Existing(id));
        }
        if self.is_preserved(&id) {
            return Ok(Built::Preserved(id));
        }
        self.ensure_parent(entity.parent())?;
        self.graph.insert(entity)?;
        Ok(Built::Created(id))
    }

    fn ensure_parent(&mut self, parent: Option<&EntityId>) -> Result<(), HkError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        match self.graph.get_entity(parent) {
            Some(existing) if existing.is_container() => Ok(()),
            Some(_) => Err(HkError::NotAContainer(parent.clone())),
            None if self.is_preserved(parent) => Ok(()),
            None => {
                tracing::debug!(context = %parent, "Auto-creating parent context");
                self.graph
                    .insert(Entity::Context(Node::new(parent.clone(), None)))
                    .map(|_| ())
            }
        }
    }
}
