//! # Entities
//!
//! The closed set of entity variants stored in a `HyperGraph`.
//!
//! Nodes and contexts (and their virtual counterparts) share one struct;
//! links and virtual links share another. The `Entity` variant is the
//! discriminator, mirroring the `type` member of the wire format.

pub(crate) mod fields;

pub mod connector;
pub mod link;
pub mod node;
pub mod trail;

pub use connector::{Connector, ConnectorClass, RoleType};
pub use link::{Anchor, BindSpec, Binds, Link};
pub use node::{Context, Interface, Interfaces, Node, Reference};
pub use trail::{Action, Event, Trail, TrailNode};

use crate::types::{EntityId, EntityKind, MetaProperties, Properties};
use fields::Object;
use serde_json::Value;

/// Any entity of the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Node(Node),
    Context(Context),
    VirtualNode(Node),
    VirtualContext(Context),
    Reference(Reference),
    Connector(Connector),
    Link(Link),
    VirtualLink(Link),
    Trail(Trail),
}

impl Entity {
    pub fn id(&self) -> &EntityId {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                &n.id
            }
            Entity::Reference(r) => &r.id,
            Entity::Connector(c) => &c.id,
            Entity::Link(l) | Entity::VirtualLink(l) => &l.id,
            Entity::Trail(t) => &t.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Node(_) => EntityKind::Node,
            Entity::Context(_) => EntityKind::Context,
            Entity::VirtualNode(_) => EntityKind::VirtualNode,
            Entity::VirtualContext(_) => EntityKind::VirtualContext,
            Entity::Reference(_) => EntityKind::Reference,
            Entity::Connector(_) => EntityKind::Connector,
            Entity::Link(_) => EntityKind::Link,
            Entity::VirtualLink(_) => EntityKind::VirtualLink,
            Entity::Trail(_) => EntityKind::Trail,
        }
    }

    /// Enclosing container; `None` for root members and for connectors.
    pub fn parent(&self) -> Option<&EntityId> {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                n.parent.as_ref()
            }
            Entity::Reference(r) => r.parent.as_ref(),
            Entity::Connector(_) => None,
            Entity::Link(l) | Entity::VirtualLink(l) => l.parent.as_ref(),
            Entity::Trail(t) => t.parent.as_ref(),
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<EntityId>) {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                n.parent = parent;
            }
            Entity::Reference(r) => r.parent = parent,
            Entity::Connector(_) => {}
            Entity::Link(l) | Entity::VirtualLink(l) => l.parent = parent,
            Entity::Trail(t) => t.parent = parent,
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                &n.properties
            }
            Entity::Reference(r) => &r.properties,
            Entity::Connector(c) => &c.properties,
            Entity::Link(l) | Entity::VirtualLink(l) => &l.properties,
            Entity::Trail(t) => &t.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                &mut n.properties
            }
            Entity::Reference(r) => &mut r.properties,
            Entity::Connector(c) => &mut c.properties,
            Entity::Link(l) | Entity::VirtualLink(l) => &mut l.properties,
            Entity::Trail(t) => &mut t.properties,
        }
    }

    pub fn meta_properties(&self) -> &MetaProperties {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                &n.meta_properties
            }
            Entity::Reference(r) => &r.meta_properties,
            Entity::Connector(c) => &c.meta_properties,
            Entity::Link(l) | Entity::VirtualLink(l) => &l.meta_properties,
            Entity::Trail(t) => &t.meta_properties,
        }
    }

    pub fn meta_properties_mut(&mut self) -> &mut MetaProperties {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                &mut n.meta_properties
            }
            Entity::Reference(r) => &mut r.meta_properties,
            Entity::Connector(c) => &mut c.meta_properties,
            Entity::Link(l) | Entity::VirtualLink(l) => &mut l.meta_properties,
            Entity::Trail(t) => &mut t.meta_properties,
        }
    }

    /// Interfaces of node kinds and references.
    pub fn interfaces(&self) -> Option<&Interfaces> {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                Some(&n.interfaces)
            }
            Entity::Reference(r) => Some(&r.interfaces),
            _ => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.kind().is_virtual()
    }

    pub fn is_container(&self) -> bool {
        self.kind().is_container()
    }

    pub fn is_contained(&self) -> bool {
        self.kind().is_contained()
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                Some(n)
            }
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Entity::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match self {
            Entity::Connector(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Entity::Link(l) | Entity::VirtualLink(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_trail(&self) -> Option<&Trail> {
        match self {
            Entity::Trail(t) => Some(t),
            _ => None,
        }
    }

    pub(crate) fn as_link_mut(&mut self) -> Option<&mut Link> {
        match self {
            Entity::Link(l) | Entity::VirtualLink(l) => Some(l),
            _ => None,
        }
    }

    pub(crate) fn as_trail_mut(&mut self) -> Option<&mut Trail> {
        match self {
            Entity::Trail(t) => Some(t),
            _ => None,
        }
    }

    /// Project to the wire format.
    pub fn to_json(&self) -> Value {
        let kind = self.kind();
        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                n.to_json(kind)
            }
            Entity::Reference(r) => r.to_json(),
            Entity::Connector(c) => c.to_json(),
            Entity::Link(l) | Entity::VirtualLink(l) => l.to_json(kind),
            Entity::Trail(t) => t.to_json(),
        }
    }

    /// Build the variant named by `kind` from an already validated object.
    pub(crate) fn from_object(id: EntityId, obj: &Object, kind: EntityKind) -> Self {
        match kind {
            EntityKind::Node => Entity::Node(Node::from_object(id, obj, kind)),
            EntityKind::Context => Entity::Context(Node::from_object(id, obj, kind)),
            EntityKind::VirtualNode => Entity::VirtualNode(Node::from_object(id, obj, kind)),
            EntityKind::VirtualContext => Entity::VirtualContext(Node::from_object(id, obj, kind)),
            EntityKind::Reference => Entity::Reference(Reference::from_object(id, obj)),
            EntityKind::Connector => Entity::Connector(Connector::from_object(id, obj)),
            EntityKind::Link => Entity::Link(Link::from_object(id, obj, kind)),
            EntityKind::VirtualLink => Entity::VirtualLink(Link::from_object(id, obj, kind)),
            EntityKind::Trail => Entity::Trail(Trail::from_object(id, obj)),
        }
    }

    /// Merge an update of the same kind into this entity.
    ///
    /// `properties` is always replaced (virtual flags are re-applied),
    /// `metaProperties` and `parent` only when present. Type-relevant fields
    /// are taken from `obj` when present.
    pub(crate) fn merge_object(&mut self, obj: &Object) {
        let is_virtual = self.is_virtual();
        let previous_source = node::virtual_source(self.properties()).map(str::to_string);
        let properties = self.properties_mut();
        *properties = fields::properties(obj);
        if is_virtual {
            let source = match node::virtual_source(properties) {
                Some(_) => None,
                None => previous_source,
            };
            node::mark_virtual(properties, source);
        }

        if obj.contains_key("metaProperties") {
            *self.meta_properties_mut() = fields::meta_properties(obj);
        }
        if obj.contains_key("parent") {
            self.set_parent(fields::id(obj, "parent"));
        }

        match self {
            Entity::Node(n) | Entity::Context(n) | Entity::VirtualNode(n) | Entity::VirtualContext(n) => {
                if obj.contains_key("interfaces") {
                    n.interfaces = fields::interfaces(obj);
                }
            }
            Entity::Reference(r) => {
                if let Some(target) = fields::id(obj, "ref") {
                    r.reference = target;
                }
                if obj.contains_key("interfaces") {
                    r.interfaces = fields::interfaces(obj);
                }
            }
            Entity::Connector(c) => {
                if let Some(class) = connector::class_name(obj) {
                    c.class_name = class;
                }
                if obj.contains_key("roles") {
                    c.roles = connector::roles(obj);
                }
            }
            Entity::Link(l) | Entity::VirtualLink(l) => {
                if obj.contains_key("connector") {
                    l.connector = fields::id(obj, "connector");
                }
                if obj.contains_key("binds") {
                    l.binds = Binds::from_json(obj.get("binds"));
                }
            }
            Entity::Trail(t) => {
                if obj.contains_key("actions") {
                    t.set_actions_from_json(obj.get("actions"));
                }
            }
        }
    }
}

impl From<Connector> for Entity {
    fn from(connector: Connector) -> Self {
        Entity::Connector(connector)
    }
}

impl From<Reference> for Entity {
    fn from(reference: Reference) -> Self {
        Entity::Reference(reference)
    }
}

impl From<Trail> for Entity {
    fn from(trail: Trail) -> Self {
        Entity::Trail(trail)
    }
}
