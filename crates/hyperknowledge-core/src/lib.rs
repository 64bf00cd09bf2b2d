//! # hyperknowledge-core
//!
//! An embeddable, in-memory hyperknowledge graph store.
//!
//! Entities (nodes, contexts, references, connectors, links, trails and
//! their virtual overlays) are related through named roles with
//! multi-valued, anchor-qualified binds. The store keeps every derived
//! index consistent under insert, update and removal.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network, no file I/O
//! - Deterministic: `BTreeMap`/`BTreeSet` indices, insertion-ordered binds
//! - Single owner: the store performs no locking
//! - No silent failures: rejected input is logged and returned as an error

// =============================================================================
// MODULES
// =============================================================================

pub mod builder;
pub mod deserialize;
pub mod entity;
pub mod formats;
pub mod graph;
pub mod primitives;
pub mod sync;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    EntityId, EntityKind, HkError, MetaProperties, Properties, PropertyValue, ValidationError,
};

// =============================================================================
// RE-EXPORTS: Entities
// =============================================================================

pub use entity::{
    Action, Anchor, BindSpec, Binds, Connector, ConnectorClass, Context, Entity, Event, Interface,
    Interfaces, Link, Node, Reference, RoleType, Trail, TrailNode,
};

// =============================================================================
// RE-EXPORTS: Store
// =============================================================================

pub use builder::{Built, GraphBuilder};
pub use deserialize::{Deserialized, deserialize, validate};
pub use graph::{EntityRef, HyperGraph, Upsert};
pub use sync::{ChangeEvent, ChangeReport, RemoteRepository, pull, push};

// =============================================================================
// RE-EXPORTS: Formats and System
// =============================================================================

pub use formats::{graph_from_json, graph_to_json, snapshot_checksum};
pub use system::GraphMetrics;

#[cfg(feature = "crypto-hash")]
pub use formats::{snapshot_crypto_hash, verify_crypto_hash};
