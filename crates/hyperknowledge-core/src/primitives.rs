//! # Primitives
//!
//! Fixed constants of the hyperknowledge model and the store.

/// The anchor that denotes the whole entity rather than a sub-region.
pub const DEFAULT_ANCHOR: &str = "λ";

/// Property carrying the external locator of a virtual entity.
pub const VIRTUAL_SOURCE_PROPERTY: &str = "virtualsrc";

/// Optional property naming the datasource type of a virtual entity.
pub const DATASOURCE_TYPE_PROPERTY: &str = "datasourcetype";

/// Property flagging an entity as read-only.
pub const READONLY_PROPERTY: &str = "readonly";

/// Length of generated short ids (hex characters of a v4 UUID).
pub const SHORT_ID_LENGTH: usize = 12;

/// Attempts at drawing a fresh short id before falling back to a full UUID.
pub const MAX_ID_ATTEMPTS: usize = 16;

/// Connector used by `GraphBuilder::add_inheritance`.
pub const INHERITANCE_CONNECTOR: &str = "isa";

/// Role names of the inheritance connector.
pub const CHILD_ROLE: &str = "child";
pub const PARENT_ROLE: &str = "parent";

/// Role names of binary fact connectors created by `GraphBuilder::add_fact`.
pub const SUBJECT_ROLE: &str = "subject";
pub const OBJECT_ROLE: &str = "object";

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum accepted size of a serialized snapshot (256 MB).
///
/// Checked before parsing so oversized input never reaches the JSON parser.
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024;
