//! # Snapshot Format
//!
//! JSON snapshot of a `HyperGraph`: one collection per kind, each an object
//! keyed by entity id.
//!
//! ```text
//! {
//!   "nodes":     { "<id>": { ...entity... }, ... },
//!   "contexts":  { ... },
//!   "links":     { ... },
//!   ...
//! }
//! ```
//!
//! Loading re-adds every member through `HyperGraph::add_entity`, so the
//! derived indices are rebuilt rather than trusted. Members that fail
//! validation are logged and skipped.
//!
//! ## Input Limits
//!
//! The payload size is checked against `MAX_SNAPSHOT_SIZE` before parsing.

use crate::graph::HyperGraph;
use crate::primitives::MAX_SNAPSHOT_SIZE;
use crate::types::{EntityKind, HkError};
use serde_json::{Map, Value};

/// Snapshot collection name of each kind, in output order.
const COLLECTIONS: [(EntityKind, &str); 9] = [
    (EntityKind::Node, "nodes"),
    (EntityKind::Context, "contexts"),
    (EntityKind::Link, "links"),
    (EntityKind::Connector, "connectors"),
    (EntityKind::Reference, "refs"),
    (EntityKind::Trail, "trails"),
    (EntityKind::VirtualNode, "virtualNodes"),
    (EntityKind::VirtualContext, "virtualContexts"),
    (EntityKind::VirtualLink, "virtualLinks"),
];

/// FNV-1a parameters for the non-cryptographic checksum.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

// =============================================================================
// EXPORT
// =============================================================================

/// Project the whole store to its snapshot value.
pub fn graph_to_json(graph: &HyperGraph) -> Value {
    let mut root = Map::new();
    for (kind, name) in COLLECTIONS {
        let members: Map<String, Value> = graph
            .entities_of(kind)
            .map(|entity| (entity.id().as_str().to_string(), entity.to_json()))
            .collect();
        root.insert(name.to_string(), Value::Object(members));
    }
    Value::Object(root)
}

/// Serialize the store, compact or pretty-printed.
pub fn to_string(graph: &HyperGraph, pretty: bool) -> Result<String, HkError> {
    let value = graph_to_json(graph);
    let result = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    result.map_err(|e| HkError::SerializationError(e.to_string()))
}

// =============================================================================
// IMPORT
// =============================================================================

/// Parse a snapshot string into a store.
pub fn from_str(snapshot: &str) -> Result<HyperGraph, HkError> {
    if snapshot.len() > MAX_SNAPSHOT_SIZE {
        return Err(HkError::DeserializationError(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            snapshot.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }
    let value: Value = serde_json::from_str(snapshot)
        .map_err(|e| HkError::DeserializationError(format!("Invalid snapshot JSON: {}", e)))?;
    graph_from_json(&value)
}

/// Rebuild a store from a snapshot value.
///
/// Unknown top-level members are ignored. A member without an `id` takes
/// its key as id.
pub fn graph_from_json(value: &Value) -> Result<HyperGraph, HkError> {
    let Value::Object(root) = value else {
        return Err(HkError::DeserializationError(
            "Snapshot must be a JSON object".to_string(),
        ));
    };

    let mut graph = HyperGraph::new();
    let mut skipped = 0usize;
    for (_, name) in COLLECTIONS {
        let Some(collection) = root.get(name) else {
            continue;
        };
        let Value::Object(members) = collection else {
            return Err(HkError::DeserializationError(format!(
                "Snapshot collection '{}' must be an object",
                name
            )));
        };
        for (key, member) in members {
            let member = with_key_as_id(key, member);
            if let Err(err) = graph.add_entity(&member) {
                tracing::warn!(collection = name, id = %key, error = %err, "Skipped snapshot member");
                skipped = skipped.saturating_add(1);
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "Snapshot loaded with skipped members");
    }
    Ok(graph)
}

fn with_key_as_id(key: &str, member: &Value) -> Value {
    let mut member = member.clone();
    if let Value::Object(obj) = &mut member {
        if !obj.get("id").is_some_and(Value::is_string) {
            obj.insert("id".to_string(), Value::String(key.to_string()));
        }
    }
    member
}

// =============================================================================
// CHECKSUMS
// =============================================================================

/// Deterministic FNV-1a checksum of the compact snapshot.
///
/// Fast integrity check, not collision resistant. Use
/// `snapshot_crypto_hash` where that matters.
#[must_use]
pub fn snapshot_checksum(graph: &HyperGraph) -> u64 {
    let bytes = serde_json::to_vec(&graph_to_json(graph)).unwrap_or_default();
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// BLAKE3 hash of the compact snapshot, as 64 hex characters.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn snapshot_crypto_hash(graph: &HyperGraph) -> String {
    let bytes = serde_json::to_vec(&graph_to_json(graph)).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

/// Whether the store hashes to `expected`.
#[cfg(feature = "crypto-hash")]
pub fn verify_crypto_hash(graph: &HyperGraph, expected: &str) -> bool {
    snapshot_crypto_hash(graph) == expected
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;
    use serde_json::json;

    fn sample() -> HyperGraph {
        let mut graph = HyperGraph::new();
        let batch = [
            json!({"id": "ctx", "type": "context", "parent": null}),
            json!({"id": "alice", "type": "node", "parent": "ctx", "properties": {"age": 30}}),
            json!({"id": "knows", "type": "connector", "className": "facts",
                   "roles": {"subject": "subject", "object": "object"}}),
            json!({"id": "l1", "type": "link", "connector": "knows", "parent": "ctx",
                   "binds": {"subject": {"alice": ["λ"]}, "object": {"bob": ["λ"]}}}),
        ];
        for value in &batch {
            graph.add_entity(value).expect("insert");
        }
        graph
    }

    #[test]
    fn every_collection_is_emitted() {
        let value = graph_to_json(&HyperGraph::new());
        for (_, name) in COLLECTIONS {
            assert_eq!(value[name], json!({}));
        }
    }

    #[test]
    fn roundtrip_preserves_entities() {
        let graph = sample();
        let text = to_string(&graph, false).expect("serialize");
        let restored = from_str(&text).expect("deserialize");

        let before: Vec<_> = graph.entities().collect();
        let after: Vec<_> = restored.entities().collect();
        assert_eq!(before, after);
        assert_eq!(restored.pending_binds(&EntityId::from("bob")).len(), 1);
    }

    #[test]
    fn invalid_members_are_skipped() {
        let text = json!({
            "nodes": {
                "good": {"id": "good", "type": "node", "parent": null},
                "bad": {"id": "bad", "type": "node"}
            }
        })
        .to_string();
        let graph = from_str(&text).expect("deserialize");
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn key_fills_missing_id() {
        let graph = graph_from_json(&json!({
            "contexts": {"ctx": {"type": "context", "parent": null}}
        }))
        .expect("deserialize");
        assert!(graph.has_id(&EntityId::from("ctx")));
    }

    #[test]
    fn non_object_snapshot_is_rejected() {
        assert!(matches!(
            from_str("[1, 2, 3]"),
            Err(HkError::DeserializationError(_))
        ));
        assert!(matches!(
            from_str("{not json"),
            Err(HkError::DeserializationError(_))
        ));
    }

    #[test]
    fn checksum_is_deterministic_and_content_sensitive() {
        let a = sample();
        let b = sample();
        assert_eq!(snapshot_checksum(&a), snapshot_checksum(&b));

        let mut c = sample();
        c.set_property(&EntityId::from("alice"), "age", 31_i64)
            .expect("set");
        assert_ne!(snapshot_checksum(&a), snapshot_checksum(&c));
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn crypto_hash_verifies() {
        let graph = sample();
        let hash = snapshot_crypto_hash(&graph);
        assert_eq!(hash.len(), 64);
        assert!(verify_crypto_hash(&graph, &hash));
    }
}
