//! Store metrics.

use crate::graph::HyperGraph;
use crate::types::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// GRAPH METRICS
// =============================================================================

/// Counts describing the shape and health of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Total number of entities.
    pub entity_count: usize,
    /// Entity count per kind; kinds with no entities are omitted.
    pub per_kind: BTreeMap<EntityKind, usize>,
    /// Entities of a virtual kind.
    pub virtual_count: usize,
    /// Entities filed under a parent that does not exist.
    pub orphan_count: usize,
    /// Binds waiting for their component to be added.
    pub pending_bind_count: usize,
    /// Distinct adjacency pairs between links and their components.
    pub adjacency_count: usize,
}

impl GraphMetrics {
    /// Compute metrics from a store.
    #[must_use]
    pub fn from_graph(graph: &HyperGraph) -> Self {
        let per_kind: BTreeMap<EntityKind, usize> = EntityKind::ALL
            .into_iter()
            .map(|kind| (kind, graph.count(kind)))
            .filter(|(_, count)| *count > 0)
            .collect();
        let virtual_count = per_kind
            .iter()
            .filter(|(kind, _)| kind.is_virtual())
            .map(|(_, count)| count)
            .sum();

        Self {
            entity_count: graph.len(),
            per_kind,
            virtual_count,
            orphan_count: graph.orphan_count(),
            pending_bind_count: graph.pending_bind_count(),
            adjacency_count: graph.adjacency_count(),
        }
    }

    /// Count for one kind, zero when absent.
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        self.per_kind.get(&kind).copied().unwrap_or(0)
    }

    /// A store is consistent when nothing waits on an absent entity.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.orphan_count == 0 && self.pending_bind_count == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_graph_has_zero_metrics() {
        let metrics = GraphMetrics::from_graph(&HyperGraph::new());
        assert_eq!(metrics, GraphMetrics::default());
        assert!(metrics.is_settled());
    }

    #[test]
    fn metrics_track_orphans_and_pending_binds() {
        let mut graph = HyperGraph::new();
        graph
            .add_entity(&json!({"id": "n", "type": "node", "parent": "missing"}))
            .expect("insert");
        graph
            .add_entity(&json!({
                "id": "l", "type": "link", "connector": null, "parent": null,
                "binds": {"subject": {"n": ["λ"]}, "object": {"ghost": ["λ"]}}
            }))
            .expect("insert");
        graph
            .add_entity(&json!({
                "id": "v", "type": "virtualnode", "parent": null,
                "properties": {"virtualsrc": "q"}
            }))
            .expect("insert");

        let metrics = GraphMetrics::from_graph(&graph);
        assert_eq!(metrics.entity_count, 3);
        assert_eq!(metrics.count(EntityKind::Node), 1);
        assert_eq!(metrics.count(EntityKind::Context), 0);
        assert_eq!(metrics.virtual_count, 1);
        assert_eq!(metrics.orphan_count, 1);
        assert_eq!(metrics.pending_bind_count, 1);
        assert_eq!(metrics.adjacency_count, 1);
        assert!(!metrics.is_settled());
    }
}
