//! # Remote Sync
//!
//! The seam between a local `HyperGraph` and a remote graph service.
//!
//! The store never talks to the network. A transport implements
//! `RemoteRepository`; notification clients turn what they receive into
//! `ChangeEvent`s and hand them to `HyperGraph::apply_change`.

use crate::graph::HyperGraph;
use crate::types::{EntityId, HkError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A remote graph that entities can be fetched from and sent to.
pub trait RemoteRepository {
    /// Every entity held remotely, in wire form.
    fn fetch_entities(&mut self) -> Result<Vec<Value>, HkError>;

    /// Create or update entities remotely.
    fn send_entities(&mut self, entities: &[Value]) -> Result<(), HkError>;

    /// Delete entities remotely.
    fn remove_entities(&mut self, ids: &[EntityId]) -> Result<(), HkError>;
}

/// A mutation observed on the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ChangeEvent {
    Added(Vec<Value>),
    Changed(Vec<Value>),
    Removed(Vec<EntityId>),
}

impl ChangeEvent {
    /// Parse a notification payload such as
    /// `{"type": "removed", "data": ["a", "b"]}`.
    pub fn from_json(value: &Value) -> Result<Self, HkError> {
        serde_json::from_value(value.clone())
            .map_err(|e| HkError::DeserializationError(format!("Invalid change event: {}", e)))
    }
}

/// How many items of a change were applied or rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub applied: usize,
    pub rejected: usize,
}

impl ChangeReport {
    fn record<T>(&mut self, result: &Result<T, HkError>) {
        if result.is_ok() {
            self.applied = self.applied.saturating_add(1);
        } else {
            self.rejected = self.rejected.saturating_add(1);
        }
    }
}

impl HyperGraph {
    /// Apply a remote change. Each item succeeds or fails on its own.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> ChangeReport {
        let mut report = ChangeReport::default();
        match event {
            ChangeEvent::Added(values) => {
                for value in values {
                    report.record(&self.add_entity(value));
                }
            }
            ChangeEvent::Changed(values) => {
                for value in values {
                    let result = self.set_entity(value);
                    if let Err(err) = &result {
                        tracing::warn!(error = %err, "Rejected remote change");
                    }
                    report.record(&result);
                }
            }
            ChangeEvent::Removed(ids) => {
                for id in ids {
                    let result = self.remove_entity(id);
                    if let Err(err) = &result {
                        tracing::debug!(error = %err, "Remote removal of unknown entity");
                    }
                    report.record(&result);
                }
            }
        }
        tracing::debug!(applied = report.applied, rejected = report.rejected, "Applied change");
        report
    }
}

/// Fetch every remote entity into `graph`.
pub fn pull<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    graph: &mut HyperGraph,
) -> Result<ChangeReport, HkError> {
    let entities = remote.fetch_entities()?;
    Ok(graph.apply_change(&ChangeEvent::Added(entities)))
}

/// Send every authoritative entity of `graph` to the remote.
///
/// Virtual entities mirror remote data already and are not sent. Returns
/// the number of entities sent.
pub fn push<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    graph: &HyperGraph,
) -> Result<usize, HkError> {
    let entities: Vec<Value> = graph
        .entities()
        .filter(|entity| !entity.is_virtual())
        .map(|entity| entity.to_json())
        .collect();
    remote.send_entities(&entities)?;
    Ok(entities.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct InMemoryRemote {
        entities: BTreeMap<String, Value>,
    }

    impl RemoteRepository for InMemoryRemote {
        fn fetch_entities(&mut self) -> Result<Vec<Value>, HkError> {
            Ok(self.entities.values().cloned().collect())
        }

        fn send_entities(&mut self, entities: &[Value]) -> Result<(), HkError> {
            for entity in entities {
                let id = entity["id"].as_str().unwrap_or_default().to_string();
                self.entities.insert(id, entity.clone());
            }
            Ok(())
        }

        fn remove_entities(&mut self, ids: &[EntityId]) -> Result<(), HkError> {
            for id in ids {
                self.entities.remove(id.as_str());
            }
            Ok(())
        }
    }

    #[test]
    fn push_then_pull_mirrors_authoritative_entities() {
        let mut local = HyperGraph::new();
        local
            .add_entity(&json!({"id": "ctx", "type": "context", "parent": null}))
            .expect("insert");
        local
            .add_entity(&json!({
                "id": "v", "type": "virtualnode", "parent": null,
                "properties": {"virtualsrc": "q"}
            }))
            .expect("insert");

        let mut remote = InMemoryRemote::default();
        assert_eq!(push(&mut remote, &local).expect("push"), 1);

        let mut mirror = HyperGraph::new();
        let report = pull(&mut remote, &mut mirror).expect("pull");
        assert_eq!(report, ChangeReport { applied: 1, rejected: 0 });
        assert!(mirror.has_id(&EntityId::from("ctx")));

        remote
            .remove_entities(&[EntityId::from("ctx")])
            .expect("remove");
        assert!(remote.fetch_entities().expect("fetch").is_empty());
    }

    #[test]
    fn change_events_parse_from_notifications() {
        let event = ChangeEvent::from_json(&json!({"type": "removed", "data": ["a", "b"]}))
            .expect("event");
        assert_eq!(
            event,
            ChangeEvent::Removed(vec![EntityId::from("a"), EntityId::from("b")])
        );
        assert!(ChangeEvent::from_json(&json!({"type": "exploded"})).is_err());
    }

    #[test]
    fn apply_change_reports_per_item() {
        let mut graph = HyperGraph::new();
        let report = graph.apply_change(&ChangeEvent::Added(vec![
            json!({"id": "a", "type": "node", "parent": null}),
            json!({"id": "b", "type": "bogus"}),
        ]));
        assert_eq!(report, ChangeReport { applied: 1, rejected: 1 });

        let report = graph.apply_change(&ChangeEvent::Changed(vec![
            json!({"id": "a", "type": "node", "parent": null, "properties": {"x": 1}}),
            json!({"id": "zzz", "type": "node", "parent": null}),
        ]));
        assert_eq!(report, ChangeReport { applied: 1, rejected: 1 });

        let report = graph.apply_change(&ChangeEvent::Removed(vec![
            EntityId::from("a"),
            EntityId::from("a"),
        ]));
        assert_eq!(report, ChangeReport { applied: 1, rejected: 1 });
        assert!(graph.is_empty());
    }
}
