//! Trails: timestamp-ordered records of navigation actions.

use super::fields::{self, Object};
use crate::primitives::DEFAULT_ANCHOR;
use crate::types::{EntityId, EntityKind, MetaProperties, Properties, ValidationError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Endpoint of an action: which entity, of what kind, at which anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailNode {
    pub node_id: EntityId,
    pub node_type: String,
    pub target_anchor: String,
}

impl TrailNode {
    pub fn new(node_id: impl Into<EntityId>, node_type: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            target_anchor: DEFAULT_ANCHOR.to_string(),
        }
    }

    fn from_json(value: Option<&Value>) -> Self {
        let Some(Value::Object(obj)) = value else {
            return Self::new("", "");
        };
        Self {
            node_id: fields::id(obj, "nodeId").unwrap_or_else(|| EntityId::from("")),
            node_type: fields::string(obj, "nodeType").unwrap_or_default(),
            target_anchor: fields::string(obj, "targetAnchor")
                .unwrap_or_else(|| DEFAULT_ANCHOR.to_string()),
        }
    }

    fn to_json(&self) -> Value {
        let mut obj = Object::new();
        obj.insert("nodeId".to_string(), Value::String(self.node_id.as_str().to_string()));
        obj.insert("nodeType".to_string(), Value::String(self.node_type.clone()));
        obj.insert("targetAnchor".to_string(), Value::String(self.target_anchor.clone()));
        Value::Object(obj)
    }
}

/// What happened during an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    /// Event type, e.g. `"click"`.
    pub kind: String,
    pub properties: Properties,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            properties: Properties::new(),
            timestamp: Some(timestamp),
        }
    }

    fn from_json(value: Option<&Value>) -> Self {
        let Some(Value::Object(obj)) = value else {
            return Self {
                id: String::new(),
                kind: String::new(),
                properties: Properties::new(),
                timestamp: None,
            };
        };
        Self {
            id: fields::string(obj, "id").unwrap_or_default(),
            kind: fields::string(obj, "type").unwrap_or_default(),
            properties: fields::properties(obj),
            timestamp: obj.get("timestamp").and_then(parse_timestamp),
        }
    }

    fn to_json(&self) -> Value {
        let mut obj = Object::new();
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        obj.insert("type".to_string(), Value::String(self.kind.clone()));
        obj.insert("properties".to_string(), fields::properties_to_json(&self.properties));
        obj.insert(
            "timestamp".to_string(),
            self.timestamp.map_or(Value::Null, |ts| {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }),
        );
        Value::Object(obj)
    }
}

/// RFC 3339 strings or integer epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// One step of a trail.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub from: TrailNode,
    pub to: TrailNode,
    pub agent: String,
    pub event: Event,
}

impl Action {
    pub fn new(from: TrailNode, to: TrailNode, agent: impl Into<String>, event: Event) -> Self {
        Self {
            from,
            to,
            agent: agent.into(),
            event,
        }
    }

    pub fn id(&self) -> &str {
        &self.event.id
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.event.timestamp
    }

    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            from: TrailNode::from_json(obj.get("from")),
            to: TrailNode::from_json(obj.get("to")),
            agent: fields::string(obj, "agent").unwrap_or_default(),
            event: Event::from_json(obj.get("event")),
        })
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Object::new();
        obj.insert("from".to_string(), self.from.to_json());
        obj.insert("to".to_string(), self.to.to_json());
        obj.insert("agent".to_string(), Value::String(self.agent.clone()));
        obj.insert("event".to_string(), self.event.to_json());
        Value::Object(obj)
    }
}

// =============================================================================
// TRAIL
// =============================================================================

/// An ordered history of actions.
///
/// Actions stay sorted by timestamp; actions without a timestamp sort first
/// and ties keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail {
    pub id: EntityId,
    pub parent: Option<EntityId>,
    pub properties: Properties,
    pub meta_properties: MetaProperties,
    actions: Vec<Action>,
}

impl Trail {
    pub fn new(id: impl Into<EntityId>, parent: Option<EntityId>) -> Self {
        Self {
            id: id.into(),
            parent,
            properties: Properties::new(),
            meta_properties: MetaProperties::new(),
            actions: Vec::new(),
        }
    }

    /// Insert `action` at its timestamp position.
    pub fn add_action(&mut self, action: Action) {
        let ts = action.timestamp();
        let pos = self.actions.partition_point(|a| a.timestamp() <= ts);
        self.actions.insert(pos, action);
    }

    /// Remove the first action whose event id is `event_id`.
    pub fn remove_action(&mut self, event_id: &str) -> Option<Action> {
        let pos = self.actions.iter().position(|a| a.id() == event_id)?;
        Some(self.actions.remove(pos))
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn first(&self) -> Option<&Action> {
        self.actions.first()
    }

    pub fn last(&self) -> Option<&Action> {
        self.actions.last()
    }

    pub fn next_action(&self, event_id: &str) -> Option<&Action> {
        let pos = self.position(event_id)?;
        self.actions.get(pos + 1)
    }

    pub fn previous_action(&self, event_id: &str) -> Option<&Action> {
        let pos = self.position(event_id)?;
        pos.checked_sub(1).and_then(|prev| self.actions.get(prev))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn position(&self, event_id: &str) -> Option<usize> {
        self.actions.iter().position(|a| a.id() == event_id)
    }

    pub fn is_valid(value: &Value) -> bool {
        crate::deserialize::validate(value).is_ok_and(|kind| kind == EntityKind::Trail)
    }

    pub(crate) fn check(obj: &Object) -> Result<(), ValidationError> {
        let kind = EntityKind::Trail;
        fields::check_id(obj, kind)?;
        fields::require_nullable_id(obj, kind, "parent")?;
        fields::require_array(obj, kind, "actions")
    }

    pub(crate) fn from_object(id: EntityId, obj: &Object) -> Self {
        let mut trail = Self {
            id,
            parent: fields::id(obj, "parent"),
            properties: fields::properties(obj),
            meta_properties: fields::meta_properties(obj),
            actions: Vec::new(),
        };
        trail.set_actions_from_json(obj.get("actions"));
        trail
    }

    /// Replace every action with the ones in `value`; malformed entries are
    /// dropped.
    pub(crate) fn set_actions_from_json(&mut self, value: Option<&Value>) {
        self.actions.clear();
        let Some(Value::Array(items)) = value else {
            return;
        };
        for action in items.iter().filter_map(Action::from_json) {
            self.add_action(action);
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = fields::header(&self.id, EntityKind::Trail);
        obj.insert("parent".to_string(), fields::id_to_json(self.parent.as_ref()));
        obj.insert(
            "actions".to_string(),
            Value::Array(self.actions.iter().map(Action::to_json).collect()),
        );
        obj.insert("properties".to_string(), fields::properties_to_json(&self.properties));
        obj.insert(
            "metaProperties".to_string(),
            fields::meta_properties_to_json(&self.meta_properties),
        );
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(id: &str, millis: i64) -> Action {
        let ts = DateTime::from_timestamp_millis(millis).expect("timestamp");
        Action::new(
            TrailNode::new("a", "node"),
            TrailNode::new("b", "node"),
            "tester",
            Event::new(id, "click", ts),
        )
    }

    #[test]
    fn actions_stay_sorted_by_timestamp() {
        let mut trail = Trail::new("t", None);
        trail.add_action(action("late", 3_000));
        trail.add_action(action("early", 1_000));
        trail.add_action(action("middle", 2_000));

        let order: Vec<_> = trail.actions().iter().map(Action::id).collect();
        assert_eq!(order, vec!["early", "middle", "late"]);
    }

    #[test]
    fn navigation_follows_order() {
        let mut trail = Trail::new("t", None);
        trail.add_action(action("one", 1));
        trail.add_action(action("two", 2));

        assert_eq!(trail.next_action("one").map(Action::id), Some("two"));
        assert_eq!(trail.previous_action("two").map(Action::id), Some("one"));
        assert!(trail.previous_action("one").is_none());
        assert!(trail.next_action("two").is_none());
        assert!(trail.next_action("missing").is_none());
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let mut trail = Trail::new("t", None);
        trail.add_action(action("first", 5));
        trail.add_action(action("second", 5));
        assert_eq!(trail.first().map(Action::id), Some("first"));
        assert_eq!(trail.last().map(Action::id), Some("second"));
    }

    #[test]
    fn timestamps_accept_rfc3339_and_epoch_millis() {
        let obj = json!({
            "id": "t", "type": "trail", "parent": null,
            "actions": [
                {"agent": "x", "event": {"id": "b", "type": "open", "timestamp": "2024-01-01T00:00:01Z"}},
                {"agent": "x", "event": {"id": "a", "type": "open", "timestamp": 1_704_067_200_000_i64}},
                "garbage"
            ]
        });
        let trail = Trail::from_object(EntityId::from("t"), obj.as_object().expect("object"));
        assert_eq!(trail.len(), 2);
        assert_eq!(trail.first().map(Action::id), Some("a"));

        let json = trail.to_json();
        assert_eq!(
            json["actions"][1]["event"]["timestamp"],
            "2024-01-01T00:00:01Z"
        );
    }

    #[test]
    fn sub_millisecond_timestamps_survive_projection() {
        let obj = json!({
            "id": "t", "type": "trail", "parent": null,
            "actions": [
                {"agent": "x", "event": {"id": "u", "type": "open", "timestamp": "2024-01-01T00:00:00.123456Z"}},
                {"agent": "x", "event": {"id": "n", "type": "open", "timestamp": "2024-01-01T00:00:00.123456789Z"}}
            ]
        });
        let trail = Trail::from_object(EntityId::from("t"), obj.as_object().expect("object"));
        let json = trail.to_json();
        assert_eq!(
            json["actions"][0]["event"]["timestamp"],
            "2024-01-01T00:00:00.123456Z"
        );
        assert_eq!(
            json["actions"][1]["event"]["timestamp"],
            "2024-01-01T00:00:00.123456789Z"
        );

        let reloaded = Trail::from_object(
            EntityId::from("t"),
            json.as_object().expect("object"),
        );
        assert_eq!(reloaded, trail);
    }

    #[test]
    fn remove_action_by_event_id() {
        let mut trail = Trail::new("t", None);
        trail.add_action(action("one", 1));
        assert!(trail.remove_action("one").is_some());
        assert!(trail.is_empty());
        assert!(trail.remove_action("one").is_none());
    }
}
