//! Connectors: the schema of a relation.

use super::fields::{self, Object};
use crate::types::{EntityId, EntityKind, MetaProperties, Properties, ValidationError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Relation class of a connector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorClass {
    Hierarchy,
    #[default]
    Facts,
    Reasoning,
    Constraint,
    Causal,
    Possibility,
    PossibilityResolver,
}

impl ConnectorClass {
    pub const ALL: [ConnectorClass; 7] = [
        ConnectorClass::Hierarchy,
        ConnectorClass::Facts,
        ConnectorClass::Reasoning,
        ConnectorClass::Constraint,
        ConnectorClass::Causal,
        ConnectorClass::Possibility,
        ConnectorClass::PossibilityResolver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorClass::Hierarchy => "hierarchy",
            ConnectorClass::Facts => "facts",
            ConnectorClass::Reasoning => "reasoning",
            ConnectorClass::Constraint => "constraint",
            ConnectorClass::Causal => "causal",
            ConnectorClass::Possibility => "possibility",
            ConnectorClass::PossibilityResolver => "possibility-resolver",
        }
    }
}

impl fmt::Display for ConnectorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorClass {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectorClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidClassName(s.to_string()))
    }
}

/// How a role participates in its relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    #[default]
    None,
    Subject,
    Object,
    Parent,
    Child,
}

impl RoleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::None => "none",
            RoleType::Subject => "subject",
            RoleType::Object => "object",
            RoleType::Parent => "parent",
            RoleType::Child => "child",
        }
    }

    /// Lenient parse: unknown tags fall back to `None`.
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "subject" => RoleType::Subject,
            "object" => RoleType::Object,
            "parent" => RoleType::Parent,
            "child" => RoleType::Child,
            "none" => RoleType::None,
            other => {
                tracing::debug!(role_type = other, "Unknown role type, using none");
                RoleType::None
            }
        }
    }
}

/// A relation schema: class plus named roles.
///
/// Connectors are never filed under a container.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub id: EntityId,
    pub class_name: ConnectorClass,
    /// Role name -> role type, in declaration order.
    pub roles: IndexMap<String, RoleType>,
    pub properties: Properties,
    pub meta_properties: MetaProperties,
}

impl Connector {
    pub fn new(id: impl Into<EntityId>, class_name: ConnectorClass) -> Self {
        Self {
            id: id.into(),
            class_name,
            roles: IndexMap::new(),
            properties: Properties::new(),
            meta_properties: MetaProperties::new(),
        }
    }

    pub fn with_role(mut self, name: impl Into<String>, role_type: RoleType) -> Self {
        self.add_role(name, role_type);
        self
    }

    pub fn add_role(&mut self, name: impl Into<String>, role_type: RoleType) {
        self.roles.insert(name.into(), role_type);
    }

    pub fn remove_role(&mut self, name: &str) -> Option<RoleType> {
        self.roles.shift_remove(name)
    }

    pub fn role_type(&self, name: &str) -> Option<RoleType> {
        self.roles.get(name).copied()
    }

    /// Role names in declaration order.
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }

    pub fn is_valid(value: &Value) -> bool {
        crate::deserialize::validate(value).is_ok_and(|kind| kind == EntityKind::Connector)
    }

    pub(crate) fn check(obj: &Object) -> Result<(), ValidationError> {
        let kind = EntityKind::Connector;
        fields::check_id(obj, kind)?;
        fields::require_string(obj, kind, "className")?;
        if let Some(class) = obj.get("className").and_then(Value::as_str) {
            class.parse::<ConnectorClass>()?;
        }
        fields::require_object(obj, kind, "roles")
    }

    pub(crate) fn from_object(id: EntityId, obj: &Object) -> Self {
        Self {
            id,
            class_name: class_name(obj).unwrap_or_default(),
            roles: roles(obj),
            properties: fields::properties(obj),
            meta_properties: fields::meta_properties(obj),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = fields::header(&self.id, EntityKind::Connector);
        obj.insert(
            "className".to_string(),
            Value::String(self.class_name.as_str().to_string()),
        );
        obj.insert(
            "roles".to_string(),
            Value::Object(
                self.roles
                    .iter()
                    .map(|(name, role)| (name.clone(), Value::String(role.as_str().to_string())))
                    .collect(),
            ),
        );
        obj.insert("properties".to_string(), fields::properties_to_json(&self.properties));
        obj.insert(
            "metaProperties".to_string(),
            fields::meta_properties_to_json(&self.meta_properties),
        );
        Value::Object(obj)
    }
}

pub(crate) fn class_name(obj: &Object) -> Option<ConnectorClass> {
    fields::string(obj, "className").and_then(|s| s.parse().ok())
}

pub(crate) fn roles(obj: &Object) -> IndexMap<String, RoleType> {
    let Some(Value::Object(map)) = obj.get("roles") else {
        return IndexMap::new();
    };
    map.iter()
        .map(|(name, role)| {
            let role_type = match role.as_str() {
                Some(tag) => RoleType::parse_lenient(tag),
                None => {
                    tracing::debug!(role = %name, "Non-string role type, using none");
                    RoleType::default()
                }
            };
            (name.clone(), role_type)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn class_codes_roundtrip() {
        for class in ConnectorClass::ALL {
            assert_eq!(class.as_str().parse::<ConnectorClass>(), Ok(class));
        }
    }

    #[test]
    fn connector_rejects_unknown_class() {
        assert!(Connector::is_valid(
            &json!({"id": "knows", "type": "connector", "className": "facts", "roles": {}})
        ));
        assert!(!Connector::is_valid(
            &json!({"id": "knows", "type": "connector", "className": "gossip", "roles": {}})
        ));
        assert!(!Connector::is_valid(
            &json!({"id": "knows", "type": "connector", "className": "facts"})
        ));
    }

    #[test]
    fn roles_keep_declaration_order_and_tolerate_unknown_types() {
        let obj = json!({
            "id": "rel", "type": "connector", "className": "causal",
            "roles": {"cause": "subject", "effect": "object", "witness": "bystander"}
        });
        let connector =
            Connector::from_object(EntityId::from("rel"), obj.as_object().expect("object"));
        assert_eq!(connector.role_names(), vec!["cause", "effect", "witness"]);
        assert_eq!(connector.role_type("witness"), Some(RoleType::None));
        assert_eq!(connector.class_name, ConnectorClass::Causal);
    }

    #[test]
    fn non_enumerated_role_types_settle_on_none() {
        let obj = json!({
            "id": "rel", "type": "connector", "className": "facts",
            "roles": {"a": "none", "b": "agentive", "c": 7}
        });
        let connector =
            Connector::from_object(EntityId::from("rel"), obj.as_object().expect("object"));
        for role in ["a", "b", "c"] {
            assert_eq!(connector.role_type(role), Some(RoleType::None));
        }

        // Once written back, the fallback is stable across reloads.
        let reloaded = Connector::from_object(
            EntityId::from("rel"),
            connector.to_json().as_object().expect("object"),
        );
        assert_eq!(reloaded, connector);
        assert_eq!(RoleType::parse_lenient("none"), RoleType::None);
    }

    #[test]
    fn remove_role_keeps_remaining_order() {
        let mut connector = Connector::new("c", ConnectorClass::Facts)
            .with_role("a", RoleType::Subject)
            .with_role("b", RoleType::None)
            .with_role("c", RoleType::Object);
        assert_eq!(connector.remove_role("b"), Some(RoleType::None));
        assert_eq!(connector.role_names(), vec!["a", "c"]);
    }
}
