//! Resource - Representing resources and their state

use std::collections::HashMap;

use thiserror::Error;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "app_service_certificate")
    pub resource_type: String,
    /// Resource name (identifier specified in the manifest)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value for persistence
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Convert from a JSON value
    pub fn from_json(json: &serde_json::Value) -> Result<Value, JsonValueError> {
        Self::from_json_at(json, "")
    }

    fn from_json_at(json: &serde_json::Value, path: &str) -> Result<Value, JsonValueError> {
        match json {
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Int).ok_or_else(|| {
                JsonValueError::NotInteger {
                    path: path.to_string(),
                    number: n.to_string(),
                }
            }),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| Self::from_json_at(v, &format!("{}[{}]", path, i)))
                .collect::<Result<_, _>>()
                .map(Value::List),
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| Self::from_json_at(v, &join_path(path, k)).map(|v| (k.clone(), v)))
                .collect::<Result<_, _>>()
                .map(Value::Map),
            serde_json::Value::Null => Err(JsonValueError::Null {
                path: path.to_string(),
            }),
        }
    }
}

/// A JSON value with no attribute counterpart
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonValueError {
    #[error("{path}: null is not a valid attribute value")]
    Null { path: String },

    #[error("{path}: {number} is not an integer")]
    NotInteger { path: String, number: String },
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Convert a JSON object into an attribute map
pub fn attributes_from_json(
    object: &serde_json::Map<String, serde_json::Value>,
) -> Result<HashMap<String, Value>, JsonValueError> {
    object
        .iter()
        .map(|(k, v)| Value::from_json_at(v, k).map(|v| (k.clone(), v)))
        .collect()
}

/// Convert an attribute map into a JSON object
pub fn attributes_to_json(
    attributes: &HashMap<String, Value>,
) -> serde_json::Map<String, serde_json::Value> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Desired state declared in the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// String attribute, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Current state fetched from actual infrastructure
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Provider-side identifier (e.g., an ARM resource ID)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// String attribute, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}
