//! Effect - A side effect represented as a value
//!
//! Effects describe what should happen to a resource. Nothing is executed
//! until an Interpreter runs them.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Create(Resource),
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Destroy the existing resource, then create it from the desired state
    Replace {
        from: State,
        to: Resource,
        /// ForceNew attributes that triggered the replacement
        forcing: Vec<String>,
    },
    Delete {
        id: ResourceId,
        identifier: String,
    },
}

impl Effect {
    /// Address of the resource this effect targets
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } | Effect::Delete { id, .. } => id,
            Effect::Replace { to, .. } => &to.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Create(_) => "create",
            Effect::Update { .. } => "update",
            Effect::Replace { .. } => "replace",
            Effect::Delete { .. } => "delete",
        }
    }
}
