//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the desired state declared in the manifest with the current state
//! fetched from the Provider, and generates the list of required Effects (Plan).

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A ForceNew attribute changed -> needs destroy and recreate
    Replace {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
        forcing: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(schema: Option<&ResourceSchema>, desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(schema, &desired.attributes, &current.attributes);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forcing: Vec<String> = changed
        .iter()
        .filter(|name| {
            schema
                .and_then(|s| s.attributes.get(name.as_str()))
                .is_some_and(|a| a.force_new)
        })
        .cloned()
        .collect();

    if forcing.is_empty() {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Replace {
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
            forcing,
        }
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    schema: Option<&ResourceSchema>,
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        let attr = schema.and_then(|s| s.attributes.get(key));

        // Computed attributes are owned by the provider
        if attr.is_some_and(|a| a.computed) {
            continue;
        }

        let equal = match (current.get(key), attr) {
            (Some(current_value), Some(attr)) => attr.values_equal(desired_value, current_value),
            (Some(current_value), None) => current_value == desired_value,
            (None, _) => false,
        };

        if !equal {
            changed.push(key.clone());
        }
    }

    // Optional attributes removed from the desired state
    if let Some(schema) = schema {
        for key in current.keys() {
            if let Some(attr) = schema.attributes.get(key)
                && !attr.computed
                && !desired.contains_key(key)
            {
                changed.push(key.clone());
            }
        }
    }

    changed.sort();
    changed
}

/// Compute Diff for multiple resources and generate a Plan
///
/// Resources present in `current_states` but absent from `desired` are deleted.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        let d = diff(schemas.get(&resource.id.resource_type), resource, &current);

        match d {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update { id, from, to, .. } => {
                plan.add(Effect::Update { id, from, to });
            }
            Diff::Replace {
                from, to, forcing, ..
            } => plan.add(Effect::Replace { from, to, forcing }),
            Diff::NoChange(_) => {}
        }
    }

    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|s| s.exists && !desired.iter().any(|r| r.id == s.id))
        .collect();
    orphans.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));

    for state in orphans {
        plan.add(Effect::Delete {
            id: state.id.clone(),
            identifier: state.identifier.clone().unwrap_or_default(),
        });
    }

    plan
}
