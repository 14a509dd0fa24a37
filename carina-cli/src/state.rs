//! Local state file (`carina.state.json`)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use carina_core::resource::{
    JsonValueError, ResourceId, State, attributes_from_json, attributes_to_json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid state file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid attributes for {resource} in state: {source}")]
    InvalidAttributes {
        resource: ResourceId,
        #[source]
        source: JsonValueError,
    },

    #[error("Unsupported state file version {found} (this build reads version {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// The persisted state of every managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    /// Incremented on every write
    pub serial: u64,
    /// Identifies this state's history across writes
    pub lineage: String,
    pub carina_version: String,
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            carina_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.carina_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == id.resource_type && r.name == id.name)
    }

    /// Record a resource that exists remotely; a not-found state removes it instead
    pub fn record(&mut self, state: &State) {
        if !state.exists {
            self.remove_resource(&state.id);
            return;
        }
        let entry = ResourceState::from_state(state);
        match self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == entry.resource_type && r.name == entry.name)
        {
            Some(existing) => *existing = entry,
            None => self.resources.push(entry),
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == id.resource_type && r.name == id.name)?;
        Some(self.resources.remove(pos))
    }

    /// Stored states keyed by resource id
    pub fn states(&self) -> Result<HashMap<ResourceId, State>, StateError> {
        self.resources
            .iter()
            .map(|r| r.to_state().map(|state| (state.id.clone(), state)))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub resource_type: String,
    pub name: String,
    /// Remote identifier (an ARM resource ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceState {
    pub fn from_state(state: &State) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier: state.identifier.clone(),
            attributes: attributes_to_json(&state.attributes),
        }
    }

    pub fn to_state(&self) -> Result<State, StateError> {
        let id = ResourceId::new(&self.resource_type, &self.name);
        let attributes = attributes_from_json(&self.attributes).map_err(|source| {
            StateError::InvalidAttributes {
                resource: id.clone(),
                source,
            }
        })?;
        let state = State::existing(id, attributes);
        Ok(match &self.identifier {
            Some(identifier) => state.with_identifier(identifier),
            None => state,
        })
    }
}

/// State kept in a JSON file on local disk
pub struct LocalState {
    path: PathBuf,
}

impl LocalState {
    pub const DEFAULT_STATE_FILE: &'static str = "carina.state.json";

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state file, or start a new one if none exists yet
    pub fn load(&self) -> Result<StateFile, StateError> {
        if !self.path.exists() {
            log::debug!("No state file at {}, starting fresh", self.path.display());
            return Ok(StateFile::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| StateError::Read {
            path: self.path.clone(),
            source,
        })?;
        let state: StateFile = serde_json::from_str(&content).map_err(|source| StateError::Invalid {
            path: self.path.clone(),
            source,
        })?;
        if state.version != StateFile::CURRENT_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: state.version,
                supported: StateFile::CURRENT_VERSION,
            });
        }
        Ok(state)
    }

    /// Write the state with the next serial
    pub fn save(&self, state: &mut StateFile) -> Result<(), StateError> {
        state.increment_serial();
        let content = serde_json::to_string_pretty(state).map_err(|source| StateError::Invalid {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, content).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl Default for LocalState {
    fn default() -> Self {
        Self::with_path(Self::DEFAULT_STATE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carina_core::resource::Value;
    use tempfile::tempdir;

    fn binding_state() -> State {
        State::existing(
            ResourceId::new("app_service_custom_hostname_binding", "www"),
            HashMap::from([(
                "hostname".to_string(),
                Value::String("www.example.com".to_string()),
            )]),
        )
        .with_identifier("/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Web/sites/svc1/hostNameBindings/www.example.com")
    }

    #[test]
    fn record_upserts_and_not_found_removes() {
        let mut file = StateFile::new();
        file.record(&binding_state());
        file.record(&binding_state().with_attribute("ssl_state", Value::String("SniEnabled".to_string())));
        assert_eq!(file.resources.len(), 1);
        assert_eq!(
            file.resources[0].attributes.get("ssl_state"),
            Some(&serde_json::json!("SniEnabled"))
        );

        file.record(&State::not_found(binding_state().id));
        assert!(file.resources.is_empty());
    }

    #[test]
    fn states_round_trip_identifier_and_attributes() {
        let mut file = StateFile::new();
        file.record(&binding_state());

        let states = file.states().unwrap();
        let state = &states[&binding_state().id];
        assert_eq!(state, &binding_state());
    }

    #[test]
    fn load_missing_file_starts_fresh() {
        let dir = tempdir().unwrap();
        let local = LocalState::with_path(dir.path().join("carina.state.json"));
        let file = local.load().unwrap();
        assert_eq!(file.serial, 0);
        assert!(file.resources.is_empty());
    }

    #[test]
    fn save_increments_serial_and_keeps_lineage() {
        let dir = tempdir().unwrap();
        let local = LocalState::with_path(dir.path().join("carina.state.json"));

        let mut file = local.load().unwrap();
        file.record(&binding_state());
        local.save(&mut file).unwrap();
        let lineage = file.lineage.clone();

        let mut reloaded = local.load().unwrap();
        assert_eq!(reloaded.serial, 1);
        assert_eq!(reloaded.lineage, lineage);
        assert_eq!(reloaded.resources.len(), 1);

        local.save(&mut reloaded).unwrap();
        assert_eq!(local.load().unwrap().serial, 2);
    }

    #[test]
    fn null_attributes_in_state_are_reported() {
        let mut file = StateFile::new();
        file.record(&binding_state());
        file.resources[0]
            .attributes
            .insert("ssl_state".to_string(), serde_json::Value::Null);

        let err = file.states().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid attributes for app_service_custom_hostname_binding.www in state: ssl_state: null is not a valid attribute value"
        );
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("carina.state.json");
        std::fs::write(
            &path,
            r#"{"version": 9, "serial": 1, "lineage": "x", "carina_version": "0.0.0", "resources": []}"#,
        )
        .unwrap();

        let err = LocalState::with_path(path).load().unwrap_err();
        assert!(matches!(err, StateError::UnsupportedVersion { found: 9, supported: 1 }));
    }
}
