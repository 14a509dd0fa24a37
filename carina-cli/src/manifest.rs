//! JSON manifest describing the desired resources

use std::collections::{HashMap, HashSet};
use std::path::Path;

use carina_core::resource::{Resource, ResourceId, Value, attributes_from_json};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    /// Provider block (subscription, credentials, environment)
    #[serde(default)]
    provider: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    resources: Vec<RawResource>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResource {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

/// Desired resources and provider settings
#[derive(Debug)]
pub struct Manifest {
    provider: HashMap<String, Value>,
    resources: Vec<Resource>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let raw: RawManifest = serde_json::from_str(content).map_err(|e| e.to_string())?;

        let provider = attributes_from_json(&raw.provider).map_err(|e| format!("provider: {}", e))?;

        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(raw.resources.len());
        for r in raw.resources {
            let id = ResourceId::new(r.resource_type, r.name);
            if !seen.insert(id.clone()) {
                return Err(format!("Duplicate resource {}", id));
            }
            let attributes = attributes_from_json(&r.attributes).map_err(|e| format!("{}: {}", id, e))?;
            resources.push(Resource { id, attributes });
        }

        Ok(Self { provider, resources })
    }

    pub fn provider_attributes(&self) -> HashMap<String, Value> {
        self.provider.clone()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources.clone()
    }
}
