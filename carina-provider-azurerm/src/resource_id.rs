//! Azure Resource Manager ID parsing
//!
//! ARM identifiers are paths of key/value segments:
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}/...`

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Errors produced when decomposing an ARM identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    #[error("Cannot parse Azure ID {0:?}: expected an absolute path")]
    NotAbsolute(String),

    #[error("The number of path segments is not divisible by 2 in {0:?}")]
    OddSegments(String),

    #[error("Key/Value cannot be empty strings in {0:?}")]
    EmptySegment(String),

    #[error("No subscription ID found in {0:?}")]
    MissingSubscription(String),

    #[error("No resource group name found in {0:?}")]
    MissingResourceGroup(String),

    #[error("ID {id:?} is missing the {key:?} segment")]
    MissingSegment { id: String, key: String },
}

/// A generic ARM identifier split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    /// Resource provider namespace (e.g., "Microsoft.Web"), absent for resource groups
    pub provider: Option<String>,
    /// Remaining key/value segments (e.g., "sites" -> "svc1")
    pub path: HashMap<String, String>,
}

impl AzureResourceId {
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let trimmed = id.trim();
        let Some(path) = trimmed.strip_prefix('/') else {
            return Err(ResourceIdError::NotAbsolute(id.to_string()));
        };
        let path = path.strip_suffix('/').unwrap_or(path);

        let components: Vec<&str> = path.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(ResourceIdError::OddSegments(id.to_string()));
        }

        let mut subscription_id = None;
        let mut segments = HashMap::with_capacity(components.len() / 2);
        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(ResourceIdError::EmptySegment(id.to_string()));
            }
            // Nested resources may reuse "subscriptions"; the first one wins
            if key == "subscriptions" && subscription_id.is_none() {
                subscription_id = Some(value.to_string());
            } else {
                segments.insert(key.to_string(), value.to_string());
            }
        }

        let subscription_id =
            subscription_id.ok_or_else(|| ResourceIdError::MissingSubscription(id.to_string()))?;

        // Some APIs hand back the resource group key in lower case
        let resource_group = segments
            .remove("resourceGroups")
            .or_else(|| segments.remove("resourcegroups"))
            .ok_or_else(|| ResourceIdError::MissingResourceGroup(id.to_string()))?;

        let provider = segments.remove("providers");

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path: segments,
        })
    }

    /// Value of a required path segment
    pub fn segment(&self, key: &str) -> Result<&str, ResourceIdError> {
        self.path
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ResourceIdError::MissingSegment {
                id: self.to_string(),
                key: key.to_string(),
            })
    }
}

impl fmt::Display for AzureResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )?;
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        let mut keys: Vec<&String> = self.path.keys().collect();
        keys.sort();
        for key in keys {
            write!(f, "/{}/{}", key, self.path[key])?;
        }
        Ok(())
    }
}

/// Identity of an App Service custom hostname binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameBindingId {
    pub subscription_id: String,
    pub resource_group: String,
    pub app_service_name: String,
    pub hostname: String,
}

impl HostnameBindingId {
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let parsed = AzureResourceId::parse(id)?;
        Ok(Self {
            app_service_name: parsed.segment("sites")?.to_string(),
            hostname: parsed.segment("hostNameBindings")?.to_string(),
            subscription_id: parsed.subscription_id,
            resource_group: parsed.resource_group,
        })
    }
}

impl fmt::Display for HostnameBindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}/hostNameBindings/{}",
            self.subscription_id, self.resource_group, self.app_service_name, self.hostname
        )
    }
}

/// Identity of an App Service certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl CertificateId {
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let parsed = AzureResourceId::parse(id)?;
        Ok(Self {
            name: parsed.segment("certificates")?.to_string(),
            subscription_id: parsed.subscription_id,
            resource_group: parsed.resource_group,
        })
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/certificates/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}
