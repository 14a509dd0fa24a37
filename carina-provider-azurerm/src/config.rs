//! Provider configuration
//!
//! Values come from the manifest's `provider` block first and fall back to
//! the `ARM_*` environment variables used by the Azure tooling.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use carina_core::resource::Value;
use thiserror::Error;

use crate::arm::Credentials;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("subscription_id is required (set it in the provider block or ARM_SUBSCRIPTION_ID)")]
    MissingSubscription,

    #[error(
        "no credentials configured: set access_token (ARM_ACCESS_TOKEN) or tenant_id, client_id and client_secret"
    )]
    MissingCredentials,

    #[error("client credentials are incomplete, missing: {}", .0.join(", "))]
    IncompleteClientSecret(Vec<&'static str>),

    #[error("unknown environment '{0}', expected one of: public, china, usgovernment, german")]
    UnknownEnvironment(String),

    #[error("attribute '{name}' must be {expected}")]
    InvalidAttribute {
        name: &'static str,
        expected: &'static str,
    },
}

/// Azure cloud the provider talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AzureEnvironment {
    #[default]
    Public,
    China,
    UsGovernment,
    German,
}

/// Management and login endpoints of an [`AzureEnvironment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub resource_manager: &'static str,
    pub active_directory: &'static str,
}

impl AzureEnvironment {
    pub fn endpoints(&self) -> Endpoints {
        match self {
            AzureEnvironment::Public => Endpoints {
                resource_manager: "https://management.azure.com/",
                active_directory: "https://login.microsoftonline.com/",
            },
            AzureEnvironment::China => Endpoints {
                resource_manager: "https://management.chinacloudapi.cn/",
                active_directory: "https://login.chinacloudapi.cn/",
            },
            AzureEnvironment::UsGovernment => Endpoints {
                resource_manager: "https://management.usgovcloudapi.net/",
                active_directory: "https://login.microsoftonline.us/",
            },
            AzureEnvironment::German => Endpoints {
                resource_manager: "https://management.microsoftazure.de/",
                active_directory: "https://login.microsoftonline.de/",
            },
        }
    }
}

impl FromStr for AzureEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" | "azurecloud" => Ok(AzureEnvironment::Public),
            "china" | "azurechinacloud" => Ok(AzureEnvironment::China),
            "usgovernment" | "azureusgovernmentcloud" => Ok(AzureEnvironment::UsGovernment),
            "german" | "azuregermancloud" => Ok(AzureEnvironment::German),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for AzureEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AzureEnvironment::Public => "public",
            AzureEnvironment::China => "china",
            AzureEnvironment::UsGovernment => "usgovernment",
            AzureEnvironment::German => "german",
        };
        f.write_str(name)
    }
}

/// Resolved provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub credentials: Credentials,
    pub environment: AzureEnvironment,
    pub request_timeout_secs: u64,
}

impl ProviderConfig {
    /// Resolve from provider block attributes, falling back to the process environment
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        Self::resolve(attributes, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve(
        attributes: &HashMap<String, Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |name: &'static str, var: &str| -> Result<Option<String>, ConfigError> {
            match attributes.get(name) {
                Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
                Some(Value::String(_)) | None => Ok(env(var).filter(|v| !v.is_empty())),
                Some(_) => Err(ConfigError::InvalidAttribute {
                    name,
                    expected: "a string",
                }),
            }
        };

        let subscription_id =
            lookup("subscription_id", "ARM_SUBSCRIPTION_ID")?.ok_or(ConfigError::MissingSubscription)?;

        let environment = match lookup("environment", "ARM_ENVIRONMENT")? {
            Some(name) => name.parse()?,
            None => AzureEnvironment::default(),
        };

        let credentials = match lookup("access_token", "ARM_ACCESS_TOKEN")? {
            Some(token) => Credentials::AccessToken(token),
            None => {
                let tenant_id = lookup("tenant_id", "ARM_TENANT_ID")?;
                let client_id = lookup("client_id", "ARM_CLIENT_ID")?;
                let client_secret = lookup("client_secret", "ARM_CLIENT_SECRET")?;
                match (tenant_id, client_id, client_secret) {
                    (None, None, None) => return Err(ConfigError::MissingCredentials),
                    (Some(tenant_id), Some(client_id), Some(client_secret)) => Credentials::ClientSecret {
                        tenant_id,
                        client_id,
                        client_secret,
                    },
                    (tenant_id, client_id, client_secret) => {
                        let missing = [
                            ("tenant_id", tenant_id.is_none()),
                            ("client_id", client_id.is_none()),
                            ("client_secret", client_secret.is_none()),
                        ]
                        .into_iter()
                        .filter_map(|(name, absent)| absent.then_some(name))
                        .collect();
                        return Err(ConfigError::IncompleteClientSecret(missing));
                    }
                }
            }
        };

        let request_timeout_secs = match attributes.get("request_timeout_seconds") {
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
            Some(Value::Int(n)) if *n > 0 => *n as u64,
            Some(_) => {
                return Err(ConfigError::InvalidAttribute {
                    name: "request_timeout_seconds",
                    expected: "a positive integer",
                });
            }
        };

        Ok(Self {
            subscription_id,
            credentials,
            environment,
            request_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn access_token_from_attributes() {
        let config =
            ProviderConfig::resolve(&attrs(&[("subscription_id", "sub"), ("access_token", "tok")]), no_env)
                .unwrap();
        assert_eq!(config.subscription_id, "sub");
        assert_eq!(config.credentials, Credentials::AccessToken("tok".to_string()));
        assert_eq!(config.environment, AzureEnvironment::Public);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn client_secret_from_environment() {
        let env = |key: &str| match key {
            "ARM_SUBSCRIPTION_ID" => Some("sub".to_string()),
            "ARM_TENANT_ID" => Some("tenant".to_string()),
            "ARM_CLIENT_ID" => Some("app".to_string()),
            "ARM_CLIENT_SECRET" => Some("secret".to_string()),
            "ARM_ENVIRONMENT" => Some("usgovernment".to_string()),
            _ => None,
        };
        let config = ProviderConfig::resolve(&HashMap::new(), env).unwrap();
        assert_eq!(
            config.credentials,
            Credentials::ClientSecret {
                tenant_id: "tenant".to_string(),
                client_id: "app".to_string(),
                client_secret: "secret".to_string(),
            }
        );
        assert_eq!(config.environment, AzureEnvironment::UsGovernment);
    }

    #[test]
    fn attributes_take_precedence_over_environment() {
        let env = |key: &str| (key == "ARM_SUBSCRIPTION_ID").then(|| "from-env".to_string());
        let config =
            ProviderConfig::resolve(&attrs(&[("subscription_id", "from-block"), ("access_token", "t")]), env)
                .unwrap();
        assert_eq!(config.subscription_id, "from-block");
    }

    #[test]
    fn missing_subscription_is_an_error() {
        let err = ProviderConfig::resolve(&attrs(&[("access_token", "t")]), no_env).unwrap_err();
        assert_eq!(err, ConfigError::MissingSubscription);
    }

    #[test]
    fn partial_client_secret_lists_missing_fields() {
        let err =
            ProviderConfig::resolve(&attrs(&[("subscription_id", "sub"), ("client_id", "app")]), no_env)
                .unwrap_err();
        assert_eq!(
            err,
            ConfigError::IncompleteClientSecret(vec!["tenant_id", "client_secret"])
        );
        assert_eq!(
            err.to_string(),
            "client credentials are incomplete, missing: tenant_id, client_secret"
        );
    }

    #[test]
    fn no_credentials_is_an_error() {
        let err = ProviderConfig::resolve(&attrs(&[("subscription_id", "sub")]), no_env).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = ProviderConfig::resolve(
            &attrs(&[("subscription_id", "sub"), ("access_token", "t"), ("environment", "mars")]),
            no_env,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownEnvironment("mars".to_string()));
    }

    #[test]
    fn request_timeout_must_be_positive() {
        let mut attributes = attrs(&[("subscription_id", "sub"), ("access_token", "t")]);
        attributes.insert("request_timeout_seconds".to_string(), Value::Int(0));
        assert!(matches!(
            ProviderConfig::resolve(&attributes, no_env),
            Err(ConfigError::InvalidAttribute { name: "request_timeout_seconds", .. })
        ));

        attributes.insert("request_timeout_seconds".to_string(), Value::Int(15));
        assert_eq!(ProviderConfig::resolve(&attributes, no_env).unwrap().request_timeout_secs, 15);
    }

    #[test]
    fn environment_names_and_endpoints() {
        assert_eq!("AzureChinaCloud".parse::<AzureEnvironment>(), Ok(AzureEnvironment::China));
        assert_eq!(
            AzureEnvironment::German.endpoints().resource_manager,
            "https://management.microsoftazure.de/"
        );
        assert_eq!(AzureEnvironment::Public.to_string(), "public");
    }
}
