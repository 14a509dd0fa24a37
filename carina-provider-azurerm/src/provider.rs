//! Azure Resource Manager provider
//!
//! Dispatches each lifecycle call to the handler of its resource type. The
//! remote client is injected, so tests can run the handlers against a fake.

use std::collections::HashMap;

use carina_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{Resource, ResourceId, State, Value};

use crate::arm::{ArmClient, CertificatesApi, StopContext, WebAppsApi};
use crate::config::ProviderConfig;
use crate::resources::{self, certificate, hostname_binding, unknown_type};
use crate::schemas::app_service::{CERTIFICATE, CUSTOM_HOSTNAME_BINDING};

pub struct AzurermProvider<C = ArmClient> {
    client: C,
}

impl AzurermProvider<ArmClient> {
    pub fn new(config: &ProviderConfig, stop: StopContext) -> ProviderResult<Self> {
        let client = ArmClient::new(config, stop)
            .map_err(|e| ProviderError::new("Failed to build the ARM client").with_cause(e))?;
        log::debug!(
            "azurerm provider for subscription {} in the {} cloud",
            client.subscription_id(),
            config.environment
        );
        Ok(Self { client })
    }

    /// Build from a manifest's provider block, falling back to `ARM_*` variables
    pub fn from_attributes(attributes: &HashMap<String, Value>, stop: StopContext) -> ProviderResult<Self> {
        let config = ProviderConfig::from_attributes(attributes)
            .map_err(|e| ProviderError::new("Invalid azurerm provider configuration").with_cause(e))?;
        Self::new(&config, stop)
    }
}

impl<C> AzurermProvider<C> {
    /// Create with a specific client (for testing)
    pub fn with_client(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C> Provider for AzurermProvider<C>
where
    C: CertificatesApi + WebAppsApi + 'static,
{
    fn name(&self) -> &'static str {
        "azurerm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn read(&self, prior: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let prior = prior.clone();
        Box::pin(async move {
            match prior.id.resource_type.as_str() {
                CERTIFICATE => certificate::read(&self.client, &prior).await,
                CUSTOM_HOSTNAME_BINDING => hostname_binding::read(&self.client, &prior).await,
                _ => Err(unknown_type(&prior.id)),
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            match resource.id.resource_type.as_str() {
                CERTIFICATE => certificate::create_or_update(&self.client, &resource).await,
                CUSTOM_HOSTNAME_BINDING => hostname_binding::create(&self.client, &resource).await,
                _ => Err(unknown_type(&resource.id)),
            }
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        _identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let to = to.clone();
        Box::pin(async move {
            match id.resource_type.as_str() {
                CERTIFICATE => certificate::create_or_update(&self.client, &to).await,
                CUSTOM_HOSTNAME_BINDING => Err(hostname_binding::reject_update(&id)),
                _ => Err(unknown_type(&id)),
            }
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            match id.resource_type.as_str() {
                CERTIFICATE => certificate::delete(&id, &identifier).await,
                CUSTOM_HOSTNAME_BINDING => {
                    hostname_binding::delete(&self.client, &id, &identifier).await
                }
                _ => Err(unknown_type(&id)),
            }
        })
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            match id.resource_type.as_str() {
                CUSTOM_HOSTNAME_BINDING => {
                    hostname_binding::import(&self.client, &id, &identifier).await
                }
                CERTIFICATE => Err(ProviderError::new(format!(
                    "{} does not support import",
                    id.resource_type
                ))
                .for_resource(id.clone())),
                _ => Err(unknown_type(&id)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::Credentials;
    use crate::config::AzureEnvironment;

    fn provider() -> AzurermProvider {
        let config = ProviderConfig {
            subscription_id: "sub".to_string(),
            credentials: Credentials::AccessToken("tok".to_string()),
            environment: AzureEnvironment::Public,
            request_timeout_secs: 30,
        };
        AzurermProvider::new(&config, StopContext::background()).unwrap()
    }

    #[test]
    fn provider_exposes_both_resource_types() {
        let provider = provider();
        assert_eq!(provider.name(), "azurerm");
        assert!(provider.schema_for(CERTIFICATE).is_some());
        assert!(provider.schema_for(CUSTOM_HOSTNAME_BINDING).is_some());
        assert!(provider.schema_for("app_service_plan").is_none());
    }

    #[tokio::test]
    async fn unknown_resource_type_is_an_error() {
        let provider = provider();
        let err = provider
            .create(&Resource::new("app_service_plan", "plan"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "[app_service_plan.plan] Unknown resource type: app_service_plan");
    }

    #[tokio::test]
    async fn certificate_import_is_rejected() {
        let provider = provider();
        let err = provider
            .import(
                &ResourceId::new(CERTIFICATE, "cert"),
                "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Web/certificates/cert1",
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("does not support import"));
    }
}
