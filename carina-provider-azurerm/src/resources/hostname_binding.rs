//! App Service custom hostname binding
//!
//! Every attribute forces replacement, so there is no update path. State is
//! keyed by the composite ARM ID returned on creation.

use std::collections::HashMap;

use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::{Resource, ResourceId, State, Value};

use super::{required_str, string_value};
use crate::arm::{HostNameBinding, HostNameBindingProperties, SslState, WebAppsApi};
use crate::resource_id::HostnameBindingId;
use crate::utils::response_was_not_found;

pub async fn create<C: WebAppsApi + ?Sized>(client: &C, resource: &Resource) -> ProviderResult<State> {
    log::info!("preparing arguments for App Service Hostname Binding creation.");

    let resource_group = required_str(resource, "resource_group_name")?;
    let app_service_name = required_str(resource, "app_service_name")?;
    let hostname = required_str(resource, "hostname")?;
    let ssl_state = resource
        .get_str("ssl_state")
        .map(str::parse::<SslState>)
        .transpose()
        .map_err(|e| ProviderError::new(e).for_resource(resource.id.clone()))?;
    let thumbprint = resource.get_str("thumbprint").map(str::to_string);

    let binding = HostNameBinding {
        properties: Some(HostNameBindingProperties {
            site_name: Some(app_service_name.to_string()),
            ssl_state,
            thumbprint,
            virtual_ip: None,
        }),
        ..Default::default()
    };

    let context = format!(
        "Hostname Binding {:?} (App Service {:?} / Resource Group {:?})",
        hostname, app_service_name, resource_group
    );

    client
        .create_or_update_host_name_binding(resource_group, app_service_name, hostname, &binding)
        .await
        .map_err(|e| {
            ProviderError::new(format!("Error creating App Service {}", context))
                .for_resource(resource.id.clone())
                .with_cause(e)
        })?;

    let confirmed = client
        .get_host_name_binding(resource_group, app_service_name, hostname)
        .await
        .map_err(|e| {
            ProviderError::new(format!("Error retrieving App Service {}", context))
                .for_resource(resource.id.clone())
                .with_cause(e)
        })?;

    let Some(identifier) = confirmed.id else {
        return Err(
            ProviderError::new(format!("Cannot read {} ID", context)).for_resource(resource.id.clone())
        );
    };

    let pending = State {
        id: resource.id.clone(),
        identifier: Some(identifier),
        attributes: resource.attributes.clone(),
        exists: true,
    };
    let state = read(client, &pending).await?;
    if !state.exists {
        return Err(ProviderError::new(format!(
            "App Service {} disappeared right after creation",
            context
        ))
        .for_resource(resource.id.clone()));
    }
    Ok(state)
}

/// Refresh from the service by decomposing the stored ID
pub async fn read<C: WebAppsApi + ?Sized>(client: &C, prior: &State) -> ProviderResult<State> {
    fetch(client, prior, false).await
}

/// Read the binding; `adopt_optional` takes `ssl_state`/`thumbprint` from the
/// remote record even when `prior` does not track them
async fn fetch<C: WebAppsApi + ?Sized>(
    client: &C,
    prior: &State,
    adopt_optional: bool,
) -> ProviderResult<State> {
    let identifier = prior.identifier.as_deref().ok_or_else(|| {
        ProviderError::new("App Service Hostname Binding has no ID to read").for_resource(prior.id.clone())
    })?;
    let id = parse_id(&prior.id, identifier)?;

    let binding = match client
        .get_host_name_binding(&id.resource_group, &id.app_service_name, &id.hostname)
        .await
    {
        Ok(binding) => binding,
        Err(e) if response_was_not_found(&e) => {
            log::debug!(
                "App Service Hostname Binding {:?} (App Service {:?} / Resource Group {:?}) was not found - removing from state",
                id.hostname,
                id.app_service_name,
                id.resource_group
            );
            return Ok(State::not_found(prior.id.clone()));
        }
        Err(e) => {
            return Err(ProviderError::new(format!(
                "Error making Read request on App Service Hostname Binding {:?} (App Service {:?} / Resource Group {:?})",
                id.hostname, id.app_service_name, id.resource_group
            ))
            .for_resource(prior.id.clone())
            .with_cause(e));
        }
    };

    let mut attributes = HashMap::new();
    attributes.insert("hostname".to_string(), string_value(&id.hostname));
    attributes.insert("app_service_name".to_string(), string_value(&id.app_service_name));
    attributes.insert("resource_group_name".to_string(), string_value(&id.resource_group));

    // Optional attributes are refreshed only once they are tracked in state
    let remote = binding.properties.unwrap_or_default();
    let refreshed = [
        ("ssl_state", remote.ssl_state.map(|s| s.as_str().to_string())),
        ("thumbprint", remote.thumbprint.filter(|t| !t.is_empty())),
    ];
    for (key, value) in refreshed {
        match (prior.attributes.get(key), value) {
            (_, Some(value)) if adopt_optional || prior.attributes.contains_key(key) => {
                attributes.insert(key.to_string(), Value::String(value));
            }
            (Some(prior_value), None) => {
                attributes.insert(key.to_string(), prior_value.clone());
            }
            _ => {}
        }
    }

    Ok(State::existing(prior.id.clone(), attributes).with_identifier(identifier))
}

/// Delete by ID; a binding that is already gone counts as deleted
pub async fn delete<C: WebAppsApi + ?Sized>(
    client: &C,
    resource_id: &ResourceId,
    identifier: &str,
) -> ProviderResult<()> {
    let id = parse_id(resource_id, identifier)?;

    log::debug!(
        "Deleting App Service Hostname Binding {:?} (App Service {:?} / Resource Group {:?})",
        id.hostname,
        id.app_service_name,
        id.resource_group
    );

    match client
        .delete_host_name_binding(&id.resource_group, &id.app_service_name, &id.hostname)
        .await
    {
        Ok(()) => Ok(()),
        Err(e) if response_was_not_found(&e) => Ok(()),
        Err(e) => Err(ProviderError::new(format!(
            "Error deleting App Service Hostname Binding {:?} (App Service {:?} / Resource Group {:?})",
            id.hostname, id.app_service_name, id.resource_group
        ))
        .for_resource(resource_id.clone())
        .with_cause(e)),
    }
}

/// Adopt an existing binding by its raw ARM ID
pub async fn import<C: WebAppsApi + ?Sized>(
    client: &C,
    resource_id: &ResourceId,
    identifier: &str,
) -> ProviderResult<State> {
    let pending = State::existing(resource_id.clone(), HashMap::new()).with_identifier(identifier);
    let state = fetch(client, &pending, true).await?;
    if !state.exists {
        return Err(ProviderError::new(format!(
            "Cannot import non-existent App Service Hostname Binding {:?}",
            identifier
        ))
        .for_resource(resource_id.clone()));
    }
    Ok(state)
}

pub fn reject_update(id: &ResourceId) -> ProviderError {
    ProviderError::new(
        "App Service Hostname Bindings cannot be updated in place; every attribute forces replacement",
    )
    .for_resource(id.clone())
}

fn parse_id(resource_id: &ResourceId, identifier: &str) -> ProviderResult<HostnameBindingId> {
    HostnameBindingId::parse(identifier).map_err(|e| {
        ProviderError::new(format!("Error parsing App Service Hostname Binding ID {:?}: {}", identifier, e))
            .for_resource(resource_id.clone())
            .with_cause(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_id_fails_with_missing_segment() {
        let id = ResourceId::new("app_service_custom_hostname_binding", "www");
        let err = parse_id(&id, "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Web/sites/svc1")
            .unwrap_err();
        assert!(err.message.contains("hostNameBindings"), "{}", err.message);
        assert_eq!(err.resource_id, Some(id));
    }

    #[test]
    fn update_is_rejected() {
        let err = reject_update(&ResourceId::new("app_service_custom_hostname_binding", "www"));
        assert!(err.to_string().contains("cannot be updated in place"));
    }
}
