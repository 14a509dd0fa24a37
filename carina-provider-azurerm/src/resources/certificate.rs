//! App Service certificate
//!
//! Certificates are created and updated by the same upsert. The service has no
//! delete operation for them, so Delete only forgets the resource locally.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::{Resource, ResourceId, State, Value};

use super::{required_str, string_value};
use crate::arm::{Certificate, CertificateProperties, CertificatesApi};
use crate::resource_id::CertificateId;
use crate::utils::{normalize_location, response_was_not_found};

/// Attributes the service never returns; carried forward from prior state
const WRITE_ONLY: [&str; 2] = ["base_64_encoded_pfx_file", "pfx_password"];

pub async fn create_or_update<C: CertificatesApi + ?Sized>(
    client: &C,
    resource: &Resource,
) -> ProviderResult<State> {
    log::info!("preparing arguments for App Service Certificate creation.");

    let resource_group = required_str(resource, "resource_group_name")?;
    let name = required_str(resource, "name")?;
    let location = normalize_location(required_str(resource, "location")?);
    let pfx_string = required_str(resource, "base_64_encoded_pfx_file")?;
    let password = required_str(resource, "pfx_password")?;

    let pfx_blob = STANDARD.decode(pfx_string).map_err(|e| {
        ProviderError::new(format!(
            "Error decoding base_64_encoded_pfx_file for App Service Certificate {:?}: {}",
            name, e
        ))
        .for_resource(resource.id.clone())
    })?;

    let certificate = Certificate {
        name: Some(name.to_string()),
        location: Some(location.clone()),
        properties: Some(CertificateProperties {
            pfx_blob: Some(pfx_blob),
            password: Some(password.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };

    let result = client
        .create_or_update(resource_group, name, &certificate)
        .await
        .map_err(|e| {
            ProviderError::new(format!(
                "Error creating/updating App Service Certificate {:?} (Resource Group {:?})",
                name, resource_group
            ))
            .for_resource(resource.id.clone())
            .with_cause(e)
        })?;

    let Some(identifier) = result.id.clone() else {
        return Err(ProviderError::new(format!(
            "Cannot read App Service Certificate {:?} (Resource Group {:?}) ID",
            name, resource_group
        ))
        .for_resource(resource.id.clone()));
    };

    let mut attributes = HashMap::new();
    attributes.insert("name".to_string(), string_value(name));
    attributes.insert("resource_group_name".to_string(), string_value(resource_group));
    attributes.insert("location".to_string(), string_value(location));
    attributes.insert("base_64_encoded_pfx_file".to_string(), string_value(pfx_string));
    attributes.insert("pfx_password".to_string(), string_value(password));
    set_computed(&mut attributes, result.properties.as_ref());

    Ok(State::existing(resource.id.clone(), attributes).with_identifier(identifier))
}

/// Refresh from the service; a certificate that no longer exists yields a not-found state
pub async fn read<C: CertificatesApi + ?Sized>(client: &C, prior: &State) -> ProviderResult<State> {
    let (resource_group, name) = locate(prior)?;

    let certificate = match client.get(&resource_group, &name).await {
        Ok(certificate) => certificate,
        Err(e) if response_was_not_found(&e) => {
            log::debug!(
                "App Service Certificate {:?} (Resource Group {:?}) was not found - removing from state",
                name,
                resource_group
            );
            return Ok(State::not_found(prior.id.clone()));
        }
        Err(e) => {
            return Err(ProviderError::new(format!(
                "Error making Read request on App Service Certificate {:?} (Resource Group {:?})",
                name, resource_group
            ))
            .for_resource(prior.id.clone())
            .with_cause(e));
        }
    };

    let mut attributes = HashMap::new();
    attributes.insert(
        "name".to_string(),
        string_value(certificate.name.as_deref().unwrap_or(&name)),
    );
    attributes.insert("resource_group_name".to_string(), string_value(&resource_group));
    if let Some(location) = certificate.location.as_deref().or(prior.get_str("location")) {
        attributes.insert("location".to_string(), string_value(normalize_location(location)));
    }
    for key in WRITE_ONLY {
        if let Some(value) = prior.attributes.get(key) {
            attributes.insert(key.to_string(), value.clone());
        }
    }
    set_computed(&mut attributes, certificate.properties.as_ref());

    let mut state = State::existing(prior.id.clone(), attributes);
    if let Some(identifier) = certificate.id.or_else(|| prior.identifier.clone()) {
        state = state.with_identifier(identifier);
    }
    Ok(state)
}

/// The service offers no delete for certificates
pub async fn delete(id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    log::debug!("[{}] removing App Service Certificate {} from state only", id, identifier);
    Ok(())
}

/// Resource group and name from prior attributes, or else from the stored identifier
fn locate(prior: &State) -> ProviderResult<(String, String)> {
    if let (Some(resource_group), Some(name)) =
        (prior.get_str("resource_group_name"), prior.get_str("name"))
    {
        return Ok((resource_group.to_string(), name.to_string()));
    }

    let identifier = prior.identifier.as_deref().ok_or_else(|| {
        ProviderError::new("App Service Certificate has neither a name nor an ID to read")
            .for_resource(prior.id.clone())
    })?;
    let parsed = CertificateId::parse(identifier).map_err(|e| {
        ProviderError::new(format!("Error parsing App Service Certificate ID {:?}", identifier))
            .for_resource(prior.id.clone())
            .with_cause(e)
    })?;
    Ok((parsed.resource_group, parsed.name))
}

fn set_computed(attributes: &mut HashMap<String, Value>, properties: Option<&CertificateProperties>) {
    let Some(properties) = properties else {
        return;
    };
    let strings = [
        ("thumbprint", &properties.thumbprint),
        ("subject_name", &properties.subject_name),
        ("issuer", &properties.issuer),
        ("expiration_date", &properties.expiration_date),
    ];
    for (key, value) in strings {
        if let Some(value) = value {
            attributes.insert(key.to_string(), string_value(value));
        }
    }
    if let Some(host_names) = &properties.host_names {
        attributes.insert(
            "host_names".to_string(),
            Value::List(host_names.iter().map(|h| string_value(h.as_str())).collect()),
        );
    }
}
