//! Resource handlers and type definitions

pub mod certificate;
pub mod hostname_binding;

use carina_core::provider::{ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{Resource, ResourceId, Value};
use carina_core::schema::ResourceSchema;

use crate::schemas::app_service;

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(
    CertificateType,
    app_service::CERTIFICATE,
    app_service::certificate_schema
);
define_resource_type!(
    CustomHostnameBindingType,
    app_service::CUSTOM_HOSTNAME_BINDING,
    app_service::custom_hostname_binding_schema
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(CertificateType), Box::new(CustomHostnameBindingType)]
}

/// A string attribute the configuration must carry
pub(crate) fn required_str<'a>(resource: &'a Resource, key: &str) -> ProviderResult<&'a str> {
    resource.get_str(key).ok_or_else(|| {
        ProviderError::new(format!("Missing required attribute '{}'", key))
            .for_resource(resource.id.clone())
    })
}

pub(crate) fn string_value(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

pub(crate) fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", id.resource_type)).for_resource(id.clone())
}
