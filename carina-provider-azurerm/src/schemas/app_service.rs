//! App Service schema definitions

use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::types;
use crate::utils::normalize_location;

pub const CERTIFICATE: &str = "app_service_certificate";
pub const CUSTOM_HOSTNAME_BINDING: &str = "app_service_custom_hostname_binding";

/// Returns the schema for App Service certificates
pub fn certificate_schema() -> ResourceSchema {
    ResourceSchema::new(CERTIFICATE)
        .with_description("A PFX certificate uploaded to App Service")
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new()
                .with_description("Name of the certificate"),
        )
        .attribute(
            AttributeSchema::new("resource_group_name", types::resource_group_name())
                .required()
                .force_new()
                .with_description("Resource group holding the certificate"),
        )
        .attribute(
            AttributeSchema::new("location", types::location())
                .required()
                .force_new()
                .with_normalizer(normalize_location)
                .with_description("Azure location, e.g. westeurope"),
        )
        .attribute(
            AttributeSchema::new("base_64_encoded_pfx_file", types::base64_string())
                .required()
                .sensitive()
                .with_description("PFX archive, base64 encoded"),
        )
        .attribute(
            AttributeSchema::new("pfx_password", AttributeType::String)
                .required()
                .sensitive()
                .with_description("Password protecting the PFX archive"),
        )
        .attribute(
            AttributeSchema::new("thumbprint", AttributeType::String)
                .computed()
                .with_description("Certificate thumbprint, assigned by the service"),
        )
        .attribute(AttributeSchema::new("subject_name", AttributeType::String).computed())
        .attribute(AttributeSchema::new("issuer", AttributeType::String).computed())
        .attribute(AttributeSchema::new("expiration_date", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("host_names", AttributeType::List(Box::new(AttributeType::String)))
                .computed()
                .with_description("Host names the certificate is valid for"),
        )
}

/// Returns the schema for App Service custom hostname bindings
pub fn custom_hostname_binding_schema() -> ResourceSchema {
    ResourceSchema::new(CUSTOM_HOSTNAME_BINDING)
        .with_description("Binds a custom domain to an App Service")
        .attribute(
            AttributeSchema::new("hostname", AttributeType::String)
                .required()
                .force_new()
                .with_description("Custom hostname, e.g. www.example.com"),
        )
        .attribute(
            AttributeSchema::new("resource_group_name", types::resource_group_name())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("app_service_name", AttributeType::String)
                .required()
                .force_new()
                .with_description("App Service the hostname is bound to"),
        )
        .attribute(
            AttributeSchema::new("ssl_state", types::ssl_state())
                .force_new()
                .with_description("SniEnabled, IpBasedEnabled or Disabled"),
        )
        .attribute(
            AttributeSchema::new("thumbprint", AttributeType::String)
                .force_new()
                .with_description("Thumbprint of the certificate used for SSL"),
        )
}

/// Returns all App Service schemas
pub fn schemas() -> Vec<ResourceSchema> {
    vec![certificate_schema(), custom_hostname_binding_schema()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use carina_core::resource::Value;
    use carina_core::schema::TypeError;
    use std::collections::HashMap;

    fn certificate_attrs() -> HashMap<String, Value> {
        [
            ("name", "cert1"),
            ("resource_group_name", "rg1"),
            ("location", "West Europe"),
            ("base_64_encoded_pfx_file", "cGZ4"),
            ("pfx_password", "secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
    }

    #[test]
    fn valid_certificate() {
        assert!(certificate_schema().validate(&certificate_attrs()).is_ok());
    }

    #[test]
    fn certificate_thumbprint_is_output_only() {
        let mut attrs = certificate_attrs();
        attrs.insert("thumbprint".to_string(), Value::String("ABC".to_string()));
        let errors = certificate_schema().validate(&attrs).unwrap_err();
        assert!(matches!(&errors[..], [TypeError::ComputedAttribute { name }] if name == "thumbprint"));
    }

    #[test]
    fn certificate_secrets_are_sensitive() {
        let schema = certificate_schema();
        assert!(schema.is_sensitive("base_64_encoded_pfx_file"));
        assert!(schema.is_sensitive("pfx_password"));
        assert!(!schema.is_sensitive("name"));
    }

    #[test]
    fn certificate_location_compares_normalized() {
        let schema = certificate_schema();
        let location = &schema.attributes["location"];
        assert!(location.values_equal(
            &Value::String("West Europe".to_string()),
            &Value::String("westeurope".to_string())
        ));
    }

    #[test]
    fn missing_required_binding_fields() {
        let errors = custom_hostname_binding_schema()
            .validate(&HashMap::new())
            .unwrap_err();
        let missing: Vec<String> = errors
            .iter()
            .filter_map(|e| match e {
                TypeError::MissingRequired { name } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec!["app_service_name", "hostname", "resource_group_name"]);
    }

    #[test]
    fn binding_rejects_unknown_ssl_state() {
        let mut attrs: HashMap<String, Value> = [
            ("hostname", "www.example.com"),
            ("resource_group_name", "rg1"),
            ("app_service_name", "svc1"),
            ("ssl_state", "sniEnabled"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
        assert!(custom_hostname_binding_schema().validate(&attrs).is_ok());

        attrs.insert("ssl_state".to_string(), Value::String("Enabled".to_string()));
        assert!(custom_hostname_binding_schema().validate(&attrs).is_err());
    }

    #[test]
    fn every_binding_attribute_forces_replacement() {
        let schema = custom_hostname_binding_schema();
        assert!(schema.attributes.values().all(|a| a.force_new));
    }
}
