//! In-memory stand-in for the ARM API

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use carina_provider_azurerm::arm::{
    ArmError, ArmResult, Certificate, CertificatesApi, HostNameBinding, WebAppsApi,
};

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Default)]
pub struct FakeArm {
    pub certificates: Mutex<HashMap<(String, String), Certificate>>,
    pub bindings: Mutex<HashMap<(String, String, String), HostNameBinding>>,
    /// Thumbprint handed out by the next certificate upsert
    pub next_thumbprint: Mutex<String>,
    /// Leave `id` off confirmation reads
    pub omit_binding_ids: Mutex<bool>,
    /// Status returned by every call when set
    pub fail_with: Mutex<Option<u16>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeArm {
    pub fn new() -> Self {
        Self {
            next_thumbprint: Mutex::new("0000".to_string()),
            ..Default::default()
        }
    }

    pub fn binding_id(resource_group: &str, app: &str, hostname: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}/hostNameBindings/{}",
            SUBSCRIPTION, resource_group, app, hostname
        )
    }

    pub fn certificate_id(resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/certificates/{}",
            SUBSCRIPTION, resource_group, name
        )
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> ArmResult<()> {
        self.calls.lock().unwrap().push(call.clone());
        match *self.fail_with.lock().unwrap() {
            Some(status) => Err(http_error("GET", &call, status)),
            None => Ok(()),
        }
    }
}

pub fn http_error(method: &str, url: &str, status: u16) -> ArmError {
    ArmError::Http {
        method: method.to_string(),
        url: url.to_string(),
        status,
        code: None,
        message: format!("fake status {}", status),
    }
}

#[async_trait]
impl CertificatesApi for FakeArm {
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        certificate: &Certificate,
    ) -> ArmResult<Certificate> {
        self.record(format!("certificates.create_or_update {}/{}", resource_group, name))?;

        let mut stored = certificate.clone();
        stored.id = Some(Self::certificate_id(resource_group, name));
        let properties = stored.properties.get_or_insert_with(Default::default);
        // The service never echoes secrets back
        properties.pfx_blob = None;
        properties.password = None;
        properties.thumbprint = Some(self.next_thumbprint.lock().unwrap().clone());
        properties.host_names = Some(vec!["www.example.com".to_string()]);

        self.certificates
            .lock()
            .unwrap()
            .insert((resource_group.to_string(), name.to_string()), stored.clone());
        Ok(stored)
    }

    async fn get(&self, resource_group: &str, name: &str) -> ArmResult<Certificate> {
        self.record(format!("certificates.get {}/{}", resource_group, name))?;
        self.certificates
            .lock()
            .unwrap()
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| http_error("GET", name, 404))
    }
}

#[async_trait]
impl WebAppsApi for FakeArm {
    async fn create_or_update_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
        binding: &HostNameBinding,
    ) -> ArmResult<HostNameBinding> {
        self.record(format!(
            "web_apps.create_or_update_host_name_binding {}/{}/{}",
            resource_group, app_service_name, hostname
        ))?;

        let mut stored = binding.clone();
        stored.id = Some(Self::binding_id(resource_group, app_service_name, hostname));
        stored.name = Some(format!("{}/{}", app_service_name, hostname));
        self.bindings.lock().unwrap().insert(
            (
                resource_group.to_string(),
                app_service_name.to_string(),
                hostname.to_string(),
            ),
            stored.clone(),
        );
        Ok(stored)
    }

    async fn get_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
    ) -> ArmResult<HostNameBinding> {
        self.record(format!(
            "web_apps.get_host_name_binding {}/{}/{}",
            resource_group, app_service_name, hostname
        ))?;

        let mut binding = self
            .bindings
            .lock()
            .unwrap()
            .get(&(
                resource_group.to_string(),
                app_service_name.to_string(),
                hostname.to_string(),
            ))
            .cloned()
            .ok_or_else(|| http_error("GET", hostname, 404))?;
        if *self.omit_binding_ids.lock().unwrap() {
            binding.id = None;
        }
        Ok(binding)
    }

    async fn delete_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
    ) -> ArmResult<()> {
        self.record(format!(
            "web_apps.delete_host_name_binding {}/{}/{}",
            resource_group, app_service_name, hostname
        ))?;

        self.bindings
            .lock()
            .unwrap()
            .remove(&(
                resource_group.to_string(),
                app_service_name.to_string(),
                hostname.to_string(),
            ))
            .map(|_| ())
            .ok_or_else(|| http_error("DELETE", hostname, 404))
    }
}
