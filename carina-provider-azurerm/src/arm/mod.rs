//! Azure Resource Manager client for Microsoft.Web
//!
//! The traits here are the seam between the resource handlers and the
//! network: handlers only see [`CertificatesApi`] and [`WebAppsApi`].

mod auth;
mod client;
mod error;
mod models;
mod stop;

pub use auth::{Credentials, TokenSource};
pub use client::{ArmClient, CERTIFICATES_API_VERSION, WEB_APPS_API_VERSION};
pub use error::{ArmError, ArmResult};
pub use models::{
    Certificate, CertificateProperties, HostNameBinding, HostNameBindingProperties, SslState,
};
pub use stop::{StopContext, StopHandle};

use async_trait::async_trait;

/// `Microsoft.Web/certificates` operations
#[async_trait]
pub trait CertificatesApi: Send + Sync {
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        certificate: &Certificate,
    ) -> ArmResult<Certificate>;

    async fn get(&self, resource_group: &str, name: &str) -> ArmResult<Certificate>;
}

/// `Microsoft.Web/sites/hostNameBindings` operations
#[async_trait]
pub trait WebAppsApi: Send + Sync {
    async fn create_or_update_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
        binding: &HostNameBinding,
    ) -> ArmResult<HostNameBinding>;

    async fn get_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
    ) -> ArmResult<HostNameBinding>;

    async fn delete_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
    ) -> ArmResult<()>;
}
