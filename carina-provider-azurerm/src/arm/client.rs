//! reqwest-backed implementation of the Microsoft.Web operations

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::auth::TokenSource;
use super::error::{ArmError, ArmResult};
use super::models::{Certificate, HostNameBinding};
use super::stop::StopContext;
use super::{CertificatesApi, WebAppsApi};
use crate::config::ProviderConfig;

pub const CERTIFICATES_API_VERSION: &str = "2016-03-01";
pub const WEB_APPS_API_VERSION: &str = "2016-08-01";

/// Client for the Azure Resource Manager REST API
#[derive(Debug)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: Url,
    subscription_id: String,
    tokens: TokenSource,
    stop: StopContext,
}

impl ArmClient {
    pub fn new(config: &ProviderConfig, stop: StopContext) -> ArmResult<Self> {
        let endpoints = config.environment.endpoints();
        Self::with_endpoints(
            config,
            stop,
            endpoints.resource_manager,
            endpoints.active_directory,
        )
    }

    /// Client against explicit Resource Manager and Active Directory endpoints
    pub fn with_endpoints(
        config: &ProviderConfig,
        stop: StopContext,
        resource_manager: &str,
        active_directory: &str,
    ) -> ArmResult<Self> {
        let endpoint = Url::parse(resource_manager).map_err(|e| ArmError::Decode {
            url: resource_manager.to_string(),
            detail: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("carina-provider-azurerm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ArmError::Transport {
                url: endpoint.to_string(),
                source: e,
            })?;

        Ok(Self {
            http,
            endpoint,
            subscription_id: config.subscription_id.clone(),
            tokens: TokenSource::new(config.credentials.clone(), active_directory, resource_manager),
            stop,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Build a Microsoft.Web URL under the given resource group
    pub fn web_url(&self, resource_group: &str, segments: &[&str], api_version: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend([
                "subscriptions",
                self.subscription_id.as_str(),
                "resourceGroups",
                resource_group,
                "providers",
                "Microsoft.Web",
            ]);
            path.extend(segments);
        }
        url.query_pairs_mut().append_pair("api-version", api_version);
        url
    }

    /// Send a request and return the body of a successful response
    async fn execute<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> ArmResult<String> {
        let token = self.tokens.token(&self.http, &self.stop).await?;
        log::debug!("[azurerm] {} {}", method, url);

        let mut request = self.http.request(method.clone(), url.clone()).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let url_str = url.to_string();
        let response = self
            .stop
            .run(async {
                request.send().await.map_err(|e| ArmError::Transport {
                    url: url_str.clone(),
                    source: e,
                })
            })
            .await?;

        let status = response.status().as_u16();
        let text = self
            .stop
            .run(async {
                response.text().await.map_err(|e| ArmError::Transport {
                    url: url_str.clone(),
                    source: e,
                })
            })
            .await?;
        log::debug!("[azurerm] Response Status: {}", status);

        if !(200..300).contains(&status) {
            return Err(ArmError::from_response(method.as_str(), &url_str, status, &text));
        }

        Ok(text)
    }

    fn parse_json<T: DeserializeOwned>(url: &Url, text: &str) -> ArmResult<T> {
        serde_json::from_str(text).map_err(|e| ArmError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ArmResult<T> {
        let text = self.execute::<()>(Method::GET, url.clone(), None).await?;
        Self::parse_json(&url, &text)
    }

    async fn put_json<B: Serialize + Sync, T: DeserializeOwned>(&self, url: Url, body: &B) -> ArmResult<T> {
        let text = self.execute(Method::PUT, url.clone(), Some(body)).await?;
        Self::parse_json(&url, &text)
    }
}

#[async_trait]
impl CertificatesApi for ArmClient {
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        certificate: &Certificate,
    ) -> ArmResult<Certificate> {
        let url = self.web_url(resource_group, &["certificates", name], CERTIFICATES_API_VERSION);
        self.put_json(url, certificate).await
    }

    async fn get(&self, resource_group: &str, name: &str) -> ArmResult<Certificate> {
        let url = self.web_url(resource_group, &["certificates", name], CERTIFICATES_API_VERSION);
        self.get_json(url).await
    }
}

#[async_trait]
impl WebAppsApi for ArmClient {
    async fn create_or_update_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
        binding: &HostNameBinding,
    ) -> ArmResult<HostNameBinding> {
        let url = self.web_url(
            resource_group,
            &["sites", app_service_name, "hostNameBindings", hostname],
            WEB_APPS_API_VERSION,
        );
        self.put_json(url, binding).await
    }

    async fn get_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
    ) -> ArmResult<HostNameBinding> {
        let url = self.web_url(
            resource_group,
            &["sites", app_service_name, "hostNameBindings", hostname],
            WEB_APPS_API_VERSION,
        );
        self.get_json(url).await
    }

    async fn delete_host_name_binding(
        &self,
        resource_group: &str,
        app_service_name: &str,
        hostname: &str,
    ) -> ArmResult<()> {
        let url = self.web_url(
            resource_group,
            &["sites", app_service_name, "hostNameBindings", hostname],
            WEB_APPS_API_VERSION,
        );
        // 200 and 204 both mean the binding is gone
        self.execute::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::Credentials;
    use crate::config::AzureEnvironment;

    fn client(environment: AzureEnvironment) -> ArmClient {
        let config = ProviderConfig {
            subscription_id: "sub".to_string(),
            credentials: Credentials::AccessToken("tok".to_string()),
            environment,
            request_timeout_secs: 30,
        };
        ArmClient::new(&config, StopContext::background()).unwrap()
    }

    #[test]
    fn certificate_url() {
        let url = client(AzureEnvironment::Public).web_url(
            "rg1",
            &["certificates", "cert1"],
            CERTIFICATES_API_VERSION,
        );
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Web/certificates/cert1?api-version=2016-03-01"
        );
    }

    #[test]
    fn hostname_binding_url_in_sovereign_cloud() {
        let url = client(AzureEnvironment::China).web_url(
            "rg1",
            &["sites", "svc1", "hostNameBindings", "www.example.com"],
            WEB_APPS_API_VERSION,
        );
        assert_eq!(
            url.as_str(),
            "https://management.chinacloudapi.cn/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Web/sites/svc1/hostNameBindings/www.example.com?api-version=2016-08-01"
        );
    }

    #[test]
    fn path_segments_are_escaped() {
        let url = client(AzureEnvironment::Public).web_url(
            "rg 1",
            &["certificates", "a/b"],
            CERTIFICATES_API_VERSION,
        );
        assert!(url.path().ends_with("/resourceGroups/rg%201/providers/Microsoft.Web/certificates/a%2Fb"));
    }

    #[tokio::test]
    async fn stopped_client_does_not_send() {
        let config = ProviderConfig {
            subscription_id: "sub".to_string(),
            credentials: Credentials::AccessToken("tok".to_string()),
            environment: AzureEnvironment::Public,
            request_timeout_secs: 30,
        };
        let (handle, stop) = StopContext::new();
        let client = ArmClient::new(&config, stop).unwrap();
        handle.stop();

        let err = client.get("rg1", "cert1").await.unwrap_err();
        assert!(matches!(err, ArmError::Cancelled));
    }
}
