//! Bearer tokens for Azure Resource Manager

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use super::error::{ArmError, ArmResult};
use super::stop::StopContext;

/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Where bearer tokens come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A pre-issued token (e.g., from `az account get-access-token`)
    AccessToken(String),
    /// OAuth2 client-credentials grant for a service principal
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Issues and caches bearer tokens
#[derive(Debug)]
pub struct TokenSource {
    credentials: Credentials,
    authority: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(credentials: Credentials, authority: &str, resource_manager: &str) -> Self {
        Self {
            credentials,
            authority: authority.trim_end_matches('/').to_string(),
            scope: format!("{}/.default", resource_manager.trim_end_matches('/')),
            cached: Mutex::new(None),
        }
    }

    /// Endpoint of the client-credentials grant
    pub fn token_url(&self) -> Option<String> {
        match &self.credentials {
            Credentials::AccessToken(_) => None,
            Credentials::ClientSecret { tenant_id, .. } => Some(format!(
                "{}/{}/oauth2/v2.0/token",
                self.authority, tenant_id
            )),
        }
    }

    pub async fn token(&self, http: &reqwest::Client, stop: &StopContext) -> ArmResult<String> {
        let (client_id, client_secret) = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ClientSecret {
                client_id,
                client_secret,
                ..
            } => (client_id, client_secret),
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now() + EXPIRY_MARGIN
        {
            return Ok(token.value.clone());
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let url = self.token_url().unwrap_or_default();
        log::debug!("Requesting ARM token from {}", url);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let issued_at = Instant::now();
        let response = stop
            .run(async {
                http.post(&url)
                    .form(&form)
                    .send()
                    .await
                    .map_err(|e| ArmError::Auth(format!("token request failed: {}", e)))
            })
            .await?;

        let status = response.status();
        let body = stop
            .run(async {
                response
                    .text()
                    .await
                    .map_err(|e| ArmError::Auth(format!("token response unreadable: {}", e)))
            })
            .await?;

        if !status.is_success() {
            return Err(ArmError::Auth(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let TokenResponse {
            access_token,
            expires_in,
        } = serde_json::from_str(&body)
            .map_err(|e| ArmError::Auth(format!("malformed token response: {}", e)))?;

        *cached = Some(CachedToken {
            value: access_token.clone(),
            expires_at: issued_at + Duration::from_secs(expires_in),
        });

        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned_without_a_request() {
        let source = TokenSource::new(
            Credentials::AccessToken("tok".to_string()),
            "https://login.microsoftonline.com",
            "https://management.azure.com/",
        );
        let http = reqwest::Client::new();
        let token = source
            .token(&http, &StopContext::background())
            .await
            .unwrap();
        assert_eq!(token, "tok");
        assert!(source.token_url().is_none());
    }

    #[test]
    fn client_secret_token_url_and_scope() {
        let source = TokenSource::new(
            Credentials::ClientSecret {
                tenant_id: "tenant".to_string(),
                client_id: "app".to_string(),
                client_secret: "secret".to_string(),
            },
            "https://login.microsoftonline.com/",
            "https://management.azure.com/",
        );
        assert_eq!(
            source.token_url().as_deref(),
            Some("https://login.microsoftonline.com/tenant/oauth2/v2.0/token")
        );
        assert_eq!(source.scope, "https://management.azure.com/.default");
    }
}
