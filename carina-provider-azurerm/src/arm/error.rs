//! Errors returned by the ARM client

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArmError {
    /// The service answered with a non-success status
    #[error("{method} {url}: HTTP {status}{}: {message}", code.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    Http {
        method: String,
        url: String,
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {url}: {detail}")]
    Decode { url: String, detail: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ArmError {
    /// Whether the remote object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::Http { status: 404, .. })
    }

    /// Build an HTTP error from a response body, extracting the ARM error envelope if present
    pub(crate) fn from_response(method: &str, url: &str, status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Option<Detail>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct LegacyEnvelope {
            code: Option<String>,
            message: Option<String>,
        }

        #[derive(Deserialize)]
        struct Detail {
            code: Option<String>,
            message: Option<String>,
        }

        let (code, message) = match serde_json::from_str::<Envelope>(body) {
            Ok(Envelope {
                error: Some(detail),
            }) => (detail.code, detail.message),
            // Microsoft.Web sometimes answers with a flat { "Code": .., "Message": .. }
            _ => match serde_json::from_str::<LegacyEnvelope>(body) {
                Ok(legacy) => (legacy.code, legacy.message),
                Err(_) => (None, None),
            },
        };

        ArmError::Http {
            method: method.to_string(),
            url: url.to_string(),
            status,
            code,
            message: message.unwrap_or_else(|| {
                if body.is_empty() {
                    "empty response body".to_string()
                } else {
                    body.to_string()
                }
            }),
        }
    }
}

pub type ArmResult<T> = Result<T, ArmError>;
