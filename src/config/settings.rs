//! Client Settings
//!
//! Defines the configuration schema for the API client, its rate limiter and
//! the webhook verifier.

use crate::error::{Result, WacloudError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WacloudConfig {
    /// Outbound API client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Inbound webhook settings
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Configuration for the Cloud API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bearer token used for every request
    #[serde(default)]
    pub access_token: String,

    /// Sending phone number id
    #[serde(default)]
    pub phone_number_id: String,

    /// WhatsApp Business Account id (needed for phone number and template endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_account_id: Option<String>,

    /// Graph API version, e.g. `v22.0`
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Graph API host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Admission and retry policy
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,
}

fn default_api_version() -> String {
    "v22.0".to_string()
}

fn default_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            business_account_id: None,
            api_version: default_api_version(),
            base_url: default_base_url(),
            rate_limit: RateLimitPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Create a config with the given credentials and default settings
    pub fn new(access_token: impl Into<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            ..Default::default()
        }
    }

    /// Set the business account id
    pub fn with_business_account_id(mut self, id: impl Into<String>) -> Self {
        self.business_account_id = Some(id.into());
        self
    }

    /// Override the API host (useful for proxies and tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the rate limit policy
    pub fn with_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    /// Versioned API root, e.g. `https://graph.facebook.com/v22.0`
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    /// Check that the credentials and policy are usable
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(WacloudError::Config("access_token is required".to_string()));
        }
        if self.phone_number_id.is_empty() {
            return Err(WacloudError::Config(
                "phone_number_id is required".to_string(),
            ));
        }
        self.rate_limit.validate()
    }
}

/// Admission and retry policy for outbound calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitPolicy {
    /// Maximum admitted calls per rolling 60 second window
    pub max_requests_per_minute: u32,

    /// Retry calls that fail with a too-many-requests signal
    pub retry_on_too_many_requests: bool,

    /// Maximum retries per logical call
    pub max_retries: u32,

    /// Base retry delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests_per_minute: 250,
            retry_on_too_many_requests: true,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl RateLimitPolicy {
    /// Base retry delay
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// A ceiling of zero would block every call forever, so it is rejected
    pub fn validate(&self) -> Result<()> {
        if self.max_requests_per_minute == 0 {
            return Err(WacloudError::Config(
                "rate_limit.max_requests_per_minute must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for inbound webhook verification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// App secret used to check `X-Hub-Signature-256`; signature checks are skipped without it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,

    /// Token expected during the subscription handshake
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,
}

impl WebhookConfig {
    /// Create a webhook config
    pub fn new(app_secret: Option<String>, verify_token: Option<String>) -> Self {
        Self {
            app_secret,
            verify_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "client": {
                "access_token": "EAAG",
                "phone_number_id": "1234",
                "rate_limit": { "max_requests_per_minute": 80 }
            }
        }"#;

        let config: WacloudConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.client.api_version, "v22.0");
        assert_eq!(config.client.base_url, "https://graph.facebook.com");
        assert_eq!(config.client.rate_limit.max_requests_per_minute, 80);
        assert!(config.client.rate_limit.retry_on_too_many_requests);
        assert_eq!(config.client.rate_limit.max_retries, 3);
        assert_eq!(config.client.rate_limit.retry_delay_ms, 1000);
        assert!(config.webhook.app_secret.is_none());
    }

    #[test]
    fn test_api_root() {
        let config = ClientConfig::new("token", "1234").with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.api_root(), "http://127.0.0.1:9000/v22.0");
    }

    #[test]
    fn test_validate() {
        assert!(ClientConfig::new("token", "1234").validate().is_ok());
        assert!(ClientConfig::new("", "1234").validate().is_err());
        assert!(ClientConfig::new("token", "").validate().is_err());

        let zero = RateLimitPolicy {
            max_requests_per_minute: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(WacloudError::Config(_))));
    }
}
