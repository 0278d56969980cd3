//! HTTP Client
//!
//! Async transport for the Graph API. Every non-2xx response is turned into a
//! structured [`WacloudError`], with provider errors enriched by
//! [`diagnostics`](crate::client::diagnostics).

use crate::client::diagnostics;
use crate::client::rate_limiter::parse_retry_after;
use crate::error::{ProviderError, Result, WacloudError};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Error body shape returned by the Graph API
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderError,
}

/// HTTP client bound to one versioned API root and access token
pub struct HttpClient {
    /// Inner reqwest client
    client: Client,

    /// Versioned API root, e.g. `https://graph.facebook.com/v22.0`
    api_root: String,

    /// Bearer token, replaceable at runtime
    access_token: RwLock<String>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(api_root: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| WacloudError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            access_token: RwLock::new(access_token.into()),
        })
    }

    /// Get the API root this client targets
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Replace the bearer token used by subsequent requests
    pub fn set_access_token(&self, access_token: impl Into<String>) {
        *self.access_token.write() = access_token.into();
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token.read()))
                .map_err(|e| WacloudError::Config(format!("Invalid access token format: {}", e)))?,
        );
        Ok(headers)
    }

    /// GET `path` with query parameters
    pub async fn get<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let request = self
            .client
            .get(self.url(path))
            .headers(self.auth_headers()?)
            .query(query);
        self.send(request).await
    }

    /// POST a JSON body to `path`
    pub async fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.url(path))
            .headers(self.auth_headers()?)
            .json(body);
        self.send(request).await
    }

    /// POST a multipart form to `path`
    pub async fn post_multipart<R>(&self, path: &str, form: Form) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.url(path))
            .headers(self.auth_headers()?)
            .multipart(form);
        self.send(request).await
    }

    /// DELETE `path` with query parameters
    pub async fn delete<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let request = self
            .client
            .delete(self.url(path))
            .headers(self.auth_headers()?)
            .query(query);
        self.send(request).await
    }

    async fn send<R>(&self, request: RequestBuilder) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Graph API response");

        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            WacloudError::Response(format!(
                "Failed to parse response: {}. Body: {}",
                e,
                truncate(&body, 500)
            ))
        })
    }
}

/// Build the error for a non-2xx response
async fn error_from_response(response: Response) -> WacloudError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after);

    let body = response.text().await.unwrap_or_default();
    classify_failure(status, &body, retry_after)
}

/// Turn a failed status and body into a provider error when the body carries
/// one, otherwise into a plain HTTP error
fn classify_failure(status: u16, body: &str, retry_after: Option<Duration>) -> WacloudError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => WacloudError::Provider {
            status,
            error: diagnostics::enrich(&envelope.error),
            retry_after,
        },
        Err(_) => WacloudError::Http {
            status,
            body: truncate(body, 500).to_string(),
            retry_after,
        },
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
