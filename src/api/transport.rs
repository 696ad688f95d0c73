//! HTTP transport for the twitterapi.io endpoints
//!
//! Issues exactly one GET per call with the API key attached. Retrying and
//! pacing are left to the caller.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use super::credentials::CredentialProvider;

/// Base URL of the remote API
pub const DEFAULT_BASE_URL: &str = "https://api.twitterapi.io";

/// Header carrying the API key
const API_KEY_HEADER: &str = "X-API-Key";

/// Maximum number of characters of an error body kept for diagnostics
const ERROR_BODY_LIMIT: usize = 200;

/// Errors that can occur when calling the remote API
#[derive(Debug, Error)]
pub enum TransportError {
    /// No API key could be found
    #[error("Missing API key: {0}")]
    MissingCredential(String),

    /// The server answered 429 Too Many Requests
    #[error("Rate limited by {endpoint}; wait before retrying")]
    RateLimited { endpoint: String },

    /// Any other non-success status
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response carried no data for the requested entity
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not JSON
    #[error("Failed to parse JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl TransportError {
    /// Whether a caller may reasonably back off and try again
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::RateLimited { .. })
    }
}

/// A single request/response exchange with the remote API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one GET to `endpoint` with the given query parameters and
    /// returns the parsed JSON body
    async fn call(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value, TransportError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Box<dyn CredentialProvider>,
    api_key: OnceLock<String>,
}

impl HttpTransport {
    /// Creates a transport for `base_url` with a per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        credentials: Box<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, credentials))
    }

    /// Creates a transport with a custom HTTP client
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        credentials: Box<dyn CredentialProvider>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            api_key: OnceLock::new(),
        }
    }

    /// Resolves the API key on first use and remembers it
    fn api_key(&self) -> Result<&str, TransportError> {
        if let Some(key) = self.api_key.get() {
            return Ok(key.as_str());
        }
        let key = self.credentials.api_key()?;
        Ok(self.api_key.get_or_init(|| key).as_str())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value, TransportError> {
        let api_key = self.api_key()?;
        let url = format!("{}{}", self.base_url, endpoint);

        log::debug!("GET {} {:?}", endpoint, params);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited {
                endpoint: endpoint.to_string(),
            });
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&text, ERROR_BODY_LIMIT),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Keeps at most `limit` characters of a response body
fn truncate_body(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
