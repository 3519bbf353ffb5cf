/*
[INPUT]:  HTTP configuration (base URL, timeouts)
[OUTPUT]: Configured reqwest client with a session cookie store
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::http::{Result, WalletError};
use crate::types::ErrorBody;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP client for the Littlefish API.
///
/// Holds the login session cookie, so one client corresponds to one browser
/// session.
#[derive(Debug, Clone)]
pub struct LittlefishClient {
    http_client: Client,
    base_url: Url,
}

impl LittlefishClient {
    /// Create a new client with default configuration
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::default(), base_url)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build request builder for a fixed endpoint
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Build request builder for `prefix/<segment>`, percent-encoding the segment
    pub(crate) fn request_with_segment(
        &self,
        method: Method,
        prefix: &str,
        segment: &str,
    ) -> Result<RequestBuilder> {
        let mut url = self.base_url.join(prefix)?;
        url.path_segments_mut()
            .map_err(|_| WalletError::Config(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push(segment);
        Ok(self.http_client.request(method, url))
    }

    /// Send a request and decode a successful JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        parse_response(response).await
    }
}

/// Decode a JSON body, mapping Littlefish error bodies onto `WalletError`
pub(crate) async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
    Err(error_from_body(status, body, text))
}

fn error_from_body(status: StatusCode, body: Option<ErrorBody>, raw: String) -> WalletError {
    let (message, code, errors) = match body {
        Some(body) => (body.message, body.code, body.errors),
        None => (raw, None, Vec::new()),
    };

    match (status, code.as_deref()) {
        (StatusCode::BAD_REQUEST, _) => WalletError::Validation { message, errors },
        (StatusCode::UNAUTHORIZED, Some("INVALID_SIGNATURE" | "CHALLENGE_REJECTED")) => {
            WalletError::InvalidSignature(message)
        }
        (StatusCode::UNAUTHORIZED, _) => WalletError::Unauthorized,
        (StatusCode::NOT_FOUND, _) => WalletError::NotFound(message),
        (_, Some("SERVICE_MISCONFIGURED")) => WalletError::ServiceMisconfigured(message),
        (_, Some("INDEXER_UNAVAILABLE")) => WalletError::IndexerUnavailable(message),
        _ => WalletError::api_error(status, message),
    }
}
