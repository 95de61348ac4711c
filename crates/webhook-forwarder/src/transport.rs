//! HTTP transport used by the delivery client.

use crate::error::DeliveryError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Content type of every webhook request.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A fully built webhook POST, ready to be sent any number of times.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    url: Url,
    body: Vec<u8>,
}

impl OutboundRequest {
    /// Build a POST of `body` against `endpoint`.
    ///
    /// Fails for endpoints that do not parse or are not http(s); retrying
    /// such a request can never succeed.
    pub fn post(endpoint: &str, body: Vec<u8>) -> Result<Self, DeliveryError> {
        let url = Url::parse(endpoint)
            .map_err(|e| DeliveryError::RequestConstruction(format!("{endpoint:?}: {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(DeliveryError::RequestConstruction(format!(
                    "unsupported scheme {other:?} in {endpoint:?}"
                )))
            }
        }

        Ok(Self { url, body })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }
}

/// Sends one request and reports the HTTP status code.
///
/// Implementations return `DeliveryError::Transport` when no response was
/// obtained. Status interpretation belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<u16, DeliveryError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose attempts time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<u16, DeliveryError> {
        let built = self
            .client
            .post(request.url().clone())
            .header(CONTENT_TYPE, request.content_type())
            .body(request.body().to_vec())
            .build()
            .map_err(|e| DeliveryError::RequestConstruction(e.to_string()))?;

        debug!(
            url = %request.url(),
            body_len = request.body().len(),
            "Sending webhook request"
        );

        let response = self
            .client
            .execute(built)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}
