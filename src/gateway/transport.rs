//! HTTP transport seam

use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use std::time::Duration;
use tracing::trace;

use crate::config::CameraConfig;
use crate::{CameraError, Result};

/// Raw reply from the camera's command endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for the camera's request/response channel.
///
/// Implementations issue one GET against the command endpoint with the given
/// path and query (`?mode=getstate`) appended, and return the status and body
/// without interpreting them.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn get(&self, path_and_query: &str) -> Result<TransportResponse>;
}

/// Default transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &CameraConfig) -> Result<Self> {
        let base_url = config.base_url();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let timeout = config.request_timeout();
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CameraError::transport_with_source(&base_url, "cannot build HTTP client", Box::new(e))
            })?;

        Ok(Self { client, base_url, timeout })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path_and_query: &str) -> Result<TransportResponse> {
        let url = format!("{}{}", self.base_url, path_and_query);
        trace!(%url, "GET");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                CameraError::Timeout { duration: self.timeout }
            } else {
                CameraError::transport_with_source(path_and_query, "request failed", Box::new(e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            CameraError::transport_with_source(path_and_query, "cannot read reply body", Box::new(e))
        })?;

        Ok(TransportResponse { status, body })
    }
}
