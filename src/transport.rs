//! HTTP transport boundary.
//!
//! Workers talk to the network through the [`Transport`] trait so tests can
//! substitute a mock and observe call patterns (concurrency, housekeeping)
//! without a real server. The production implementation is [`HttpTransport`]
//! over a shared `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use url::Url;

use crate::config::FetchConfig;

/// Errors from a single GET attempt.
///
/// There is no retry tier here: one request either yields a body or one of
/// these. Backoff policy belongs to callers that want it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),

    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Response body exceeded the configured size limit
    #[error("response too large")]
    ResponseTooLarge,

    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A blocking-from-the-caller's-view "execute GET, return body or error"
/// boundary, shared across workers.
///
/// `housekeep` is the connection-pool maintenance hook the worker invokes
/// before each request. It must be cheap, idempotent, and safe under
/// concurrent calls from multiple workers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError>;

    fn housekeep(&self) {}
}

/// `reqwest`-backed transport.
///
/// The client is built once and shared; its pool reaps idle connections on
/// its own (driven by `pool_idle_secs`), so [`Transport::housekeep`] keeps
/// its default no-op body.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
    max_body: usize,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_secs))
            .build()?;
        Ok(Self {
            client,
            timeout: Duration::from_secs(config.request_timeout_secs),
            max_body: config.max_response_bytes,
        })
    }
}

impl HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(TransportError::Network)?;

        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_body).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        tracing::debug!(url = %url, "starting request");

        // The timeout bounds the whole exchange, body read included: a
        // server that sends headers and then stalls mid-body must not hold
        // the caller (and its permit) forever.
        tokio::time::timeout(self.timeout, self.fetch(url))
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(TransportError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(TransportError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // A response shorter than its Content-Length means the connection was
    // interrupted mid-body.
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(TransportError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
