//! HTTP transport abstraction.

use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;

use crate::types::{ClientError, HttpRequest, HttpResponse, Result};

/// Sends a prepared request and returns whatever the server answered.
///
/// Implementations report every received response as `Ok`, whatever its
/// status; only failures to obtain a response are `Err`. Status handling
/// belongs to [`AuthenticatedClient`](crate::AuthenticatedClient).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("propfinder/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("failed to read body: {}", e)))?
            .to_vec();

        trace!("received {} from {} ({} bytes)", status, url, body.len());

        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
        })
    }
}
