//! HTTP transport to the RapidDeploy web services

use std::time::Duration;

use async_trait::async_trait;
use rapiddeploy_api::{
    DeployError,
    DeployResult,
};
use reqwest::header::{
    AUTHORIZATION,
    CONTENT_TYPE,
};
use reqwest::Client;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
}

/// One authenticated round-trip returning the raw response body.
///
/// Implementations must not retry: the only repetition in the client is the
/// status polling loop.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self, method: HttpMethod, url: &str, auth_token: &str, body: Option<String>,
    ) -> DeployResult<String>;
}

/// `reqwest`-backed transport sharing one connection pool
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> DeployResult<Self> {
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            // Another caller may win the race; either provider is fine.
            let _ = rustls::crypto::ring::default_provider().install_default();
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| DeployError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self, method: HttpMethod, url: &str, auth_token: &str, body: Option<String>,
    ) -> DeployResult<String> {
        tracing::debug!(?method, url, "calling RapidDeploy server");

        let request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Put => self.client.put(url),
        }
        .header(AUTHORIZATION, auth_token);

        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/xml")
                .body(body),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| DeployError::Network(format!("Failed to call {url}: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| DeployError::Network(format!("Failed to read response from {url}: {e}")))?;

        classify_response(status, url, text)
    }
}

/// Only 4xx is a failure. Other codes, 5xx included, hand the body back.
pub(crate) fn classify_response(status: u16, url: &str, body: String) -> DeployResult<String> {
    if (400..500).contains(&status) {
        tracing::warn!(status, url, "RapidDeploy server rejected the request");
        return Err(DeployError::RemoteCall {
            status,
            url: url.to_string(),
            body,
        });
    }
    Ok(body)
}
