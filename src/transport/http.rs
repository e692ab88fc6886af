//! HTTP transport backed by reqwest

use crate::transport::traits::{HttpClient, HttpResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// reqwest client wrapper implementing HttpClient
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, query: &[(&'static str, String)]) -> Result<HttpResponse> {
        let response = self
            .inner
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body of GET {url}"))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let client = ReqwestHttpClient::new(Duration::from_millis(500)).expect("client");
        // Port 9 (discard) on loopback is closed on test hosts
        let result = client.get("http://127.0.0.1:9/wifi", &[]).await;
        assert!(result.is_err());
    }
}
