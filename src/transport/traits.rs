//! Transport trait abstraction for pluggable radio and HTTP backends

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracker_shared::NetworkCredential;

/// A radio that can join one network at a time
#[async_trait]
pub trait WifiRadio: Send + Sync {
    /// Join `credential`, waiting at most `deadline` for the link to come up.
    ///
    /// Returns an error if the join was refused or the deadline passed.
    async fn join(&self, credential: &NetworkCredential, deadline: Duration) -> Result<()>;

    /// Whether the radio currently has a usable link
    async fn is_connected(&self) -> bool;

    /// Human-readable name for this radio
    fn name(&self) -> &'static str;
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal GET-only HTTP client
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET with the given query parameters appended to `url`
    async fn get(&self, url: &str, query: &[(&'static str, String)]) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let response = |status| HttpResponse {
            status,
            body: Bytes::new(),
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(199).is_success());
        assert!(!response(301).is_success());
        assert!(!response(500).is_success());
    }
}
