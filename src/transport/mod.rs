//! Transport boundary.
//!
//! One physical HTTP attempt: method, absolute URL, headers, optional JSON
//! body, per-attempt timeout. The retry loop above this layer decides whether
//! a [`TransportError`] or a non-2xx status warrants another attempt.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of one physical attempt that produced an HTTP response.
///
/// Any status is a valid `TransportResponse`; classifying it is the caller's
/// job.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
    pub duration: Duration,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection-level failure: the attempt produced no HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport error: {0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}
