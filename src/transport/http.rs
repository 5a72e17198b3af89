use super::{Transport, TransportError, TransportResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::time::{Duration, Instant};

/// reqwest-backed transport shared by all services.
///
/// Connection pooling is per-host inside the client; per-attempt timeouts
/// come from the service descriptor, so the client itself carries no global
/// timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        // Minimal production-friendly defaults (env-overridable).
        let builder = reqwest::Client::builder()
            .pool_max_idle_per_host(
                env::var("SVCLINK_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("SVCLINK_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )));

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client })
    }

    fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Http(err)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let mut req = match method.to_uppercase().as_str() {
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "DELETE" => self.client.delete(url),
            "PATCH" => self.client.patch(url),
            _ => self.client.get(url),
        };

        req = req.timeout(timeout);

        for (k, v) in headers {
            req = req.header(k, v);
        }

        if let Some(json) = body {
            req = req.json(json);
        }

        let start = Instant::now();
        let resp = req.send().await.map_err(|e| Self::classify(e, timeout))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        Ok(TransportResponse {
            status,
            body,
            duration: start.elapsed(),
        })
    }
}
