//! Per-call request builder.

use super::{Response, ResilientClient};
use crate::Result;
use std::collections::HashMap;

/// Fluent builder for one logical call.
///
/// ```rust,no_run
/// # async fn demo(client: svclink::ResilientClient) -> svclink::Result<()> {
/// let resp = client
///     .call("billing", "POST", "/invoices")
///     .json(serde_json::json!({"customer": "c-42"}))
///     .header("Idempotency-Key", "inv-2024-001")
///     .fallback(svclink::Response::fallback(r#"{"queued":true}"#))
///     .send()
///     .await?;
/// # Ok(()) }
/// ```
pub struct CallBuilder<'a> {
    client: &'a ResilientClient,
    service: String,
    method: String,
    endpoint: String,
    payload: Option<serde_json::Value>,
    headers: HashMap<String, String>,
    fallback: Option<Response>,
}

impl<'a> CallBuilder<'a> {
    pub(crate) fn new(
        client: &'a ResilientClient,
        service: &str,
        method: &str,
        endpoint: &str,
    ) -> Self {
        Self {
            client,
            service: service.to_string(),
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            payload: None,
            headers: HashMap::new(),
            fallback: None,
        }
    }

    pub fn json(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn fallback(mut self, fallback: Response) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub async fn send(self) -> Result<Response> {
        self.client
            .dispatch(
                &self.service,
                &self.method,
                &self.endpoint,
                self.payload,
                self.headers,
                self.fallback,
            )
            .await
    }
}
