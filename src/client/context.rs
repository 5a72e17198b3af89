//! Per-attempt tracing context.

use std::collections::HashMap;
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";
pub const SERVICE_SOURCE_HEADER: &str = "X-Service-Source";

/// Identity of one physical attempt inside one logical call.
///
/// `correlation_id` is stable across every attempt of the call; `request_id`
/// is fresh per attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub request_id: String,
    pub service: String,
    pub method: String,
    pub endpoint: String,
    pub attempt: u32,
}

impl RequestContext {
    pub fn new(
        correlation_id: &str,
        service: &str,
        method: &str,
        endpoint: &str,
        attempt: u32,
    ) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            request_id: Uuid::new_v4().to_string(),
            service: service.to_string(),
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            attempt,
        }
    }

    /// Caller headers merged with the tracing headers. Tracing headers win on
    /// collision so callers cannot spoof correlation.
    pub fn merged_headers(
        &self,
        caller_headers: &HashMap<String, String>,
        source: &str,
    ) -> HashMap<String, String> {
        let mut headers = caller_headers.clone();
        headers.insert(CORRELATION_ID_HEADER.into(), self.correlation_id.clone());
        headers.insert(REQUEST_ID_HEADER.into(), self.request_id.clone());
        headers.insert(SERVICE_SOURCE_HEADER.into(), source.to_string());
        headers
    }
}
