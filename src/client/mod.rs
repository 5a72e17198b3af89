//! Resilient inter-service client.
//!
//! One logical call = descriptor lookup, correlation headers, a bounded retry
//! loop against the transport, all wrapped as a single unit of work under the
//! service's circuit breaker. The breaker records exactly one success or
//! failure per logical call, however many physical attempts ran inside it.

mod backoff;
mod builder;
mod call;
mod context;

pub use backoff::BackoffPolicy;
pub use builder::ResilientClientBuilder;
pub use call::CallBuilder;
pub use context::{
    RequestContext, CORRELATION_ID_HEADER, REQUEST_ID_HEADER, SERVICE_SOURCE_HEADER,
};

use crate::breaker::{BreakerRegistry, BreakerStatus, CircuitState};
use crate::registry::{ServiceDescriptor, ServiceRegistry};
use crate::transport::Transport;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Statuses worth another attempt: throttling and transient server errors.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Successful (or fallback) outcome of one logical call.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub duration: Duration,
    pub correlation_id: String,
}

impl Response {
    /// Fallback value substituted when the breaker blocks or the call fails.
    pub fn fallback(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            duration: Duration::ZERO,
            correlation_id: String::new(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

pub struct ResilientClient {
    registry: Arc<dyn ServiceRegistry>,
    transport: Arc<dyn Transport>,
    breakers: BreakerRegistry,
    /// Value sent as X-Service-Source, naming this caller.
    source: String,
    backoff: BackoffPolicy,
}

fn join_url(base: &str, endpoint: &str) -> String {
    let base = base.trim_end_matches('/');
    if endpoint.starts_with('/') {
        format!("{}{}", base, endpoint)
    } else {
        format!("{}/{}", base, endpoint)
    }
}

impl ResilientClient {
    pub fn builder() -> ResilientClientBuilder {
        ResilientClientBuilder::new()
    }

    pub(crate) fn from_parts(
        registry: Arc<dyn ServiceRegistry>,
        transport: Arc<dyn Transport>,
        breakers: BreakerRegistry,
        source: String,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            registry,
            transport,
            breakers,
            source,
            backoff,
        }
    }

    /// One logical outbound call with full resilience semantics.
    pub async fn request(
        &self,
        service: &str,
        method: &str,
        endpoint: &str,
        payload: Option<serde_json::Value>,
        headers: Option<HashMap<String, String>>,
    ) -> Result<Response> {
        self.dispatch(
            service,
            method,
            endpoint,
            payload,
            headers.unwrap_or_default(),
            None,
        )
        .await
    }

    /// As [`request`](Self::request), but substituting `fallback` instead of
    /// erroring when the breaker is open or the call ultimately fails.
    pub async fn request_with_fallback(
        &self,
        service: &str,
        method: &str,
        endpoint: &str,
        payload: Option<serde_json::Value>,
        headers: Option<HashMap<String, String>>,
        fallback: Response,
    ) -> Result<Response> {
        self.dispatch(
            service,
            method,
            endpoint,
            payload,
            headers.unwrap_or_default(),
            Some(fallback),
        )
        .await
    }

    /// Per-call builder for payload, headers and fallback.
    pub fn call(&self, service: &str, method: &str, endpoint: &str) -> CallBuilder<'_> {
        CallBuilder::new(self, service, method, endpoint)
    }

    pub async fn get(&self, service: &str, endpoint: &str) -> Result<Response> {
        self.request(service, "GET", endpoint, None, None).await
    }

    pub async fn post(
        &self,
        service: &str,
        endpoint: &str,
        payload: serde_json::Value,
    ) -> Result<Response> {
        self.request(service, "POST", endpoint, Some(payload), None)
            .await
    }

    pub async fn put(
        &self,
        service: &str,
        endpoint: &str,
        payload: serde_json::Value,
    ) -> Result<Response> {
        self.request(service, "PUT", endpoint, Some(payload), None)
            .await
    }

    pub async fn delete(&self, service: &str, endpoint: &str) -> Result<Response> {
        self.request(service, "DELETE", endpoint, None, None).await
    }

    /// Breaker status for one service, if this process has called it.
    pub async fn circuit_status(&self, service: &str) -> Option<BreakerStatus> {
        match self.breakers.existing(service) {
            Some(handle) => Some(handle.status().await),
            None => None,
        }
    }

    /// Breaker statuses for every service this process has called.
    pub async fn circuit_statuses(&self) -> HashMap<String, BreakerStatus> {
        self.breakers.statuses().await
    }

    /// Operator override: clears the stored breaker record for `service`.
    pub async fn reset_circuit(&self, service: &str) -> Result<bool> {
        self.breakers.reset(service).await
    }

    pub(crate) async fn dispatch(
        &self,
        service: &str,
        method: &str,
        endpoint: &str,
        payload: Option<serde_json::Value>,
        headers: HashMap<String, String>,
        fallback: Option<Response>,
    ) -> Result<Response> {
        let correlation_id = Uuid::new_v4().to_string();

        // A missing descriptor is a caller/config error, not a downstream
        // failure: it never touches the breaker.
        let descriptor =
            self.registry
                .lookup(service)
                .await
                .ok_or_else(|| Error::UnknownService {
                    service: service.to_string(),
                })?;

        let breaker = self
            .breakers
            .handle(service, descriptor.breaker_failure_threshold);
        let url = join_url(&descriptor.base_url, endpoint);

        // Whether the refusal surfaces as CircuitOpen or a substituted
        // fallback, the logical call gets a correlation-carrying log line.
        if breaker.state().await == CircuitState::Open {
            warn!(
                service,
                method,
                endpoint,
                correlation_id = correlation_id.as_str(),
                "circuit open, refusing dispatch"
            );
        }

        breaker
            .execute(
                || {
                    self.run_attempts(
                        &descriptor,
                        method,
                        &url,
                        endpoint,
                        payload.as_ref(),
                        &headers,
                        &correlation_id,
                    )
                },
                fallback,
            )
            .await
    }

    /// The retry loop: the single unit of work the breaker observes.
    #[allow(clippy::too_many_arguments)]
    async fn run_attempts(
        &self,
        descriptor: &ServiceDescriptor,
        method: &str,
        url: &str,
        endpoint: &str,
        payload: Option<&serde_json::Value>,
        caller_headers: &HashMap<String, String>,
        correlation_id: &str,
    ) -> Result<Response> {
        let max_retries = descriptor.max_retries.max(1);
        let mut attempt = 1u32;

        loop {
            let ctx =
                RequestContext::new(correlation_id, &descriptor.name, method, endpoint, attempt);
            let attempt_headers = ctx.merged_headers(caller_headers, &self.source);

            let start = std::time::Instant::now();
            let outcome = self
                .transport
                .send(method, url, &attempt_headers, payload, descriptor.request_timeout)
                .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(resp) if resp.is_success() => {
                    info!(
                        service = descriptor.name.as_str(),
                        method,
                        endpoint,
                        attempt,
                        max_retries,
                        status = resp.status,
                        duration_ms,
                        correlation_id,
                        request_id = ctx.request_id.as_str(),
                        "request succeeded"
                    );
                    return Ok(Response {
                        status: resp.status,
                        body: resp.body,
                        duration: resp.duration,
                        correlation_id: correlation_id.to_string(),
                    });
                }
                Ok(resp) => {
                    let retryable = RETRYABLE_STATUSES.contains(&resp.status);
                    if retryable && attempt < max_retries {
                        let delay = self.backoff.delay_for(attempt);
                        warn!(
                            service = descriptor.name.as_str(),
                            method,
                            endpoint,
                            attempt,
                            max_retries,
                            status = resp.status,
                            duration_ms,
                            correlation_id,
                            delay_ms = delay.as_millis() as u64,
                            "retryable status, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    error!(
                        service = descriptor.name.as_str(),
                        method,
                        endpoint,
                        attempt,
                        max_retries,
                        status = resp.status,
                        duration_ms,
                        correlation_id,
                        "request failed"
                    );
                    return Err(Error::Http {
                        service: descriptor.name.clone(),
                        status: resp.status,
                        body: resp.body,
                    });
                }
                Err(transport_err) => {
                    if attempt < max_retries {
                        let delay = self.backoff.delay_for(attempt);
                        warn!(
                            service = descriptor.name.as_str(),
                            method,
                            endpoint,
                            attempt,
                            max_retries,
                            error = %transport_err,
                            duration_ms,
                            correlation_id,
                            delay_ms = delay.as_millis() as u64,
                            "transport failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    error!(
                        service = descriptor.name.as_str(),
                        method,
                        endpoint,
                        attempt,
                        max_retries,
                        error = %transport_err,
                        duration_ms,
                        correlation_id,
                        "transport failure, retries exhausted"
                    );
                    return Err(Error::Transport {
                        service: descriptor.name.clone(),
                        source: transport_err,
                    });
                }
            }
        }
    }
}
