//! # svclink
//!
//! Resilient inter-service HTTP client: a circuit breaker combined with a
//! retrying, correlation-tracked client for calls between internal services.
//! The layer survives transient failures, avoids hammering a degraded
//! downstream, and gives callers a predictable, observable failure contract.
//!
//! ## Overview
//!
//! Every outbound call resolves a [`registry::ServiceDescriptor`], runs a
//! bounded retry loop against the [`transport::Transport`], and wraps that
//! whole loop as a single unit of work under the service's circuit breaker.
//! Breaker state lives in a shared key-value store and is derived from the
//! failure record plus wall-clock time, so it is correct across processes
//! and can never get stuck open.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ResilientClient`], retry loop, backoff, call builder |
//! | [`breaker`] | Circuit breaker handles and the process-local registry |
//! | [`registry`] | Service descriptors and the directory lookup trait |
//! | [`store`] | Shared KV store trait and in-memory implementation |
//! | [`transport`] | HTTP transport trait and reqwest implementation |
//! | [`logging`] | Optional tracing subscriber setup |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use svclink::{ResilientClient, ServiceDescriptor, StaticRegistry};
//!
//! #[tokio::main]
//! async fn main() -> svclink::Result<()> {
//!     let registry = StaticRegistry::new()
//!         .with_service(ServiceDescriptor::new("billing", "http://billing.internal:8080"));
//!
//!     let client = ResilientClient::builder()
//!         .with_registry(registry)
//!         .with_source("web-frontend")
//!         .build()?;
//!
//!     let resp = client.get("billing", "/invoices/inv-42").await?;
//!     println!("{}", resp.body);
//!     Ok(())
//! }
//! ```

pub mod breaker;
pub mod client;
pub mod logging;
pub mod registry;
pub mod store;
pub mod transport;

pub mod error;
pub use error::Error;

// Re-export main types for convenience
pub use breaker::{BreakerConfig, BreakerRegistry, BreakerStatus, CircuitBreaker, CircuitState};
pub use client::{
    BackoffPolicy, CallBuilder, RequestContext, ResilientClient, ResilientClientBuilder, Response,
    CORRELATION_ID_HEADER, REQUEST_ID_HEADER, RETRYABLE_STATUSES, SERVICE_SOURCE_HEADER,
};
pub use registry::{ServiceDescriptor, ServiceRegistry, StaticRegistry};
pub use store::{MemoryStore, StateStore};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
