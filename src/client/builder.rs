//! Client construction.

use super::{BackoffPolicy, ResilientClient};
use crate::breaker::{BreakerConfig, BreakerRegistry};
use crate::registry::ServiceRegistry;
use crate::store::{MemoryStore, StateStore};
use crate::transport::{HttpTransport, Transport};
use crate::{Error, Result};
use std::sync::Arc;

/// Builder for [`ResilientClient`].
///
/// A registry is required; everything else has working defaults: an
/// [`HttpTransport`], an in-process [`MemoryStore`], breaker defaults of
/// threshold 5 / 60s recovery, and the 1s-base exponential backoff.
pub struct ResilientClientBuilder {
    registry: Option<Arc<dyn ServiceRegistry>>,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn StateStore>>,
    source: Option<String>,
    backoff: BackoffPolicy,
    breaker_defaults: BreakerConfig,
}

impl ResilientClientBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            transport: None,
            store: None,
            source: None,
            backoff: BackoffPolicy::default(),
            breaker_defaults: BreakerConfig::default(),
        }
    }

    pub fn with_registry(mut self, registry: impl ServiceRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn with_registry_arc(mut self, registry: Arc<dyn ServiceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn with_transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn with_store_arc(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Name of this caller, sent as X-Service-Source on every attempt.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Recovery timeout and record TTL for breakers. The failure threshold
    /// here is the default; per-service descriptors override it.
    pub fn with_breaker_defaults(mut self, defaults: BreakerConfig) -> Self {
        self.breaker_defaults = defaults;
        self
    }

    pub fn build(self) -> Result<ResilientClient> {
        let registry = self
            .registry
            .ok_or_else(|| Error::Config("a service registry is required".into()))?;

        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(
                HttpTransport::new().map_err(|e| Error::Config(e.to_string()))?,
            ),
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        let source = self
            .source
            .or_else(|| std::env::var("SERVICE_NAME").ok())
            .unwrap_or_else(|| "unknown".to_string());

        let breakers = BreakerRegistry::new(store, self.breaker_defaults);

        Ok(ResilientClient::from_parts(
            registry,
            transport,
            breakers,
            source,
            self.backoff,
        ))
    }
}

impl Default for ResilientClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;

    #[test]
    fn test_registry_is_required() {
        let err = ResilientClientBuilder::new().build().err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_defaults_fill_in() {
        let client = ResilientClientBuilder::new()
            .with_registry(StaticRegistry::new())
            .with_source("web-frontend")
            .build();
        assert!(client.is_ok());
    }
}
