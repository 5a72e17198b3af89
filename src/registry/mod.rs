//! Service directory.
//!
//! A [`ServiceDescriptor`] carries the static connection metadata for one
//! named downstream service. The [`ServiceRegistry`] trait is the lookup
//! seam; [`StaticRegistry`] is the in-memory implementation used for
//! configuration-driven deployments and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Connection metadata for a named downstream service.
///
/// Looked up once per logical call and immutable for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub base_url: String,
    /// Per-attempt timeout, not an overall deadline.
    #[serde(with = "duration_ms", rename = "request_timeout_ms")]
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub breaker_failure_threshold: u32,
}

impl ServiceDescriptor {
    /// Descriptor with default policy: 30s timeout, 3 attempts, threshold 5.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            breaker_failure_threshold: 5,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.breaker_failure_threshold = threshold.max(1);
        self
    }

    /// Validates the base URL parses; returns the descriptor unchanged.
    pub fn validate(self) -> crate::Result<Self> {
        url::Url::parse(&self.base_url)
            .map_err(|e| crate::Error::Config(format!("invalid base_url for {}: {}", self.name, e)))?;
        Ok(self)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Lookup seam for the service directory collaborator.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn lookup(&self, name: &str) -> Option<ServiceDescriptor>;
}

/// In-memory registry built from a fixed set of descriptors.
pub struct StaticRegistry {
    services: HashMap<String, ServiceDescriptor>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    pub fn with_service(mut self, descriptor: ServiceDescriptor) -> Self {
        self.services.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn lookup(&self, name: &str) -> Option<ServiceDescriptor> {
        self.services.get(name).cloned()
    }
}
