//! Process-local breaker handle registry.

use super::{BreakerConfig, BreakerStatus, CircuitBreaker};
use crate::store::StateStore;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Maps service name to its in-process [`CircuitBreaker`] handle.
///
/// Constructed once and injected into the client; handles are created lazily
/// on first use and live for the process lifetime. The map itself is
/// process-local; the cross-process state lives only in the store.
pub struct BreakerRegistry {
    store: Arc<dyn StateStore>,
    defaults: BreakerConfig,
    handles: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(store: Arc<dyn StateStore>, defaults: BreakerConfig) -> Self {
        Self {
            store,
            defaults,
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the handle for `service`, with the descriptor-supplied
    /// failure threshold layered over the registry defaults.
    pub fn handle(&self, service: &str, failure_threshold: u32) -> Arc<CircuitBreaker> {
        {
            let handles = self.handles.read().unwrap_or_else(|e| e.into_inner());
            if let Some(handle) = handles.get(service) {
                return Arc::clone(handle);
            }
        }
        let mut handles = self.handles.write().unwrap_or_else(|e| e.into_inner());
        // Double-checked: another caller may have created it between locks.
        if let Some(handle) = handles.get(service) {
            return Arc::clone(handle);
        }
        let cfg = self
            .defaults
            .clone()
            .with_failure_threshold(failure_threshold);
        let handle = Arc::new(CircuitBreaker::new(
            service,
            cfg,
            Arc::clone(&self.store),
        ));
        handles.insert(service.to_string(), Arc::clone(&handle));
        handle
    }

    /// Handle for `service` if this process has created one.
    pub fn existing(&self, service: &str) -> Option<Arc<CircuitBreaker>> {
        let handles = self.handles.read().unwrap_or_else(|e| e.into_inner());
        handles.get(service).cloned()
    }

    /// Statuses of every breaker this process has touched.
    pub async fn statuses(&self) -> HashMap<String, BreakerStatus> {
        let handles: Vec<Arc<CircuitBreaker>> = {
            let guard = self.handles.read().unwrap_or_else(|e| e.into_inner());
            guard.values().cloned().collect()
        };
        let mut out = HashMap::with_capacity(handles.len());
        for handle in handles {
            out.insert(handle.service().to_string(), handle.status().await);
        }
        out
    }

    /// Clears the stored record for `service`, whether or not this process
    /// holds a handle for it. Returns whether any record existed.
    pub async fn reset(&self, service: &str) -> Result<bool> {
        if let Some(handle) = self.existing(service) {
            return handle.reset().await;
        }
        let a = self
            .store
            .delete(&format!("failures:{}", service))
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        let b = self
            .store
            .delete(&format!("lastFailure:{}", service))
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(a || b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_handle_created_once_per_service() {
        let registry = BreakerRegistry::new(Arc::new(MemoryStore::new()), BreakerConfig::new());
        let a = registry.handle("billing", 3);
        let b = registry.handle("billing", 7);
        // Second threshold is ignored: the first handle wins.
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.existing("profile").is_none());
    }

    #[tokio::test]
    async fn test_reset_without_handle_clears_store() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("failures:docs", b"9", Duration::from_secs(60))
            .await
            .unwrap();
        let registry = BreakerRegistry::new(Arc::clone(&store) as Arc<dyn crate::store::StateStore>, BreakerConfig::new());

        assert!(registry.reset("docs").await.unwrap());
        assert!(!registry.reset("docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_statuses_reports_touched_services() {
        let registry = BreakerRegistry::new(Arc::new(MemoryStore::new()), BreakerConfig::new());
        registry.handle("billing", 5);
        registry.handle("profile", 2);

        let statuses = registry.statuses().await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses["profile"].failure_threshold, 2);
    }
}
