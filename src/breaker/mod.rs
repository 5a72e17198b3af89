//! Circuit breaker.
//!
//! Per-service failure tracker and gatekeeper. The only durable state is the
//! failure record in the shared [`StateStore`] (`failures:{service}` and
//! `lastFailure:{service}`); the closed/open/half-open state is always
//! derived from that record plus wall-clock time, so a stale "open" flag can
//! never outlive its recovery window. Records carry a TTL as the safety net
//! for processes that crash before resetting.

mod registry;

pub use registry::BreakerRegistry;

use crate::store::StateStore;
use crate::{Error, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Derived breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    /// TTL applied to stored failure records.
    pub record_ttl: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            record_ttl: Duration::from_secs(300),
        }
    }
}

impl BreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn with_record_ttl(mut self, ttl: Duration) -> Self {
        self.record_ttl = ttl;
        self
    }
}

/// Observability snapshot of one breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub service: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub last_failure_ms: Option<u64>,
    pub recovery_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct FailureRecord {
    count: u32,
    last_failure_ms: Option<u64>,
}

/// In-process handle bound to one service name.
///
/// Cheap to clone via [`BreakerRegistry`]; all mutable state lives in the
/// shared store.
pub struct CircuitBreaker {
    service: String,
    cfg: BreakerConfig,
    store: Arc<dyn StateStore>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, cfg: BreakerConfig, store: Arc<dyn StateStore>) -> Self {
        Self {
            service: service.into(),
            cfg,
            store,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn failures_key(&self) -> String {
        format!("failures:{}", self.service)
    }

    fn last_failure_key(&self) -> String {
        format!("lastFailure:{}", self.service)
    }

    /// Reads the failure record. Store failures degrade to "no record": the
    /// breaker is an advisory load-shedding heuristic and must not fail calls
    /// on its own.
    async fn load_record(&self) -> FailureRecord {
        let count = match self.store.get(&self.failures_key()).await {
            Ok(v) => v
                .and_then(|b| String::from_utf8(b).ok())
                .and_then(|s| s.trim().parse::<u32>().ok())
                .unwrap_or(0),
            Err(e) => {
                warn!(
                    service = self.service.as_str(),
                    store = self.store.name(),
                    error = %e,
                    "failed to read breaker failure count"
                );
                0
            }
        };
        let last_failure_ms = match self.store.get(&self.last_failure_key()).await {
            Ok(v) => v
                .and_then(|b| String::from_utf8(b).ok())
                .and_then(|s| s.trim().parse::<u64>().ok()),
            Err(e) => {
                warn!(
                    service = self.service.as_str(),
                    store = self.store.name(),
                    error = %e,
                    "failed to read breaker failure timestamp"
                );
                None
            }
        };
        FailureRecord {
            count,
            last_failure_ms,
        }
    }

    fn derive_state(&self, record: FailureRecord, now_ms: u64) -> CircuitState {
        if record.count < self.cfg.failure_threshold {
            return CircuitState::Closed;
        }
        match record.last_failure_ms {
            Some(last) => {
                let elapsed = Duration::from_millis(now_ms.saturating_sub(last));
                if elapsed <= self.cfg.recovery_timeout {
                    CircuitState::Open
                } else {
                    CircuitState::HalfOpen
                }
            }
            // Count over threshold but no timestamp: the window cannot be
            // located, allow a trial.
            None => CircuitState::HalfOpen,
        }
    }

    /// Current derived state.
    pub async fn state(&self) -> CircuitState {
        self.derive_state(self.load_record().await, now_ms())
    }

    /// Runs `operation` under breaker control.
    ///
    /// The operation is the whole unit of work: exactly one success or one
    /// failure is recorded per call, however many attempts happen inside it.
    /// When the breaker is open the operation is never invoked; the fallback
    /// is returned if supplied, otherwise [`Error::CircuitOpen`]. Half-open
    /// admits a single trial; a success closes the breaker, one more failure
    /// re-opens the full recovery window (the count is deliberately not
    /// cleared before the trial).
    pub async fn execute<F, Fut, T>(&self, operation: F, fallback: Option<T>) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send,
    {
        let record = self.load_record().await;
        let state = self.derive_state(record, now_ms());

        if state == CircuitState::Open {
            debug!(
                service = self.service.as_str(),
                failure_count = record.count,
                "circuit open, refusing dispatch"
            );
            return match fallback {
                Some(value) => Ok(value),
                None => Err(Error::CircuitOpen {
                    service: self.service.clone(),
                }),
            };
        }

        match operation().await {
            Ok(value) => {
                self.on_success(record).await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure(record).await;
                match fallback {
                    Some(value) => {
                        warn!(
                            service = self.service.as_str(),
                            error = %err,
                            "operation failed, substituting fallback"
                        );
                        Ok(value)
                    }
                    None => Err(err),
                }
            }
        }
    }

    async fn on_success(&self, record: FailureRecord) {
        if record.count == 0 && record.last_failure_ms.is_none() {
            return;
        }
        if let Err(e) = self.store.delete(&self.failures_key()).await {
            warn!(service = self.service.as_str(), error = %e, "failed to clear failure count");
        }
        if let Err(e) = self.store.delete(&self.last_failure_key()).await {
            warn!(service = self.service.as_str(), error = %e, "failed to clear failure timestamp");
        }
        debug!(service = self.service.as_str(), "breaker record cleared");
    }

    async fn on_failure(&self, record: FailureRecord) {
        // Read-then-write, not CAS. Concurrent failures from different
        // processes may under-count; the breaker is advisory.
        let count = record.count.saturating_add(1);
        let now = now_ms();
        if let Err(e) = self
            .store
            .put(
                &self.failures_key(),
                count.to_string().as_bytes(),
                self.cfg.record_ttl,
            )
            .await
        {
            warn!(service = self.service.as_str(), error = %e, "failed to record breaker failure");
        }
        if let Err(e) = self
            .store
            .put(
                &self.last_failure_key(),
                now.to_string().as_bytes(),
                self.cfg.record_ttl,
            )
            .await
        {
            warn!(service = self.service.as_str(), error = %e, "failed to record failure timestamp");
        }
        if count >= self.cfg.failure_threshold {
            warn!(
                service = self.service.as_str(),
                failure_count = count,
                failure_threshold = self.cfg.failure_threshold,
                "failure threshold reached, circuit opening"
            );
        }
    }

    pub async fn status(&self) -> BreakerStatus {
        let record = self.load_record().await;
        BreakerStatus {
            service: self.service.clone(),
            state: self.derive_state(record, now_ms()),
            failure_count: record.count,
            failure_threshold: self.cfg.failure_threshold,
            last_failure_ms: record.last_failure_ms,
            recovery_timeout_ms: self.cfg.recovery_timeout.as_millis() as u64,
        }
    }

    /// Operator override: clears the stored record. Returns whether any
    /// record existed.
    pub async fn reset(&self) -> Result<bool> {
        let a = self
            .store
            .delete(&self.failures_key())
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        let b = self
            .store
            .delete(&self.last_failure_key())
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(a || b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn breaker(threshold: u32, recovery: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "billing",
            BreakerConfig::new()
                .with_failure_threshold(threshold)
                .with_recovery_timeout(recovery),
            Arc::new(MemoryStore::new()),
        )
    }

    async fn fail(cb: &CircuitBreaker) {
        let r = cb
            .execute::<_, _, ()>(
                || async { Err(Error::Store("boom".into())) },
                None,
            )
            .await;
        assert!(r.is_err());
    }

    #[tokio::test]
    async fn test_initial_state_closed() {
        let cb = breaker(3, Duration::from_secs(60));
        assert_eq!(cb.state().await, CircuitState::Closed);
        let status = cb.status().await;
        assert_eq!(status.failure_count, 0);
        assert!(status.last_failure_ms.is_none());
    }

    #[tokio::test]
    async fn test_opens_at_threshold_and_fails_fast() {
        let cb = breaker(3, Duration::from_secs(60));

        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Closed);

        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        // Operation must not run while open.
        let ran = std::sync::atomic::AtomicBool::new(false);
        let r = cb
            .execute::<_, _, u32>(
                || async {
                    ran.store(true, std::sync::atomic::Ordering::SeqCst);
                    Ok(1)
                },
                None,
            )
            .await;
        assert!(matches!(r, Err(Error::CircuitOpen { .. })));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_success_clears_record() {
        let cb = breaker(5, Duration::from_secs(60));
        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.status().await.failure_count, 2);

        let r = cb.execute(|| async { Ok(42u32) }, None).await.unwrap();
        assert_eq!(r, 42);
        let status = cb.status().await;
        assert_eq!(status.failure_count, 0);
        assert!(status.last_failure_ms.is_none());
    }

    #[tokio::test]
    async fn test_half_open_trial_success_closes() {
        let cb = breaker(2, Duration::from_millis(40));
        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        let r = cb.execute(|| async { Ok("ok") }, None).await.unwrap();
        assert_eq!(r, "ok");
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert_eq!(cb.status().await.failure_count, 0);
    }

    #[tokio::test]
    async fn test_half_open_trial_failure_reopens() {
        let cb = breaker(2, Duration::from_millis(40));
        fail(&cb).await;
        fail(&cb).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        // One more failure re-opens immediately: the count was not cleared
        // before the trial.
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert_eq!(cb.status().await.failure_count, 3);
    }

    #[tokio::test]
    async fn test_open_returns_fallback_without_error() {
        let cb = breaker(1, Duration::from_secs(60));
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        let r = cb
            .execute(|| async { Ok("live") }, Some("cached"))
            .await
            .unwrap();
        assert_eq!(r, "cached");
    }

    #[tokio::test]
    async fn test_failure_with_fallback_substitutes() {
        let cb = breaker(5, Duration::from_secs(60));
        let r = cb
            .execute(
                || async { Err(Error::Store("down".into())) },
                Some("cached"),
            )
            .await
            .unwrap();
        assert_eq!(r, "cached");
        // Failure still recorded.
        assert_eq!(cb.status().await.failure_count, 1);
    }

    #[tokio::test]
    async fn test_reset_clears_record() {
        let cb = breaker(1, Duration::from_secs(60));
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        assert!(cb.reset().await.unwrap());
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert!(!cb.reset().await.unwrap());
    }

    #[tokio::test]
    async fn test_scenario_threshold_three_recovery() {
        // threshold=3, recovery=100ms (scaled down from the 10s scenario).
        let cb = breaker(3, Duration::from_millis(100));
        fail(&cb).await;
        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        // Mid-window call with no fallback raises CircuitOpen.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let r = cb.execute(|| async { Ok(1u32) }, None).await;
        assert!(matches!(r, Err(Error::CircuitOpen { .. })));

        // Past the window the trial runs once and closes on success.
        tokio::time::sleep(Duration::from_millis(70)).await;
        let calls = std::sync::atomic::AtomicU32::new(0);
        let r = cb
            .execute(
                || async {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(1u32)
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(r, 1);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert_eq!(cb.status().await.failure_count, 0);
    }
}
