//! Shared key-value state store.
//!
//! Circuit breaker records live in a store shared by every process talking to
//! the same downstream services. The interface is deliberately narrow (get,
//! put with TTL, delete) so any backing store, from an in-process map to a
//! networked cache, can satisfy it.

mod memory;

pub use memory::MemoryStore;

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Narrow KV abstraction backing cross-process breaker state.
///
/// Values are opaque bytes; every entry carries a TTL so crashed processes
/// cannot leave failure history behind forever.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;
    fn name(&self) -> &'static str;
}
