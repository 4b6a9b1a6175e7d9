// wcpay_core/src/store/mod.rs

//! The persistent option/transient store consumed by the cache and the order lock.

pub mod memory;

use crate::error::WcpayResult;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub use memory::InMemoryKeyValueStore;

/// Key-value storage with optional expiry. `None` TTL means the entry never expires.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Returns the live value for `key`; expired entries read as absent.
  async fn get(&self, key: &str) -> WcpayResult<Option<Value>>;

  /// Creates or replaces `key`.
  async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> WcpayResult<()>;

  /// Stores `key` only if no live entry exists. Returns whether the write happened.
  /// Implementations must make the check and the write one atomic operation.
  async fn add(&self, key: &str, value: Value, ttl: Option<Duration>) -> WcpayResult<bool>;

  /// Removes `key`. Returns whether a live entry was removed.
  async fn delete(&self, key: &str) -> WcpayResult<bool>;
}
