// wcpay_core/src/store/memory.rs

use crate::clock::{offset_secs, Clock};
use crate::error::WcpayResult;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredEntry {
  value: Value,
  expires_at: Option<i64>,
}

/// Process-local `KeyValueStore`. Expiry is evaluated lazily against the injected clock.
pub struct InMemoryKeyValueStore {
  entries: Mutex<HashMap<String, StoredEntry>>,
  clock: Arc<dyn Clock>,
}

impl InMemoryKeyValueStore {
  pub fn new(clock: Arc<dyn Clock>) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      clock,
    }
  }

  fn expiry(&self, ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| offset_secs(self.clock.now(), ttl))
  }

  fn is_live(entry: &StoredEntry, now: i64) -> bool {
    entry.expires_at.map_or(true, |expires_at| expires_at > now)
  }

  /// Writes a raw value without going through the trait; lets tests seed legacy or corrupt data.
  pub fn insert_raw(&self, key: &str, value: Value) {
    self.entries.lock().insert(
      key.to_string(),
      StoredEntry {
        value,
        expires_at: None,
      },
    );
  }

  pub fn len(&self) -> usize {
    let now = self.clock.now();
    self.entries.lock().values().filter(|e| Self::is_live(e, now)).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
  async fn get(&self, key: &str) -> WcpayResult<Option<Value>> {
    let now = self.clock.now();
    let mut entries = self.entries.lock();
    match entries.get(key) {
      Some(entry) if Self::is_live(entry, now) => Ok(Some(entry.value.clone())),
      Some(_) => {
        entries.remove(key);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> WcpayResult<()> {
    let expires_at = self.expiry(ttl);
    self
      .entries
      .lock()
      .insert(key.to_string(), StoredEntry { value, expires_at });
    Ok(())
  }

  async fn add(&self, key: &str, value: Value, ttl: Option<Duration>) -> WcpayResult<bool> {
    let now = self.clock.now();
    let expires_at = self.expiry(ttl);
    // Check and insert happen under one guard.
    let mut entries = self.entries.lock();
    if entries.get(key).map_or(false, |e| Self::is_live(e, now)) {
      return Ok(false);
    }
    entries.insert(key.to_string(), StoredEntry { value, expires_at });
    Ok(true)
  }

  async fn delete(&self, key: &str) -> WcpayResult<bool> {
    let now = self.clock.now();
    Ok(
      self
        .entries
        .lock()
        .remove(key)
        .map_or(false, |e| Self::is_live(&e, now)),
    )
  }
}
