// wcpay_core/src/order/lock.rs

//! Advisory per-order lock serialising concurrent transition attempts (a checkout request,
//! a background job and a webhook delivery racing on the same order).

use crate::error::WcpayResult;
use crate::store::KeyValueStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{event, Level};

pub const LOCK_KEY_PREFIX: &str = "wcpay_processing_intent_";
/// Stored when the lock holder has no intent id.
pub const NO_INTENT_SENTINEL: &str = "-1";

#[derive(Clone)]
pub struct OrderLock {
  store: Arc<dyn KeyValueStore>,
  ttl: Duration,
}

impl OrderLock {
  pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
    Self { store, ttl }
  }

  pub fn key(order_id: u64) -> String {
    format!("{}{}", LOCK_KEY_PREFIX, order_id)
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Atomically takes the lock for `order_id`. Returns `false` if any holder (same intent
  /// or another) already has it. The lock expires on its own after the TTL.
  pub async fn lock_order_payment(&self, order_id: u64, intent_id: Option<&str>) -> WcpayResult<bool> {
    let holder = intent_id.filter(|id| !id.is_empty()).unwrap_or(NO_INTENT_SENTINEL);
    let acquired = self
      .store
      .add(&Self::key(order_id), Value::String(holder.to_string()), Some(self.ttl))
      .await?;
    event!(Level::DEBUG, order_id, %holder, acquired, "Order lock attempt.");
    Ok(acquired)
  }

  pub async fn is_order_locked(&self, order_id: u64) -> WcpayResult<bool> {
    Ok(self.lock_holder(order_id).await?.is_some())
  }

  /// The intent id (or `-1`) currently holding the lock.
  pub async fn lock_holder(&self, order_id: u64) -> WcpayResult<Option<String>> {
    Ok(self.store.get(&Self::key(order_id)).await?.map(|holder| match holder {
      Value::String(s) => s,
      other => other.to_string(),
    }))
  }

  pub async fn unlock_order_payment(&self, order_id: u64) -> WcpayResult<()> {
    self.store.delete(&Self::key(order_id)).await?;
    event!(Level::DEBUG, order_id, "Order lock released.");
    Ok(())
  }
}

impl std::fmt::Debug for OrderLock {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderLock").field("ttl", &self.ttl).finish()
  }
}
