// tests/order_lock_tests.rs
mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use wcpay::order::lock::{OrderLock, NO_INTENT_SENTINEL};
use wcpay::store::KeyValueStore;

#[tokio::test]
async fn test_lock_is_exclusive_until_released() {
  let h = Harness::new();
  let lock = h.order_service.lock();

  assert!(lock.lock_order_payment(42, Some("pi_a")).await.unwrap());
  assert!(!lock.lock_order_payment(42, Some("pi_b")).await.unwrap());
  assert!(!lock.lock_order_payment(42, Some("pi_a")).await.unwrap());
  assert_eq!(lock.lock_holder(42).await.unwrap().as_deref(), Some("pi_a"));

  // Other orders are unaffected.
  assert!(lock.lock_order_payment(43, Some("pi_b")).await.unwrap());

  lock.unlock_order_payment(42).await.unwrap();
  assert!(!lock.is_order_locked(42).await.unwrap());
  assert!(lock.lock_order_payment(42, Some("pi_b")).await.unwrap());
}

#[tokio::test]
async fn test_lock_expires_after_ttl() {
  let h = Harness::new();
  let lock = h.order_service.lock();
  assert_eq!(lock.ttl(), Duration::from_secs(300));

  assert!(lock.lock_order_payment(7, Some("pi_a")).await.unwrap());
  h.clock.advance(Duration::from_secs(299));
  assert!(lock.is_order_locked(7).await.unwrap());

  h.clock.advance(Duration::from_secs(2));
  assert!(!lock.is_order_locked(7).await.unwrap());
  assert!(lock.lock_order_payment(7, Some("pi_b")).await.unwrap());
}

#[tokio::test]
async fn test_lock_without_intent_stores_sentinel() {
  let h = Harness::new();
  let lock = h.order_service.lock();

  assert!(lock.lock_order_payment(9, None).await.unwrap());
  assert_eq!(
    h.kv.get(&OrderLock::key(9)).await.unwrap(),
    Some(json!(NO_INTENT_SENTINEL))
  );
  assert_eq!(OrderLock::key(9), "wcpay_processing_intent_9");
}
