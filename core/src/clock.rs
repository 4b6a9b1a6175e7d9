// wcpay_core/src/clock.rs

//! Time source shared by the order lock, the in-memory option store and the cache TTL policy.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Supplies the current time as unix seconds.
pub trait Clock: Send + Sync {
  fn now(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> i64 {
    chrono::Utc::now().timestamp()
  }
}

/// `at` plus `by`, saturating at `i64::MAX` for oversized durations.
pub fn offset_secs(at: i64, by: Duration) -> i64 {
  at.saturating_add(i64::try_from(by.as_secs()).unwrap_or(i64::MAX))
}

/// A clock that only moves when told to. Used to simulate lock expiry and cache ageing.
#[derive(Debug)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
  pub fn new(start: i64) -> Self {
    ManualClock(AtomicI64::new(start))
  }

  pub fn set(&self, now: i64) {
    self.0.store(now, Ordering::SeqCst);
  }

  pub fn advance(&self, by: Duration) {
    let _ = self
      .0
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| Some(offset_secs(now, by)));
  }
}

impl Clock for ManualClock {
  fn now(&self) -> i64 {
    self.0.load(Ordering::SeqCst)
  }
}
