// wcpay_core/src/cache/context.rs

use std::sync::atomic::{AtomicBool, Ordering};

/// Execution context threaded into every cache call. Replaces ambient request detection:
/// callers state whether they run in an admin screen, an AJAX request or a background job.
#[derive(Debug, Default)]
pub struct CacheContext {
  is_admin: bool,
  is_ajax: bool,
  in_background_job: bool,
  refresh_disabled: AtomicBool,
}

impl CacheContext {
  /// A regular storefront request.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn admin() -> Self {
    Self {
      is_admin: true,
      ..Self::default()
    }
  }

  pub fn ajax() -> Self {
    Self {
      is_ajax: true,
      ..Self::default()
    }
  }

  pub fn background_job() -> Self {
    Self {
      in_background_job: true,
      ..Self::default()
    }
  }

  pub fn is_admin(&self) -> bool {
    self.is_admin
  }

  /// Makes every later cache call in this context read-only. Can only be switched on once;
  /// returns `false` if refresh was already disabled.
  pub fn disable_refresh(&self) -> bool {
    let newly_disabled = !self.refresh_disabled.swap(true, Ordering::SeqCst);
    if newly_disabled {
      tracing::debug!("Cache refresh disabled for the rest of this execution context.");
    }
    newly_disabled
  }

  pub fn is_refresh_disabled(&self) -> bool {
    self.refresh_disabled.load(Ordering::SeqCst)
  }

  /// AJAX requests and background jobs only read the cache; they never refresh it on their own.
  pub fn is_passive(&self) -> bool {
    self.is_ajax || self.in_background_job
  }
}
