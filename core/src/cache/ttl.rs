// wcpay_core/src/cache/ttl.rs

use crate::cache::context::CacheContext;
use crate::cache::database_cache::CacheEntry;
use crate::cache::{ACCOUNT_KEY, BUSINESS_TYPES_KEY};
use std::sync::Arc;
use std::time::Duration;

pub const ACCOUNT_ADMIN_ERRORED_TTL: Duration = Duration::from_secs(2 * 60);
pub const ACCOUNT_ADMIN_TTL: Duration = Duration::from_secs(2 * 60 * 60);
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const BUSINESS_TYPES_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Extension point receiving `(computed ttl, key, entry)` and returning the TTL to use.
pub type TtlOverride = Arc<dyn Fn(Duration, &str, &CacheEntry) -> Duration + Send + Sync>;

/// Per-key, context-sensitive freshness rules.
#[derive(Clone, Default)]
pub struct TtlPolicy {
  override_fn: Option<TtlOverride>,
}

impl TtlPolicy {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_override(override_fn: TtlOverride) -> Self {
    Self {
      override_fn: Some(override_fn),
    }
  }

  pub fn ttl(&self, ctx: &CacheContext, key: &str, entry: &CacheEntry) -> Duration {
    let ttl = match key {
      ACCOUNT_KEY if ctx.is_admin() && entry.errored => ACCOUNT_ADMIN_ERRORED_TTL,
      ACCOUNT_KEY if ctx.is_admin() => ACCOUNT_ADMIN_TTL,
      ACCOUNT_KEY => DEFAULT_TTL,
      BUSINESS_TYPES_KEY => BUSINESS_TYPES_TTL,
      _ => DEFAULT_TTL,
    };
    match &self.override_fn {
      Some(override_fn) => override_fn(ttl, key, entry),
      None => ttl,
    }
  }
}

impl std::fmt::Debug for TtlPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TtlPolicy")
      .field("override_present", &self.override_fn.is_some())
      .finish()
  }
}
