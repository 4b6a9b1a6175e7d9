// wcpay_core/src/cache/database_cache.rs

use crate::cache::context::CacheContext;
use crate::cache::ttl::TtlPolicy;
use crate::clock::{offset_secs, Clock};
use crate::store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{event, instrument, Level};

/// A well-formed cache wrapper as persisted in the option store.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  /// Last known good payload; `null` only if no fetch ever succeeded.
  pub data: Value,
  pub fetched: i64,
  pub errored: bool,
}

impl CacheEntry {
  /// Returns `None` for anything that is not a complete `{data, fetched, errored}` object
  /// (legacy formats, partial writes, empty values).
  pub fn parse(raw: &Value) -> Option<Self> {
    let obj = raw.as_object()?;
    let data = obj.get("data")?.clone();
    let fetched = obj.get("fetched")?.as_i64()?;
    let errored = obj.get("errored")?.as_bool()?;
    Some(Self { data, fetched, errored })
  }

  pub fn to_value(&self) -> Value {
    json!({
      "data": self.data,
      "fetched": self.fetched,
      "errored": self.errored,
    })
  }

  /// The payload as `T`, if present and of the right shape.
  pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
    if self.data.is_null() {
      return None;
    }
    serde_json::from_value(self.data.clone()).ok()
  }
}

/// Result of `get_or_add`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup<T> {
  /// Fresh data, the retained last-good value, or `None` when nothing valid exists.
  pub data: Option<T>,
  /// `true` only when the generator ran and succeeded.
  pub refreshed: bool,
}

pub struct DatabaseCache {
  store: Arc<dyn KeyValueStore>,
  clock: Arc<dyn Clock>,
  ttl_policy: TtlPolicy,
}

impl DatabaseCache {
  pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
    Self::with_ttl_policy(store, clock, TtlPolicy::new())
  }

  pub fn with_ttl_policy(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl_policy: TtlPolicy) -> Self {
    Self {
      store,
      clock,
      ttl_policy,
    }
  }

  /// Returns the cached value for `key`, refreshing it through `generator` when the entry
  /// is missing, malformed, invalid or expired (see `should_refresh_cache`).
  ///
  /// A generator error or `Ok(None)` counts as a failed refresh: the previous valid value is
  /// kept, written back with `errored = true`, and returned with `refreshed = false`.
  #[instrument(name = "DatabaseCache::get_or_add", skip_all, fields(key = %key, force_refresh = force_refresh))]
  pub async fn get_or_add<T, G, Fut, V>(
    &self,
    ctx: &CacheContext,
    key: &str,
    generator: G,
    validator: V,
    force_refresh: bool,
  ) -> CacheLookup<T>
  where
    T: Serialize + DeserializeOwned,
    G: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<Option<T>>>,
    V: Fn(&T) -> bool,
  {
    let raw = self.read_raw(key).await;

    let old_data: Option<T> = raw
      .as_ref()
      .and_then(CacheEntry::parse)
      .and_then(|entry| entry.data_as::<T>())
      .filter(|data| validator(data));

    if !self.should_refresh_cache::<T, V>(ctx, key, raw.as_ref(), &validator, force_refresh) {
      return CacheLookup {
        data: old_data,
        refreshed: false,
      };
    }

    let fresh = match generator().await {
      Ok(Some(data)) => Some(data),
      Ok(None) => {
        event!(Level::WARN, "Cache generator returned no data.");
        None
      }
      Err(e) => {
        event!(Level::WARN, error = %e, "Cache generator failed.");
        None
      }
    };

    let (data, errored) = match fresh {
      Some(data) => (Some(data), false),
      None => (old_data, true),
    };

    self.write_to_cache(key, data.as_ref(), errored).await;

    CacheLookup {
      data,
      refreshed: !errored,
    }
  }

  /// Decides whether `get_or_add` should call its generator for the raw stored value `raw`.
  ///
  /// Order matters: a disabled context never refreshes, even when forced; `force_refresh`
  /// overrides everything else; passive contexts (AJAX, background jobs) only read.
  pub fn should_refresh_cache<T, V>(
    &self,
    ctx: &CacheContext,
    key: &str,
    raw: Option<&Value>,
    validator: &V,
    force_refresh: bool,
  ) -> bool
  where
    T: DeserializeOwned,
    V: Fn(&T) -> bool,
  {
    if ctx.is_refresh_disabled() {
      return false;
    }
    if force_refresh {
      return true;
    }
    if ctx.is_passive() {
      return false;
    }
    let raw = match raw {
      Some(raw) => raw,
      None => return true,
    };
    let entry = match CacheEntry::parse(raw) {
      Some(entry) => entry,
      None => {
        event!(Level::DEBUG, %key, "Malformed cache entry, refreshing.");
        return true;
      }
    };
    if !entry.errored && !entry.data_as::<T>().map_or(false, |data| validator(&data)) {
      return true;
    }
    self.is_expired(ctx, key, &entry)
  }

  /// Cached data for `key` if present and not expired. Never refreshes.
  pub async fn get<T: DeserializeOwned>(&self, ctx: &CacheContext, key: &str) -> Option<T> {
    let entry = CacheEntry::parse(&self.read_raw(key).await?)?;
    if self.is_expired(ctx, key, &entry) {
      return None;
    }
    entry.data_as()
  }

  /// Unconditionally stores `data` as a fresh, successful entry.
  pub async fn add<T: Serialize>(&self, key: &str, data: &T) {
    self.write_to_cache(key, Some(data), false).await;
  }

  pub async fn delete(&self, key: &str) {
    if let Err(e) = self.store.delete(key).await {
      event!(Level::WARN, %key, error = %e, "Failed to delete cache entry.");
    }
  }

  pub fn get_ttl(&self, ctx: &CacheContext, key: &str, entry: &CacheEntry) -> Duration {
    self.ttl_policy.ttl(ctx, key, entry)
  }

  fn is_expired(&self, ctx: &CacheContext, key: &str, entry: &CacheEntry) -> bool {
    let ttl = self.get_ttl(ctx, key, entry);
    offset_secs(entry.fetched, ttl) < self.clock.now()
  }

  async fn read_raw(&self, key: &str) -> Option<Value> {
    match self.store.get(key).await {
      Ok(raw) => raw,
      Err(e) => {
        event!(Level::WARN, %key, error = %e, "Failed to read cache entry; treating as missing.");
        None
      }
    }
  }

  async fn write_to_cache<T: Serialize>(&self, key: &str, data: Option<&T>, errored: bool) {
    let data = match data.map(serde_json::to_value).transpose() {
      Ok(data) => data.unwrap_or(Value::Null),
      Err(e) => {
        event!(Level::WARN, %key, error = %e, "Cache data is not serializable; entry not written.");
        return;
      }
    };
    let entry = CacheEntry {
      data,
      fetched: self.clock.now(),
      errored,
    }
    .to_value();

    // Create when the option never existed, update otherwise.
    let written = match self.store.add(key, entry.clone(), None).await {
      Ok(true) => Ok(()),
      Ok(false) => self.store.set(key, entry, None).await,
      Err(e) => Err(e),
    };
    if let Err(e) = written {
      event!(Level::WARN, %key, error = %e, "Failed to write cache entry.");
    }
  }
}

impl std::fmt::Debug for DatabaseCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DatabaseCache").field("ttl_policy", &self.ttl_policy).finish()
  }
}
