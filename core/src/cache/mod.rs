// wcpay_core/src/cache/mod.rs

//! A stale-while-revalidate cache stored in the option store.
//!
//! Entries are wrapped as `{data, fetched, errored}`. A failed refresh keeps the last good
//! `data` and flags the entry `errored`, so consumers keep seeing valid (if stale) values
//! while the remote side is unavailable. Nothing in this module returns an error: generator
//! failures, store failures and corrupt entries are absorbed and logged.

pub mod context;
pub mod database_cache;
pub mod ttl;

pub use context::CacheContext;
pub use database_cache::{CacheEntry, CacheLookup, DatabaseCache};
pub use ttl::{TtlOverride, TtlPolicy};

/// Cached account data. Refreshed aggressively in admin screens.
pub const ACCOUNT_KEY: &str = "wcpay_account_data";
/// Business types rarely change: flat seven-day TTL.
pub const BUSINESS_TYPES_KEY: &str = "wcpay_business_types_data";
pub const ONBOARDING_FIELDS_DATA_KEY: &str = "wcpay_onboarding_fields_data";
pub const CURRENCIES_KEY: &str = "wcpay_multi_currency_cached_currencies";
