// wcpay_core/src/config.rs

use crate::error::{WcpayError, WcpayResult};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Default lifetime of an order lock. A leaked lock never outlives this.
pub const DEFAULT_ORDER_LOCK_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct WcpayConfig {
  /// Base admin URL used to link transactions and disputes from order notes.
  /// `None` renders plain `<code>` IDs instead.
  pub admin_base_url: Option<String>,
  pub order_lock_ttl: Duration,
  /// Delay between a successful payment and the scheduled fee-breakdown job.
  pub fee_breakdown_delay: Duration,
}

impl Default for WcpayConfig {
  fn default() -> Self {
    Self {
      admin_base_url: None,
      order_lock_ttl: DEFAULT_ORDER_LOCK_TTL,
      fee_breakdown_delay: Duration::ZERO,
    }
  }
}

impl WcpayConfig {
  pub fn from_env() -> WcpayResult<Self> {
    dotenv().ok(); // Load .env file if present

    let admin_base_url = env::var("WCPAY_ADMIN_URL")
      .ok()
      .map(|url| url.trim_end_matches('/').to_string())
      .filter(|url| !url.is_empty());

    let order_lock_ttl = read_secs("WCPAY_ORDER_LOCK_TTL_SECS")?.unwrap_or(DEFAULT_ORDER_LOCK_TTL);
    let fee_breakdown_delay = read_secs("WCPAY_FEE_BREAKDOWN_DELAY_SECS")?.unwrap_or(Duration::ZERO);

    if order_lock_ttl.is_zero() {
      return Err(WcpayError::Config(
        "WCPAY_ORDER_LOCK_TTL_SECS must be greater than zero".to_string(),
      ));
    }

    tracing::info!(
      links_enabled = admin_base_url.is_some(),
      order_lock_ttl_secs = order_lock_ttl.as_secs(),
      "wcpay configuration loaded."
    );

    Ok(Self {
      admin_base_url,
      order_lock_ttl,
      fee_breakdown_delay,
    })
  }

  pub fn with_admin_base_url(mut self, url: impl Into<String>) -> Self {
    self.admin_base_url = Some(url.into().trim_end_matches('/').to_string());
    self
  }
}

fn read_secs(var_name: &str) -> WcpayResult<Option<Duration>> {
  match env::var(var_name) {
    Ok(raw) => raw
      .trim()
      .parse::<u64>()
      .map(|secs| Some(Duration::from_secs(secs)))
      .map_err(|e| WcpayError::Config(format!("Invalid {}: {}", var_name, e))),
    Err(_) => Ok(None),
  }
}
