// wcpay_core/src/api.rs

//! Read-only operations of the remote payments API consumed by the reconciliation core.

use crate::error::WcpayResult;
use crate::intent::PaymentIntent;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait PaymentsApiClient: Send + Sync {
  /// Timeline of events for an intent: `{"data": [{"type": "captured", ...}, ...]}`.
  async fn get_timeline(&self, intent_id: &str) -> WcpayResult<Value>;

  async fn get_intent(&self, intent_id: &str) -> WcpayResult<PaymentIntent>;
}
