// wcpay_core/src/intent.rs

//! Read-only view of a remote payment intent. Its status drives order transitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
  RequiresPaymentMethod,
  RequiresConfirmation,
  RequiresAction,
  Processing,
  RequiresCapture,
  Succeeded,
  Canceled,
  /// Not a backend status: stored in `_intention_status` after a terminal failure.
  Failed,
}

impl IntentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      IntentStatus::RequiresPaymentMethod => "requires_payment_method",
      IntentStatus::RequiresConfirmation => "requires_confirmation",
      IntentStatus::RequiresAction => "requires_action",
      IntentStatus::Processing => "processing",
      IntentStatus::RequiresCapture => "requires_capture",
      IntentStatus::Succeeded => "succeeded",
      IntentStatus::Canceled => "canceled",
      IntentStatus::Failed => "failed",
    }
  }
}

impl fmt::Display for IntentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for IntentStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let status = match s {
      "requires_payment_method" => IntentStatus::RequiresPaymentMethod,
      "requires_confirmation" => IntentStatus::RequiresConfirmation,
      "requires_action" => IntentStatus::RequiresAction,
      "processing" => IntentStatus::Processing,
      "requires_capture" => IntentStatus::RequiresCapture,
      "succeeded" => IntentStatus::Succeeded,
      "canceled" => IntentStatus::Canceled,
      "failed" => IntentStatus::Failed,
      other => return Err(format!("unknown payment intent status '{}'", other)),
    };
    Ok(status)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
  pub id: String,
  pub status: IntentStatus,
  /// Amount in the currency's minor unit.
  pub amount: i64,
  pub currency: String,
  #[serde(default)]
  pub charge_id: Option<String>,
  #[serde(default)]
  pub client_secret: Option<String>,
  #[serde(default)]
  pub payment_method_id: Option<String>,
  #[serde(default)]
  pub customer_id: Option<String>,
}

impl PaymentIntent {
  pub fn new(id: impl Into<String>, status: IntentStatus, amount: i64, currency: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      status,
      amount,
      currency: currency.into(),
      charge_id: None,
      client_secret: None,
      payment_method_id: None,
      customer_id: None,
    }
  }

  pub fn with_charge(mut self, charge_id: impl Into<String>) -> Self {
    self.charge_id = Some(charge_id.into());
    self
  }

  pub fn with_payment_method(mut self, payment_method_id: impl Into<String>) -> Self {
    self.payment_method_id = Some(payment_method_id.into());
    self
  }

  pub fn charge_id_or_empty(&self) -> &str {
    self.charge_id.as_deref().unwrap_or("")
  }
}
