// wcpay_core/src/order/model.rs

use crate::error::{WcpayError, WcpayResult};
use crate::intent::{IntentStatus, PaymentIntent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const META_INTENT_ID: &str = "_intent_id";
pub const META_CHARGE_ID: &str = "_charge_id";
pub const META_INTENTION_STATUS: &str = "_intention_status";
pub const META_PAYMENT_METHOD_ID: &str = "_payment_method_id";
pub const META_CUSTOMER_ID: &str = "_stripe_customer_id";
pub const META_PAYMENT_CURRENCY: &str = "_wcpay_intent_currency";
pub const META_REFUND_STATUS: &str = "_wcpay_refund_status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
  Pending,
  Processing,
  OnHold,
  Completed,
  Cancelled,
  Refunded,
  Failed,
}

impl OrderStatus {
  /// Statuses WooCommerce treats as paid.
  pub const PAID: &'static [OrderStatus] = &[OrderStatus::Processing, OrderStatus::Completed];

  /// Statuses from which `payment_complete` is allowed.
  pub const PAYMENT_COMPLETE_FROM: &'static [OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::OnHold,
    OrderStatus::Failed,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::OnHold => "on-hold",
      OrderStatus::Completed => "completed",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Refunded => "refunded",
      OrderStatus::Failed => "failed",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A requested status change, validated against the order's current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
  /// Marks the order paid (moves it to `processing`) and records the transaction id.
  PaymentComplete { transaction_id: String },
  To(OrderStatus),
}

impl StatusChange {
  pub fn target(&self) -> OrderStatus {
    match self {
      StatusChange::PaymentComplete { .. } => OrderStatus::Processing,
      StatusChange::To(status) => *status,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRefund {
  pub amount: i64,
  pub reason: String,
}

/// The externally owned order entity. The core only mutates status, meta and notes and
/// persists through `OrderStore::save`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: u64,
  pub status: OrderStatus,
  /// Order total in the currency's minor unit.
  pub total: i64,
  pub currency: String,
  #[serde(default)]
  pub transaction_id: Option<String>,
  #[serde(default)]
  pub meta: BTreeMap<String, String>,
  /// Append-only.
  #[serde(default)]
  pub notes: Vec<String>,
  #[serde(default)]
  pub refunds: Vec<OrderRefund>,
  /// Keys of transitions already applied to this order, e.g. `pi_123:payment_completed`.
  #[serde(default)]
  pub processed_transitions: BTreeSet<String>,
}

impl Order {
  pub fn new(id: u64, total: i64, currency: impl Into<String>) -> Self {
    Self {
      id,
      status: OrderStatus::Pending,
      total,
      currency: currency.into(),
      transaction_id: None,
      meta: BTreeMap::new(),
      notes: Vec::new(),
      refunds: Vec::new(),
      processed_transitions: BTreeSet::new(),
    }
  }

  pub fn with_status(mut self, status: OrderStatus) -> Self {
    self.status = status;
    self
  }

  pub fn has_status(&self, statuses: &[OrderStatus]) -> bool {
    statuses.contains(&self.status)
  }

  pub fn is_paid(&self) -> bool {
    self.has_status(OrderStatus::PAID)
  }

  // --- Meta ---

  pub fn get_meta(&self, key: &str) -> Option<&str> {
    self.meta.get(key).map(String::as_str)
  }

  pub fn update_meta(&mut self, key: &str, value: impl Into<String>) {
    self.meta.insert(key.to_string(), value.into());
  }

  pub fn delete_meta(&mut self, key: &str) -> Option<String> {
    self.meta.remove(key)
  }

  pub fn intent_id(&self) -> Option<&str> {
    self.get_meta(META_INTENT_ID)
  }

  pub fn set_intent_id(&mut self, intent_id: &str) {
    self.update_meta(META_INTENT_ID, intent_id);
  }

  pub fn charge_id(&self) -> Option<&str> {
    self.get_meta(META_CHARGE_ID)
  }

  pub fn set_charge_id(&mut self, charge_id: &str) {
    self.update_meta(META_CHARGE_ID, charge_id);
  }

  /// `None` when unset or not a recognised status.
  pub fn intention_status(&self) -> Option<IntentStatus> {
    self.get_meta(META_INTENTION_STATUS).and_then(|s| s.parse().ok())
  }

  pub fn set_intention_status(&mut self, status: IntentStatus) {
    self.update_meta(META_INTENTION_STATUS, status.as_str());
  }

  pub fn payment_method_id(&self) -> Option<&str> {
    self.get_meta(META_PAYMENT_METHOD_ID)
  }

  pub fn set_payment_method_id(&mut self, payment_method_id: &str) {
    self.update_meta(META_PAYMENT_METHOD_ID, payment_method_id);
  }

  /// Copies everything the order needs to know about `intent` into meta.
  pub fn attach_intent_info(&mut self, intent: &PaymentIntent) {
    self.set_intent_id(&intent.id);
    self.set_intention_status(intent.status);
    self.update_meta(META_PAYMENT_CURRENCY, intent.currency.to_ascii_uppercase());
    if let Some(charge_id) = intent.charge_id.as_deref().filter(|c| !c.is_empty()) {
      self.set_charge_id(charge_id);
    }
    if let Some(payment_method_id) = intent.payment_method_id.as_deref() {
      self.set_payment_method_id(payment_method_id);
    }
    if let Some(customer_id) = intent.customer_id.as_deref() {
      self.update_meta(META_CUSTOMER_ID, customer_id);
    }
  }

  // --- Notes ---

  pub fn add_note(&mut self, note: impl Into<String>) {
    self.notes.push(note.into());
  }

  /// Exact content match.
  pub fn note_exists(&self, note: &str) -> bool {
    self.notes.iter().any(|n| n == note)
  }

  // --- Status and refunds ---

  /// Applies `change` if the order-store rules allow it. `refunded` is terminal, and
  /// `payment_complete` only applies to orders that still await payment.
  pub fn apply_status_change(&mut self, change: &StatusChange) -> WcpayResult<()> {
    let target = change.target();
    let allowed = match change {
      _ if self.status == OrderStatus::Refunded => target == OrderStatus::Refunded,
      StatusChange::PaymentComplete { .. } => self.has_status(OrderStatus::PAYMENT_COMPLETE_FROM),
      StatusChange::To(_) => true,
    };
    if !allowed {
      return Err(WcpayError::InvalidTransition {
        order_id: self.id,
        from: self.status.to_string(),
        to: target.to_string(),
      });
    }
    if let StatusChange::PaymentComplete { transaction_id } = change {
      if !transaction_id.is_empty() {
        self.transaction_id = Some(transaction_id.clone());
      }
    }
    self.status = target;
    Ok(())
  }

  pub fn refunded_total(&self) -> i64 {
    self.refunds.iter().map(|r| r.amount).sum()
  }

  pub fn remaining_refund_amount(&self) -> i64 {
    (self.total - self.refunded_total()).max(0)
  }
}
