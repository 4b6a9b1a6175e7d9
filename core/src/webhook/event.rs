// wcpay_core/src/webhook/event.rs

//! Parses a decoded webhook body into a typed event. Every property a branch needs is read
//! here, once, so a malformed payload fails before any order is touched.

use crate::error::{WcpayError, WcpayResult};
use chrono::DateTime;
use serde_json::Value;

/// Strict accessor: a missing key is an `InvalidWebhookData` error.
pub fn read_webhook_property<'a>(data: &'a Value, key: &str) -> WcpayResult<&'a Value> {
  data
    .get(key)
    .ok_or_else(|| WcpayError::invalid_webhook_data(format!("Webhook data missing required property: {}", key)))
}

fn read_str<'a>(data: &'a Value, key: &str) -> WcpayResult<&'a str> {
  read_webhook_property(data, key)?
    .as_str()
    .ok_or_else(|| WcpayError::invalid_webhook_data(format!("Webhook property is not a string: {}", key)))
}

fn read_i64(data: &Value, key: &str) -> WcpayResult<i64> {
  read_webhook_property(data, key)?
    .as_i64()
    .ok_or_else(|| WcpayError::invalid_webhook_data(format!("Webhook property is not an integer: {}", key)))
}

/// Optional string property; absent, null and non-string values read as `None`.
fn opt_str<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
  data.get(key).and_then(Value::as_str)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceEventKind {
  Upcoming,
  Paid,
  PaymentFailed,
}

impl InvoiceEventKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      InvoiceEventKind::Upcoming => "invoice.upcoming",
      InvoiceEventKind::Paid => "invoice.paid",
      InvoiceEventKind::PaymentFailed => "invoice.payment_failed",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeUpdateKind {
  FundsWithdrawn,
  FundsReinstated,
  Updated,
}

impl DisputeUpdateKind {
  /// First sentence of the dispute-updated note.
  pub fn message(&self) -> &'static str {
    match self {
      DisputeUpdateKind::FundsWithdrawn => "Payment dispute and fees have been deducted from your next deposit",
      DisputeUpdateKind::FundsReinstated => "Payment dispute funds have been reinstated",
      DisputeUpdateKind::Updated => "Payment dispute information has been updated",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundUpdated {
  pub refund_id: String,
  pub status: String,
  pub charge_id: String,
  pub amount: i64,
  pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeExpired {
  pub charge_id: String,
  pub intent_id: String,
}

/// A `payment_intent.*` event. `object` is kept for order resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntentEvent {
  pub intent_id: String,
  pub status: String,
  pub charge_id: String,
  pub payment_method_id: Option<String>,
  pub last_payment_error: Option<PaymentError>,
  pub object: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentError {
  pub code: Option<String>,
  pub decline_code: Option<String>,
  pub message: Option<String>,
  pub payment_method_id: Option<String>,
  pub payment_method_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisputeCreated {
  pub dispute_id: String,
  pub charge_id: String,
  pub amount: i64,
  pub currency: String,
  pub reason: String,
  /// Evidence due date, already formatted for the note.
  pub due_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisputeClosed {
  pub dispute_id: String,
  pub charge_id: String,
  pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisputeUpdated {
  pub kind: DisputeUpdateKind,
  pub dispute_id: String,
  pub charge_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
  RefundUpdated(RefundUpdated),
  ChargeExpired(ChargeExpired),
  AccountUpdated,
  Notification { note: Value },
  PaymentIntentFailed(PaymentIntentEvent),
  PaymentIntentSucceeded(PaymentIntentEvent),
  Invoice { kind: InvoiceEventKind, object: Value },
  DisputeCreated(DisputeCreated),
  DisputeClosed(DisputeClosed),
  DisputeUpdated(DisputeUpdated),
  /// Types this core does not handle; ignored without error.
  Unknown(String),
}

impl WebhookEvent {
  /// Validates `body` (`{"type": ..., "data": {"object": {...}}}`) and builds the event.
  pub fn from_body(body: &Value) -> WcpayResult<Self> {
    let event_type = read_str(body, "type")?;
    let data = read_webhook_property(body, "data")?;

    let event = match event_type {
      "charge.refund.updated" => {
        let object = read_webhook_property(data, "object")?;
        WebhookEvent::RefundUpdated(RefundUpdated {
          refund_id: read_str(object, "id")?.to_string(),
          status: read_str(object, "status")?.to_string(),
          charge_id: read_str(object, "charge")?.to_string(),
          amount: read_i64(object, "amount")?,
          currency: read_str(object, "currency")?.to_string(),
        })
      }
      "charge.expired" => {
        let object = read_webhook_property(data, "object")?;
        WebhookEvent::ChargeExpired(ChargeExpired {
          charge_id: read_str(object, "id")?.to_string(),
          intent_id: read_str(object, "payment_intent")?.to_string(),
        })
      }
      "account.updated" => WebhookEvent::AccountUpdated,
      "wcpay.notification" => WebhookEvent::Notification {
        note: read_webhook_property(data, "note")?.clone(),
      },
      "payment_intent.payment_failed" => {
        WebhookEvent::PaymentIntentFailed(PaymentIntentEvent::from_object(read_webhook_property(data, "object")?)?)
      }
      "payment_intent.succeeded" => {
        WebhookEvent::PaymentIntentSucceeded(PaymentIntentEvent::from_object(read_webhook_property(data, "object")?)?)
      }
      "invoice.upcoming" | "invoice.paid" | "invoice.payment_failed" => {
        let kind = match event_type {
          "invoice.upcoming" => InvoiceEventKind::Upcoming,
          "invoice.paid" => InvoiceEventKind::Paid,
          _ => InvoiceEventKind::PaymentFailed,
        };
        WebhookEvent::Invoice {
          kind,
          object: read_webhook_property(data, "object")?.clone(),
        }
      }
      "charge.dispute.created" => {
        let object = read_webhook_property(data, "object")?;
        let due_by = object
          .get("evidence_details")
          .and_then(|details| details.get("due_by"))
          .and_then(Value::as_i64)
          .and_then(format_due_by);
        WebhookEvent::DisputeCreated(DisputeCreated {
          dispute_id: read_str(object, "id")?.to_string(),
          charge_id: read_str(object, "charge")?.to_string(),
          amount: read_i64(object, "amount")?,
          currency: read_str(object, "currency")?.to_string(),
          reason: read_str(object, "reason")?.to_string(),
          due_by,
        })
      }
      "charge.dispute.closed" => {
        let object = read_webhook_property(data, "object")?;
        WebhookEvent::DisputeClosed(DisputeClosed {
          dispute_id: read_str(object, "id")?.to_string(),
          charge_id: read_str(object, "charge")?.to_string(),
          status: read_str(object, "status")?.to_string(),
        })
      }
      "charge.dispute.funds_withdrawn" | "charge.dispute.funds_reinstated" | "charge.dispute.updated" => {
        let kind = match event_type {
          "charge.dispute.funds_withdrawn" => DisputeUpdateKind::FundsWithdrawn,
          "charge.dispute.funds_reinstated" => DisputeUpdateKind::FundsReinstated,
          _ => DisputeUpdateKind::Updated,
        };
        let object = read_webhook_property(data, "object")?;
        WebhookEvent::DisputeUpdated(DisputeUpdated {
          kind,
          dispute_id: read_str(object, "id")?.to_string(),
          charge_id: read_str(object, "charge")?.to_string(),
        })
      }
      other => WebhookEvent::Unknown(other.to_string()),
    };
    Ok(event)
  }
}

impl PaymentIntentEvent {
  /// Builds the event from a `payment_intent` object.
  pub fn from_object(object: &Value) -> WcpayResult<Self> {
    let last_payment_error = object
      .get("last_payment_error")
      .filter(|error| error.is_object())
      .map(|error| {
        let payment_method = error.get("payment_method");
        PaymentError {
          code: opt_str(error, "code").map(str::to_string),
          decline_code: opt_str(error, "decline_code").map(str::to_string),
          message: opt_str(error, "message").map(str::to_string),
          payment_method_id: payment_method.and_then(|pm| opt_str(pm, "id")).map(str::to_string),
          payment_method_type: payment_method.and_then(|pm| opt_str(pm, "type")).map(str::to_string),
        }
      });

    Ok(PaymentIntentEvent {
      intent_id: read_str(object, "id")?.to_string(),
      status: read_str(object, "status")?.to_string(),
      charge_id: event_charge_id(object).unwrap_or_default().to_string(),
      payment_method_id: opt_str(object, "payment_method").map(str::to_string),
      last_payment_error,
      object: object.clone(),
    })
  }
}

/// `latest_charge`, or the first entry of the legacy `charges.data` list.
fn event_charge_id(object: &Value) -> Option<&str> {
  opt_str(object, "latest_charge").or_else(|| {
    object
      .get("charges")
      .and_then(|charges| charges.get("data"))
      .and_then(Value::as_array)
      .and_then(|charges| charges.first())
      .and_then(|charge| opt_str(charge, "id"))
  })
}

fn format_due_by(timestamp: i64) -> Option<String> {
  DateTime::from_timestamp(timestamp, 0).map(|due_by| due_by.format("%b %-d, %Y %-I:%M %p").to_string())
}
