// tests/webhook_processing_tests.rs
mod common;

use async_trait::async_trait;
use common::*;
use parking_lot::Mutex;
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::Arc;
use wcpay::cache::{CacheContext, ACCOUNT_KEY};
use wcpay::error::ORDER_NOT_FOUND_CODE;
use wcpay::order::model::META_REFUND_STATUS;
use wcpay::webhook::event::PaymentIntentEvent;
use wcpay::webhook::{InvoiceEventKind, SubscriptionEventHandler};
use wcpay::{IntentStatus, OrderStatus, PaymentIntent, WcpayError, WcpayResult};

fn intent_body(event_type: &str, object: Value) -> Value {
  json!({"type": event_type, "data": {"object": object}})
}

#[tokio::test]
#[serial]
async fn test_dispute_created_puts_order_on_hold() {
  let h = Harness::new();
  h.insert_order(pending_order(1, "pi_1", "ch_1").with_status(OrderStatus::Processing));

  h.webhooks
    .process(&intent_body(
      "charge.dispute.created",
      json!({
        "id": "dp_1", "charge": "ch_1", "amount": 1500, "currency": "usd",
        "reason": "product_not_received", "evidence_details": {"due_by": 1767369600}
      }),
    ))
    .await
    .unwrap();

  let stored = h.stored(1);
  assert_eq!(stored.status, OrderStatus::OnHold);
  assert_eq!(stored.notes.len(), 1);
  assert!(stored.notes[0].contains("disputed as product not received"));
  assert!(stored.notes[0].ends_with("Respond by Jan 2, 2026 4:00 PM."));
}

#[tokio::test]
#[serial]
async fn test_unknown_type_is_ignored() {
  let h = Harness::new();
  h.insert_order(pending_order(2, "pi_2", "ch_2"));

  h.webhooks
    .process(&intent_body("customer.subscription.created", json!({"id": "sub_1"})))
    .await
    .unwrap();

  assert_eq!(h.stored(2), pending_order(2, "pi_2", "ch_2"));
  assert!(h.scheduler.jobs().is_empty());
}

#[tokio::test]
#[serial]
async fn test_missing_property_is_invalid_webhook_data() {
  let h = Harness::new();

  let err = h
    .webhooks
    .process(&intent_body("charge.dispute.closed", json!({"id": "dp_1", "charge": "ch_1"})))
    .await
    .unwrap_err();

  assert!(matches!(err, WcpayError::InvalidWebhookData { .. }));
  assert_eq!(
    err.to_string(),
    "Invalid webhook data: Webhook data missing required property: status"
  );
}

#[tokio::test]
#[serial]
async fn test_unknown_charge_is_invalid_webhook_data() {
  let h = Harness::new();

  let err = h
    .webhooks
    .process(&intent_body(
      "charge.dispute.closed",
      json!({"id": "dp_1", "charge": "ch_missing", "status": "won"}),
    ))
    .await
    .unwrap_err();

  assert_eq!(
    err.to_string(),
    "Invalid webhook data: Could not find order via charge ID: ch_missing"
  );
}

#[tokio::test]
#[serial]
async fn test_intent_succeeded_completes_order_and_records_meta() {
  let h = Harness::new();
  let mut order = wcpay::Order::new(3, 1500, "USD");
  order.set_intent_id("pi_3");
  h.insert_order(order);

  h.webhooks
    .process(&intent_body(
      "payment_intent.succeeded",
      json!({"id": "pi_3", "status": "succeeded", "latest_charge": "ch_3", "payment_method": "pm_3", "metadata": {}}),
    ))
    .await
    .unwrap();

  let stored = h.stored(3);
  assert_eq!(stored.status, OrderStatus::Processing);
  assert_eq!(stored.charge_id(), Some("ch_3"));
  assert_eq!(stored.payment_method_id(), Some("pm_3"));
  assert_eq!(stored.intention_status(), Some(IntentStatus::Succeeded));
  assert_eq!(h.scheduler.jobs().len(), 1);
}

#[tokio::test]
#[serial]
async fn test_resolution_falls_back_to_metadata_order_id() {
  let h = Harness::new();
  h.insert_order(wcpay::Order::new(4, 1500, "USD"));

  h.webhooks
    .process(&intent_body(
      "payment_intent.succeeded",
      json!({"id": "pi_unknown", "status": "succeeded", "latest_charge": "ch_4", "metadata": {"order_id": "4"}}),
    ))
    .await
    .unwrap();

  assert_eq!(h.stored(4).status, OrderStatus::Processing);
}

#[tokio::test]
#[serial]
async fn test_resolution_defers_invoice_payments() {
  let h = Harness::new();
  let body = intent_body(
    "payment_intent.succeeded",
    json!({"id": "pi_sub", "status": "succeeded", "metadata": {}, "invoice": "in_1"}),
  );

  h.webhooks.process(&body).await.unwrap();

  let event = PaymentIntentEvent::from_object(&body["data"]["object"]).unwrap();
  let resolved = h.webhooks.get_order_from_event_body_intent_id(&event).await.unwrap();
  assert!(resolved.is_none());
}

#[tokio::test]
#[serial]
async fn test_explicit_order_id_is_not_deferred_to_invoice() {
  let h = Harness::new();

  let err = h
    .webhooks
    .process(&intent_body(
      "payment_intent.succeeded",
      json!({"id": "pi_inv", "status": "succeeded", "metadata": {"order_id": "999"}, "invoice": "in_1"}),
    ))
    .await
    .unwrap_err();
  assert_eq!(err.code(), Some(ORDER_NOT_FOUND_CODE));

  // An empty invoice does not count as an invoice payment.
  let body = intent_body(
    "payment_intent.succeeded",
    json!({"id": "pi_blank", "status": "succeeded", "metadata": {}, "invoice": ""}),
  );
  let err = h.webhooks.process(&body).await.unwrap_err();
  assert_eq!(err.code(), Some(ORDER_NOT_FOUND_CODE));
}

#[tokio::test]
#[serial]
async fn test_resolution_failure_is_order_not_found() {
  let h = Harness::new();

  let err = h
    .webhooks
    .process(&intent_body(
      "payment_intent.succeeded",
      json!({"id": "pi_lost", "status": "succeeded", "metadata": {"order_id": 999}}),
    ))
    .await
    .unwrap_err();

  assert_eq!(err.code(), Some(ORDER_NOT_FOUND_CODE));
  assert!(err.to_string().contains("pi_lost"));
}

#[tokio::test]
#[serial]
async fn test_resolution_requires_metadata_on_miss() {
  let h = Harness::new();

  let err = h
    .webhooks
    .process(&intent_body("payment_intent.succeeded", json!({"id": "pi_x", "status": "succeeded"})))
    .await
    .unwrap_err();

  assert!(matches!(err, WcpayError::InvalidWebhookData { .. }));
}

fn bank_debit_failure(payment_method_id: &str, method_type: &str, code: &str) -> Value {
  intent_body(
    "payment_intent.payment_failed",
    json!({
      "id": "pi_5", "status": "requires_payment_method", "latest_charge": "ch_5", "metadata": {},
      "last_payment_error": {
        "code": code, "message": "raw backend message",
        "payment_method": {"id": payment_method_id, "type": method_type}
      }
    }),
  )
}

#[tokio::test]
#[serial]
async fn test_bank_debit_failure_marks_order_failed() {
  let h = Harness::new();
  let mut order = pending_order(5, "pi_5", "ch_5");
  order.set_payment_method_id("pm_bank");
  h.insert_order(order);

  h.webhooks
    .process(&bank_debit_failure("pm_bank", "us_bank_account", "insufficient_funds"))
    .await
    .unwrap();

  let stored = h.stored(5);
  assert_eq!(stored.status, OrderStatus::Failed);
  assert!(stored.notes[0].ends_with("The customer's account has insufficient funds to cover this payment."));
}

#[tokio::test]
#[serial]
async fn test_failures_of_other_methods_are_ignored() {
  let h = Harness::new();
  let mut order = pending_order(5, "pi_5", "ch_5");
  order.set_payment_method_id("pm_bank");
  h.insert_order(order.clone());

  // Card failures are handled synchronously at checkout.
  h.webhooks
    .process(&bank_debit_failure("pm_bank", "card", "card_declined"))
    .await
    .unwrap();
  // A failure for a payment method the order no longer uses.
  h.webhooks
    .process(&bank_debit_failure("pm_old", "becs", "account_closed"))
    .await
    .unwrap();

  assert_eq!(h.stored(5), order);
}

#[tokio::test]
#[serial]
async fn test_failed_refund_adds_note_and_meta() {
  let h = Harness::new();
  h.insert_order(pending_order(6, "pi_6", "ch_6").with_status(OrderStatus::Processing));
  let body = intent_body(
    "charge.refund.updated",
    json!({"id": "re_1", "status": "failed", "charge": "ch_6", "amount": 500, "currency": "usd"}),
  );

  h.webhooks.process(&body).await.unwrap();
  h.webhooks.process(&body).await.unwrap();

  let stored = h.stored(6);
  assert_eq!(stored.get_meta(META_REFUND_STATUS), Some("failed"));
  assert_eq!(
    stored.notes,
    vec!["A refund of $5.00 was <strong>unsuccessful</strong> using WooCommerce Payments (<code>re_1</code>).".to_string()]
  );
}

#[tokio::test]
#[serial]
async fn test_succeeded_refund_needs_no_action() {
  let h = Harness::new();

  h.webhooks
    .process(&intent_body(
      "charge.refund.updated",
      json!({"id": "re_1", "status": "succeeded", "charge": "ch_none", "amount": 500, "currency": "usd"}),
    ))
    .await
    .unwrap();
}

#[tokio::test]
#[serial]
async fn test_charge_expired_cancels_order() {
  let h = Harness::new();
  h.insert_order(pending_order(7, "pi_7", "ch_7").with_status(OrderStatus::OnHold));
  h.api.set_intent(PaymentIntent::new("pi_7", IntentStatus::Canceled, 1500, "usd"));

  h.webhooks
    .process(&intent_body("charge.expired", json!({"id": "ch_7", "payment_intent": "pi_7"})))
    .await
    .unwrap();

  let stored = h.stored(7);
  assert_eq!(stored.status, OrderStatus::Cancelled);
  assert_eq!(stored.intention_status(), Some(IntentStatus::Canceled));
}

#[tokio::test]
#[serial]
async fn test_dispute_updates_add_notes() {
  let h = Harness::new();
  h.insert_order(pending_order(8, "pi_8", "ch_8").with_status(OrderStatus::OnHold));

  h.webhooks
    .process(&intent_body("charge.dispute.funds_withdrawn", json!({"id": "dp_8", "charge": "ch_8"})))
    .await
    .unwrap();
  h.webhooks
    .process(&intent_body("charge.dispute.funds_reinstated", json!({"id": "dp_8", "charge": "ch_8"})))
    .await
    .unwrap();

  assert_eq!(
    h.stored(8).notes,
    vec![
      "Payment dispute and fees have been deducted from your next deposit. See dispute overview (<code>dp_8</code>) for more details.".to_string(),
      "Payment dispute funds have been reinstated. See dispute overview (<code>dp_8</code>) for more details.".to_string(),
    ]
  );
  assert_eq!(h.stored(8).status, OrderStatus::OnHold);
}

#[tokio::test]
#[serial]
async fn test_account_updated_invalidates_cached_account() {
  let h = Harness::new();
  h.cache.add(ACCOUNT_KEY, &json!({"id": "acct_1"})).await;

  h.webhooks
    .process(&json!({"type": "account.updated", "data": {"object": {}}}))
    .await
    .unwrap();

  assert_eq!(h.cache.get::<Value>(&CacheContext::new(), ACCOUNT_KEY).await, None);
}

#[derive(Default)]
struct RecordingSubscriptions {
  seen: Mutex<Vec<InvoiceEventKind>>,
}

#[async_trait]
impl SubscriptionEventHandler for RecordingSubscriptions {
  async fn handle_invoice_event(&self, kind: InvoiceEventKind, _object: &Value) -> WcpayResult<()> {
    self.seen.lock().push(kind);
    Ok(())
  }
}

#[tokio::test]
#[serial]
async fn test_invoice_events_are_delegated() {
  let h = Harness::new();
  let subscriptions = Arc::new(RecordingSubscriptions::default());
  let webhooks = wcpay::WebhookProcessingService::new(h.order_service.clone(), h.api.clone(), h.cache.clone())
    .with_subscription_handler(subscriptions.clone());

  webhooks
    .process(&intent_body("invoice.paid", json!({"id": "in_1"})))
    .await
    .unwrap();
  webhooks
    .process(&intent_body("invoice.upcoming", json!({"id": "in_2"})))
    .await
    .unwrap();

  assert_eq!(
    *subscriptions.seen.lock(),
    vec![InvoiceEventKind::Paid, InvoiceEventKind::Upcoming]
  );
}
