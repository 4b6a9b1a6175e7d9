// wcpay_core/src/webhook/processing.rs

use crate::api::PaymentsApiClient;
use crate::cache::{DatabaseCache, ACCOUNT_KEY};
use crate::error::{WcpayError, WcpayResult};
use crate::intent::IntentStatus;
use crate::order::model::{Order, META_REFUND_STATUS};
use crate::order::OrderService;
use crate::webhook::event::{
  read_webhook_property, ChargeExpired, DisputeClosed, DisputeCreated, DisputeUpdated, InvoiceEventKind,
  PaymentIntentEvent, RefundUpdated, WebhookEvent,
};
use crate::webhook::failure::{failure_message_from_error, is_bank_debit_method};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{event, instrument, Level};

/// Receives remote inbox notes pushed through `wcpay.notification`.
#[async_trait]
pub trait RemoteNoteService: Send + Sync {
  async fn put_note(&self, note: &Value) -> WcpayResult<()>;
}

/// Handles subscription invoice events, which never resolve orders through this service.
#[async_trait]
pub trait SubscriptionEventHandler: Send + Sync {
  async fn handle_invoice_event(&self, kind: InvoiceEventKind, object: &Value) -> WcpayResult<()>;
}

#[derive(Debug, Error)]
pub enum OrderResolutionError {
  #[error("Could not find order via intent ID: {intent_id}")]
  NotFound { intent_id: String },

  #[error(transparent)]
  Wcpay(#[from] WcpayError),
}

impl From<OrderResolutionError> for WcpayError {
  fn from(err: OrderResolutionError) -> Self {
    match err {
      OrderResolutionError::NotFound { .. } => WcpayError::order_not_found_for_payment(err.to_string()),
      OrderResolutionError::Wcpay(inner) => inner,
    }
  }
}

/// Applies webhook events from the payments backend to orders.
///
/// Stateless: every call parses the body, resolves the affected order from storage and hands
/// off to `OrderService` or writes the note directly. Unknown event types are ignored.
pub struct WebhookProcessingService {
  order_service: OrderService,
  api: Arc<dyn PaymentsApiClient>,
  cache: Arc<DatabaseCache>,
  remote_notes: Option<Arc<dyn RemoteNoteService>>,
  subscriptions: Option<Arc<dyn SubscriptionEventHandler>>,
}

impl WebhookProcessingService {
  pub fn new(order_service: OrderService, api: Arc<dyn PaymentsApiClient>, cache: Arc<DatabaseCache>) -> Self {
    Self {
      order_service,
      api,
      cache,
      remote_notes: None,
      subscriptions: None,
    }
  }

  pub fn with_remote_note_service(mut self, remote_notes: Arc<dyn RemoteNoteService>) -> Self {
    self.remote_notes = Some(remote_notes);
    self
  }

  pub fn with_subscription_handler(mut self, subscriptions: Arc<dyn SubscriptionEventHandler>) -> Self {
    self.subscriptions = Some(subscriptions);
    self
  }

  /// Processes one decoded webhook body. An error aborts this event only; the caller should
  /// still acknowledge the delivery.
  #[instrument(
    name = "WebhookProcessingService::process",
    skip_all,
    fields(event_type = body.get("type").and_then(serde_json::Value::as_str).unwrap_or_default()),
    err(Display)
  )]
  pub async fn process(&self, body: &Value) -> WcpayResult<()> {
    match WebhookEvent::from_body(body)? {
      WebhookEvent::RefundUpdated(refund) => self.process_refund_updated(refund).await,
      WebhookEvent::ChargeExpired(expired) => self.process_charge_expired(expired).await,
      WebhookEvent::AccountUpdated => {
        self.cache.delete(ACCOUNT_KEY).await;
        event!(Level::INFO, "Cached account data invalidated.");
        Ok(())
      }
      WebhookEvent::Notification { note } => match &self.remote_notes {
        Some(remote_notes) => remote_notes.put_note(&note).await,
        None => {
          event!(Level::DEBUG, "No remote note service configured.");
          Ok(())
        }
      },
      WebhookEvent::PaymentIntentFailed(intent) => self.process_payment_intent_failed(intent).await,
      WebhookEvent::PaymentIntentSucceeded(intent) => self.process_payment_intent_succeeded(intent).await,
      WebhookEvent::Invoice { kind, object } => match &self.subscriptions {
        Some(subscriptions) => subscriptions.handle_invoice_event(kind, &object).await,
        None => {
          event!(Level::DEBUG, kind = kind.as_str(), "No subscription handler configured.");
          Ok(())
        }
      },
      WebhookEvent::DisputeCreated(dispute) => self.process_dispute_created(dispute).await,
      WebhookEvent::DisputeClosed(dispute) => self.process_dispute_closed(dispute).await,
      WebhookEvent::DisputeUpdated(dispute) => self.process_dispute_updated(dispute).await,
      WebhookEvent::Unknown(event_type) => {
        event!(Level::DEBUG, %event_type, "Ignoring unhandled webhook type.");
        Ok(())
      }
    }
  }

  /// Resolves the order a `payment_intent.*` event belongs to.
  ///
  /// Looks up the intent id, then `metadata.order_id`. Payments without an order id that belong
  /// to an invoice resolve to `None`: the subscription events handle them. The order is re-read
  /// from storage before it is returned.
  pub async fn get_order_from_event_body_intent_id(
    &self,
    event: &PaymentIntentEvent,
  ) -> Result<Option<Order>, OrderResolutionError> {
    let store = self.order_service.store();
    let mut order = store.find_by_intent_id(&event.intent_id).await?;
    let mut invoice_payment = false;

    if order.is_none() {
      let metadata = read_webhook_property(&event.object, "metadata")?;
      match metadata.get("order_id").filter(|id| is_set(id)) {
        Some(order_id) => {
          if let Some(order_id) = parse_order_id(order_id) {
            order = store.get_by_id(order_id).await?;
          }
        }
        None => invoice_payment = event.object.get("invoice").map_or(false, is_set),
      }
    }

    match order {
      Some(order) => Ok(Some(store.refresh(&order).await?)),
      None if invoice_payment => {
        event!(Level::DEBUG, intent_id = %event.intent_id, "Invoice payment, leaving it to subscription events.");
        Ok(None)
      }
      None => Err(OrderResolutionError::NotFound {
        intent_id: event.intent_id.clone(),
      }),
    }
  }

  async fn order_by_charge_id(&self, charge_id: &str) -> WcpayResult<Order> {
    self
      .order_service
      .store()
      .find_by_charge_id(charge_id)
      .await?
      .ok_or_else(|| WcpayError::invalid_webhook_data(format!("Could not find order via charge ID: {}", charge_id)))
  }

  async fn process_refund_updated(&self, refund: RefundUpdated) -> WcpayResult<()> {
    if refund.status != "failed" {
      event!(Level::DEBUG, refund_id = %refund.refund_id, status = %refund.status, "Refund update needs no action.");
      return Ok(());
    }
    let mut order = self.order_by_charge_id(&refund.charge_id).await?;
    let note = self
      .order_service
      .notes()
      .refund_failed(refund.amount, &refund.currency, &refund.refund_id);
    if !order.note_exists(&note) {
      order.add_note(note);
    }
    order.update_meta(META_REFUND_STATUS, "failed");
    self.order_service.store().save(&order).await
  }

  async fn process_charge_expired(&self, expired: ChargeExpired) -> WcpayResult<()> {
    let mut order = self.order_by_charge_id(&expired.charge_id).await?;
    let intent = self.api.get_intent(&expired.intent_id).await?;
    self
      .order_service
      .mark_payment_capture_expired(&mut order, &expired.intent_id, intent.status, &expired.charge_id)
      .await?;
    Ok(())
  }

  async fn process_payment_intent_failed(&self, intent: PaymentIntentEvent) -> WcpayResult<()> {
    let error = match &intent.last_payment_error {
      Some(error) if error.payment_method_type.as_deref().map_or(false, is_bank_debit_method) => error,
      _ => {
        event!(Level::DEBUG, intent_id = %intent.intent_id, "Failure is not from a bank debit method, ignoring.");
        return Ok(());
      }
    };

    let mut order = match self.get_order_from_event_body_intent_id(&intent).await? {
      Some(order) => order,
      None => return Ok(()),
    };

    // The order may have moved on to another payment method since this attempt.
    if order.payment_method_id() != error.payment_method_id.as_deref() {
      event!(Level::INFO, order_id = order.id, "Failed payment method no longer matches the order.");
      return Ok(());
    }

    let message = failure_message_from_error(error);
    self
      .order_service
      .mark_payment_failed(&mut order, &intent.intent_id, &intent.charge_id, Some(message))
      .await?;
    Ok(())
  }

  async fn process_payment_intent_succeeded(&self, intent: PaymentIntentEvent) -> WcpayResult<()> {
    let mut order = match self.get_order_from_event_body_intent_id(&intent).await? {
      Some(order) => order,
      None => return Ok(()),
    };

    if !intent.charge_id.is_empty() {
      order.set_charge_id(&intent.charge_id);
    }
    if let Some(payment_method_id) = &intent.payment_method_id {
      order.set_payment_method_id(payment_method_id);
    }
    self.order_service.store().save(&order).await?;

    let status = intent.status.parse().unwrap_or(IntentStatus::Succeeded);
    self
      .order_service
      .mark_payment_completed(&mut order, &intent.intent_id, status, &intent.charge_id)
      .await?;
    Ok(())
  }

  async fn process_dispute_created(&self, dispute: DisputeCreated) -> WcpayResult<()> {
    let mut order = self.order_by_charge_id(&dispute.charge_id).await?;
    self
      .order_service
      .mark_payment_dispute_created(
        &mut order,
        &dispute.dispute_id,
        dispute.amount,
        &dispute.currency,
        &dispute.reason,
        dispute.due_by.as_deref(),
      )
      .await?;
    Ok(())
  }

  async fn process_dispute_closed(&self, dispute: DisputeClosed) -> WcpayResult<()> {
    let mut order = self.order_by_charge_id(&dispute.charge_id).await?;
    self
      .order_service
      .mark_payment_dispute_closed(&mut order, &dispute.dispute_id, &dispute.status)
      .await?;
    Ok(())
  }

  async fn process_dispute_updated(&self, dispute: DisputeUpdated) -> WcpayResult<()> {
    let mut order = self.order_by_charge_id(&dispute.charge_id).await?;
    let note = self
      .order_service
      .notes()
      .dispute_updated(&dispute.dispute_id, dispute.kind.message());
    if order.note_exists(&note) {
      return Ok(());
    }
    order.add_note(note);
    self.order_service.store().save(&order).await
  }
}

/// `metadata.order_id`, sent as a string or a number.
fn is_set(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::String(s) => !s.trim().is_empty(),
    _ => true,
  }
}

fn parse_order_id(order_id: &Value) -> Option<u64> {
  match order_id {
    Value::Number(n) => n.as_u64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}
