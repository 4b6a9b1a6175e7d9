// wcpay_core/src/order/service.rs

use crate::api::PaymentsApiClient;
use crate::captured_event_note::CapturedEvent;
use crate::clock::Clock;
use crate::config::WcpayConfig;
use crate::core::{ContextData, TransitionOutcome};
use crate::error::{WcpayError, WcpayResult};
use crate::intent::{IntentStatus, PaymentIntent};
use crate::order::lock::OrderLock;
use crate::order::model::{Order, OrderStatus, StatusChange};
use crate::order::notes::NoteComposer;
use crate::order::store::OrderStore;
use crate::order::transition::{
  build_transition_pipeline, FollowUp, TransitionData, TransitionDeps, TransitionKind, TransitionPipeline,
  TransitionRequest,
};
use crate::scheduler::{JobScheduler, ScheduledJob, FEE_BREAKDOWN_HOOK};
use crate::store::KeyValueStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Refund reason recorded when a dispute is lost.
pub const DISPUTE_LOST_REFUND_REASON: &str = "Dispute lost.";

/// Applies payment intent lifecycle events to orders.
///
/// Every `mark_*` method is idempotent and safe against concurrent processing of the same
/// order: see `order::transition` for the steps. The caller's `order` is updated in place with
/// whatever the run left on it, and the returned outcome says whether anything changed.
#[derive(Clone)]
pub struct OrderService {
  deps: Arc<TransitionDeps>,
  pipeline: Arc<TransitionPipeline>,
  notes: NoteComposer,
  api: Arc<dyn PaymentsApiClient>,
}

impl OrderService {
  pub fn new(
    config: &WcpayConfig,
    store: Arc<dyn OrderStore>,
    kv_store: Arc<dyn KeyValueStore>,
    api: Arc<dyn PaymentsApiClient>,
    scheduler: Arc<dyn JobScheduler>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let deps = Arc::new(TransitionDeps {
      store,
      lock: OrderLock::new(kv_store, config.order_lock_ttl),
      scheduler,
      clock,
      fee_breakdown_delay: config.fee_breakdown_delay,
    });
    let pipeline = Arc::new(build_transition_pipeline(deps.clone()));
    Self {
      deps,
      pipeline,
      notes: NoteComposer::new(config.admin_base_url.clone()),
      api,
    }
  }

  pub fn store(&self) -> &Arc<dyn OrderStore> {
    &self.deps.store
  }

  pub fn notes(&self) -> &NoteComposer {
    &self.notes
  }

  pub fn lock(&self) -> &OrderLock {
    &self.deps.lock
  }

  // --- Transitions ---

  #[instrument(name = "OrderService::mark_payment_completed", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_payment_completed(
    &self,
    order: &mut Order,
    intent_id: &str,
    intent_status: IntentStatus,
    charge_id: &str,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self
      .notes
      .payment_completed(order.total, &order.currency, transaction_ref(intent_id, charge_id));
    let request = TransitionRequest::new(TransitionKind::PaymentCompleted, intent_id, note)
      .status_change(StatusChange::PaymentComplete {
        transaction_id: intent_id.to_string(),
      })
      .intention_status(intent_status)
      .follow_up(FollowUp::ScheduleFeeBreakdown {
        intent_id: intent_id.to_string(),
      });
    self.run_transition(order, request).await
  }

  /// Refuses orders that already failed, by status or by recorded intention status.
  #[instrument(name = "OrderService::mark_payment_failed", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_payment_failed(
    &self,
    order: &mut Order,
    intent_id: &str,
    charge_id: &str,
    message: Option<&str>,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self
      .notes
      .payment_failed(order.total, &order.currency, transaction_ref(intent_id, charge_id), message);
    let request = TransitionRequest::new(TransitionKind::PaymentFailed, intent_id, note)
      .reject_if(|order| order.status == OrderStatus::Failed || order.intention_status() == Some(IntentStatus::Failed))
      .status_change(StatusChange::To(OrderStatus::Failed))
      .intention_status(IntentStatus::Failed);
    self.run_transition(order, request).await
  }

  #[instrument(name = "OrderService::mark_payment_authorized", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_payment_authorized(
    &self,
    order: &mut Order,
    intent_id: &str,
    intent_status: IntentStatus,
    charge_id: &str,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self
      .notes
      .payment_authorized(order.total, &order.currency, transaction_ref(intent_id, charge_id));
    let request = TransitionRequest::new(TransitionKind::PaymentAuthorized, intent_id, note)
      .reject_if(|order| order.status == OrderStatus::OnHold)
      .status_change(StatusChange::To(OrderStatus::OnHold))
      .intention_status(intent_status);
    self.run_transition(order, request).await
  }

  /// Notes a payment that needs customer action. Only applies to pending orders and never
  /// changes the status.
  #[instrument(name = "OrderService::mark_payment_started", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_payment_started(
    &self,
    order: &mut Order,
    intent_id: &str,
    intent_status: IntentStatus,
    charge_id: &str,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self
      .notes
      .payment_started(order.total, &order.currency, transaction_ref(intent_id, charge_id));
    let request = TransitionRequest::new(TransitionKind::PaymentStarted, intent_id, note)
      .reject_if(|order| order.status != OrderStatus::Pending)
      .intention_status(intent_status);
    self.run_transition(order, request).await
  }

  #[instrument(name = "OrderService::mark_payment_capture_completed", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_payment_capture_completed(
    &self,
    order: &mut Order,
    intent_id: &str,
    intent_status: IntentStatus,
    charge_id: &str,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self
      .notes
      .capture_completed(order.total, &order.currency, transaction_ref(intent_id, charge_id));
    let request = TransitionRequest::new(TransitionKind::CaptureCompleted, intent_id, note)
      .status_change(StatusChange::PaymentComplete {
        transaction_id: intent_id.to_string(),
      })
      .intention_status(intent_status)
      .follow_up(FollowUp::ScheduleFeeBreakdown {
        intent_id: intent_id.to_string(),
      });
    self.run_transition(order, request).await
  }

  /// Note only; the authorization may still be captured later.
  #[instrument(name = "OrderService::mark_payment_capture_failed", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_payment_capture_failed(
    &self,
    order: &mut Order,
    intent_id: &str,
    intent_status: IntentStatus,
    charge_id: &str,
    message: Option<&str>,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self
      .notes
      .capture_failed(order.total, &order.currency, transaction_ref(intent_id, charge_id), message);
    let request =
      TransitionRequest::new(TransitionKind::CaptureFailed, intent_id, note).intention_status(intent_status);
    self.run_transition(order, request).await
  }

  #[instrument(name = "OrderService::mark_payment_capture_expired", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_payment_capture_expired(
    &self,
    order: &mut Order,
    intent_id: &str,
    intent_status: IntentStatus,
    charge_id: &str,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self.notes.capture_expired(transaction_ref(intent_id, charge_id));
    let request = TransitionRequest::new(TransitionKind::CaptureExpired, intent_id, note)
      .status_change(StatusChange::To(OrderStatus::Cancelled))
      .intention_status(intent_status);
    self.run_transition(order, request).await
  }

  #[instrument(name = "OrderService::mark_payment_capture_cancelled", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_payment_capture_cancelled(
    &self,
    order: &mut Order,
    intent_id: &str,
    intent_status: IntentStatus,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self.notes.capture_cancelled();
    let request = TransitionRequest::new(TransitionKind::CaptureCancelled, intent_id, note)
      .status_change(StatusChange::To(OrderStatus::Cancelled))
      .intention_status(intent_status);
    self.run_transition(order, request).await
  }

  /// Puts the order on hold. Disputes arrive after payment, so this skips the paid check and
  /// the order lock.
  #[instrument(name = "OrderService::mark_payment_dispute_created", skip_all, fields(order_id = order.id, dispute_id = %dispute_id))]
  pub async fn mark_payment_dispute_created(
    &self,
    order: &mut Order,
    dispute_id: &str,
    amount: i64,
    currency: &str,
    reason: &str,
    due_by: Option<&str>,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self.notes.dispute_created(dispute_id, amount, currency, reason, due_by);
    let request = TransitionRequest::new(TransitionKind::DisputeCreated, dispute_id, note)
      .ungated()
      .status_change(StatusChange::To(OrderStatus::OnHold));
    self.run_transition(order, request).await
  }

  /// A lost dispute refunds the rest of the order. Any other close status moves the order to
  /// `completed`, whatever it was before the dispute.
  #[instrument(name = "OrderService::mark_payment_dispute_closed", skip_all, fields(order_id = order.id, dispute_id = %dispute_id, %status))]
  pub async fn mark_payment_dispute_closed(
    &self,
    order: &mut Order,
    dispute_id: &str,
    status: &str,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self.notes.dispute_closed(dispute_id, status);
    let request = TransitionRequest::new(TransitionKind::DisputeClosed, dispute_id, note).ungated();
    let request = if status == "lost" {
      request.follow_up(FollowUp::RefundOrder {
        reason: DISPUTE_LOST_REFUND_REASON.to_string(),
      })
    } else {
      request.status_change(StatusChange::To(OrderStatus::Completed))
    };
    self.run_transition(order, request).await
  }

  /// In-person payments complete the order straight away.
  #[instrument(name = "OrderService::mark_terminal_payment_completed", skip_all, fields(order_id = order.id, intent_id = %intent_id))]
  pub async fn mark_terminal_payment_completed(
    &self,
    order: &mut Order,
    intent_id: &str,
    intent_status: IntentStatus,
  ) -> WcpayResult<TransitionOutcome> {
    let note = self.notes.payment_completed(order.total, &order.currency, intent_id);
    let request = TransitionRequest::new(TransitionKind::TerminalPaymentCompleted, intent_id, note)
      .status_change(StatusChange::To(OrderStatus::Completed))
      .intention_status(intent_status)
      .follow_up(FollowUp::ScheduleFeeBreakdown {
        intent_id: intent_id.to_string(),
      });
    self.run_transition(order, request).await
  }

  /// Dispatches to the transition matching `intent.status`. Returns `None` for statuses that
  /// do not move the order.
  #[instrument(name = "OrderService::update_order_status_from_intent", skip_all, fields(order_id = order.id, intent_id = %intent.id, status = %intent.status))]
  pub async fn update_order_status_from_intent(
    &self,
    order: &mut Order,
    intent: &PaymentIntent,
  ) -> WcpayResult<Option<TransitionOutcome>> {
    let charge_id = intent.charge_id_or_empty();
    let outcome = match intent.status {
      IntentStatus::Canceled => self.mark_payment_capture_cancelled(order, &intent.id, intent.status).await?,
      IntentStatus::Succeeded if order.intention_status() == Some(IntentStatus::RequiresCapture) => {
        self
          .mark_payment_capture_completed(order, &intent.id, intent.status, charge_id)
          .await?
      }
      IntentStatus::Succeeded => {
        self
          .mark_payment_completed(order, &intent.id, intent.status, charge_id)
          .await?
      }
      IntentStatus::Processing | IntentStatus::RequiresCapture => {
        self
          .mark_payment_authorized(order, &intent.id, intent.status, charge_id)
          .await?
      }
      IntentStatus::RequiresAction | IntentStatus::RequiresPaymentMethod => {
        self
          .mark_payment_started(order, &intent.id, intent.status, charge_id)
          .await?
      }
      IntentStatus::RequiresConfirmation | IntentStatus::Failed => {
        event!(Level::DEBUG, "Intent status does not map to an order transition.");
        return Ok(None);
      }
    };
    Ok(Some(outcome))
  }

  /// Writes the intent's identifiers and status to the order meta and saves it.
  pub async fn attach_intent_info_to_order(&self, order: &mut Order, intent: &PaymentIntent) -> WcpayResult<()> {
    order.attach_intent_info(intent);
    self.deps.store.save(order).await
  }

  // --- Lock ---

  pub async fn lock_order_payment(&self, order: &Order, intent_id: Option<&str>) -> WcpayResult<bool> {
    self.deps.lock.lock_order_payment(order.id, intent_id).await
  }

  pub async fn is_order_locked(&self, order: &Order) -> WcpayResult<bool> {
    self.deps.lock.is_order_locked(order.id).await
  }

  pub async fn unlock_order_payment(&self, order: &Order) -> WcpayResult<()> {
    self.deps.lock.unlock_order_payment(order.id).await
  }

  // --- Fee breakdown ---

  /// Appends the fee breakdown of the intent's `captured` timeline event to the order.
  /// Returns `false` when there is no captured event yet or the note is already present.
  #[instrument(name = "OrderService::add_fee_breakdown_to_order_notes", skip(self))]
  pub async fn add_fee_breakdown_to_order_notes(&self, order_id: u64, intent_id: &str) -> WcpayResult<bool> {
    let mut order = self
      .deps
      .store
      .get_by_id(order_id)
      .await?
      .ok_or(WcpayError::OrderNotFound { order_id })?;

    let timeline = self.api.get_timeline(intent_id).await?;
    let captured = timeline
      .get("data")
      .and_then(Value::as_array)
      .and_then(|events| events.iter().find(|e| e.get("type").and_then(Value::as_str) == Some("captured")));
    let captured = match captured {
      Some(raw) => serde_json::from_value::<CapturedEvent>(raw.clone())?,
      None => {
        event!(Level::DEBUG, "No captured event in the intent timeline.");
        return Ok(false);
      }
    };

    let note = captured.compose_note();
    if order.note_exists(&note) {
      return Ok(false);
    }
    order.add_note(note);
    self.deps.store.save(&order).await?;
    Ok(true)
  }

  /// Runs a job previously scheduled by this service. Returns `false` for unknown hooks.
  pub async fn handle_scheduled_job(&self, job: &ScheduledJob) -> WcpayResult<bool> {
    if job.hook != FEE_BREAKDOWN_HOOK {
      event!(Level::DEBUG, hook = %job.hook, "Ignoring job for unknown hook.");
      return Ok(false);
    }
    let order_id = job
      .args
      .get("order_id")
      .and_then(Value::as_u64)
      .ok_or_else(|| WcpayError::Internal("Fee breakdown job is missing order_id".to_string()))?;
    let intent_id = job
      .args
      .get("intent_id")
      .and_then(Value::as_str)
      .ok_or_else(|| WcpayError::Internal("Fee breakdown job is missing intent_id".to_string()))?;
    self.add_fee_breakdown_to_order_notes(order_id, intent_id).await
  }

  async fn run_transition(&self, order: &mut Order, request: TransitionRequest) -> WcpayResult<TransitionOutcome> {
    let kind = request.kind;
    let ctx = ContextData::new(TransitionData::new(order.clone(), request));
    let result = self.pipeline.run(ctx.clone()).await;
    *order = ctx.snapshot().order;

    let outcome = result?;
    event!(Level::INFO, order_id = order.id, %kind, ?outcome, "Order transition finished.");
    Ok(outcome)
  }
}

impl std::fmt::Debug for OrderService {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderService")
      .field("pipeline", &self.pipeline.name())
      .field("lock", &self.deps.lock)
      .finish()
  }
}

/// The charge id when known, else the intent id.
fn transaction_ref<'a>(intent_id: &'a str, charge_id: &'a str) -> &'a str {
  if charge_id.is_empty() {
    intent_id
  } else {
    charge_id
  }
}
