// wcpay_core/src/order/transition.rs

//! The transition pipeline behind every `mark_payment_*` operation.
//!
//! Steps, in order:
//! - `guard`: transition-specific status rules checked on the caller's order.
//! - `refresh`: swaps the caller's copy for the persisted order and checks the status rules
//!   again. Everything after this step works on the persisted copy.
//! - `prepare`: rejects paid orders and takes the order lock. Skipped for ungated
//!   transitions (disputes).
//! - `deduplicate`: rejects a transition whose note or processed-transition key is already
//!   on either copy.
//! - `apply`: status change (failures logged, never propagated), note, processed key and
//!   follow-up work.
//!
//! The `complete` finalizer always runs. For applied transitions it writes
//! `_intention_status` and saves the order. It then releases the lock if this run took it.

use crate::clock::{offset_secs, Clock};
use crate::core::step::SkipCondition;
use crate::core::{ContextData, SkipReason, StepControl, TransitionOutcome};
use crate::error::{WcpayError, WcpayResult};
use crate::intent::IntentStatus;
use crate::order::lock::OrderLock;
use crate::order::model::{Order, StatusChange};
use crate::order::store::OrderStore;
use crate::pipeline::Pipeline;
use crate::scheduler::{JobScheduler, FEE_BREAKDOWN_HOOK};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
  PaymentCompleted,
  PaymentFailed,
  PaymentAuthorized,
  PaymentStarted,
  CaptureCompleted,
  CaptureFailed,
  CaptureExpired,
  CaptureCancelled,
  DisputeCreated,
  DisputeClosed,
  TerminalPaymentCompleted,
}

impl TransitionKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      TransitionKind::PaymentCompleted => "payment_completed",
      TransitionKind::PaymentFailed => "payment_failed",
      TransitionKind::PaymentAuthorized => "payment_authorized",
      TransitionKind::PaymentStarted => "payment_started",
      TransitionKind::CaptureCompleted => "capture_completed",
      TransitionKind::CaptureFailed => "capture_failed",
      TransitionKind::CaptureExpired => "capture_expired",
      TransitionKind::CaptureCancelled => "capture_cancelled",
      TransitionKind::DisputeCreated => "dispute_created",
      TransitionKind::DisputeClosed => "dispute_closed",
      TransitionKind::TerminalPaymentCompleted => "terminal_payment_completed",
    }
  }
}

impl fmt::Display for TransitionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Work done after an applied transition. Failures are logged only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
  None,
  /// Schedules the fee-breakdown note job for the intent.
  ScheduleFeeBreakdown { intent_id: String },
  /// Refunds whatever is left of the order total.
  RefundOrder { reason: String },
}

/// Returns `true` when the order must not take the transition.
pub type RejectIf = fn(&Order) -> bool;

/// Everything one transition run needs to know about the requested change.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
  pub kind: TransitionKind,
  /// Intent id, or dispute id for dispute transitions. Half of the processed-transition key.
  pub idempotency_id: String,
  /// Recorded as the lock holder.
  pub intent_id: Option<String>,
  pub note: String,
  pub status_change: Option<StatusChange>,
  /// Written to `_intention_status` once the transition applied.
  pub intention_status: Option<IntentStatus>,
  /// Gated transitions go through the paid check and the order lock.
  pub gated: bool,
  pub reject_if: Option<RejectIf>,
  pub follow_up: FollowUp,
}

impl TransitionRequest {
  pub fn new(kind: TransitionKind, idempotency_id: impl Into<String>, note: impl Into<String>) -> Self {
    let idempotency_id = idempotency_id.into();
    Self {
      kind,
      intent_id: Some(idempotency_id.clone()).filter(|id| !id.is_empty()),
      idempotency_id,
      note: note.into(),
      status_change: None,
      intention_status: None,
      gated: true,
      reject_if: None,
      follow_up: FollowUp::None,
    }
  }

  pub fn status_change(mut self, change: StatusChange) -> Self {
    self.status_change = Some(change);
    self
  }

  pub fn intention_status(mut self, status: IntentStatus) -> Self {
    self.intention_status = Some(status);
    self
  }

  pub fn ungated(mut self) -> Self {
    self.gated = false;
    self.intent_id = None;
    self
  }

  pub fn reject_if(mut self, reject_if: RejectIf) -> Self {
    self.reject_if = Some(reject_if);
    self
  }

  pub fn follow_up(mut self, follow_up: FollowUp) -> Self {
    self.follow_up = follow_up;
    self
  }

  fn rejects(&self, order: &Order) -> bool {
    self.reject_if.map_or(false, |reject| reject(order))
  }

  /// `<idempotency id>:<transition>`, recorded on the order once applied.
  pub fn processed_key(&self) -> String {
    format!("{}:{}", self.idempotency_id, self.kind.as_str())
  }
}

/// Shared state of one transition run.
#[derive(Debug, Clone)]
pub struct TransitionData {
  pub order: Order,
  pub request: TransitionRequest,
  /// The order as the caller passed it, kept once `refresh` loaded the persisted copy.
  pub submitted: Option<Order>,
  pub lock_acquired: bool,
}

impl TransitionData {
  pub fn new(order: Order, request: TransitionRequest) -> Self {
    Self {
      order,
      request,
      submitted: None,
      lock_acquired: false,
    }
  }

  fn is_duplicate(&self) -> bool {
    let key = self.request.processed_key();
    let seen = |order: &Order| order.note_exists(&self.request.note) || order.processed_transitions.contains(&key);
    seen(&self.order) || self.submitted.as_ref().map_or(false, seen)
  }
}

/// Collaborators used by the transition steps.
pub struct TransitionDeps {
  pub store: Arc<dyn OrderStore>,
  pub lock: OrderLock,
  pub scheduler: Arc<dyn JobScheduler>,
  pub clock: Arc<dyn Clock>,
  pub fee_breakdown_delay: Duration,
}

pub type TransitionPipeline = Pipeline<TransitionData, WcpayError>;

pub const STEP_GUARD: &str = "guard";
pub const STEP_REFRESH: &str = "refresh";
pub const STEP_PREPARE: &str = "prepare";
pub const STEP_DEDUPLICATE: &str = "deduplicate";
pub const STEP_APPLY: &str = "apply";

/// Builds the pipeline once; it is shared by all transitions of an `OrderService`.
pub fn build_transition_pipeline(deps: Arc<TransitionDeps>) -> TransitionPipeline {
  let ungated: SkipCondition<TransitionData> =
    Arc::new(|ctx: ContextData<TransitionData>| ctx.with(|data| !data.request.gated));

  let mut pipeline = TransitionPipeline::new(
    "order_transition",
    &[
      (STEP_GUARD, false, None),
      (STEP_REFRESH, false, None),
      (STEP_PREPARE, false, Some(ungated)),
      (STEP_DEDUPLICATE, false, None),
      (STEP_APPLY, false, None),
    ],
  );

  pipeline.on_root(STEP_GUARD, guard_step);

  let refresh_deps = deps.clone();
  pipeline.on_root(STEP_REFRESH, move |ctx| refresh_step(refresh_deps.clone(), ctx));

  let prepare_deps = deps.clone();
  pipeline.on_root(STEP_PREPARE, move |ctx| prepare_step(prepare_deps.clone(), ctx));

  pipeline.on_root(STEP_DEDUPLICATE, deduplicate_step);

  let apply_deps = deps.clone();
  pipeline.on_root(STEP_APPLY, move |ctx| apply_step(apply_deps.clone(), ctx));

  pipeline.finally_root(move |ctx, outcome| complete_step(deps.clone(), ctx, outcome));

  pipeline
}

async fn guard_step(ctx: ContextData<TransitionData>) -> WcpayResult<StepControl> {
  if ctx.with(|data| data.request.rejects(&data.order)) {
    event!(Level::DEBUG, "Order status rules out this transition.");
    return Ok(StepControl::Stop(SkipReason::StatusGuard));
  }
  Ok(StepControl::Continue)
}

async fn refresh_step(deps: Arc<TransitionDeps>, ctx: ContextData<TransitionData>) -> WcpayResult<StepControl> {
  let order = ctx.with(|data| data.order.clone());
  // Another request may have changed the order since the caller loaded it.
  let persisted = deps.store.refresh(&order).await?;

  let rejected = ctx.with_mut(|data| {
    data.submitted = Some(std::mem::replace(&mut data.order, persisted));
    data.request.rejects(&data.order)
  });
  if rejected {
    event!(Level::DEBUG, order_id = order.id, "Persisted order status rules out this transition.");
    return Ok(StepControl::Stop(SkipReason::StatusGuard));
  }
  Ok(StepControl::Continue)
}

async fn prepare_step(deps: Arc<TransitionDeps>, ctx: ContextData<TransitionData>) -> WcpayResult<StepControl> {
  let (order_id, status, paid, intent_id) = ctx.with(|data| {
    (data.order.id, data.order.status, data.order.is_paid(), data.request.intent_id.clone())
  });

  if paid {
    event!(Level::INFO, order_id, %status, "Order already paid.");
    return Ok(StepControl::Stop(SkipReason::AlreadyPaid));
  }

  if !deps.lock.lock_order_payment(order_id, intent_id.as_deref()).await? {
    event!(Level::INFO, order_id, "Order is locked by another payment process.");
    return Ok(StepControl::Stop(SkipReason::Locked));
  }

  ctx.with_mut(|data| data.lock_acquired = true);
  Ok(StepControl::Continue)
}

async fn deduplicate_step(ctx: ContextData<TransitionData>) -> WcpayResult<StepControl> {
  if ctx.with(TransitionData::is_duplicate) {
    event!(Level::INFO, "Transition already applied to this order.");
    return Ok(StepControl::Stop(SkipReason::Duplicate));
  }
  Ok(StepControl::Continue)
}

async fn apply_step(deps: Arc<TransitionDeps>, ctx: ContextData<TransitionData>) -> WcpayResult<StepControl> {
  let follow_up = ctx.with_mut(|data| {
    let TransitionData { order, request, .. } = data;
    if let Some(change) = &request.status_change {
      update_order_status(order, change);
    }
    order.add_note(request.note.clone());
    order.processed_transitions.insert(request.processed_key());
    request.follow_up.clone()
  });

  match follow_up {
    FollowUp::None => {}
    FollowUp::ScheduleFeeBreakdown { intent_id } => {
      let order_id = ctx.with(|data| data.order.id);
      let at = offset_secs(deps.clock.now(), deps.fee_breakdown_delay);
      let args = json!({ "order_id": order_id, "intent_id": intent_id });
      if let Err(e) = deps.scheduler.schedule_job(at, FEE_BREAKDOWN_HOOK, args).await {
        event!(Level::WARN, order_id, error = %e, "Failed to schedule fee breakdown job.");
      }
    }
    FollowUp::RefundOrder { reason } => {
      let mut order = ctx.with(|data| data.order.clone());
      let amount = order.remaining_refund_amount();
      if amount > 0 {
        let refunded = deps.store.create_refund(&mut order, amount, &reason).await;
        match refunded {
          Ok(()) => ctx.with_mut(|data| data.order = order),
          Err(e) => event!(Level::WARN, order_id = order.id, error = %e, "Failed to refund order."),
        }
      }
    }
  }

  Ok(StepControl::Continue)
}

async fn complete_step(
  deps: Arc<TransitionDeps>,
  ctx: ContextData<TransitionData>,
  outcome: Option<TransitionOutcome>,
) -> WcpayResult<()> {
  let applied = matches!(outcome, Some(TransitionOutcome::Applied));
  let (order, lock_acquired) = ctx.with_mut(|data| {
    if applied {
      if let Some(status) = data.request.intention_status {
        data.order.set_intention_status(status);
      }
    }
    (data.order.clone(), data.lock_acquired)
  });

  let saved = if applied { deps.store.save(&order).await } else { Ok(()) };

  if lock_acquired {
    if let Err(e) = deps.lock.unlock_order_payment(order.id).await {
      event!(Level::WARN, order_id = order.id, error = %e, "Failed to release order lock.");
    }
  }
  saved
}

/// Applies `change`, logging instead of failing when the order rules refuse it.
pub(crate) fn update_order_status(order: &mut Order, change: &StatusChange) -> bool {
  match order.apply_status_change(change) {
    Ok(()) => true,
    Err(e) => {
      event!(Level::WARN, order_id = order.id, error = %e, "Order status update failed.");
      false
    }
  }
}
