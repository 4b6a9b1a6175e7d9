// wcpay_core/src/core/control.rs

//! Signals for controlling a transition pipeline and the outcome of a run.

use std::fmt;

/// Why a transition did not mutate the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  /// The persisted order is already in a paid status.
  AlreadyPaid,
  /// Another run holds the order lock.
  Locked,
  /// An identical note (or the same transition key) is already on the order.
  Duplicate,
  /// The order's current status or intention status rules the transition out.
  StatusGuard,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      SkipReason::AlreadyPaid => "already_paid",
      SkipReason::Locked => "locked",
      SkipReason::Duplicate => "duplicate",
      SkipReason::StatusGuard => "status_guard",
    };
    f.write_str(s)
  }
}

/// Signal from a step handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  Continue,
  /// Halt the pipeline; remaining steps are not run, the finalizer still is.
  Stop(SkipReason),
}

/// Outcome of a full transition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
  Applied,
  Skipped(SkipReason),
}

impl TransitionOutcome {
  pub fn is_applied(&self) -> bool {
    matches!(self, TransitionOutcome::Applied)
  }
}
