// wcpay_core/src/scheduler.rs

//! Fire-and-forget background jobs, used to move slow follow-up work (a second remote API
//! call) out of the request that triggered it.

use crate::error::WcpayResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

/// Hook name of the job that appends the fee breakdown note to an order.
pub const FEE_BREAKDOWN_HOOK: &str = "wcpay_add_fee_breakdown_to_order_notes";

#[async_trait]
pub trait JobScheduler: Send + Sync {
  async fn schedule_job(&self, timestamp: i64, hook: &str, args: Value) -> WcpayResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledJob {
  pub timestamp: i64,
  pub hook: String,
  pub args: Value,
}

/// Records scheduled jobs in memory; a worker (or a test) drains them with `take_jobs`.
#[derive(Debug, Default)]
pub struct InMemoryJobScheduler {
  jobs: Mutex<Vec<ScheduledJob>>,
}

impl InMemoryJobScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn jobs(&self) -> Vec<ScheduledJob> {
    self.jobs.lock().clone()
  }

  pub fn take_jobs(&self) -> Vec<ScheduledJob> {
    std::mem::take(&mut *self.jobs.lock())
  }
}

#[async_trait]
impl JobScheduler for InMemoryJobScheduler {
  async fn schedule_job(&self, timestamp: i64, hook: &str, args: Value) -> WcpayResult<()> {
    tracing::debug!(%hook, timestamp, "Job scheduled.");
    self.jobs.lock().push(ScheduledJob {
      timestamp,
      hook: hook.to_string(),
      args,
    });
    Ok(())
  }
}
