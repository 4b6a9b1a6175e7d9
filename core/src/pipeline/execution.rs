// wcpay_core/src/pipeline/execution.rs

//! Contains `Pipeline::run()`, which executes the steps and then the finalizers.

use crate::core::context_data::ContextData;
use crate::core::control::{StepControl, TransitionOutcome};
use crate::error::WcpayError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WcpayError> + Send + Sync + 'static,
{
  /// Executes the steps in order against `ctx_data`, then every finalizer.
  ///
  /// A step error is returned after the finalizers ran; a finalizer error is returned only
  /// when the steps themselves succeeded.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<TransitionOutcome, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    let steps_result = self.run_steps(ctx_data.clone()).await;
    let outcome = steps_result.as_ref().ok().copied();

    let mut finalizer_error = None;
    for (idx, finalizer) in self.finalizers.iter().enumerate() {
      if let Err(e) = finalizer(ctx_data.clone(), outcome).await {
        event!(Level::ERROR, finalizer_index = idx, error = %e, "Finalizer failed.");
        if finalizer_error.is_none() {
          finalizer_error = Some(e);
        }
      }
    }

    match (steps_result, finalizer_error) {
      (Err(step_err), _) => Err(step_err),
      (Ok(_), Some(fin_err)) => Err(fin_err),
      (Ok(outcome), None) => {
        event!(Level::DEBUG, ?outcome, "Pipeline execution finished.");
        Ok(outcome)
      }
    }
  }

  async fn run_steps(&self, ctx_data: ContextData<TData>) -> Result<TransitionOutcome, Err> {
    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name_str = step_def.name.as_str();
      // Entered guards are not Send; handlers are instrumented with the span instead.
      let step_span = span!(Level::DEBUG, "pipeline_step", step_name = step_name_str, step_index = step_idx);

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          event!(Level::DEBUG, step_name = step_name_str, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let handlers = match self.on.get(step_name_str) {
        Some(handlers) if !handlers.is_empty() => handlers,
        _ if step_def.optional => {
          event!(Level::TRACE, step_name = step_name_str, "Optional step has no handlers, skipping.");
          continue;
        }
        _ => {
          event!(Level::ERROR, step_name = step_name_str, "Non-optional step has no handlers.");
          return Err(Err::from(WcpayError::HandlerMissing {
            step_name: step_def.name.clone(),
          }));
        }
      };

      for handler_fn in handlers {
        match handler_fn(ctx_data.clone()).instrument(step_span.clone()).await {
          Ok(StepControl::Continue) => {}
          Ok(StepControl::Stop(reason)) => {
            event!(Level::INFO, step_name = step_name_str, %reason, "Pipeline stopped by step.");
            return Ok(TransitionOutcome::Skipped(reason));
          }
          Err(e) => {
            event!(Level::ERROR, step_name = step_name_str, error = %e, "Step handler failed.");
            return Err(e);
          }
        }
      }
    }
    Ok(TransitionOutcome::Applied)
  }
}
