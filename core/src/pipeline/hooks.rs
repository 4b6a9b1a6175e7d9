// wcpay_core/src/pipeline/hooks.rs

//! Registration of step handlers and finalizers.

use crate::core::context::{Finalizer, Handler};
use crate::core::context_data::ContextData;
use crate::core::control::{StepControl, TransitionOutcome};
use crate::error::WcpayError;
use crate::pipeline::definition::Pipeline;
use std::future::Future;

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WcpayError> + Send + Sync + 'static,
{
  /// Registers an `on` handler for `step_name`.
  ///
  /// The handler's own error type only needs to convert into the pipeline's `Err`.
  pub fn on_root<F, UserProvidedErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let final_handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let user_fut = handler_fn(ctx_data);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    });
    self.on.entry(step_name.to_string()).or_default().push(final_handler);
  }

  /// Registers a finalizer. Finalizers run in registration order after the steps, including
  /// when a step stopped the pipeline or returned an error.
  pub fn finally_root<F, UserProvidedErr>(
    &mut self,
    finalizer_fn: impl Fn(ContextData<TData>, Option<TransitionOutcome>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<(), UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    let final_handler: Finalizer<TData, Err> = Box::new(move |ctx_data, outcome| {
      let user_fut = finalizer_fn(ctx_data, outcome);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    });
    self.finalizers.push(final_handler);
  }
}
