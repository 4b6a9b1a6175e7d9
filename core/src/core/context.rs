// wcpay_core/src/core/context.rs

//! The handler type registered against pipeline steps.

use crate::core::context_data::ContextData;
use crate::core::control::StepControl;
use std::future::Future;
use std::pin::Pin;

/// A step handler: an async function over a clone of the shared `ContextData<TData>`.
///
/// Handlers must drop any lock guard on the context before awaiting, and return
/// `StepControl::Continue` to proceed or `StepControl::Stop(reason)` to halt.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<StepControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// A finalizer runs once after the steps, whether they completed, stopped or failed.
/// It receives the outcome reached so far (`None` when a step failed).
pub type Finalizer<TData, Err> = Box<
  dyn Fn(ContextData<TData>, Option<crate::core::control::TransitionOutcome>) -> Pin<Box<dyn Future<Output = Result<(), Err>> + Send>>
    + Send
    + Sync,
>;
