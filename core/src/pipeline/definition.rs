// wcpay_core/src/pipeline/definition.rs

//! Contains the `Pipeline<TData, Err>` struct definition and its construction.

use crate::core::context::{Finalizer, Handler};
use crate::core::step::{SkipCondition, StepDef};
use crate::error::WcpayError;
use std::collections::HashMap;

/// An ordered list of named steps, each with zero or more `on` handlers, plus finalizers
/// that run after the steps no matter how they ended.
///
/// `Err` must be constructible from `WcpayError` so that configuration problems detected at
/// run time (a non-optional step without handlers) surface through the pipeline's own error.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WcpayError> + Send + Sync + 'static,
{
  /// Used in spans; e.g. the transition name.
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) finalizers: Vec<Finalizer<TData, Err>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WcpayError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step name, optional, skip_if)` definitions.
  pub fn new(name: impl Into<String>, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_cond_opt)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_cond_opt.clone(),
      })
      .collect();

    Self {
      name: name.into(),
      steps,
      on: HashMap::new(),
      finalizers: Vec::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics on an unknown step name: a typo here is a programming error, not a runtime condition.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "wcpay setup error: Step '{}' not found in pipeline '{}'.",
        step_name, self.name
      );
    }
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.skip_if = skip_if;
    }
  }
}
