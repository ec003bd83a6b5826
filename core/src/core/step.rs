// tarzify-flow/src/core/step.rs

//! Step definitions: name, failure policy, timeout and skip condition.

use super::ContextData;
use std::sync::Arc;
use std::time::Duration;

pub type SkipCondition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// What a handler error (or timeout) inside a step means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
  /// The step must have handlers; an error aborts the run.
  Required,
  /// The step may have no handlers; an error still aborts the run.
  Optional,
  /// An error or timeout is logged, recorded in the `RunReport` and the run continues.
  BestEffort,
}

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub policy: StepPolicy,
  /// Upper bound for all handlers of the step together.
  pub timeout: Option<Duration>,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> StepDef<T> {
  pub fn new(name: impl Into<String>, policy: StepPolicy) -> Self {
    Self {
      name: name.into(),
      policy,
      timeout: None,
      skip_if: None,
    }
  }

  pub fn required(name: impl Into<String>) -> Self {
    Self::new(name, StepPolicy::Required)
  }

  pub fn optional(name: impl Into<String>) -> Self {
    Self::new(name, StepPolicy::Optional)
  }

  pub fn best_effort(name: impl Into<String>) -> Self {
    Self::new(name, StepPolicy::BestEffort)
  }

  pub fn with_timeout(mut self, limit: Duration) -> Self {
    self.timeout = Some(limit);
    self
  }

  pub fn skip_if(mut self, condition: impl Fn(ContextData<T>) -> bool + Send + Sync + 'static) -> Self {
    self.skip_if = Some(Arc::new(condition));
    self
  }

  /// Whether a step with no handlers at all may be passed over.
  pub fn may_be_empty(&self) -> bool {
    self.policy != StepPolicy::Required
  }
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("policy", &self.policy)
      .field("timeout", &self.timeout)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
