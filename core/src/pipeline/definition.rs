// tarzify-flow/src/pipeline/definition.rs

use crate::core::handler::Handler;
use crate::core::step::StepDef;
use crate::error::FlowError;
use std::collections::HashMap;
use std::time::Duration;

/// An ordered list of named steps over a context data type `TData`, whose handlers
/// return `Result<_, Err>`.
///
/// `Err` must be constructible from `FlowError` so that engine-level failures
/// (missing handlers, step timeouts) surface through the same error type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from its step definitions. Panics on duplicate step names,
  /// which is a setup error rather than a runtime condition.
  pub fn new(steps: Vec<StepDef<TData>>) -> Self {
    for (idx, step) in steps.iter().enumerate() {
      if steps[..idx].iter().any(|s| s.name == step.name) {
        panic!("Flow setup error: step '{}' is defined twice.", step.name);
      }
    }

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Flow setup error: step '{}' not found in pipeline definition.", step_name);
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn step(&self, step_name: &str) -> Option<&StepDef<TData>> {
    self.steps.iter().find(|s| s.name == step_name)
  }

  /// Overrides the timeout of an existing step.
  pub fn set_timeout(&mut self, step_name: &str, limit: Option<Duration>) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.timeout = limit;
    }
  }

  pub(crate) fn has_handlers(&self, step_name: &str) -> bool {
    [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(step_name).map_or(false, |hs| !hs.is_empty()))
  }
}
