// tarzify-flow/src/core/control.rs

//! Flow signals returned by handlers and the report produced by a pipeline run.

/// Returned by a handler to continue or halt the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt immediately: no further handlers of this step or later steps run.
  Stop,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  Stopped,
}

/// A best-effort step that failed or timed out without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedStep {
  pub step_name: String,
  pub error: String,
}

/// Outcome of `Pipeline::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub result: PipelineResult,
  pub degraded: Vec<DegradedStep>,
}

impl RunReport {
  pub fn completed(degraded: Vec<DegradedStep>) -> Self {
    Self {
      result: PipelineResult::Completed,
      degraded,
    }
  }

  pub fn stopped(degraded: Vec<DegradedStep>) -> Self {
    Self {
      result: PipelineResult::Stopped,
      degraded,
    }
  }

  pub fn is_completed(&self) -> bool {
    self.result == PipelineResult::Completed
  }

  pub fn is_degraded(&self) -> bool {
    !self.degraded.is_empty()
  }

  pub fn degraded_step(&self, step_name: &str) -> Option<&DegradedStep> {
    self.degraded.iter().find(|d| d.step_name == step_name)
  }
}
