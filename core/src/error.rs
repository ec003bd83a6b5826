// tarzify-flow/src/error.rs
use anyhow::Error as AnyhowError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Step '{step_name}' timed out after {limit:?}")]
  StepTimedOut { step_name: String, limit: Duration },

  #[error("Context type mismatch (expected {expected_type}, at '{step_name}')")]
  TypeMismatch { step_name: String, expected_type: String },

  #[error("No pipeline registered for context type {type_name}")]
  PipelineNotRegistered { type_name: String },

  #[error("Error in handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

// An anyhow::Error that already carries a FlowError is unwrapped instead of nested.
impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<FlowError>() {
      Ok(flow_err) => flow_err,
      Err(err) => FlowError::HandlerError { source: err },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
