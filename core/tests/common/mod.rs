// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::time::Duration;
use tarzify_flow::{ContextData, FlowError, Handler, PipelineControl};
use tracing::Level;

/// A miniature checkout context: each handler appends to `log` so tests can
/// assert exactly which steps ran and in which order.
#[derive(Clone, Debug, Default)]
pub struct CheckoutLog {
  pub log: Vec<String>,
  pub total: i64,
  pub stop_at: Option<String>,
  pub mail_sent: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  /// Engine errors, kept as their Debug text so the enum stays `Eq`.
  #[error("flow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn recording_handler(label: &'static str, add: i64) -> Handler<CheckoutLog, TestError> {
  Box::new(move |ctx: ContextData<CheckoutLog>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.log.push(label.to_string());
      guard.total += add;
      if guard.stop_at.as_deref() == Some(label) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(label: &'static str, message: &'static str) -> Handler<CheckoutLog, TestError> {
  Box::new(move |ctx: ContextData<CheckoutLog>| {
    Box::pin(async move {
      ctx.write().log.push(label.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

pub fn sleeping_handler(label: &'static str, nap: Duration) -> Handler<CheckoutLog, TestError> {
  Box::new(move |ctx: ContextData<CheckoutLog>| {
    Box::pin(async move {
      tokio::time::sleep(nap).await;
      ctx.write().log.push(label.to_string());
      Ok(PipelineControl::Continue)
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
