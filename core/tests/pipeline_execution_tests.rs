// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use serial_test::serial;
use tarzify_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, StepDef};

#[tokio::test]
#[serial]
async fn steps_run_in_declared_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutLog, TestError>::new(vec![
    StepDef::required("create_order"),
    StepDef::required("create_lines"),
    StepDef::required("notify"),
  ]);
  pipeline.on_root("create_order", recording_handler("create_order", 1));
  pipeline.on_root("create_lines", recording_handler("create_lines", 10));
  pipeline.on_root("notify", recording_handler("notify", 100));

  let ctx = ContextData::new(CheckoutLog::default());
  let report = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(report.result, PipelineResult::Completed);
  assert!(!report.is_degraded());
  let guard = ctx.read();
  assert_eq!(guard.log, vec!["create_order", "create_lines", "notify"]);
  assert_eq!(guard.total, 111);
}

#[tokio::test]
#[serial]
async fn stop_signal_halts_remaining_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutLog, TestError>::new(vec![
    StepDef::required("a"),
    StepDef::required("b"),
    StepDef::required("c"),
  ]);
  pipeline.on_root("a", recording_handler("a", 1));
  pipeline.on_root("b", recording_handler("b", 1));
  pipeline.on_root("c", recording_handler("c", 1));

  let ctx = ContextData::new(CheckoutLog {
    stop_at: Some("b".to_string()),
    ..Default::default()
  });
  let report = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(report.result, PipelineResult::Stopped);
  assert_eq!(ctx.read().log, vec!["a", "b"]);
}

#[tokio::test]
#[serial]
async fn required_step_error_aborts_the_run() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutLog, TestError>::new(vec![
    StepDef::required("create_order"),
    StepDef::required("create_lines"),
    StepDef::required("notify"),
  ]);
  pipeline.on_root("create_order", recording_handler("create_order", 1));
  pipeline.on_root("create_lines", failing_handler("create_lines", "constraint violated"));
  pipeline.on_root("notify", recording_handler("notify", 1));

  let ctx = ContextData::new(CheckoutLog::default());
  let err = pipeline.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Handler("constraint violated".to_string()));
  assert_eq!(ctx.read().log, vec!["create_order", "create_lines"]);
}

#[tokio::test]
#[serial]
async fn skip_condition_passes_over_a_step() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutLog, TestError>::new(vec![
    StepDef::required("price"),
    StepDef::required("free_gift").skip_if(|ctx: ContextData<CheckoutLog>| ctx.read().total < 1000),
    StepDef::required("notify"),
  ]);
  pipeline.on_root("price", recording_handler("price", 500));
  pipeline.on_root("free_gift", recording_handler("free_gift", 0));
  pipeline.on_root("notify", recording_handler("notify", 0));

  let ctx = ContextData::new(CheckoutLog::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().log, vec!["price", "notify"]);
}

#[tokio::test]
#[serial]
async fn required_step_without_handlers_is_a_flow_error() {
  setup_tracing();
  let pipeline = Pipeline::<CheckoutLog, TestError>::new(vec![StepDef::required("unwired")]);

  let err = pipeline.run(ContextData::new(CheckoutLog::default())).await.unwrap_err();

  match err {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("unwired"));
    }
    other => panic!("expected HandlerMissing, got {other:?}"),
  }
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_passed_over() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<CheckoutLog, TestError>::new(vec![StepDef::optional("coupon"), StepDef::required("notify")]);
  pipeline.on_root("notify", recording_handler("notify", 0));

  let ctx = ContextData::new(CheckoutLog::default());
  let report = pipeline.run(ctx.clone()).await.unwrap();

  assert!(report.is_completed());
  assert_eq!(ctx.read().log, vec!["notify"]);
}

#[tokio::test]
#[serial]
async fn before_on_after_run_in_phase_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutLog, TestError>::new(vec![StepDef::required("persist")]);
  pipeline.after_root("persist", recording_handler("after", 0));
  pipeline.on_root("persist", recording_handler("on", 0));
  pipeline.before_root("persist", recording_handler("before", 0));

  let ctx = ContextData::new(CheckoutLog::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().log, vec!["before", "on", "after"]);
}

#[tokio::test]
#[serial]
async fn handlers_share_one_context() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<CheckoutLog, TestError>::new(vec![StepDef::required("write"), StepDef::required("read")]);
  pipeline.on_root("write", |ctx: ContextData<CheckoutLog>| {
    Box::pin(async move {
      ctx.write().total = 15000;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  pipeline.on_root("read", |ctx: ContextData<CheckoutLog>| {
    Box::pin(async move {
      let seen = ctx.read().total;
      ctx.update(|c| c.log.push(format!("saw {seen}")));
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(CheckoutLog::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.snapshot().log, vec!["saw 15000"]);
}

#[test]
#[should_panic(expected = "not found in pipeline definition")]
fn registering_on_unknown_step_panics() {
  let mut pipeline = Pipeline::<CheckoutLog, TestError>::new(vec![StepDef::required("known")]);
  pipeline.on_root("typo", recording_handler("typo", 0));
}

#[test]
#[should_panic(expected = "defined twice")]
fn duplicate_step_names_panic() {
  let _ = Pipeline::<CheckoutLog, TestError>::new(vec![StepDef::required("dup"), StepDef::optional("dup")]);
}
