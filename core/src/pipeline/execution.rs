// tarzify-flow/src/pipeline/execution.rs

//! `Pipeline::run`: executes steps in order, applying each step's policy and timeout.

use crate::core::context_data::ContextData;
use crate::core::control::{DegradedStep, PipelineControl, RunReport};
use crate::core::step::{StepDef, StepPolicy};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs the pipeline against `ctx_data`.
  ///
  /// Errors from `Required`/`Optional` steps abort the run and are returned as-is.
  /// Errors and timeouts from `BestEffort` steps are logged and collected in
  /// `RunReport::degraded`, and the run moves on to the next step.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<RunReport, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut degraded = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = info_span!(
        "pipeline_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        policy = ?step_def.policy,
      );

      if let Some(skip_cond) = &step_def.skip_if {
        if skip_cond(ctx_data.clone()) {
          event!(parent: &step_span, Level::INFO, "Step skipped by its skip condition.");
          continue;
        }
      }

      if !self.has_handlers(&step_def.name) {
        if step_def.may_be_empty() {
          event!(parent: &step_span, Level::DEBUG, "Step has no handlers, passing over it.");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "Required step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let outcome = self.run_step(step_def, ctx_data.clone()).instrument(step_span.clone()).await;

      match outcome {
        Ok(PipelineControl::Continue) => {
          event!(parent: &step_span, Level::DEBUG, "Step finished.");
        }
        Ok(PipelineControl::Stop) => {
          event!(parent: &step_span, Level::INFO, "Pipeline stopped by a handler.");
          return Ok(RunReport::stopped(degraded));
        }
        Err(e) if step_def.policy == StepPolicy::BestEffort => {
          event!(parent: &step_span, Level::WARN, error = %e, "Best-effort step failed, continuing.");
          degraded.push(DegradedStep {
            step_name: step_def.name.clone(),
            error: e.to_string(),
          });
        }
        Err(e) => {
          event!(parent: &step_span, Level::ERROR, error = %e, "Step failed.");
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, degraded_steps = degraded.len(), "Pipeline execution completed.");
    Ok(RunReport::completed(degraded))
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: ContextData<TData>) -> Result<PipelineControl, Err> {
    match step_def.timeout {
      Some(limit) => match tokio::time::timeout(limit, self.run_phases(&step_def.name, ctx_data)).await {
        Ok(outcome) => outcome,
        Err(_elapsed) => Err(Err::from(FlowError::StepTimedOut {
          step_name: step_def.name.clone(),
          limit,
        })),
      },
      None => self.run_phases(&step_def.name, ctx_data).await,
    }
  }

  async fn run_phases(&self, step_name: &str, ctx_data: ContextData<TData>) -> Result<PipelineControl, Err> {
    for (phase_name, table) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      let Some(handlers) = table.get(step_name) else {
        continue;
      };
      for (handler_idx, handler_fn) in handlers.iter().enumerate() {
        event!(Level::TRACE, phase = phase_name, handler_index = handler_idx, "Running handler.");
        if handler_fn(ctx_data.clone()).await? == PipelineControl::Stop {
          return Ok(PipelineControl::Stop);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }
}
