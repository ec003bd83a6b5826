// storefront/src/pipelines/mod.rs

//! Defines and registers the pipelines used by the storefront.

use crate::errors::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tarzify_flow::FlowRegistry;

pub mod contexts;

pub mod placement_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers every pipeline with `flows`. Called once at start-up.
pub fn register_all_pipelines(flows: &Arc<FlowRegistry<AppError>>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(flows, app_state);
  signin_pipeline::register_signin_pipeline(flows, app_state);
  placement_pipeline::register_placement_pipeline(flows, app_state);

  tracing::info!("All application pipelines registered.");
}
