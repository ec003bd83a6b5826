// storefront/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::email::EmailSender;
use crate::services::order_code::OrderCodeSource;
use crate::store::Stores;
use std::sync::Arc;
use tarzify_flow::FlowRegistry;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub stores: Stores,
  pub mailer: Arc<dyn EmailSender>,
  pub order_codes: Arc<dyn OrderCodeSource>,
}

impl AppState {
  /// Wires the collaborators together and registers every pipeline.
  pub fn assemble(
    config: Arc<AppConfig>,
    stores: Stores,
    mailer: Arc<dyn EmailSender>,
    order_codes: Arc<dyn OrderCodeSource>,
  ) -> Self {
    let app_state = Self {
      config,
      flows: Arc::new(FlowRegistry::new()),
      stores,
      mailer,
      order_codes,
    };
    pipelines::register_all_pipelines(&app_state.flows, &app_state);
    app_state
  }
}
