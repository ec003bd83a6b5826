// storefront/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::Role;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use crate::state::AppState;
use crate::store::USER_EMAIL_CONSTRAINT;
use std::sync::Arc;
use tarzify_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, StepDef};
use tracing::{event, info, warn, Level};

pub fn register_signup_pipeline(flows: &Arc<FlowRegistry<AppError>>, app_state: &AppState) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(vec![
    StepDef::required("validate_signup_input"),
    StepDef::required("hash_signup_password"),
    StepDef::required("create_user").with_timeout(app_state.config.external_call_timeout),
  ]);

  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let email = ctx_data.read().email.trim().to_ascii_lowercase();

      event!(Level::DEBUG, %email, "Validating signup input.");
      if email.is_empty() || !email.contains('@') {
        warn!("Invalid email format provided for signup.");
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      ctx_data.write().email = email;
      Ok(PipelineControl::Continue)
    })
  });

  // Length rules live in `hash_password`.
  signup_p.on_root("hash_signup_password", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let password = ctx_data.read().password.clone();
      let hash = tokio::task::spawn_blocking(move || auth_service::hash_password(&password))
        .await
        .map_err(|join_err| AppError::Internal(format!("Password hashing task failed: {}", join_err)))??;
      ctx_data.write().password_hash = Some(hash);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signup_p.on_root("create_user", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, password_hash, accounts) = {
        let guard = ctx_data.read();
        (
          guard.email.clone(),
          guard.password_hash.clone(),
          guard.app_state.stores.accounts.clone(),
        )
      };
      let password_hash =
        password_hash.ok_or_else(|| AppError::Internal("Password hash missing at user creation.".to_string()))?;

      match accounts.create_user(&email, &password_hash, Role::Customer).await {
        Ok(user) => {
          info!(user_id = %user.id, "User created.");
          ctx_data.write().created_user = Some(user);
          Ok(PipelineControl::Continue)
        }
        Err(e) if e.is_duplicate_of(USER_EMAIL_CONSTRAINT) => {
          warn!(%email, "Signup with an email that is already registered.");
          Err(AppError::Conflict("An account with this email already exists.".to_string()))
        }
        Err(e) => Err(AppError::Store(e)),
      }
    })
  });

  flows.register_pipeline(signup_p);
  tracing::info!("Sign-up pipeline registered.");
}
