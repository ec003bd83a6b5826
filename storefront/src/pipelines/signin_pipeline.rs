// storefront/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use crate::state::AppState;
use std::sync::Arc;
use tarzify_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, StepDef};
use tracing::{event, info, warn, Level};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

pub fn register_signin_pipeline(flows: &Arc<FlowRegistry<AppError>>, app_state: &AppState) {
  let call_limit = app_state.config.external_call_timeout;

  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(vec![
    StepDef::required("validate_signin_input"),
    StepDef::required("fetch_user_by_email").with_timeout(call_limit),
    StepDef::required("verify_user_password"),
    StepDef::required("issue_session_token").with_timeout(call_limit),
  ]);

  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, password_is_empty) = {
        let guard = ctx_data.read();
        (guard.email.trim().to_string(), guard.password.is_empty())
      };

      event!(Level::DEBUG, %email, "Validating sign-in input.");
      if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if password_is_empty {
        return Err(AppError::Validation("Password is required.".to_string()));
      }
      ctx_data.write().email = email;
      Ok(PipelineControl::Continue)
    })
  });

  signin_p.on_root("fetch_user_by_email", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, accounts) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.stores.accounts.clone())
      };

      match accounts.find_user_by_email(&email).await? {
        Some(user) => {
          event!(Level::DEBUG, user_id = %user.id, "User found for sign-in.");
          ctx_data.write().user = Some(user);
          Ok(PipelineControl::Continue)
        }
        None => {
          warn!(%email, "Sign-in for an unknown email.");
          Err(AppError::Auth(INVALID_CREDENTIALS.to_string()))
        }
      }
    })
  });

  signin_p.on_root("verify_user_password", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (stored_hash, password) = {
        let guard = ctx_data.read();
        (
          guard.user.as_ref().map(|u| u.password_hash.clone()),
          guard.password.clone(),
        )
      };
      let stored_hash =
        stored_hash.ok_or_else(|| AppError::Internal("User missing at password verification.".to_string()))?;

      let matches = tokio::task::spawn_blocking(move || auth_service::verify_password(&stored_hash, &password))
        .await
        .map_err(|join_err| AppError::Internal(format!("Password verification task failed: {}", join_err)))??;
      if !matches {
        warn!("Sign-in with a wrong password.");
        return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  signin_p.on_root("issue_session_token", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (user_id, accounts) = {
        let guard = ctx_data.read();
        (guard.user.as_ref().map(|u| u.id), guard.app_state.stores.accounts.clone())
      };
      let user_id = user_id.ok_or_else(|| AppError::Internal("User missing at token issue.".to_string()))?;

      let token = auth_service::generate_session_token();
      accounts.create_session(user_id, &token).await?;
      info!(%user_id, "Session issued.");
      ctx_data.write().session_token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(signin_p);
  tracing::info!("Sign-in pipeline registered.");
}
