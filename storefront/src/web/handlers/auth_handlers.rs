// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tarzify_flow::ContextData;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::state::AppState;
use crate::store::with_timeout;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize)]
pub struct PasswordUpdatePayload {
  pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let SignupRequestPayload { email, password } = req_payload.into_inner();
  let ctx_data = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    email,
    password,
    password_hash: None,
    created_user: None,
  });

  let report = app_state.flows.run(ctx_data.clone()).await?;
  if !report.is_completed() {
    warn!("Signup pipeline was stopped by a handler.");
    return Err(AppError::Internal("Signup process was halted by an internal step.".to_string()));
  }

  let user = ctx_data
    .read()
    .created_user
    .clone()
    .ok_or_else(|| AppError::Internal("Signup completed without creating a user.".to_string()))?;
  info!(user_id = %user.id, "Signup successful.");

  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "userId": user.id,
    "email": user.email,
    "role": user.role,
  })))
}

#[instrument(name = "handler::signin", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let SigninRequestPayload { email, password } = req_payload.into_inner();
  let ctx_data = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email,
    password,
    user: None,
    session_token: None,
  });

  let report = app_state.flows.run(ctx_data.clone()).await?;
  if !report.is_completed() {
    warn!("Signin pipeline was stopped by a handler.");
    return Err(AppError::Auth("Authentication process was unexpectedly halted.".to_string()));
  }

  let (session_user, token) = {
    let guard = ctx_data.read();
    (guard.session_user(), guard.session_token.clone())
  };
  let session_user = session_user.ok_or_else(|| AppError::Auth("Signin completed without a user.".to_string()))?;
  let token = token.ok_or_else(|| AppError::Auth("Signin completed without a session token.".to_string()))?;
  info!(user_id = %session_user.user_id, "Signin successful.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "userId": session_user.user_id,
    "email": session_user.email,
    "role": session_user.role,
    "token": token,
  })))
}

#[instrument(name = "handler::update_password", skip_all, fields(user_id = %user.user_id))]
pub async fn update_password_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<PasswordUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let PasswordUpdatePayload { password } = req_payload.into_inner();
  let password_hash = tokio::task::spawn_blocking(move || auth_service::hash_password(&password))
    .await
    .map_err(|join_err| AppError::Internal(format!("Password hashing task failed: {}", join_err)))??;

  let updated = with_timeout(
    app_state.config.external_call_timeout,
    app_state.stores.accounts.update_password(user.user_id, &password_hash),
  )
  .await?;
  if !updated {
    warn!("Session resolved to a user that no longer exists.");
    return Err(AppError::Auth("Invalid or expired session.".to_string()));
  }
  info!("Password updated.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Password updated successfully",
  })))
}
