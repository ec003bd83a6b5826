// storefront/src/web/extractors.rs

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::Role;
use crate::state::AppState;
use crate::store::with_timeout;

/// The caller behind `Authorization: Bearer <token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub email: String,
  pub role: Role,
}

impl AuthenticatedUser {
  /// Merchants and admins only.
  pub fn require_operator(&self) -> AppResult<()> {
    if self.role.is_operator() {
      Ok(())
    } else {
      Err(AppError::Forbidden("Merchant or admin role required.".to_string()))
    }
  }

  pub fn require_admin(&self) -> AppResult<()> {
    if self.role == Role::Admin {
      Ok(())
    } else {
      Err(AppError::Forbidden("Admin role required.".to_string()))
    }
  }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
  let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  let token = token.trim();
  (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let app_state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);

    Box::pin(async move {
      let app_state = app_state.ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
      let token = token.ok_or_else(|| AppError::Auth("Missing bearer token.".to_string()))?;

      let session = with_timeout(
        app_state.config.external_call_timeout,
        app_state.stores.accounts.resolve_session(&token),
      )
      .await?
      .ok_or_else(|| AppError::Auth("Invalid or expired session.".to_string()))?;

      Ok(AuthenticatedUser {
        user_id: session.user_id,
        email: session.email,
        role: session.role,
      })
    })
  }
}
