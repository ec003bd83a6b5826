// storefront/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use tarzify_flow::FlowError;
use thiserror::Error;

use crate::services::email::EmailError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  /// No unique order code after the configured number of attempts.
  #[error("Could not allocate a unique order code after {attempts} attempts")]
  OrderCodeExhausted { attempts: u32 },

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(#[from] StoreError),

  #[error("Email Error: {0}")]
  Email(#[from] EmailError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<StoreError>() {
        Ok(store_err) => AppError::Store(store_err),
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

impl AppError {
  /// Message shown to clients. Backend details stay in the logs.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m) => m.clone(),
      AppError::OrderCodeExhausted { .. } => {
        "Could not allocate an order number right now. Please try again.".to_string()
      }
      AppError::Store(StoreError::DuplicateKey { .. }) => "Resource already exists.".to_string(),
      AppError::Store(StoreError::TimedOut { .. }) => "The data store did not respond in time.".to_string(),
      AppError::Store(_) => "Database operation failed.".to_string(),
      AppError::Email(_) => "Email service error.".to_string(),
      AppError::Config(_) => "Configuration issue.".to_string(),
      AppError::Workflow { source } => match source {
        FlowError::StepTimedOut { step_name, .. } => format!("Step '{}' did not complete in time.", step_name),
        _ => "Workflow processing error.".to_string(),
      },
      AppError::Internal(_) => "An internal error occurred.".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::OrderCodeExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Store(StoreError::DuplicateKey { .. }) => StatusCode::CONFLICT,
      AppError::Store(StoreError::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
      AppError::Workflow {
        source: FlowError::StepTimedOut { .. },
      } => StatusCode::GATEWAY_TIMEOUT,
      AppError::Store(_) | AppError::Email(_) | AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::debug!(application_error = %self, "Responding with client error");
    }
    HttpResponse::build(status).json(json!({"success": false, "error": self.public_message()}))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn anyhow_round_trip_keeps_the_app_error() {
    let wrapped = anyhow::Error::new(AppError::NotFound("order".into()));
    assert!(matches!(AppError::from(wrapped), AppError::NotFound(m) if m == "order"));
  }

  #[test]
  fn statuses_follow_the_error_kind() {
    assert_eq!(AppError::OrderCodeExhausted { attempts: 3 }.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
      AppError::Store(StoreError::DuplicateKey { constraint: "users_email_key".into() }).status_code(),
      StatusCode::CONFLICT
    );
    let timed_out = AppError::Workflow {
      source: FlowError::StepTimedOut {
        step_name: "persist_order".into(),
        limit: Duration::from_millis(10),
      },
    };
    assert_eq!(timed_out.status_code(), StatusCode::GATEWAY_TIMEOUT);
  }

  #[test]
  fn store_details_are_not_exposed() {
    let err = AppError::Store(StoreError::Unavailable("connection refused at 10.0.0.3".into()));
    assert_eq!(err.public_message(), "Database operation failed.");
  }
}
