// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline run. Handlers receive these wrapped in
//! `tarzify_flow::ContextData`.

use crate::models::{CustomerContact, PlacedOrder, PlacementRequest, SessionUser, User};
use crate::services::pricing::TotalBreakdown;
use crate::state::AppState;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub password_hash: Option<String>,
  pub created_user: Option<User>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub session_token: Option<String>,
}

impl SigninCtxData {
  pub fn session_user(&self) -> Option<SessionUser> {
    self.user.as_ref().map(|u| SessionUser {
      user_id: u.id,
      email: u.email.clone(),
      role: u.role,
    })
  }
}

/// Outcome of the stock decrement for one order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockLineResult {
  Decremented { remaining: i32 },
  Insufficient,
  UnknownProduct,
  Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLineOutcome {
  pub product_id: i64,
  pub quantity: i32,
  pub result: StockLineResult,
}

impl StockLineOutcome {
  pub fn is_shortfall(&self) -> bool {
    !matches!(self.result, StockLineResult::Decremented { .. })
  }
}

#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub app_state: AppState,
  pub request: PlacementRequest,
  pub amounts: Option<TotalBreakdown>,
  pub placed: Option<PlacedOrder>,
  pub code_attempts: u32,
  /// Set by customer verification; its email addresses the confirmation.
  pub customer: Option<CustomerContact>,
  pub confirmation_message_id: Option<String>,
  pub stock_outcomes: Vec<StockLineOutcome>,
}

impl PlaceOrderCtxData {
  pub fn new(app_state: AppState, request: PlacementRequest) -> Self {
    Self {
      app_state,
      request,
      amounts: None,
      placed: None,
      code_attempts: 0,
      customer: None,
      confirmation_message_id: None,
      stock_outcomes: Vec::new(),
    }
  }

  pub fn customer_email(&self) -> Option<&str> {
    self.customer.as_ref().and_then(|c| c.email.as_deref())
  }
}
