// storefront/src/services/fulfillment.rs

//! Operator-side order updates: status changes and courier tracking.

use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderStatus, TrackingAssignment};
use crate::state::AppState;
use crate::store::{with_timeout, StatusWrite};

pub type TransitionRule = fn(OrderStatus, OrderStatus) -> bool;

/// Which status transitions an operator may make.
#[derive(Clone, Copy, Default)]
pub enum StatusPolicy {
  /// Any status to any status.
  #[default]
  Permissive,
  /// Forward along pending, processing, shipped, delivered. Cancellation only
  /// before shipping. Delivered and cancelled are final.
  Monotonic,
  Custom(TransitionRule),
}

impl StatusPolicy {
  pub fn permits(&self, from: OrderStatus, to: OrderStatus) -> bool {
    match self {
      StatusPolicy::Permissive => true,
      StatusPolicy::Monotonic => monotonic_transition(from, to),
      StatusPolicy::Custom(rule) => rule(from, to),
    }
  }

  fn reads_before_write(&self) -> bool {
    !matches!(self, StatusPolicy::Permissive)
  }
}

impl fmt::Debug for StatusPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      StatusPolicy::Permissive => "Permissive",
      StatusPolicy::Monotonic => "Monotonic",
      StatusPolicy::Custom(_) => "Custom",
    })
  }
}

impl FromStr for StatusPolicy {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "permissive" => Ok(StatusPolicy::Permissive),
      "monotonic" => Ok(StatusPolicy::Monotonic),
      other => Err(AppError::Config(format!(
        "ORDER_STATUS_POLICY must be permissive or monotonic (got '{}')",
        other
      ))),
    }
  }
}

fn stage(status: OrderStatus) -> u8 {
  match status {
    OrderStatus::Pending => 0,
    OrderStatus::Processing => 1,
    OrderStatus::Shipped => 2,
    OrderStatus::Delivered => 3,
    OrderStatus::Cancelled => 4,
  }
}

fn monotonic_transition(from: OrderStatus, to: OrderStatus) -> bool {
  if from.is_terminal() {
    return false;
  }
  match to {
    OrderStatus::Cancelled => matches!(from, OrderStatus::Pending | OrderStatus::Processing),
    _ => stage(to) > stage(from),
  }
}

/// Sets an order's status under the configured policy.
///
/// With a non-permissive policy the write is a compare-and-set on the status
/// that was checked, so a concurrent change yields `Conflict` instead of being
/// overwritten.
#[instrument(name = "fulfillment::update_status", skip(state), err(Display))]
pub async fn update_status(state: &AppState, order_id: i64, to: OrderStatus) -> AppResult<Order> {
  let policy = state.config.status_policy;
  let limit = state.config.external_call_timeout;
  let orders = &state.stores.orders;

  let expected = if policy.reads_before_write() {
    let current = with_timeout(limit, orders.find_order_by_id(order_id))
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
    if !policy.permits(current.status, to) {
      warn!(from = %current.status, %to, "Status transition refused by policy.");
      return Err(AppError::Conflict(format!(
        "Order {} cannot move from {} to {}.",
        order_id, current.status, to
      )));
    }
    Some(current.status)
  } else {
    None
  };

  match with_timeout(limit, orders.update_status(order_id, expected, to)).await? {
    StatusWrite::Updated(order) => {
      info!(order_code = %order.order_code, status = %order.status, "Order status updated.");
      Ok(order)
    }
    StatusWrite::NotFound => Err(AppError::NotFound(format!("Order {} not found.", order_id))),
    StatusWrite::Conflict { current } => Err(AppError::Conflict(format!(
      "Order {} changed concurrently (now {}); reload and retry.",
      order_id, current
    ))),
  }
}

/// Records courier tracking details and marks the order shipped, whatever its
/// current status.
#[instrument(name = "fulfillment::assign_tracking", skip(state, assignment), err(Display))]
pub async fn assign_tracking(state: &AppState, order_id: i64, assignment: TrackingAssignment) -> AppResult<Order> {
  let assignment = normalize_assignment(assignment)?;
  let limit = state.config.external_call_timeout;

  let order = with_timeout(limit, state.stores.orders.assign_tracking(order_id, &assignment))
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  info!(
    order_code = %order.order_code,
    courier = %assignment.courier_name,
    "Tracking assigned, order marked shipped."
  );
  Ok(order)
}

fn normalize_assignment(assignment: TrackingAssignment) -> AppResult<TrackingAssignment> {
  let tracking_number = assignment.tracking_number.trim().to_string();
  let courier_name = assignment.courier_name.trim().to_string();
  if tracking_number.is_empty() {
    return Err(AppError::Validation("Tracking number is required.".to_string()));
  }
  if courier_name.is_empty() {
    return Err(AppError::Validation("Courier name is required.".to_string()));
  }
  let shipping_proof_url = assignment
    .shipping_proof_url
    .map(|url| url.trim().to_string())
    .filter(|url| !url.is_empty());
  Ok(TrackingAssignment {
    tracking_number,
    courier_name,
    shipping_proof_url,
  })
}
