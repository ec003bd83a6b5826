// storefront/src/models/order.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::order_item::{CartLine, OrderItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
  pub kind: &'static str,
  pub value: String,
}

/// Order lifecycle. `Cancelled` is reserved: operators may set it, but nothing
/// in the placement workflow produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = ParseEnumError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_ascii_lowercase();
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == wanted)
      .ok_or_else(|| ParseEnumError {
        kind: "order status",
        value: s.to_string(),
      })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  #[default]
  FastPay,
  Cod,
}

impl PaymentMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentMethod::FastPay => "fastpay",
      PaymentMethod::Cod => "cod",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      PaymentMethod::FastPay => "FastPay",
      PaymentMethod::Cod => "Cash on Delivery",
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentMethod {
  type Err = ParseEnumError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "fastpay" => Ok(PaymentMethod::FastPay),
      "cod" => Ok(PaymentMethod::Cod),
      _ => Err(ParseEnumError {
        kind: "payment method",
        value: s.to_string(),
      }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: i64,
  pub order_code: String,
  pub customer_id: Uuid,
  /// Whole currency units (Rs.), shipping included.
  pub total_amount: i64,
  pub shipping_address: String,
  pub phone: String,
  pub payment_method: PaymentMethod,
  pub status: OrderStatus,
  pub tracking_number: Option<String>,
  pub courier_name: Option<String>,
  pub shipping_proof_url: Option<String>,
  /// Set when a best-effort side effect (stock decrement) failed after placement.
  pub needs_reconciliation: bool,
  pub reconciliation_note: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The order row as inserted; status is always `pending` at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
  pub order_code: String,
  pub customer_id: Uuid,
  pub total_amount: i64,
  pub shipping_address: String,
  pub phone: String,
  pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
  pub order: Order,
  pub items: Vec<OrderItem>,
}

/// Validated input of the placement workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
  pub customer_id: Uuid,
  pub lines: Vec<CartLine>,
  pub total: i64,
  pub shipping_address: String,
  pub phone: String,
  pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingAssignment {
  pub tracking_number: String,
  pub courier_name: String,
  pub shipping_proof_url: Option<String>,
}

/// Public tracking view. Carries no address, phone or customer id, since
/// the only credential for reading it is the order code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOrder {
  pub order_code: String,
  pub status: OrderStatus,
  pub total_amount: i64,
  pub courier_name: Option<String>,
  pub tracking_number: Option<String>,
  pub placed_on: NaiveDate,
  pub last_updated_on: NaiveDate,
}

impl From<&Order> for TrackedOrder {
  fn from(order: &Order) -> Self {
    Self {
      order_code: order.order_code.clone(),
      status: order.status,
      total_amount: order.total_amount,
      courier_name: order.courier_name.clone(),
      tracking_number: order.tracking_number.clone(),
      placed_on: order.created_at.date_naive(),
      last_updated_on: order.updated_at.date_naive(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
  pub customer_id: Option<Uuid>,
  pub needs_reconciliation: Option<bool>,
  pub limit: i64,
}

impl OrderFilter {
  pub const DEFAULT_LIMIT: i64 = 200;

  pub fn all() -> Self {
    Self {
      customer_id: None,
      needs_reconciliation: None,
      limit: Self::DEFAULT_LIMIT,
    }
  }

  pub fn for_customer(customer_id: Uuid) -> Self {
    Self {
      customer_id: Some(customer_id),
      ..Self::all()
    }
  }

  pub fn needing_reconciliation() -> Self {
    Self {
      needs_reconciliation: Some(true),
      ..Self::all()
    }
  }

  pub fn matches(&self, order: &Order) -> bool {
    self.customer_id.map_or(true, |c| order.customer_id == c)
      && self.needs_reconciliation.map_or(true, |flag| order.needs_reconciliation == flag)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_parsing_is_case_and_space_insensitive() {
    assert_eq!(" Shipped ".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    assert_eq!("CANCELLED".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
    let err = "lost".parse::<OrderStatus>().unwrap_err();
    assert_eq!(err.kind, "order status");
  }

  #[test]
  fn payment_method_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&PaymentMethod::FastPay).unwrap(), "\"fastpay\"");
    assert_eq!(serde_json::from_str::<PaymentMethod>("\"cod\"").unwrap(), PaymentMethod::Cod);
    assert!("card".parse::<PaymentMethod>().is_err());
  }

  #[test]
  fn only_delivered_and_cancelled_are_terminal() {
    let terminal: Vec<_> = OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()).collect();
    assert_eq!(terminal, vec![OrderStatus::Delivered, OrderStatus::Cancelled]);
  }
}
