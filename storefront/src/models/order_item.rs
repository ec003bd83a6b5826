// storefront/src/models/order_item.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted order line. The unit price is the one captured at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub id: i64,
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub unit_price: i64,
}

/// One line of the customer's cart as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  #[serde(alias = "id")]
  pub product_id: i64,
  pub quantity: i32,
  #[serde(alias = "price")]
  pub unit_price: i64,
  /// Display name for the confirmation mail only; never persisted.
  #[serde(default)]
  pub name: Option<String>,
}

impl CartLine {
  /// `unit_price * quantity`, or `None` on overflow.
  pub fn line_total(&self) -> Option<i64> {
    self.unit_price.checked_mul(i64::from(self.quantity))
  }

  pub fn display_name(&self) -> String {
    match self.name.as_deref().map(str::trim) {
      Some(name) if !name.is_empty() => name.to_string(),
      _ => format!("Product #{}", self.product_id),
    }
  }
}
