// storefront/src/services/pricing.rs

//! Shipping rates and the order-total check applied at placement.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{CartLine, PaymentMethod};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRate {
  pub id: PaymentMethod,
  pub name: String,
  pub price: i64,
  pub estimated_days: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShippingRates(Vec<ShippingRate>);

impl ShippingRates {
  pub fn new(fastpay: i64, cod: i64) -> Self {
    Self(vec![
      ShippingRate {
        id: PaymentMethod::FastPay,
        name: "Standard (PayFast)".to_string(),
        price: fastpay,
        estimated_days: "3-5".to_string(),
      },
      ShippingRate {
        id: PaymentMethod::Cod,
        name: "Cash on Delivery (COD)".to_string(),
        price: cod,
        estimated_days: "3-5".to_string(),
      },
    ])
  }

  pub fn rate_for(&self, method: PaymentMethod) -> Option<i64> {
    self.0.iter().find(|r| r.id == method).map(|r| r.price)
  }

  pub fn as_slice(&self) -> &[ShippingRate] {
    &self.0
  }
}

impl Default for ShippingRates {
  fn default() -> Self {
    Self::new(250, 300)
  }
}

/// How the client-supplied total is treated at placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalCheck {
  /// Store the total as given.
  Trust,
  /// Store the total as given, log when it differs from subtotal plus shipping rate.
  #[default]
  Warn,
  /// Reject totals that differ from subtotal plus shipping rate.
  Enforce,
}

impl fmt::Display for TotalCheck {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      TotalCheck::Trust => "trust",
      TotalCheck::Warn => "warn",
      TotalCheck::Enforce => "enforce",
    })
  }
}

impl FromStr for TotalCheck {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "trust" => Ok(TotalCheck::Trust),
      "warn" => Ok(TotalCheck::Warn),
      "enforce" => Ok(TotalCheck::Enforce),
      other => Err(AppError::Config(format!(
        "ORDER_TOTAL_CHECK must be trust, warn or enforce (got '{}')",
        other
      ))),
    }
  }
}

/// Amounts shown in the confirmation mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalBreakdown {
  pub subtotal: i64,
  /// `total - subtotal`, whatever the client charged for shipping.
  pub shipping: i64,
  pub total: i64,
}

/// Sum of `unit_price * quantity`. Overflow is a validation error.
pub fn subtotal(lines: &[CartLine]) -> AppResult<i64> {
  lines.iter().try_fold(0i64, |acc, line| {
    line
      .line_total()
      .and_then(|line_total| acc.checked_add(line_total))
      .ok_or_else(|| AppError::Validation("Order amounts are out of range.".to_string()))
  })
}

pub fn check_total(
  mode: TotalCheck,
  rates: &ShippingRates,
  lines: &[CartLine],
  method: PaymentMethod,
  total: i64,
) -> AppResult<TotalBreakdown> {
  let subtotal = subtotal(lines)?;
  let breakdown = TotalBreakdown {
    subtotal,
    shipping: total - subtotal,
    total,
  };
  if mode == TotalCheck::Trust {
    return Ok(breakdown);
  }

  let expected = rates.rate_for(method).map(|rate| subtotal + rate);
  if expected == Some(total) {
    return Ok(breakdown);
  }

  match mode {
    TotalCheck::Enforce => Err(AppError::Validation(format!(
      "Order total {} does not match the cart ({} expected).",
      total,
      expected.map_or_else(|| "no rate".to_string(), |e| e.to_string())
    ))),
    _ => {
      warn!(
        total,
        subtotal,
        expected_total = ?expected,
        payment_method = %method,
        "Client-supplied order total differs from subtotal plus shipping rate; storing it as given."
      );
      Ok(breakdown)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lines() -> Vec<CartLine> {
    vec![
      CartLine {
        product_id: 1,
        quantity: 2,
        unit_price: 5000,
        name: None,
      },
      CartLine {
        product_id: 2,
        quantity: 1,
        unit_price: 3000,
        name: None,
      },
    ]
  }

  #[test]
  fn default_rate_table_names_both_methods() {
    let rates = ShippingRates::default();
    let names: Vec<_> = rates.as_slice().iter().map(|r| (r.name.as_str(), r.estimated_days.as_str())).collect();
    assert_eq!(names, vec![("Standard (PayFast)", "3-5"), ("Cash on Delivery (COD)", "3-5")]);
    assert_eq!(rates.rate_for(PaymentMethod::Cod), Some(300));
  }

  #[test]
  fn subtotal_sums_captured_prices() {
    assert_eq!(subtotal(&lines()).unwrap(), 13000);
  }

  #[test]
  fn warn_mode_accepts_a_mismatching_total() {
    let breakdown = check_total(TotalCheck::Warn, &ShippingRates::default(), &lines(), PaymentMethod::FastPay, 15000)
      .unwrap();
    assert_eq!(breakdown.shipping, 2000);
  }

  #[test]
  fn enforce_mode_rejects_a_mismatching_total_and_accepts_the_exact_one() {
    let rates = ShippingRates::default();
    let err = check_total(TotalCheck::Enforce, &rates, &lines(), PaymentMethod::FastPay, 15000).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let ok = check_total(TotalCheck::Enforce, &rates, &lines(), PaymentMethod::Cod, 13300).unwrap();
    assert_eq!(ok.shipping, 300);
  }

  #[test]
  fn overflowing_amounts_are_rejected() {
    let huge = vec![CartLine {
      product_id: 1,
      quantity: 2,
      unit_price: i64::MAX,
      name: None,
    }];
    assert!(subtotal(&huge).is_err());
  }
}
