// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::order::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Merchant,
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::Customer => "customer",
      Role::Merchant => "merchant",
      Role::Admin => "admin",
    }
  }

  /// Merchants and admins run fulfillment (status and tracking updates).
  pub fn is_operator(self) -> bool {
    matches!(self, Role::Merchant | Role::Admin)
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = ParseEnumError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "customer" => Ok(Role::Customer),
      "merchant" => Ok(Role::Merchant),
      "admin" => Ok(Role::Admin),
      _ => Err(ParseEnumError {
        kind: "role",
        value: s.to_string(),
      }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role: Role,
  pub created_at: DateTime<Utc>,
}

/// The identity behind a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
  pub user_id: Uuid,
  pub email: String,
  pub role: Role,
}

/// What the placement workflow needs to know about a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerContact {
  pub id: Uuid,
  pub email: Option<String>,
}
