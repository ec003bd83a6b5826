// storefront/src/store/mod.rs

//! Persistence seams. Workflows talk to these traits only; `PgStore` backs them
//! with Postgres and `MemoryStore` with in-process maps.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
  CartLine, CustomerContact, NewOrder, NewProduct, Order, OrderFilter, OrderItem, OrderStatus, PlacedOrder, Product,
  Role, SessionUser, TrackingAssignment, User,
};

/// Unique constraint on `orders.order_code`.
pub const ORDER_CODE_CONSTRAINT: &str = "orders_order_code_key";
/// Unique constraint on `users.email`.
pub const USER_EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("duplicate key violates unique constraint '{constraint}'")]
  DuplicateKey { constraint: String },

  #[error("row violates check constraint '{constraint}'")]
  CheckViolation { constraint: String },

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("stored record is unreadable: {0}")]
  Corrupt(String),

  #[error("migration failed: {0}")]
  Migration(String),

  #[error("store call exceeded {limit:?}")]
  TimedOut { limit: Duration },

  #[error("store unavailable: {0}")]
  Unavailable(String),
}

impl StoreError {
  pub fn is_duplicate_of(&self, constraint: &str) -> bool {
    matches!(self, StoreError::DuplicateKey { constraint: c } if c == constraint)
  }
}

/// Bounds a store call. Elapsed calls become `StoreError::TimedOut`.
pub async fn with_timeout<T>(
  limit: Duration,
  call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
  match tokio::time::timeout(limit, call).await {
    Ok(result) => result,
    Err(_elapsed) => Err(StoreError::TimedOut { limit }),
  }
}

/// Result of `UPDATE orders SET status ...` with an optional expected current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusWrite {
  Updated(Order),
  NotFound,
  /// The row exists but its status was not the expected one.
  Conflict { current: OrderStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
  Applied { remaining: i32 },
  Insufficient,
  UnknownProduct,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Writes the order (status `pending`) and all its lines atomically: either
  /// both are stored or neither is.
  async fn insert_order_with_items(&self, order: &NewOrder, lines: &[CartLine]) -> Result<PlacedOrder, StoreError>;

  async fn find_order_by_id(&self, order_id: i64) -> Result<Option<Order>, StoreError>;

  /// Exact match on an already normalized code.
  async fn find_order_by_code(&self, order_code: &str) -> Result<Option<Order>, StoreError>;

  async fn items_for_order(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError>;

  /// Sets the status; when `expected` is given, only if the stored status still equals it.
  async fn update_status(
    &self,
    order_id: i64,
    expected: Option<OrderStatus>,
    to: OrderStatus,
  ) -> Result<StatusWrite, StoreError>;

  /// Stores tracking details and sets the status to `shipped` in one write.
  async fn assign_tracking(
    &self,
    order_id: i64,
    assignment: &TrackingAssignment,
  ) -> Result<Option<Order>, StoreError>;

  async fn flag_for_reconciliation(&self, order_id: i64, note: &str) -> Result<(), StoreError>;

  /// Newest first.
  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;
}

#[async_trait]
pub trait StockLedger: Send + Sync {
  /// Decrements stock only if enough is on hand. Never goes negative.
  async fn decrement_stock(&self, product_id: i64, amount: i32) -> Result<StockDecrement, StoreError>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
  async fn find_customer(&self, customer_id: Uuid) -> Result<Option<CustomerContact>, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
  async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User, StoreError>;

  /// Case-insensitive on the email.
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

  async fn create_session(&self, user_id: Uuid, token: &str) -> Result<(), StoreError>;

  /// `None` for unknown or expired tokens.
  async fn resolve_session(&self, token: &str) -> Result<Option<SessionUser>, StoreError>;

  /// `false` when no such user exists.
  async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
  async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

  async fn find_product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;

  /// Upserts by SKU. Returns the number of rows written.
  async fn seed_products(&self, products: &[NewProduct]) -> Result<u64, StoreError>;
}

/// The collaborators the workflows use, each behind its own seam.
#[derive(Clone)]
pub struct Stores {
  pub orders: Arc<dyn OrderStore>,
  pub stock: Arc<dyn StockLedger>,
  pub customers: Arc<dyn CustomerDirectory>,
  pub accounts: Arc<dyn AccountStore>,
  pub catalog: Arc<dyn Catalog>,
}

impl Stores {
  /// Uses one backend for every seam.
  pub fn from_shared<S>(backend: Arc<S>) -> Self
  where
    S: OrderStore + StockLedger + CustomerDirectory + AccountStore + Catalog + 'static,
  {
    Self {
      orders: backend.clone(),
      stock: backend.clone(),
      customers: backend.clone(),
      accounts: backend.clone(),
      catalog: backend,
    }
  }
}
