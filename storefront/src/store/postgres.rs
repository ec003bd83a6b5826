// storefront/src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
  AccountStore, Catalog, CustomerDirectory, OrderStore, StatusWrite, StockDecrement, StockLedger, StoreError,
};
use crate::models::{
  CartLine, CustomerContact, NewOrder, NewProduct, Order, OrderFilter, OrderItem, OrderStatus, PlacedOrder, Product,
  Role, SessionUser, TrackingAssignment, User,
};

const ORDER_COLUMNS: &str = "id, order_code, customer_id, total_amount, shipping_address, phone, payment_method, \
  status, tracking_number, courier_name, shipping_proof_url, needs_reconciliation, reconciliation_note, \
  created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price";

const PRODUCT_COLUMNS: &str = "id, name, sku, description, price, category, image_url, stock, created_at, updated_at";

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at";

/// Unique and check violations keep their constraint name; everything else stays a `sqlx::Error`.
fn map_db_error(err: sqlx::Error) -> StoreError {
  if let sqlx::Error::Database(db_err) = &err {
    let constraint = db_err.constraint().unwrap_or("unknown").to_string();
    if db_err.is_unique_violation() {
      return StoreError::DuplicateKey { constraint };
    }
    if db_err.is_check_violation() {
      return StoreError::CheckViolation { constraint };
    }
  }
  StoreError::Database(err)
}

#[derive(FromRow)]
struct OrderRow {
  id: i64,
  order_code: String,
  customer_id: Uuid,
  total_amount: i64,
  shipping_address: String,
  phone: String,
  payment_method: String,
  status: String,
  tracking_number: Option<String>,
  courier_name: Option<String>,
  shipping_proof_url: Option<String>,
  needs_reconciliation: bool,
  reconciliation_note: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = StoreError;

  fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
    let status = row
      .status
      .parse()
      .map_err(|e| StoreError::Corrupt(format!("order {}: {}", row.id, e)))?;
    let payment_method = row
      .payment_method
      .parse()
      .map_err(|e| StoreError::Corrupt(format!("order {}: {}", row.id, e)))?;
    Ok(Order {
      id: row.id,
      order_code: row.order_code,
      customer_id: row.customer_id,
      total_amount: row.total_amount,
      shipping_address: row.shipping_address,
      phone: row.phone,
      payment_method,
      status,
      tracking_number: row.tracking_number,
      courier_name: row.courier_name,
      shipping_proof_url: row.shipping_proof_url,
      needs_reconciliation: row.needs_reconciliation,
      reconciliation_note: row.reconciliation_note,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(FromRow)]
struct UserRow {
  id: Uuid,
  email: String,
  password_hash: String,
  role: String,
  created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
  type Error = StoreError;

  fn try_from(row: UserRow) -> Result<Self, Self::Error> {
    let role = row
      .role
      .parse()
      .map_err(|e| StoreError::Corrupt(format!("user {}: {}", row.id, e)))?;
    Ok(User {
      id: row.id,
      email: row.email,
      password_hash: row.password_hash,
      role,
      created_at: row.created_at,
    })
  }
}

fn orders_from_rows(rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
  rows.into_iter().map(Order::try_from).collect()
}

/// Postgres-backed implementation of every store seam.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  /// Applies the embedded migrations under `storefront/migrations`.
  #[instrument(name = "PgStore::migrate", skip(self), err(Display))]
  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(|e| StoreError::Migration(e.to_string()))
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "PgStore::insert_order_with_items", skip_all, fields(order_code = %order.order_code, lines = lines.len()), err(Display))]
  async fn insert_order_with_items(&self, order: &NewOrder, lines: &[CartLine]) -> Result<PlacedOrder, StoreError> {
    let mut tx = self.pool.begin().await.map_err(map_db_error)?;

    let insert_order = format!(
      "INSERT INTO orders (order_code, customer_id, total_amount, shipping_address, phone, payment_method, status) \
       VALUES ($1, $2, $3, $4, $5, $6, 'pending') RETURNING {ORDER_COLUMNS}"
    );
    let row: OrderRow = sqlx::query_as(&insert_order)
      .bind(&order.order_code)
      .bind(order.customer_id)
      .bind(order.total_amount)
      .bind(&order.shipping_address)
      .bind(&order.phone)
      .bind(order.payment_method.as_str())
      .fetch_one(&mut *tx)
      .await
      .map_err(map_db_error)?;
    let stored = Order::try_from(row)?;

    let insert_item = format!(
      "INSERT INTO order_items (order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4) \
       RETURNING {ORDER_ITEM_COLUMNS}"
    );
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
      let item: OrderItem = sqlx::query_as(&insert_item)
        .bind(stored.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
      items.push(item);
    }

    tx.commit().await.map_err(map_db_error)?;
    debug!(order_id = stored.id, "Order and lines committed.");
    Ok(PlacedOrder { order: stored, items })
  }

  async fn find_order_by_id(&self, order_id: i64) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(map_db_error)?;
    row.map(Order::try_from).transpose()
  }

  async fn find_order_by_code(&self, order_code: &str) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_code = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(order_code)
      .fetch_optional(&self.pool)
      .await
      .map_err(map_db_error)?;
    row.map(Order::try_from).transpose()
  }

  async fn items_for_order(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
    let sql = format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");
    sqlx::query_as(&sql)
      .bind(order_id)
      .fetch_all(&self.pool)
      .await
      .map_err(map_db_error)
  }

  #[instrument(name = "PgStore::update_status", skip(self), err(Display))]
  async fn update_status(
    &self,
    order_id: i64,
    expected: Option<OrderStatus>,
    to: OrderStatus,
  ) -> Result<StatusWrite, StoreError> {
    let sql = format!(
      "UPDATE orders SET status = $2, updated_at = now() \
       WHERE id = $1 AND ($3::text IS NULL OR status = $3) RETURNING {ORDER_COLUMNS}"
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(order_id)
      .bind(to.as_str())
      .bind(expected.map(OrderStatus::as_str))
      .fetch_optional(&self.pool)
      .await
      .map_err(map_db_error)?;

    match row {
      Some(row) => Ok(StatusWrite::Updated(Order::try_from(row)?)),
      None => match self.find_order_by_id(order_id).await? {
        Some(current) => Ok(StatusWrite::Conflict { current: current.status }),
        None => Ok(StatusWrite::NotFound),
      },
    }
  }

  #[instrument(name = "PgStore::assign_tracking", skip(self, assignment), err(Display))]
  async fn assign_tracking(
    &self,
    order_id: i64,
    assignment: &TrackingAssignment,
  ) -> Result<Option<Order>, StoreError> {
    let sql = format!(
      "UPDATE orders SET tracking_number = $2, courier_name = $3, shipping_proof_url = $4, \
       status = 'shipped', updated_at = now() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(order_id)
      .bind(&assignment.tracking_number)
      .bind(&assignment.courier_name)
      .bind(assignment.shipping_proof_url.as_deref())
      .fetch_optional(&self.pool)
      .await
      .map_err(map_db_error)?;
    row.map(Order::try_from).transpose()
  }

  async fn flag_for_reconciliation(&self, order_id: i64, note: &str) -> Result<(), StoreError> {
    sqlx::query(
      "UPDATE orders SET needs_reconciliation = TRUE, reconciliation_note = $2, updated_at = now() WHERE id = $1",
    )
    .bind(order_id)
    .bind(note)
    .execute(&self.pool)
    .await
    .map_err(map_db_error)?;
    Ok(())
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
    let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));
    if let Some(customer_id) = filter.customer_id {
      query.push(" AND customer_id = ").push_bind(customer_id);
    }
    if let Some(flag) = filter.needs_reconciliation {
      query.push(" AND needs_reconciliation = ").push_bind(flag);
    }
    query.push(" ORDER BY created_at DESC, id DESC LIMIT ").push_bind(filter.limit);

    let rows: Vec<OrderRow> = query
      .build_query_as()
      .fetch_all(&self.pool)
      .await
      .map_err(map_db_error)?;
    orders_from_rows(rows)
  }
}

#[async_trait]
impl StockLedger for PgStore {
  #[instrument(name = "PgStore::decrement_stock", skip(self), err(Display))]
  async fn decrement_stock(&self, product_id: i64, amount: i32) -> Result<StockDecrement, StoreError> {
    let remaining: Option<i32> = sqlx::query_scalar(
      "UPDATE products SET stock = stock - $2, updated_at = now() WHERE id = $1 AND stock >= $2 RETURNING stock",
    )
    .bind(product_id)
    .bind(amount)
    .fetch_optional(&self.pool)
    .await
    .map_err(map_db_error)?;

    if let Some(remaining) = remaining {
      return Ok(StockDecrement::Applied { remaining });
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
      .bind(product_id)
      .fetch_one(&self.pool)
      .await
      .map_err(map_db_error)?;
    Ok(if exists {
      StockDecrement::Insufficient
    } else {
      StockDecrement::UnknownProduct
    })
  }
}

#[async_trait]
impl CustomerDirectory for PgStore {
  async fn find_customer(&self, customer_id: Uuid) -> Result<Option<CustomerContact>, StoreError> {
    let row: Option<(Uuid, String)> = sqlx::query_as("SELECT id, email FROM users WHERE id = $1")
      .bind(customer_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(map_db_error)?;
    Ok(row.map(|(id, email)| CustomerContact {
      id,
      email: Some(email).filter(|e| !e.trim().is_empty()),
    }))
  }
}

#[async_trait]
impl AccountStore for PgStore {
  #[instrument(name = "PgStore::create_user", skip(self, password_hash), err(Display))]
  async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User, StoreError> {
    let sql = format!(
      "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    );
    let row: UserRow = sqlx::query_as(&sql)
      .bind(Uuid::new_v4())
      .bind(email)
      .bind(password_hash)
      .bind(role.as_str())
      .fetch_one(&self.pool)
      .await
      .map_err(map_db_error)?;
    User::try_from(row)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
    let row: Option<UserRow> = sqlx::query_as(&sql)
      .bind(email)
      .fetch_optional(&self.pool)
      .await
      .map_err(map_db_error)?;
    row.map(User::try_from).transpose()
  }

  async fn create_session(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
      .bind(token)
      .bind(user_id)
      .execute(&self.pool)
      .await
      .map_err(map_db_error)?;
    Ok(())
  }

  async fn resolve_session(&self, token: &str) -> Result<Option<SessionUser>, StoreError> {
    let row: Option<(Uuid, String, String)> = sqlx::query_as(
      "SELECT u.id, u.email, u.role FROM sessions s JOIN users u ON u.id = s.user_id \
       WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(&self.pool)
    .await
    .map_err(map_db_error)?;

    row
      .map(|(user_id, email, role)| {
        let role = role
          .parse()
          .map_err(|e| StoreError::Corrupt(format!("user {}: {}", user_id, e)))?;
        Ok(SessionUser { user_id, email, role })
      })
      .transpose()
  }

  #[instrument(name = "PgStore::update_password", skip(self, password_hash), err(Display))]
  async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
      .bind(user_id)
      .bind(password_hash)
      .execute(&self.pool)
      .await
      .map_err(map_db_error)?;
    Ok(result.rows_affected() == 1)
  }
}

#[async_trait]
impl Catalog for PgStore {
  async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name");
    sqlx::query_as(&sql).fetch_all(&self.pool).await.map_err(map_db_error)
  }

  async fn find_product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    sqlx::query_as(&sql)
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(map_db_error)
  }

  #[instrument(name = "PgStore::seed_products", skip_all, fields(count = products.len()), err(Display))]
  async fn seed_products(&self, products: &[NewProduct]) -> Result<u64, StoreError> {
    let mut written = 0;
    for product in products {
      let result = sqlx::query(
        "INSERT INTO products (name, sku, price, category, image_url, stock) VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (sku) DO UPDATE SET name = EXCLUDED.name, price = EXCLUDED.price, \
         category = EXCLUDED.category, image_url = EXCLUDED.image_url, stock = EXCLUDED.stock, updated_at = now()",
      )
      .bind(&product.name)
      .bind(&product.sku)
      .bind(product.price)
      .bind(&product.category)
      .bind(&product.image_url)
      .bind(product.stock)
      .execute(&self.pool)
      .await
      .map_err(map_db_error)?;
      written += result.rows_affected();
    }
    Ok(written)
  }
}
