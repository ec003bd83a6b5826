// storefront/src/store/memory.rs

//! In-process store with the same semantics as `PgStore`, including atomic
//! order writes and unique order codes. Used by tests and local demos; it also
//! carries a few switches to inject failures.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use super::{
  AccountStore, Catalog, CustomerDirectory, OrderStore, StatusWrite, StockDecrement, StockLedger, StoreError,
  ORDER_CODE_CONSTRAINT, USER_EMAIL_CONSTRAINT,
};
use crate::models::{
  CartLine, CustomerContact, NewOrder, NewProduct, Order, OrderFilter, OrderItem, OrderStatus, PlacedOrder, Product,
  Role, SessionUser, TrackingAssignment, User,
};

const SESSION_TTL_DAYS: i64 = 7;

#[derive(Default)]
struct MemoryState {
  orders: BTreeMap<i64, Order>,
  items: Vec<OrderItem>,
  products: BTreeMap<i64, Product>,
  users: Vec<User>,
  sessions: HashMap<String, (Uuid, chrono::DateTime<Utc>)>,
  next_order_id: i64,
  next_item_id: i64,
  next_product_id: i64,
  // Fault switches.
  rejected_item_products: HashSet<i64>,
  failing_stock_products: HashSet<i64>,
  failing_reconciliation_flag: bool,
  customer_directory_down: bool,
  order_inserts_down: bool,
  customer_lookups: usize,
}

#[derive(Default)]
pub struct MemoryStore {
  state: Mutex<MemoryState>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a customer account with an unusable password hash and returns its id.
  pub fn add_customer(&self, email: &str) -> Uuid {
    let user = User {
      id: Uuid::new_v4(),
      email: email.to_string(),
      password_hash: String::new(),
      role: Role::Customer,
      created_at: Utc::now(),
    };
    let id = user.id;
    self.state.lock().users.push(user);
    id
  }

  pub fn add_product(&self, name: &str, price: i64, stock: i32) -> i64 {
    let mut state = self.state.lock();
    state.next_product_id += 1;
    let id = state.next_product_id;
    let now = Utc::now();
    state.products.insert(
      id,
      Product {
        id,
        name: name.to_string(),
        sku: format!("SKU-{id:03}"),
        description: None,
        price,
        category: None,
        image_url: None,
        stock,
        created_at: now,
        updated_at: now,
      },
    );
    id
  }

  pub fn set_product_price(&self, product_id: i64, price: i64) {
    if let Some(product) = self.state.lock().products.get_mut(&product_id) {
      product.price = price;
      product.updated_at = Utc::now();
    }
  }

  pub fn stock_of(&self, product_id: i64) -> Option<i32> {
    self.state.lock().products.get(&product_id).map(|p| p.stock)
  }

  pub fn order_count(&self) -> usize {
    self.state.lock().orders.len()
  }

  pub fn item_count(&self) -> usize {
    self.state.lock().items.len()
  }

  /// Makes any order containing `product_id` fail while its lines are written.
  pub fn reject_items_for_product(&self, product_id: i64) {
    self.state.lock().rejected_item_products.insert(product_id);
  }

  /// Makes stock decrements for `product_id` fail with `StoreError::Unavailable`.
  pub fn fail_stock_for_product(&self, product_id: i64) {
    self.state.lock().failing_stock_products.insert(product_id);
  }

  pub fn fail_reconciliation_flags(&self) {
    self.state.lock().failing_reconciliation_flag = true;
  }

  pub fn take_customer_directory_down(&self) {
    self.state.lock().customer_directory_down = true;
  }

  /// Makes every order insert fail with `StoreError::Unavailable`.
  pub fn fail_order_inserts(&self) {
    self.state.lock().order_inserts_down = true;
  }

  pub fn customer_lookups(&self) -> usize {
    self.state.lock().customer_lookups
  }

  /// Ages a session so it resolves as expired.
  pub fn expire_session(&self, token: &str) {
    if let Some(entry) = self.state.lock().sessions.get_mut(token) {
      entry.1 = Utc::now() - ChronoDuration::seconds(1);
    }
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert_order_with_items(&self, order: &NewOrder, lines: &[CartLine]) -> Result<PlacedOrder, StoreError> {
    let mut state = self.state.lock();

    if state.order_inserts_down {
      return Err(StoreError::Unavailable("orders table is unavailable".to_string()));
    }
    if state.orders.values().any(|o| o.order_code == order.order_code) {
      return Err(StoreError::DuplicateKey {
        constraint: ORDER_CODE_CONSTRAINT.to_string(),
      });
    }
    // Validate every line before touching the maps, so a failure leaves nothing behind.
    for line in lines {
      if line.quantity < 1 {
        return Err(StoreError::CheckViolation {
          constraint: "order_items_quantity_check".to_string(),
        });
      }
      if state.rejected_item_products.contains(&line.product_id) {
        return Err(StoreError::Unavailable(format!(
          "order line for product {} was rejected",
          line.product_id
        )));
      }
    }

    state.next_order_id += 1;
    let order_id = state.next_order_id;
    let now = Utc::now();
    let stored = Order {
      id: order_id,
      order_code: order.order_code.clone(),
      customer_id: order.customer_id,
      total_amount: order.total_amount,
      shipping_address: order.shipping_address.clone(),
      phone: order.phone.clone(),
      payment_method: order.payment_method,
      status: OrderStatus::Pending,
      tracking_number: None,
      courier_name: None,
      shipping_proof_url: None,
      needs_reconciliation: false,
      reconciliation_note: None,
      created_at: now,
      updated_at: now,
    };

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
      state.next_item_id += 1;
      items.push(OrderItem {
        id: state.next_item_id,
        order_id,
        product_id: line.product_id,
        quantity: line.quantity,
        unit_price: line.unit_price,
      });
    }

    state.orders.insert(order_id, stored.clone());
    state.items.extend(items.iter().cloned());
    Ok(PlacedOrder { order: stored, items })
  }

  async fn find_order_by_id(&self, order_id: i64) -> Result<Option<Order>, StoreError> {
    Ok(self.state.lock().orders.get(&order_id).cloned())
  }

  async fn find_order_by_code(&self, order_code: &str) -> Result<Option<Order>, StoreError> {
    Ok(
      self
        .state
        .lock()
        .orders
        .values()
        .find(|o| o.order_code == order_code)
        .cloned(),
    )
  }

  async fn items_for_order(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
    Ok(
      self
        .state
        .lock()
        .items
        .iter()
        .filter(|i| i.order_id == order_id)
        .cloned()
        .collect(),
    )
  }

  async fn update_status(
    &self,
    order_id: i64,
    expected: Option<OrderStatus>,
    to: OrderStatus,
  ) -> Result<StatusWrite, StoreError> {
    let mut state = self.state.lock();
    let Some(order) = state.orders.get_mut(&order_id) else {
      return Ok(StatusWrite::NotFound);
    };
    if let Some(expected) = expected {
      if order.status != expected {
        return Ok(StatusWrite::Conflict { current: order.status });
      }
    }
    order.status = to;
    order.updated_at = Utc::now();
    Ok(StatusWrite::Updated(order.clone()))
  }

  async fn assign_tracking(
    &self,
    order_id: i64,
    assignment: &TrackingAssignment,
  ) -> Result<Option<Order>, StoreError> {
    let mut state = self.state.lock();
    Ok(state.orders.get_mut(&order_id).map(|order| {
      order.tracking_number = Some(assignment.tracking_number.clone());
      order.courier_name = Some(assignment.courier_name.clone());
      order.shipping_proof_url = assignment.shipping_proof_url.clone();
      order.status = OrderStatus::Shipped;
      order.updated_at = Utc::now();
      order.clone()
    }))
  }

  async fn flag_for_reconciliation(&self, order_id: i64, note: &str) -> Result<(), StoreError> {
    let mut state = self.state.lock();
    if state.failing_reconciliation_flag {
      return Err(StoreError::Unavailable("reconciliation flag write failed".to_string()));
    }
    if let Some(order) = state.orders.get_mut(&order_id) {
      order.needs_reconciliation = true;
      order.reconciliation_note = Some(note.to_string());
      order.updated_at = Utc::now();
    }
    Ok(())
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
    let state = self.state.lock();
    let limit = usize::try_from(filter.limit).unwrap_or(0);
    Ok(
      state
        .orders
        .values()
        .rev()
        .filter(|o| filter.matches(o))
        .take(limit)
        .cloned()
        .collect(),
    )
  }
}

#[async_trait]
impl StockLedger for MemoryStore {
  async fn decrement_stock(&self, product_id: i64, amount: i32) -> Result<StockDecrement, StoreError> {
    let mut state = self.state.lock();
    if state.failing_stock_products.contains(&product_id) {
      return Err(StoreError::Unavailable(format!(
        "stock service refused product {}",
        product_id
      )));
    }
    let Some(product) = state.products.get_mut(&product_id) else {
      return Ok(StockDecrement::UnknownProduct);
    };
    if product.stock < amount {
      return Ok(StockDecrement::Insufficient);
    }
    product.stock -= amount;
    product.updated_at = Utc::now();
    Ok(StockDecrement::Applied {
      remaining: product.stock,
    })
  }
}

#[async_trait]
impl CustomerDirectory for MemoryStore {
  async fn find_customer(&self, customer_id: Uuid) -> Result<Option<CustomerContact>, StoreError> {
    let mut state = self.state.lock();
    state.customer_lookups += 1;
    if state.customer_directory_down {
      return Err(StoreError::Unavailable("customer directory is down".to_string()));
    }
    Ok(state.users.iter().find(|u| u.id == customer_id).map(|u| CustomerContact {
      id: u.id,
      email: Some(u.email.clone()).filter(|e| !e.trim().is_empty()),
    }))
  }
}

#[async_trait]
impl AccountStore for MemoryStore {
  async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User, StoreError> {
    let mut state = self.state.lock();
    if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
      return Err(StoreError::DuplicateKey {
        constraint: USER_EMAIL_CONSTRAINT.to_string(),
      });
    }
    let user = User {
      id: Uuid::new_v4(),
      email: email.to_string(),
      password_hash: password_hash.to_string(),
      role,
      created_at: Utc::now(),
    };
    state.users.push(user.clone());
    Ok(user)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
    Ok(
      self
        .state
        .lock()
        .users
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email))
        .cloned(),
    )
  }

  async fn create_session(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
    let expires_at = Utc::now() + ChronoDuration::days(SESSION_TTL_DAYS);
    self.state.lock().sessions.insert(token.to_string(), (user_id, expires_at));
    Ok(())
  }

  async fn resolve_session(&self, token: &str) -> Result<Option<SessionUser>, StoreError> {
    let state = self.state.lock();
    let Some((user_id, expires_at)) = state.sessions.get(token) else {
      return Ok(None);
    };
    if *expires_at <= Utc::now() {
      return Ok(None);
    }
    Ok(state.users.iter().find(|u| u.id == *user_id).map(|u| SessionUser {
      user_id: u.id,
      email: u.email.clone(),
      role: u.role,
    }))
  }

  async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
    let mut state = self.state.lock();
    match state.users.iter_mut().find(|u| u.id == user_id) {
      Some(user) => {
        user.password_hash = password_hash.to_string();
        Ok(true)
      }
      None => Ok(false),
    }
  }
}

#[async_trait]
impl Catalog for MemoryStore {
  async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
    let mut products: Vec<Product> = self.state.lock().products.values().cloned().collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn find_product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
    Ok(self.state.lock().products.get(&product_id).cloned())
  }

  async fn seed_products(&self, products: &[NewProduct]) -> Result<u64, StoreError> {
    let mut state = self.state.lock();
    let now = Utc::now();
    for seed in products {
      let existing = state.products.values_mut().find(|p| p.sku == seed.sku);
      match existing {
        Some(product) => {
          product.name = seed.name.clone();
          product.price = seed.price;
          product.category = Some(seed.category.clone());
          product.image_url = Some(seed.image_url.clone());
          product.stock = seed.stock;
          product.updated_at = now;
        }
        None => {
          state.next_product_id += 1;
          let id = state.next_product_id;
          state.products.insert(
            id,
            Product {
              id,
              name: seed.name.clone(),
              sku: seed.sku.clone(),
              description: None,
              price: seed.price,
              category: Some(seed.category.clone()),
              image_url: Some(seed.image_url.clone()),
              stock: seed.stock,
              created_at: now,
              updated_at: now,
            },
          );
        }
      }
    }
    Ok(products.len() as u64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{demo_catalog, PaymentMethod};

  fn new_order(code: &str, customer_id: Uuid) -> NewOrder {
    NewOrder {
      order_code: code.to_string(),
      customer_id,
      total_amount: 1000,
      shipping_address: "House 1, Street 2".to_string(),
      phone: "03001234567".to_string(),
      payment_method: PaymentMethod::Cod,
    }
  }

  fn line(product_id: i64, quantity: i32) -> CartLine {
    CartLine {
      product_id,
      quantity,
      unit_price: 500,
      name: None,
    }
  }

  #[tokio::test]
  async fn duplicate_codes_are_rejected_with_the_code_constraint() {
    let store = MemoryStore::new();
    let customer = store.add_customer("a@example.com");
    store
      .insert_order_with_items(&new_order("AB123456", customer), &[line(1, 1)])
      .await
      .unwrap();
    let err = store
      .insert_order_with_items(&new_order("AB123456", customer), &[line(1, 1)])
      .await
      .unwrap_err();
    assert!(err.is_duplicate_of(ORDER_CODE_CONSTRAINT));
    assert_eq!(store.order_count(), 1);
  }

  #[tokio::test]
  async fn a_rejected_line_leaves_no_order_behind() {
    let store = MemoryStore::new();
    let customer = store.add_customer("a@example.com");
    store.reject_items_for_product(2);
    let result = store
      .insert_order_with_items(&new_order("AB123456", customer), &[line(1, 1), line(2, 1)])
      .await;
    assert!(result.is_err());
    assert_eq!(store.order_count(), 0);
    assert_eq!(store.item_count(), 0);
  }

  #[tokio::test]
  async fn stock_never_goes_negative() {
    let store = MemoryStore::new();
    let product = store.add_product("Lamp", 100, 2);
    assert_eq!(
      store.decrement_stock(product, 2).await.unwrap(),
      StockDecrement::Applied { remaining: 0 }
    );
    assert_eq!(store.decrement_stock(product, 1).await.unwrap(), StockDecrement::Insufficient);
    assert_eq!(store.decrement_stock(999, 1).await.unwrap(), StockDecrement::UnknownProduct);
    assert_eq!(store.stock_of(product), Some(0));
  }

  #[tokio::test]
  async fn compare_and_set_reports_the_current_status() {
    let store = MemoryStore::new();
    let customer = store.add_customer("a@example.com");
    let placed = store
      .insert_order_with_items(&new_order("AB123456", customer), &[line(1, 1)])
      .await
      .unwrap();
    let write = store
      .update_status(placed.order.id, Some(OrderStatus::Processing), OrderStatus::Shipped)
      .await
      .unwrap();
    assert_eq!(write, StatusWrite::Conflict { current: OrderStatus::Pending });
    assert_eq!(store.update_status(42, None, OrderStatus::Shipped).await.unwrap(), StatusWrite::NotFound);
  }

  #[tokio::test]
  async fn seeding_upserts_by_sku() {
    let store = MemoryStore::new();
    let catalog = demo_catalog();
    store.seed_products(&catalog).await.unwrap();
    store.seed_products(&catalog).await.unwrap();
    assert_eq!(store.list_products().await.unwrap().len(), catalog.len());
  }

  #[tokio::test]
  async fn expired_sessions_do_not_resolve() {
    let store = MemoryStore::new();
    let user = store.create_user("op@example.com", "hash", Role::Merchant).await.unwrap();
    store.create_session(user.id, "tok").await.unwrap();
    assert_eq!(store.resolve_session("tok").await.unwrap().map(|s| s.role), Some(Role::Merchant));
    store.expire_session("tok");
    assert!(store.resolve_session("tok").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn password_updates_only_touch_known_users() {
    let store = MemoryStore::new();
    let user = store.create_user("op@example.com", "old", Role::Customer).await.unwrap();
    assert!(store.update_password(user.id, "new").await.unwrap());
    let stored = store.find_user_by_email("OP@example.com").await.unwrap().unwrap();
    assert_eq!(stored.password_hash, "new");
    assert!(!store.update_password(Uuid::new_v4(), "new").await.unwrap());
  }
}
