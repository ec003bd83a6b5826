// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tarzify::config::{AppConfig, LogFormat};
use tarzify::models::{CartLine, NewOrder, PaymentMethod, PlacementRequest};
use tarzify::services::email::{EmailError, EmailMessage, EmailSender, RecordingEmailSender, SentEmail};
use tarzify::services::order_code::{generate_order_code, OrderCodeSource};
use tarzify::state::AppState;
use tarzify::store::{MemoryStore, OrderStore, StockDecrement, StockLedger, StoreError, Stores};
use uuid::Uuid;

pub const BUYER_EMAIL: &str = "buyer@example.com";
pub const WATCH_PRICE: i64 = 5000;
pub const LAMP_PRICE: i64 = 3000;

static TRACING: Lazy<()> = Lazy::new(|| {
  tarzify::telemetry::init_tracing(LogFormat::Pretty);
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// Hands out scripted codes first, then random ones.
#[derive(Default)]
pub struct ScriptedCodes {
  script: Mutex<VecDeque<String>>,
  issued: AtomicUsize,
}

impl ScriptedCodes {
  pub fn push(&self, codes: &[&str]) {
    self.script.lock().extend(codes.iter().map(|c| c.to_string()));
  }

  pub fn issued(&self) -> usize {
    self.issued.load(Ordering::SeqCst)
  }
}

impl OrderCodeSource for ScriptedCodes {
  fn next_code(&self) -> String {
    self.issued.fetch_add(1, Ordering::SeqCst);
    let scripted = self.script.lock().pop_front();
    scripted.unwrap_or_else(|| generate_order_code(&mut rand::thread_rng()))
  }
}

pub struct FailingEmailSender;

#[async_trait]
impl EmailSender for FailingEmailSender {
  async fn send(&self, _message: &EmailMessage) -> Result<SentEmail, EmailError> {
    Err(EmailError::Transport("smtp connection refused".to_string()))
  }
}

pub struct SlowEmailSender(pub Duration);

#[async_trait]
impl EmailSender for SlowEmailSender {
  async fn send(&self, _message: &EmailMessage) -> Result<SentEmail, EmailError> {
    tokio::time::sleep(self.0).await;
    Ok(SentEmail {
      message_id: "late".to_string(),
    })
  }
}

/// Delegates to the memory store but stalls on one product.
pub struct StallingStock {
  pub inner: Arc<MemoryStore>,
  pub stalled_product: i64,
  pub stall: Duration,
}

#[async_trait]
impl StockLedger for StallingStock {
  async fn decrement_stock(&self, product_id: i64, amount: i32) -> Result<StockDecrement, StoreError> {
    if product_id == self.stalled_product {
      tokio::time::sleep(self.stall).await;
    }
    self.inner.decrement_stock(product_id, amount).await
  }
}

#[derive(Default)]
pub struct Overrides {
  pub mailer: Option<Arc<dyn EmailSender>>,
  /// Stock decrements for the lamp sleep this long before running.
  pub lamp_stock_stall: Option<Duration>,
}

pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub outbox: Arc<RecordingEmailSender>,
  pub codes: Arc<ScriptedCodes>,
  pub state: AppState,
  pub customer_id: Uuid,
  pub watch_id: i64,
  pub lamp_id: i64,
}

pub fn test_config() -> AppConfig {
  let mut config = AppConfig::with_database_url("postgres://unused/tarzify_test");
  config.external_call_timeout = Duration::from_millis(200);
  config
}

impl Harness {
  pub fn new() -> Self {
    Self::custom(|_| {}, Overrides::default())
  }

  pub fn custom(configure: impl FnOnce(&mut AppConfig), overrides: Overrides) -> Self {
    setup_tracing();
    let mut config = test_config();
    configure(&mut config);

    let store = Arc::new(MemoryStore::new());
    let customer_id = store.add_customer(BUYER_EMAIL);
    let watch_id = store.add_product("Minimalist Leather Watch", WATCH_PRICE, 10);
    let lamp_id = store.add_product("Desk Lamp", LAMP_PRICE, 5);

    let outbox = Arc::new(RecordingEmailSender::new());
    let codes = Arc::new(ScriptedCodes::default());

    let mut stores = Stores::from_shared(store.clone());
    if let Some(stall) = overrides.lamp_stock_stall {
      stores.stock = Arc::new(StallingStock {
        inner: store.clone(),
        stalled_product: lamp_id,
        stall,
      });
    }
    let mailer: Arc<dyn EmailSender> = match overrides.mailer {
      Some(mailer) => mailer,
      None => outbox.clone(),
    };

    let state = AppState::assemble(Arc::new(config), stores, mailer, codes.clone());
    Self {
      store,
      outbox,
      codes,
      state,
      customer_id,
      watch_id,
      lamp_id,
    }
  }

  /// Two watches at 5000 and one lamp at 3000, total 15000.
  pub fn request(&self) -> PlacementRequest {
    PlacementRequest {
      customer_id: self.customer_id,
      lines: vec![
        CartLine {
          product_id: self.watch_id,
          quantity: 2,
          unit_price: WATCH_PRICE,
          name: Some("Minimalist Leather Watch".to_string()),
        },
        CartLine {
          product_id: self.lamp_id,
          quantity: 1,
          unit_price: LAMP_PRICE,
          name: Some("Desk Lamp".to_string()),
        },
      ],
      total: 15000,
      shipping_address: "House 7, Street 3, Lahore".to_string(),
      phone: "03001234567".to_string(),
      payment_method: PaymentMethod::FastPay,
    }
  }

  /// Stores an order directly so its code is taken.
  pub async fn occupy_code(&self, code: &str) {
    let order = NewOrder {
      order_code: code.to_string(),
      customer_id: self.customer_id,
      total_amount: 100,
      shipping_address: "Somewhere".to_string(),
      phone: "0300".to_string(),
      payment_method: PaymentMethod::Cod,
    };
    let lines = [CartLine {
      product_id: self.lamp_id,
      quantity: 1,
      unit_price: 100,
      name: None,
    }];
    self
      .store
      .insert_order_with_items(&order, &lines)
      .await
      .expect("occupying a code should succeed");
  }
}
