// tests/fulfillment_tests.rs
mod common;

use common::*;
use tarzify::errors::AppError;
use tarzify::models::{OrderStatus, TrackingAssignment};
use tarzify::pipelines::placement_pipeline::{place_order, PlacementReceipt};
use tarzify::services::fulfillment::{assign_tracking, update_status, StatusPolicy};
use tarzify::services::tracking::track_order;
use tarzify::store::OrderStore;

async fn placed(h: &Harness) -> PlacementReceipt {
  place_order(&h.state, h.request()).await.unwrap()
}

fn tcs(number: &str) -> TrackingAssignment {
  TrackingAssignment {
    tracking_number: number.to_string(),
    courier_name: "TCS".to_string(),
    shipping_proof_url: Some("https://cdn.example.com/proof/1.jpg".to_string()),
  }
}

#[tokio::test]
async fn assigning_tracking_to_a_pending_order_ships_it() {
  let h = Harness::new();
  let receipt = placed(&h).await;

  let order = assign_tracking(&h.state, receipt.order_id, tcs("TCS-778812")).await.unwrap();

  assert_eq!(order.status, OrderStatus::Shipped);
  assert_eq!(order.tracking_number.as_deref(), Some("TCS-778812"));
  assert_eq!(order.courier_name.as_deref(), Some("TCS"));
  assert_eq!(order.shipping_proof_url.as_deref(), Some("https://cdn.example.com/proof/1.jpg"));
  let stored = h.store.find_order_by_id(receipt.order_id).await.unwrap().unwrap();
  assert_eq!(stored, order);
}

#[tokio::test]
async fn tracking_ships_even_from_a_terminal_status_under_a_strict_policy() {
  let h = Harness::custom(|c| c.status_policy = StatusPolicy::Monotonic, Overrides::default());
  let receipt = placed(&h).await;
  update_status(&h.state, receipt.order_id, OrderStatus::Cancelled).await.unwrap();

  let order = assign_tracking(&h.state, receipt.order_id, tcs("TCS-1")).await.unwrap();
  assert_eq!(order.status, OrderStatus::Shipped);
}

#[tokio::test]
async fn tracking_requires_number_and_courier() {
  let h = Harness::new();
  let receipt = placed(&h).await;
  let mut assignment = tcs("TCS-1");
  assignment.courier_name = "   ".to_string();

  let err = assign_tracking(&h.state, receipt.order_id, assignment).await.unwrap_err();

  assert!(matches!(err, AppError::Validation(_)));
  let stored = h.store.find_order_by_id(receipt.order_id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Pending);
  assert_eq!(stored.tracking_number, None);
}

#[tokio::test]
async fn updates_to_unknown_orders_are_not_found() {
  let h = Harness::new();
  assert!(matches!(
    assign_tracking(&h.state, 4242, tcs("TCS-1")).await,
    Err(AppError::NotFound(_))
  ));
  assert!(matches!(
    update_status(&h.state, 4242, OrderStatus::Shipped).await,
    Err(AppError::NotFound(_))
  ));
}

#[tokio::test]
async fn permissive_policy_allows_moving_backwards() {
  let h = Harness::new();
  let receipt = placed(&h).await;

  update_status(&h.state, receipt.order_id, OrderStatus::Delivered).await.unwrap();
  let order = update_status(&h.state, receipt.order_id, OrderStatus::Pending).await.unwrap();

  assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn monotonic_policy_refuses_backward_moves() {
  let h = Harness::custom(|c| c.status_policy = StatusPolicy::Monotonic, Overrides::default());
  let receipt = placed(&h).await;

  update_status(&h.state, receipt.order_id, OrderStatus::Processing).await.unwrap();
  update_status(&h.state, receipt.order_id, OrderStatus::Shipped).await.unwrap();

  let err = update_status(&h.state, receipt.order_id, OrderStatus::Processing).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)));
  let err = update_status(&h.state, receipt.order_id, OrderStatus::Cancelled).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)));

  let stored = h.store.find_order_by_id(receipt.order_id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Shipped);

  let order = update_status(&h.state, receipt.order_id, OrderStatus::Delivered).await.unwrap();
  assert_eq!(order.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn tracking_lookup_normalizes_the_code() {
  let h = Harness::new();
  let receipt = placed(&h).await;
  let typed = format!("  {}  ", receipt.order_code.to_lowercase());

  let tracked = track_order(&h.state, &typed).await.unwrap().unwrap();

  assert_eq!(tracked.order_code, receipt.order_code);
  assert_eq!(tracked.status, OrderStatus::Pending);
  assert_eq!(tracked.total_amount, 15000);
  assert_eq!(tracked.courier_name, None);
}

#[tokio::test]
async fn tracking_lookup_shows_the_courier_once_shipped() {
  let h = Harness::new();
  let receipt = placed(&h).await;
  assign_tracking(&h.state, receipt.order_id, tcs("TCS-42")).await.unwrap();

  let tracked = track_order(&h.state, &receipt.order_code).await.unwrap().unwrap();

  assert_eq!(tracked.status, OrderStatus::Shipped);
  assert_eq!(tracked.courier_name.as_deref(), Some("TCS"));
  assert_eq!(tracked.tracking_number.as_deref(), Some("TCS-42"));
}

#[tokio::test]
async fn unknown_codes_are_absent_and_malformed_codes_are_invalid() {
  let h = Harness::new();
  placed(&h).await;

  assert_eq!(track_order(&h.state, "ZZ000000").await.unwrap(), None);
  assert!(matches!(track_order(&h.state, "ZZ-0000").await, Err(AppError::Validation(_))));
  assert!(matches!(track_order(&h.state, "").await, Err(AppError::Validation(_))));
}
