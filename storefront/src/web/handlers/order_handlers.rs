// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
  CartLine, OrderFilter, OrderStatus, PaymentMethod, PlacedOrder, PlacementRequest, TrackingAssignment,
};
use crate::pipelines::placement_pipeline;
use crate::services::{fulfillment, tracking};
use crate::state::AppState;
use crate::store::with_timeout;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderPayload {
  #[serde(alias = "userId")]
  pub customer_id: Uuid,
  #[serde(alias = "lines")]
  pub items: Vec<CartLine>,
  pub total: i64,
  pub shipping_address: String,
  pub phone: String,
  #[serde(default)]
  pub payment_method: PaymentMethod,
}

#[derive(Deserialize, Debug)]
pub struct StatusPayload {
  pub status: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPayload {
  #[serde(alias = "tracking_number")]
  pub tracking_number: String,
  #[serde(alias = "courier_name")]
  pub courier_name: String,
  #[serde(default, alias = "shipping_proof_url")]
  pub shipping_proof_url: Option<String>,
}

#[instrument(name = "handler::place_order", skip_all, fields(user_id = %user.user_id))]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<PlaceOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if payload.customer_id != user.user_id {
    warn!(customer_id = %payload.customer_id, "Order placed on behalf of another customer refused.");
    return Err(AppError::Forbidden("Orders can only be placed for your own account.".to_string()));
  }

  let request = PlacementRequest {
    customer_id: payload.customer_id,
    lines: payload.items,
    total: payload.total,
    shipping_address: payload.shipping_address,
    phone: payload.phone,
    payment_method: payload.payment_method,
  };
  let receipt = placement_pipeline::place_order(app_state.get_ref(), request).await?;
  info!(order_code = %receipt.order_code, degraded = ?receipt.degraded_steps, "Order placed.");

  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "orderId": receipt.order_code,
    "orderCode": receipt.order_code,
    "order": receipt,
  })))
}

#[instrument(name = "handler::update_order_status", skip(app_state, user, req_payload), fields(order_id = %path.as_ref()))]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<i64>,
  req_payload: web::Json<StatusPayload>,
) -> Result<HttpResponse, AppError> {
  user.require_operator()?;
  let status: OrderStatus = req_payload
    .status
    .parse()
    .map_err(|e| AppError::Validation(format!("Invalid status: {}", e)))?;

  let order = fulfillment::update_status(app_state.get_ref(), path.into_inner(), status).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

#[instrument(name = "handler::assign_tracking", skip(app_state, user, req_payload), fields(order_id = %path.as_ref()))]
pub async fn assign_tracking_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<i64>,
  req_payload: web::Json<TrackingPayload>,
) -> Result<HttpResponse, AppError> {
  user.require_operator()?;
  let payload = req_payload.into_inner();
  let assignment = TrackingAssignment {
    tracking_number: payload.tracking_number,
    courier_name: payload.courier_name,
    shipping_proof_url: payload.shipping_proof_url,
  };

  let order = fulfillment::assign_tracking(app_state.get_ref(), path.into_inner(), assignment).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

/// Public: the order code is the only credential.
#[instrument(name = "handler::track_order", skip(app_state))]
pub async fn track_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let raw_code = path.into_inner();
  let tracked = tracking::track_order(app_state.get_ref(), &raw_code)
    .await?
    .ok_or_else(|| AppError::NotFound("No order found with this code.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": tracked })))
}

#[instrument(name = "handler::my_orders", skip_all, fields(user_id = %user.user_id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let limit = app_state.config.external_call_timeout;
  let orders = with_timeout(
    limit,
    app_state.stores.orders.list_orders(&OrderFilter::for_customer(user.user_id)),
  )
  .await?;

  let mut history = Vec::with_capacity(orders.len());
  for order in orders {
    let items = with_timeout(limit, app_state.stores.orders.items_for_order(order.id)).await?;
    history.push(PlacedOrder { order, items });
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": history })))
}

#[instrument(name = "handler::list_orders", skip_all)]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  user.require_operator()?;
  let orders = with_timeout(
    app_state.config.external_call_timeout,
    app_state.stores.orders.list_orders(&OrderFilter::all()),
  )
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

#[instrument(name = "handler::reconciliation_queue", skip_all)]
pub async fn reconciliation_queue_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  user.require_admin()?;
  let orders = with_timeout(
    app_state.config.external_call_timeout,
    app_state.stores.orders.list_orders(&OrderFilter::needing_reconciliation()),
  )
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}
