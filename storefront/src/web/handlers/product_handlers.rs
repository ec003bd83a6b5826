// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::store::with_timeout;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = with_timeout(
    app_state.config.external_call_timeout,
    app_state.stores.catalog.list_products(),
  )
  .await?;
  info!(count = products.len(), "Products fetched.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "products": products,
  })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product = with_timeout(
    app_state.config.external_call_timeout,
    app_state.stores.catalog.find_product(product_id),
  )
  .await?
  .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "product": product,
  })))
}
