// storefront/src/web/handlers/shipping_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn shipping_rates_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "success": true,
    "rates": app_state.config.shipping_rates,
  }))
}
