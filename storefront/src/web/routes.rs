// storefront/src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{auth_handlers, order_handlers, product_handlers, shipping_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed JSON bodies get the same `{success: false, error}` shape as other failures.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(json_config()).service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/password", web::post().to(auth_handlers::update_password_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
      )
      .service(web::scope("/shipping").route("/rates", web::get().to(shipping_handlers::shipping_rates_handler)))
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::place_order_handler))
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/mine", web::get().to(order_handlers::my_orders_handler))
          .route("/reconciliation", web::get().to(order_handlers::reconciliation_queue_handler))
          .route("/track/{code}", web::get().to(order_handlers::track_order_handler))
          .route("/{order_id}/status", web::patch().to(order_handlers::update_status_handler))
          .route("/{order_id}/tracking", web::patch().to(order_handlers::assign_tracking_handler)),
      ),
  );
}
