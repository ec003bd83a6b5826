// storefront/src/services/mod.rs

pub mod auth_service;
pub mod email;
pub mod fulfillment;
pub mod order_code;
pub mod pricing;
pub mod smtp_mailer;
pub mod tracking;
