// storefront/src/lib.rs

//! TARZIFY storefront: order placement, fulfillment and public order tracking
//! over HTTP, built on `tarzify_flow` pipelines.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod web;
