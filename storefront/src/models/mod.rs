// storefront/src/models/mod.rs

//! Data structures for the persisted entities and the values passed between layers.

pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use order::{
  NewOrder, Order, OrderFilter, OrderStatus, ParseEnumError, PaymentMethod, PlacedOrder, PlacementRequest,
  TrackedOrder, TrackingAssignment,
};
pub use order_item::{CartLine, OrderItem};
pub use product::{demo_catalog, NewProduct, Product};
pub use user::{CustomerContact, Role, SessionUser, User};
