// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub sku: String,
  pub description: Option<String>,
  pub price: i64,
  pub category: Option<String>,
  pub image_url: Option<String>,
  pub stock: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
  pub name: String,
  pub sku: String,
  pub price: i64,
  pub category: String,
  pub image_url: String,
  pub stock: i32,
}

impl NewProduct {
  fn demo(name: &str, sku: &str, price: i64, category: &str, image_url: &str, stock: i32) -> Self {
    Self {
      name: name.to_string(),
      sku: sku.to_string(),
      price,
      category: category.to_string(),
      image_url: image_url.to_string(),
      stock,
    }
  }
}

/// The launch catalog, upserted by SKU when `SEED_DB` is on.
pub fn demo_catalog() -> Vec<NewProduct> {
  vec![
    NewProduct::demo("Premium Wireless Headphones", "HEAD-001", 15500, "Electronics",
      "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?w=800&q=80", 50),
    NewProduct::demo("Minimalist Leather Watch", "WATCH-002", 8500, "Accessories",
      "https://images.unsplash.com/photo-1523275335684-37898b6baf30?w=800&q=80", 30),
    NewProduct::demo("Ultra-Bright LED Flashlight", "LIGHT-003", 4200, "Outdoor",
      "https://images.unsplash.com/photo-1517055727180-60b70c3f5904?w=800&q=80", 100),
    NewProduct::demo("Ergonomic Gaming Mouse", "MOUSE-004", 6800, "Electronics",
      "https://images.unsplash.com/photo-1527814732934-94b1ec5d0927?w=800&q=80", 40),
    NewProduct::demo("Smart Fitness Tracker", "FIT-005", 5500, "Accessories",
      "https://images.unsplash.com/photo-1575311373937-040b8e1fd5b6?w=800&q=80", 75),
    NewProduct::demo("Portable Bluetooth Speaker", "SPK-006", 12000, "Electronics",
      "https://images.unsplash.com/photo-1608156639585-b3a032ef9689?w=800&q=80", 25),
    NewProduct::demo("Waterproof Hiking Boots", "BOOT-007", 18500, "Outdoor",
      "https://images.unsplash.com/photo-1520639889313-72702c18d1f0?w=800&q=80", 15),
    NewProduct::demo("Compact Travel Pillow", "PILLOW-008", 2200, "Accessories",
      "https://images.unsplash.com/photo-1584305116359-ef81baaf2fd3?w=800&q=80", 200),
  ]
}
