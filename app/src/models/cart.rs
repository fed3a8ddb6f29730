// app/src/models/cart.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One cart line. `unit_price` is captured when the product is added and is
/// what the order is priced with, even if the catalog price changes later.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
  pub owner_id: Uuid,
  pub items: Vec<CartItem>,
}

impl Cart {
  pub fn empty(owner_id: Uuid) -> Self {
    Self {
      owner_id,
      items: Vec::new(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn item_count(&self) -> i32 {
    self.items.iter().map(|i| i.quantity).sum()
  }

  /// Priced at the unit prices captured when each line was added.
  pub fn subtotal(&self) -> Decimal {
    self
      .items
      .iter()
      .map(|i| i.unit_price * Decimal::from(i.quantity))
      .sum()
  }
}
