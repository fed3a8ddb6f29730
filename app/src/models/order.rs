// app/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  pub street: String,
  pub city: String,
  pub state: String,
  pub zip_code: String,
  pub country: String,
}

impl ShippingAddress {
  /// Names of the fields that are blank, in declaration order.
  pub fn missing_fields(&self) -> Vec<&'static str> {
    [
      ("street", &self.street),
      ("city", &self.city),
      ("state", &self.state),
      ("zipCode", &self.zip_code),
      ("country", &self.country),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub line_total: Decimal,
}

/// An order is a snapshot. Totals are computed once when it is assembled;
/// only status, cancellation and delivery fields change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub owner_id: Uuid,
  pub items: Vec<OrderItem>,
  pub subtotal: Decimal,
  pub tax: Decimal,
  pub shipping: Decimal,
  pub total: Decimal,
  pub status: OrderStatus,
  pub payment_method: String,
  pub shipping_address: ShippingAddress,
  pub notes: Option<String>,
  pub cancellation_reason: Option<String>,
  pub cancelled_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// `ORD-YYYYMMDD-XXXXXX`, the suffix taken from the order id.
  pub fn number_for(id: Uuid, at: DateTime<Utc>) -> String {
    let suffix: String = id.simple().to_string().chars().take(6).collect();
    format!("ORD-{}-{}", at.format("%Y%m%d"), suffix.to_uppercase())
  }

  pub fn summary(&self) -> OrderSummary {
    OrderSummary {
      id: self.id,
      order_number: self.order_number.clone(),
      total: self.total,
      status: self.status,
    }
  }
}

/// What the client gets back after placing an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
  pub id: Uuid,
  pub order_number: String,
  pub total: Decimal,
  pub status: OrderStatus,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A 1-based page request. Out-of-range input is clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page: u32,
  pub limit: u32,
}

impl PageRequest {
  pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit
      .filter(|l| *l > 0)
      .unwrap_or(DEFAULT_PAGE_LIMIT)
      .min(MAX_PAGE_LIMIT);
    Self { page, limit }
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page - 1) * u64::from(self.limit)
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    Self::new(None, None)
  }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub request: PageRequest,
}

impl<T> Page<T> {
  pub fn pagination(&self) -> Pagination {
    let limit = u64::from(self.request.limit);
    let total_pages = self.total.div_ceil(limit);
    let current = u64::from(self.request.page);
    Pagination {
      current_page: current,
      total_pages,
      total_orders: self.total,
      has_next: current < total_pages,
      has_prev: current > 1,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub current_page: u64,
  pub total_pages: u64,
  pub total_orders: u64,
  pub has_next: bool,
  pub has_prev: bool,
}
