// app/src/store/memory.rs

//! In-process stores on `parking_lot` locks. Every conditional update happens
//! under a single write guard, which gives the same atomicity as the SQL
//! `UPDATE ... WHERE` statements of the PostgreSQL backend.

use super::{
  CancelOutcome, CartStore, IdentityStore, OrderStore, SessionStore, StockLedger, StockOutcome, StoreError,
  StoreResult,
};
use crate::models::{Cart, CartItem, IdentityRecord, Order, OrderStatus, Page, PageRequest, Product, SessionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryIdentityStore {
  records: RwLock<HashMap<Uuid, IdentityRecord>>,
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
  async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<IdentityRecord>> {
    Ok(self.records.read().get(&id).cloned())
  }

  async fn find_by_email(&self, email: &str) -> StoreResult<Option<IdentityRecord>> {
    let needle = email.trim().to_lowercase();
    Ok(self.records.read().values().find(|r| r.email == needle).cloned())
  }

  async fn insert(&self, record: &IdentityRecord) -> StoreResult<()> {
    let mut records = self.records.write();
    if records.values().any(|r| r.email == record.email) {
      return Err(StoreError::Duplicate(format!("identity with email {}", record.email)));
    }
    records.insert(record.id, record.clone());
    Ok(())
  }

  #[instrument(name = "memory::record_failed_login", skip(self))]
  async fn record_failed_login(
    &self,
    id: Uuid,
    max_attempts: i32,
    lock_until: DateTime<Utc>,
  ) -> StoreResult<Option<IdentityRecord>> {
    let mut records = self.records.write();
    let Some(record) = records.get_mut(&id) else {
      return Ok(None);
    };
    record.failed_login_attempts += 1;
    if record.failed_login_attempts >= max_attempts {
      record.locked_until = Some(lock_until);
      record.failed_login_attempts = 0;
      debug!(identity_id = %id, "Identity locked after repeated failures.");
    }
    record.updated_at = Utc::now();
    Ok(Some(record.clone()))
  }

  async fn reset_failed_logins(&self, id: Uuid) -> StoreResult<()> {
    if let Some(record) = self.records.write().get_mut(&id) {
      record.failed_login_attempts = 0;
      record.locked_until = None;
      record.updated_at = Utc::now();
    }
    Ok(())
  }
}

#[derive(Default)]
pub struct MemorySessionStore {
  sessions: RwLock<HashMap<String, SessionRecord>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
  async fn get(&self, session_id: &str) -> StoreResult<Option<SessionRecord>> {
    Ok(self.sessions.read().get(session_id).cloned())
  }

  async fn put(&self, record: &SessionRecord) -> StoreResult<()> {
    self.sessions.write().insert(record.id.clone(), record.clone());
    Ok(())
  }

  async fn delete(&self, session_id: &str) -> StoreResult<()> {
    self.sessions.write().remove(session_id);
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryStockLedger {
  products: RwLock<HashMap<Uuid, Product>>,
}

#[async_trait]
impl StockLedger for MemoryStockLedger {
  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.products.read().get(&id).cloned())
  }

  async fn insert_product(&self, product: &Product) -> StoreResult<()> {
    self.products.write().insert(product.id, product.clone());
    Ok(())
  }

  async fn try_decrement(&self, product_id: Uuid, quantity: i32) -> StoreResult<StockOutcome> {
    let mut products = self.products.write();
    let Some(product) = products.get_mut(&product_id) else {
      return Ok(StockOutcome::UnknownProduct);
    };
    if product.stock < quantity {
      return Ok(StockOutcome::Insufficient {
        product_name: product.name.clone(),
        available: product.stock,
      });
    }
    product.stock -= quantity;
    product.updated_at = Utc::now();
    Ok(StockOutcome::Reserved)
  }

  async fn increment(&self, product_id: Uuid, quantity: i32) -> StoreResult<()> {
    if let Some(product) = self.products.write().get_mut(&product_id) {
      product.stock += quantity;
      product.updated_at = Utc::now();
    }
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryCartStore {
  carts: RwLock<HashMap<Uuid, Vec<CartItem>>>,
}

#[async_trait]
impl CartStore for MemoryCartStore {
  async fn load(&self, owner_id: Uuid) -> StoreResult<Cart> {
    let items = self.carts.read().get(&owner_id).cloned().unwrap_or_default();
    Ok(Cart { owner_id, items })
  }

  async fn add_item(&self, owner_id: Uuid, item: CartItem) -> StoreResult<Cart> {
    let mut carts = self.carts.write();
    let items = carts.entry(owner_id).or_default();
    match items.iter_mut().find(|i| i.product_id == item.product_id) {
      Some(existing) => {
        existing.quantity = existing
          .quantity
          .checked_add(item.quantity)
          .ok_or_else(|| StoreError::OutOfRange(format!("cart quantity for product {}", item.product_id)))?;
      }
      None => items.push(item),
    }
    Ok(Cart {
      owner_id,
      items: items.clone(),
    })
  }

  async fn clear(&self, owner_id: Uuid) -> StoreResult<()> {
    self.carts.write().remove(&owner_id);
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryOrderStore {
  orders: RwLock<HashMap<Uuid, Order>>,
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
  async fn insert(&self, order: &Order) -> StoreResult<()> {
    let mut orders = self.orders.write();
    if orders.contains_key(&order.id) || orders.values().any(|o| o.order_number == order.order_number) {
      return Err(StoreError::Duplicate(format!("order {}", order.order_number)));
    }
    orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn find(&self, id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.orders.read().get(&id).cloned())
  }

  async fn list(&self, owner_id: Option<Uuid>, page: PageRequest) -> StoreResult<Page<Order>> {
    let orders = self.orders.read();
    let mut matching: Vec<&Order> = orders
      .values()
      .filter(|o| owner_id.map_or(true, |owner| o.owner_id == owner))
      .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = matching.len() as u64;
    let items = matching
      .into_iter()
      .skip(page.offset() as usize)
      .take(page.limit as usize)
      .cloned()
      .collect();
    Ok(Page {
      items,
      total,
      request: page,
    })
  }

  async fn cancel_if_pending(
    &self,
    id: Uuid,
    owner_id: Uuid,
    reason: Option<String>,
    at: DateTime<Utc>,
  ) -> StoreResult<CancelOutcome> {
    let mut orders = self.orders.write();
    let Some(order) = orders.get_mut(&id).filter(|o| o.owner_id == owner_id) else {
      return Ok(CancelOutcome::NotFound);
    };
    if order.status != OrderStatus::Pending {
      return Ok(CancelOutcome::NotPending(order.status));
    }
    order.status = OrderStatus::Cancelled;
    order.cancelled_at = Some(at);
    order.cancellation_reason = reason;
    order.updated_at = at;
    Ok(CancelOutcome::Cancelled(order.clone()))
  }

  async fn set_status(
    &self,
    id: Uuid,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
  ) -> StoreResult<Option<Order>> {
    let mut orders = self.orders.write();
    let Some(order) = orders.get_mut(&id) else {
      return Ok(None);
    };
    order.status = status;
    if delivered_at.is_some() {
      order.delivered_at = delivered_at;
    }
    order.updated_at = at;
    Ok(Some(order.clone()))
  }
}
