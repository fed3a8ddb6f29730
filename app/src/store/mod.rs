// app/src/store/mod.rs

//! Persistence collaborators.
//!
//! Every store is an explicit handle carried in [`Stores`] and injected through
//! application state. Two backends exist: PostgreSQL (`postgres`) and an
//! in-process one (`memory`) used when no database is configured and in tests.

pub mod memory;
pub mod postgres;

use crate::models::{
  Cart, CartItem, IdentityRecord, Order, OrderStatus, Page, PageRequest, Product, SessionRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("Duplicate record: {0}")]
  Duplicate(String),

  #[error("Value out of range: {0}")]
  OutOfRange(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a conditional stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockOutcome {
  Reserved,
  Insufficient { product_name: String, available: i32 },
  UnknownProduct,
}

/// Result of a conditional `pending -> cancelled` update.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
  Cancelled(Order),
  NotPending(OrderStatus),
  NotFound,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
  async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<IdentityRecord>>;

  /// Lookup is case-insensitive.
  async fn find_by_email(&self, email: &str) -> StoreResult<Option<IdentityRecord>>;

  async fn insert(&self, record: &IdentityRecord) -> StoreResult<()>;

  /// Bumps the failed-login counter. When it reaches `max_attempts` the
  /// account is locked until `lock_until` and the counter starts over.
  async fn record_failed_login(
    &self,
    id: Uuid,
    max_attempts: i32,
    lock_until: DateTime<Utc>,
  ) -> StoreResult<Option<IdentityRecord>>;

  async fn reset_failed_logins(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
  async fn get(&self, session_id: &str) -> StoreResult<Option<SessionRecord>>;

  /// Upsert; concurrent writers to one id are last-writer-wins.
  async fn put(&self, record: &SessionRecord) -> StoreResult<()>;

  async fn delete(&self, session_id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait StockLedger: Send + Sync {
  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

  async fn insert_product(&self, product: &Product) -> StoreResult<()>;

  /// Decrements stock by `quantity` only if at least that much is on hand.
  /// Check and decrement are a single atomic operation.
  async fn try_decrement(&self, product_id: Uuid, quantity: i32) -> StoreResult<StockOutcome>;

  async fn increment(&self, product_id: Uuid, quantity: i32) -> StoreResult<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn load(&self, owner_id: Uuid) -> StoreResult<Cart>;

  /// Adds a line, or adds to the quantity of an existing line for the same
  /// product. The stored unit price is the one from the first add.
  async fn add_item(&self, owner_id: Uuid, item: CartItem) -> StoreResult<Cart>;

  async fn clear(&self, owner_id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert(&self, order: &Order) -> StoreResult<()>;

  async fn find(&self, id: Uuid) -> StoreResult<Option<Order>>;

  /// Newest first. `owner_id = None` lists every order.
  async fn list(&self, owner_id: Option<Uuid>, page: PageRequest) -> StoreResult<Page<Order>>;

  /// Atomically moves an order owned by `owner_id` from `pending` to `cancelled`.
  async fn cancel_if_pending(
    &self,
    id: Uuid,
    owner_id: Uuid,
    reason: Option<String>,
    at: DateTime<Utc>,
  ) -> StoreResult<CancelOutcome>;

  async fn set_status(
    &self,
    id: Uuid,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
  ) -> StoreResult<Option<Order>>;
}

/// The bundle of store handles shared through application state.
#[derive(Clone)]
pub struct Stores {
  pub identities: Arc<dyn IdentityStore>,
  pub sessions: Arc<dyn SessionStore>,
  pub stock: Arc<dyn StockLedger>,
  pub carts: Arc<dyn CartStore>,
  pub orders: Arc<dyn OrderStore>,
}

impl Stores {
  pub fn in_memory() -> Self {
    Self {
      identities: Arc::new(memory::MemoryIdentityStore::default()),
      sessions: Arc::new(memory::MemorySessionStore::default()),
      stock: Arc::new(memory::MemoryStockLedger::default()),
      carts: Arc::new(memory::MemoryCartStore::default()),
      orders: Arc::new(memory::MemoryOrderStore::default()),
    }
  }

  /// Connects, runs the embedded migrations and hands out one shared pool.
  pub async fn postgres(database_url: &str) -> StoreResult<Self> {
    let store = Arc::new(postgres::PgStore::connect(database_url).await?);
    store.migrate().await?;
    Ok(Self {
      identities: store.clone(),
      sessions: store.clone(),
      stock: store.clone(),
      carts: store.clone(),
      orders: store,
    })
  }
}
