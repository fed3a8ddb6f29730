// app/src/store/postgres.rs

//! PostgreSQL backend. Queries are checked at runtime so the crate builds
//! without a live database.

use super::{
  CancelOutcome, CartStore, IdentityStore, OrderStore, SessionStore, StockLedger, StockOutcome, StoreError,
  StoreResult,
};
use crate::models::{
  Cart, CartItem, IdentityRecord, Order, OrderItem, OrderStatus, Page, PageRequest, Product, SessionRecord,
  ShippingAddress,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_number, owner_id, subtotal, tax, shipping, total, status, payment_method, \
   shipping_address, notes, cancellation_reason, cancelled_at, delivered_at, created_at, updated_at";

pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  #[instrument(name = "pg::connect", skip(database_url))]
  pub async fn connect(database_url: &str) -> StoreResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .connect(database_url)
      .await?;
    info!("Connected to PostgreSQL.");
    Ok(Self { pool })
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  pub async fn migrate(&self) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  async fn items_for(&self, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderItem>>> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
      "SELECT order_id, product_id, product_name, quantity, unit_price, line_total
       FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
    )
    .bind(order_ids)
    .fetch_all(&self.pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in rows {
      grouped.entry(row.order_id).or_default().push(row.into_item());
    }
    Ok(grouped)
  }

  async fn hydrate(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut items = self.items_for(&ids).await?;
    Ok(
      rows
        .into_iter()
        .map(|row| {
          let order_items = items.remove(&row.id).unwrap_or_default();
          row.into_order(order_items)
        })
        .collect(),
    )
  }
}

#[derive(FromRow)]
struct OrderRow {
  id: Uuid,
  order_number: String,
  owner_id: Uuid,
  subtotal: Decimal,
  tax: Decimal,
  shipping: Decimal,
  total: Decimal,
  status: OrderStatus,
  payment_method: String,
  shipping_address: Json<ShippingAddress>,
  notes: Option<String>,
  cancellation_reason: Option<String>,
  cancelled_at: Option<DateTime<Utc>>,
  delivered_at: Option<DateTime<Utc>>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl OrderRow {
  fn into_order(self, items: Vec<OrderItem>) -> Order {
    Order {
      id: self.id,
      order_number: self.order_number,
      owner_id: self.owner_id,
      items,
      subtotal: self.subtotal,
      tax: self.tax,
      shipping: self.shipping,
      total: self.total,
      status: self.status,
      payment_method: self.payment_method,
      shipping_address: self.shipping_address.0,
      notes: self.notes,
      cancellation_reason: self.cancellation_reason,
      cancelled_at: self.cancelled_at,
      delivered_at: self.delivered_at,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

#[derive(FromRow)]
struct OrderItemRow {
  order_id: Uuid,
  product_id: Uuid,
  product_name: String,
  quantity: i32,
  unit_price: Decimal,
  line_total: Decimal,
}

impl OrderItemRow {
  fn into_item(self) -> OrderItem {
    OrderItem {
      product_id: self.product_id,
      product_name: self.product_name,
      quantity: self.quantity,
      unit_price: self.unit_price,
      line_total: self.line_total,
    }
  }
}

fn unique_violation(err: sqlx::Error, what: impl Into<String>) -> StoreError {
  match err {
    sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what.into()),
    other => StoreError::Sqlx(other),
  }
}

#[async_trait]
impl IdentityStore for PgStore {
  #[instrument(name = "pg::find_identity_by_id", skip(self))]
  async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<IdentityRecord>> {
    let record = sqlx::query_as::<_, IdentityRecord>("SELECT * FROM identities WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(record)
  }

  #[instrument(name = "pg::find_identity_by_email", skip(self))]
  async fn find_by_email(&self, email: &str) -> StoreResult<Option<IdentityRecord>> {
    let record = sqlx::query_as::<_, IdentityRecord>("SELECT * FROM identities WHERE email = LOWER($1)")
      .bind(email.trim())
      .fetch_optional(&self.pool)
      .await?;
    Ok(record)
  }

  #[instrument(name = "pg::insert_identity", skip(self, record), fields(identity_id = %record.id))]
  async fn insert(&self, record: &IdentityRecord) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO identities
         (id, email, first_name, last_name, role, email_verified, locked_until,
          password_hash, failed_login_attempts, created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(record.id)
    .bind(&record.email)
    .bind(&record.first_name)
    .bind(&record.last_name)
    .bind(record.role)
    .bind(record.email_verified)
    .bind(record.locked_until)
    .bind(&record.password_hash)
    .bind(record.failed_login_attempts)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| unique_violation(e, format!("identity with email {}", record.email)))?;
    Ok(())
  }

  #[instrument(name = "pg::record_failed_login", skip(self))]
  async fn record_failed_login(
    &self,
    id: Uuid,
    max_attempts: i32,
    lock_until: DateTime<Utc>,
  ) -> StoreResult<Option<IdentityRecord>> {
    let record = sqlx::query_as::<_, IdentityRecord>(
      "UPDATE identities SET
         failed_login_attempts = CASE WHEN failed_login_attempts + 1 >= $2 THEN 0
                                      ELSE failed_login_attempts + 1 END,
         locked_until = CASE WHEN failed_login_attempts + 1 >= $2 THEN $3 ELSE locked_until END,
         updated_at = NOW()
       WHERE id = $1
       RETURNING *",
    )
    .bind(id)
    .bind(max_attempts)
    .bind(lock_until)
    .fetch_optional(&self.pool)
    .await?;
    Ok(record)
  }

  async fn reset_failed_logins(&self, id: Uuid) -> StoreResult<()> {
    sqlx::query(
      "UPDATE identities SET failed_login_attempts = 0, locked_until = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl SessionStore for PgStore {
  async fn get(&self, session_id: &str) -> StoreResult<Option<SessionRecord>> {
    let record = sqlx::query_as::<_, SessionRecord>(
      "SELECT id, identity_id, expires_at, created_at FROM sessions WHERE id = $1",
    )
    .bind(session_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(record)
  }

  async fn put(&self, record: &SessionRecord) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO sessions (id, identity_id, expires_at, created_at)
       VALUES ($1, $2, $3, $4)
       ON CONFLICT (id) DO UPDATE
       SET identity_id = EXCLUDED.identity_id, expires_at = EXCLUDED.expires_at",
    )
    .bind(&record.id)
    .bind(record.identity_id)
    .bind(record.expires_at)
    .bind(record.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn delete(&self, session_id: &str) -> StoreResult<()> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
      .bind(session_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl StockLedger for PgStore {
  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
      "SELECT id, name, price, stock, created_at, updated_at FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }

  async fn insert_product(&self, product: &Product) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO products (id, name, price, stock, created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| unique_violation(e, format!("product {}", product.id)))?;
    Ok(())
  }

  #[instrument(name = "pg::try_decrement_stock", skip(self))]
  async fn try_decrement(&self, product_id: Uuid, quantity: i32) -> StoreResult<StockOutcome> {
    let reserved = sqlx::query(
      "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&self.pool)
    .await?
    .rows_affected();
    if reserved == 1 {
      return Ok(StockOutcome::Reserved);
    }

    let current = sqlx::query_as::<_, (String, i32)>("SELECT name, stock FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(match current {
      Some((product_name, available)) => StockOutcome::Insufficient {
        product_name,
        available,
      },
      None => StockOutcome::UnknownProduct,
    })
  }

  #[instrument(name = "pg::increment_stock", skip(self))]
  async fn increment(&self, product_id: Uuid, quantity: i32) -> StoreResult<()> {
    sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
      .bind(product_id)
      .bind(quantity)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn load(&self, owner_id: Uuid) -> StoreResult<Cart> {
    let items = sqlx::query_as::<_, CartItem>(
      "SELECT c.product_id, p.name AS product_name, c.quantity, c.unit_price, c.added_at
       FROM cart_items c JOIN products p ON p.id = c.product_id
       WHERE c.owner_id = $1
       ORDER BY c.added_at, c.product_id",
    )
    .bind(owner_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(Cart { owner_id, items })
  }

  #[instrument(name = "pg::add_cart_item", skip(self, item), fields(product_id = %item.product_id))]
  async fn add_item(&self, owner_id: Uuid, item: CartItem) -> StoreResult<Cart> {
    sqlx::query(
      "INSERT INTO cart_items (owner_id, product_id, quantity, unit_price, added_at)
       VALUES ($1, $2, $3, $4, $5)
       ON CONFLICT (owner_id, product_id) DO UPDATE
       SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(owner_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.added_at)
    .execute(&self.pool)
    .await?;
    self.load(owner_id).await
  }

  async fn clear(&self, owner_id: Uuid) -> StoreResult<()> {
    sqlx::query("DELETE FROM cart_items WHERE owner_id = $1")
      .bind(owner_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "pg::insert_order", skip(self, order), fields(order_id = %order.id))]
  async fn insert(&self, order: &Order) -> StoreResult<()> {
    let mut tx = self.pool.begin().await?;
    sqlx::query(
      "INSERT INTO orders
         (id, order_number, owner_id, subtotal, tax, shipping, total, status, payment_method,
          shipping_address, notes, created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.owner_id)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.shipping)
    .bind(order.total)
    .bind(order.status)
    .bind(&order.payment_method)
    .bind(Json(&order.shipping_address))
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| unique_violation(e, format!("order {}", order.order_number)))?;

    for (position, item) in order.items.iter().enumerate() {
      sqlx::query(
        "INSERT INTO order_items (order_id, position, product_id, product_name, quantity, unit_price, line_total)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
      )
      .bind(order.id)
      .bind(position as i32)
      .bind(item.product_id)
      .bind(&item.product_name)
      .bind(item.quantity)
      .bind(item.unit_price)
      .bind(item.line_total)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(())
  }

  async fn find(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    match row {
      Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
      None => Ok(None),
    }
  }

  #[instrument(name = "pg::list_orders", skip(self))]
  async fn list(&self, owner_id: Option<Uuid>, page: PageRequest) -> StoreResult<Page<Order>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::uuid IS NULL OR owner_id = $1)")
      .bind(owner_id)
      .fetch_one(&self.pool)
      .await?;

    let rows = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders
       WHERE ($1::uuid IS NULL OR owner_id = $1)
       ORDER BY created_at DESC, id
       LIMIT $2 OFFSET $3"
    ))
    .bind(owner_id)
    .bind(i64::from(page.limit))
    .bind(page.offset() as i64)
    .fetch_all(&self.pool)
    .await?;

    Ok(Page {
      items: self.hydrate(rows).await?,
      total: total.max(0) as u64,
      request: page,
    })
  }

  #[instrument(name = "pg::cancel_order", skip(self, reason))]
  async fn cancel_if_pending(
    &self,
    id: Uuid,
    owner_id: Uuid,
    reason: Option<String>,
    at: DateTime<Utc>,
  ) -> StoreResult<CancelOutcome> {
    let cancelled = sqlx::query_as::<_, OrderRow>(&format!(
      "UPDATE orders
       SET status = 'cancelled', cancelled_at = $3, cancellation_reason = $4, updated_at = $3
       WHERE id = $1 AND owner_id = $2 AND status = 'pending'
       RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(owner_id)
    .bind(at)
    .bind(reason)
    .fetch_optional(&self.pool)
    .await?;

    if let Some(row) = cancelled {
      let order = self.hydrate(vec![row]).await?.pop();
      return Ok(order.map_or(CancelOutcome::NotFound, CancelOutcome::Cancelled));
    }

    let status: Option<OrderStatus> =
      sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
    Ok(status.map_or(CancelOutcome::NotFound, CancelOutcome::NotPending))
  }

  #[instrument(name = "pg::set_order_status", skip(self))]
  async fn set_status(
    &self,
    id: Uuid,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
  ) -> StoreResult<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
      "UPDATE orders
       SET status = $2, delivered_at = COALESCE($3, delivered_at), updated_at = $4
       WHERE id = $1
       RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .bind(delivered_at)
    .bind(at)
    .fetch_optional(&self.pool)
    .await?;
    match row {
      Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
      None => Ok(None),
    }
  }
}
