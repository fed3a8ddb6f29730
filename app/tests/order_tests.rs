// tests/order_tests.rs
mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::*;
use medimart::errors::AppError;
use medimart::models::{Cart, CartItem, Order, OrderStatus, Page, PageRequest, Role};
use medimart::orders::{OrderError, PricingPolicy, TransitionPolicy};
use medimart::pipelines::contexts::{AddToCartCtxData, CancelOrderCtxData, UpdateStatusCtxData};
use medimart::pipelines::run_to_completion;
use medimart::store::memory::{MemoryCartStore, MemoryOrderStore};
use medimart::store::{CancelOutcome, CartStore, OrderStore, StoreError, StoreResult, Stores};
use medimart::AppState;
use medimart_core::ContextData;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn totals_for_a_small_cart() {
  let policy = PricingPolicy::default();
  let lines = [
    PricingPolicy::line_total(dec("10"), 2),
    PricingPolicy::line_total(dec("5"), 1),
  ];
  let totals = policy.totals(lines);
  assert_eq!(totals.subtotal, dec("25"));
  assert_eq!(totals.tax, dec("2.5"));
  assert_eq!(totals.shipping, dec("10"));
  assert_eq!(totals.total, dec("37.5"));
}

#[test]
fn free_shipping_starts_strictly_above_the_threshold() {
  let policy = PricingPolicy::default();
  assert_eq!(policy.totals([dec("100")]).shipping, dec("10"));
  assert_eq!(policy.totals([dec("100.01")]).shipping, Decimal::ZERO);
}

#[test]
fn forward_only_policy_accepts_only_forward_fulfilment_moves() {
  let p = TransitionPolicy::ForwardOnly;
  assert!(p.allows(OrderStatus::Pending, OrderStatus::Processing));
  assert!(p.allows(OrderStatus::Pending, OrderStatus::Shipped));
  assert!(!p.allows(OrderStatus::Shipped, OrderStatus::Processing));
  assert!(!p.allows(OrderStatus::Delivered, OrderStatus::Delivered));
  assert!(!p.allows(OrderStatus::Cancelled, OrderStatus::Processing));
  assert!(p.allows(OrderStatus::Pending, OrderStatus::Cancelled));
  assert!(!p.allows(OrderStatus::Processing, OrderStatus::Cancelled));
  assert!(TransitionPolicy::Permissive.allows(OrderStatus::Delivered, OrderStatus::Pending));
  assert_eq!("forward_only".parse::<TransitionPolicy>(), Ok(TransitionPolicy::ForwardOnly));
}

#[tokio::test]
async fn empty_cart_is_refused() {
  let state = test_state();
  let patient = add_identity(&state, "empty@example.com", Role::Patient, true).await;

  let err = place_order(&state, &patient).await.unwrap_err();
  assert!(matches!(err, AppError::Order(OrderError::EmptyCart)));
}

#[tokio::test]
async fn order_is_priced_stored_and_the_cart_cleared() {
  let state = test_state();
  let patient = add_identity(&state, "buyer@example.com", Role::Patient, true).await;
  let gloves = add_product(&state, "Gloves", dec("10"), 5).await;
  let masks = add_product(&state, "Masks", dec("5"), 5).await;
  put_in_cart(&state, &patient, &gloves, 2).await;
  put_in_cart(&state, &patient, &masks, 1).await;

  let order = place_order(&state, &patient).await.unwrap();

  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.total, dec("37.5"));
  assert_eq!(order.total, order.subtotal + order.tax + order.shipping);
  assert_eq!(order.items.len(), 2);
  assert_eq!(order.items[0].product_name, "Gloves");
  assert_eq!(order.items[0].line_total, dec("20"));
  assert!(order.order_number.starts_with("ORD-"));
  assert_eq!(order.order_number.len(), "ORD-20240101-ABCDEF".len());

  assert_eq!(stock_of(&state, &gloves).await, 3);
  assert_eq!(stock_of(&state, &masks).await, 4);
  assert!(state.stores.carts.load(patient.id).await.unwrap().is_empty());

  let stored = state.stores.orders.find(order.id).await.unwrap().unwrap();
  assert_eq!(stored, order);
}

#[tokio::test]
async fn price_changes_after_adding_do_not_affect_the_order() {
  let state = test_state();
  let patient = add_identity(&state, "snap@example.com", Role::Patient, true).await;
  let mut syringe = add_product(&state, "Syringe", dec("2.5"), 10).await;
  put_in_cart(&state, &patient, &syringe, 4).await;

  syringe.price = dec("99");
  state.stores.stock.insert_product(&syringe).await.unwrap();

  let order = place_order(&state, &patient).await.unwrap();
  assert_eq!(order.subtotal, dec("10"));
}

#[tokio::test]
async fn insufficient_stock_names_the_product_and_releases_earlier_lines() {
  let state = test_state();
  let patient = add_identity(&state, "short@example.com", Role::Patient, true).await;
  let plenty = add_product(&state, "Bandages", dec("3"), 10).await;
  let scarce = add_product(&state, "Insulin Pen", dec("40"), 1).await;
  put_in_cart(&state, &patient, &plenty, 4).await;
  put_in_cart(&state, &patient, &scarce, 2).await;

  let err = place_order(&state, &patient).await.unwrap_err();
  match err {
    AppError::Order(OrderError::InsufficientStock(name)) => assert_eq!(name, "Insulin Pen"),
    other => panic!("expected InsufficientStock, got {:?}", other),
  }

  assert_eq!(stock_of(&state, &plenty).await, 10);
  assert_eq!(stock_of(&state, &scarce).await, 1);
  assert_eq!(state.stores.carts.load(patient.id).await.unwrap().items.len(), 2);
  let orders = state.stores.orders.list(Some(patient.id), PageRequest::default()).await.unwrap();
  assert_eq!(orders.total, 0);
}

#[tokio::test]
async fn concurrent_orders_cannot_oversell_the_last_unit() {
  let state = test_state();
  let last = add_product(&state, "Last Unit", dec("15"), 1).await;
  let first_buyer = add_identity(&state, "one@example.com", Role::Patient, true).await;
  let second_buyer = add_identity(&state, "two@example.com", Role::Patient, true).await;
  put_in_cart(&state, &first_buyer, &last, 1).await;
  put_in_cart(&state, &second_buyer, &last, 1).await;

  let (a, b) = tokio::join!(place_order(&state, &first_buyer), place_order(&state, &second_buyer));

  let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
  assert!(successes <= 1);
  assert_eq!(successes, 1);
  assert_eq!(stock_of(&state, &last).await, 0);
}

async fn cancel(state: &AppState, owner: Uuid, order_id: Uuid) -> Result<(), AppError> {
  let ctx_data = ContextData::new(CancelOrderCtxData::new(
    state.clone(),
    owner,
    order_id,
    Some("changed my mind".to_string()),
  ));
  run_to_completion(&state.pipelines, ctx_data).await
}

#[tokio::test]
async fn cancelling_a_pending_order_restores_stock() {
  let state = test_state();
  let patient = add_identity(&state, "cancel@example.com", Role::Patient, true).await;
  let strips = add_product(&state, "Test Strips", dec("8"), 10).await;
  put_in_cart(&state, &patient, &strips, 3).await;
  let order = place_order(&state, &patient).await.unwrap();
  assert_eq!(stock_of(&state, &strips).await, 7);

  cancel(&state, patient.id, order.id).await.unwrap();

  assert_eq!(stock_of(&state, &strips).await, 10);
  let stored = state.stores.orders.find(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Cancelled);
  assert!(stored.cancelled_at.is_some());
  assert_eq!(stored.cancellation_reason.as_deref(), Some("changed my mind"));
  assert_eq!(stored.total, order.total);
}

#[tokio::test]
async fn cancelling_twice_is_a_conflict_and_changes_nothing() {
  let state = test_state();
  let patient = add_identity(&state, "twice@example.com", Role::Patient, true).await;
  let strips = add_product(&state, "Lancets", dec("4"), 5).await;
  put_in_cart(&state, &patient, &strips, 3).await;
  let order = place_order(&state, &patient).await.unwrap();

  cancel(&state, patient.id, order.id).await.unwrap();
  let err = cancel(&state, patient.id, order.id).await.unwrap_err();

  assert!(matches!(
    err,
    AppError::Order(OrderError::NotPending(OrderStatus::Cancelled))
  ));
  assert_eq!(stock_of(&state, &strips).await, 5);
  let stored = state.stores.orders.find(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn only_the_owner_can_cancel() {
  let state = test_state();
  let owner = add_identity(&state, "owner@example.com", Role::Patient, true).await;
  let other = add_identity(&state, "other@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Gauze", dec("1"), 5).await;
  put_in_cart(&state, &owner, &item, 1).await;
  let order = place_order(&state, &owner).await.unwrap();

  let err = cancel(&state, other.id, order.id).await.unwrap_err();
  assert!(matches!(err, AppError::Order(OrderError::NotFound)));
  assert_eq!(stock_of(&state, &item).await, 4);
}

async fn set_status(state: &AppState, order_id: Uuid, status: OrderStatus) -> Result<(), AppError> {
  let ctx_data = ContextData::new(UpdateStatusCtxData::new(state.clone(), order_id, status));
  run_to_completion(&state.pipelines, ctx_data).await
}

#[tokio::test]
async fn delivering_stamps_the_delivery_time() {
  let state = test_state();
  let patient = add_identity(&state, "deliver@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Crutches", dec("60"), 2).await;
  put_in_cart(&state, &patient, &item, 1).await;
  let order = place_order(&state, &patient).await.unwrap();

  set_status(&state, order.id, OrderStatus::Shipped).await.unwrap();
  let shipped = state.stores.orders.find(order.id).await.unwrap().unwrap();
  assert_eq!(shipped.status, OrderStatus::Shipped);
  assert!(shipped.delivered_at.is_none());

  set_status(&state, order.id, OrderStatus::Delivered).await.unwrap();
  let delivered = state.stores.orders.find(order.id).await.unwrap().unwrap();
  assert_eq!(delivered.status, OrderStatus::Delivered);
  assert!(delivered.delivered_at.is_some());
}

#[tokio::test]
async fn permissive_policy_allows_any_move_and_forward_only_does_not() {
  let permissive = test_state();
  let patient = add_identity(&permissive, "perm@example.com", Role::Patient, true).await;
  let item = add_product(&permissive, "Cane", dec("20"), 2).await;
  put_in_cart(&permissive, &patient, &item, 1).await;
  let order = place_order(&permissive, &patient).await.unwrap();
  set_status(&permissive, order.id, OrderStatus::Delivered).await.unwrap();
  set_status(&permissive, order.id, OrderStatus::Pending).await.unwrap();

  let mut config = test_config();
  config.status_policy = TransitionPolicy::ForwardOnly;
  let strict = test_state_with(config);
  let patient = add_identity(&strict, "strict@example.com", Role::Patient, true).await;
  let item = add_product(&strict, "Cane", dec("20"), 2).await;
  put_in_cart(&strict, &patient, &item, 1).await;
  let order = place_order(&strict, &patient).await.unwrap();
  set_status(&strict, order.id, OrderStatus::Shipped).await.unwrap();

  let err = set_status(&strict, order.id, OrderStatus::Processing).await.unwrap_err();
  assert!(matches!(
    err,
    AppError::Order(OrderError::InvalidTransition {
      from: OrderStatus::Shipped,
      to: OrderStatus::Processing
    })
  ));
}

#[tokio::test]
async fn status_change_for_unknown_order_is_not_found() {
  let state = test_state();
  let err = set_status(&state, Uuid::new_v4(), OrderStatus::Shipped).await.unwrap_err();
  assert!(matches!(err, AppError::Order(OrderError::NotFound)));
}

#[tokio::test]
async fn own_orders_are_listed_newest_first_with_pagination() {
  let state = test_state();
  let patient = add_identity(&state, "many@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Vitamin D", dec("6"), 100).await;

  let mut placed = Vec::new();
  for _ in 0..3 {
    put_in_cart(&state, &patient, &item, 1).await;
    placed.push(place_order(&state, &patient).await.unwrap());
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
  }

  let page = state
    .stores
    .orders
    .list(Some(patient.id), PageRequest::new(Some(1), Some(2)))
    .await
    .unwrap();
  assert_eq!(page.items.len(), 2);
  assert_eq!(page.items[0].id, placed[2].id);

  let pagination = page.pagination();
  assert_eq!(pagination.total_orders, 3);
  assert_eq!(pagination.total_pages, 2);
  assert!(pagination.has_next);
  assert!(!pagination.has_prev);
}

async fn add_to_cart(state: &AppState, owner: Uuid, product_id: Uuid, quantity: i32) -> Result<(), AppError> {
  let ctx_data = ContextData::new(AddToCartCtxData::new(state.clone(), owner, product_id, quantity));
  run_to_completion(&state.pipelines, ctx_data).await
}

#[tokio::test]
async fn repeated_adds_accumulate_but_cannot_exceed_stock() {
  let state = test_state();
  let patient = add_identity(&state, "cart@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Ice Pack", dec("7"), 5).await;

  add_to_cart(&state, patient.id, item.id, 2).await.unwrap();
  add_to_cart(&state, patient.id, item.id, 3).await.unwrap();
  let cart = state.stores.carts.load(patient.id).await.unwrap();
  assert_eq!(cart.items.len(), 1);
  assert_eq!(cart.items[0].quantity, 5);
  assert_eq!(cart.subtotal(), dec("35"));

  let err = add_to_cart(&state, patient.id, item.id, 1).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn cart_input_is_validated() {
  let state = test_state();
  let patient = add_identity(&state, "cartval@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Heat Pad", dec("12"), 5).await;

  let err = add_to_cart(&state, patient.id, item.id, 0).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));

  let err = add_to_cart(&state, patient.id, Uuid::new_v4(), 1).await.unwrap_err();
  assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn huge_quantities_cannot_wrap_the_cart_line() {
  let state = test_state();
  let patient = add_identity(&state, "wrap@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Tongue Depressor", dec("1"), 5).await;

  add_to_cart(&state, patient.id, item.id, 1).await.unwrap();
  let err = add_to_cart(&state, patient.id, item.id, i32::MAX).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));

  let cart = state.stores.carts.load(patient.id).await.unwrap();
  assert_eq!(cart.items[0].quantity, 1);
}

#[tokio::test]
async fn memory_cart_refuses_to_overflow_a_line() {
  let carts = MemoryCartStore::default();
  let owner = Uuid::new_v4();
  let line = |quantity| CartItem {
    product_id: Uuid::nil(),
    product_name: "Bandage".to_string(),
    quantity,
    unit_price: dec("2"),
    added_at: Utc::now(),
  };

  carts.add_item(owner, line(2)).await.unwrap();
  let err = carts.add_item(owner, line(i32::MAX)).await.unwrap_err();
  assert!(matches!(err, StoreError::OutOfRange(_)));
  assert_eq!(carts.load(owner).await.unwrap().items[0].quantity, 2);
}

#[tokio::test]
async fn forward_only_policy_lets_an_admin_cancel_a_pending_order() {
  let mut config = test_config();
  config.status_policy = TransitionPolicy::ForwardOnly;
  let state = test_state_with(config);
  let patient = add_identity(&state, "fwdcancel@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Sling", dec("9"), 3).await;
  put_in_cart(&state, &patient, &item, 1).await;
  let order = place_order(&state, &patient).await.unwrap();

  set_status(&state, order.id, OrderStatus::Cancelled).await.unwrap();
  let stored = state.stores.orders.find(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Cancelled);

  let err = set_status(&state, order.id, OrderStatus::Processing).await.unwrap_err();
  assert!(matches!(err, AppError::Order(OrderError::InvalidTransition { .. })));
}

/// Cart store whose `clear` always fails.
#[derive(Default)]
struct StuckCart {
  inner: MemoryCartStore,
}

#[async_trait]
impl CartStore for StuckCart {
  async fn load(&self, owner_id: Uuid) -> StoreResult<Cart> {
    self.inner.load(owner_id).await
  }

  async fn add_item(&self, owner_id: Uuid, item: CartItem) -> StoreResult<Cart> {
    self.inner.add_item(owner_id, item).await
  }

  async fn clear(&self, _owner_id: Uuid) -> StoreResult<()> {
    Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
  }
}

#[tokio::test]
async fn order_stands_when_the_cart_cannot_be_cleared() {
  setup_tracing();
  let stores = Stores {
    carts: Arc::new(StuckCart::default()),
    ..Stores::in_memory()
  };
  let state = AppState::new(stores, test_config());
  let patient = add_identity(&state, "stuck@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Brace", dec("40"), 4).await;
  put_in_cart(&state, &patient, &item, 2).await;

  let order = place_order(&state, &patient).await.unwrap();

  assert!(state.stores.orders.find(order.id).await.unwrap().is_some());
  assert_eq!(stock_of(&state, &item).await, 2);
  assert_eq!(state.stores.carts.load(patient.id).await.unwrap().items.len(), 1);
}

/// Order store that reports the first order number it sees as taken.
#[derive(Default)]
struct TakenNumberOrders {
  inner: MemoryOrderStore,
  refused: Mutex<Vec<String>>,
}

#[async_trait]
impl OrderStore for TakenNumberOrders {
  async fn insert(&self, order: &Order) -> StoreResult<()> {
    {
      let mut refused = self.refused.lock();
      if refused.is_empty() {
        refused.push(order.order_number.clone());
        return Err(StoreError::Duplicate(format!("order {}", order.order_number)));
      }
    }
    self.inner.insert(order).await
  }

  async fn find(&self, id: Uuid) -> StoreResult<Option<Order>> {
    self.inner.find(id).await
  }

  async fn list(&self, owner_id: Option<Uuid>, page: PageRequest) -> StoreResult<Page<Order>> {
    self.inner.list(owner_id, page).await
  }

  async fn cancel_if_pending(
    &self,
    id: Uuid,
    owner_id: Uuid,
    reason: Option<String>,
    at: DateTime<Utc>,
  ) -> StoreResult<CancelOutcome> {
    self.inner.cancel_if_pending(id, owner_id, reason, at).await
  }

  async fn set_status(
    &self,
    id: Uuid,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
  ) -> StoreResult<Option<Order>> {
    self.inner.set_status(id, status, delivered_at, at).await
  }
}

#[tokio::test]
async fn taken_order_number_is_replaced_and_the_order_still_stored() {
  setup_tracing();
  let orders = Arc::new(TakenNumberOrders::default());
  let stores = Stores {
    orders: orders.clone(),
    ..Stores::in_memory()
  };
  let state = AppState::new(stores, test_config());
  let patient = add_identity(&state, "renumber@example.com", Role::Patient, true).await;
  let item = add_product(&state, "Splint", dec("15"), 2).await;
  put_in_cart(&state, &patient, &item, 1).await;

  let order = place_order(&state, &patient).await.unwrap();

  let refused = orders.refused.lock().clone();
  assert_eq!(refused.len(), 1);
  assert_ne!(order.order_number, refused[0]);
  assert!(order.order_number.starts_with("ORD-"));
  let stored = state.stores.orders.find(order.id).await.unwrap().unwrap();
  assert_eq!(stored.order_number, order.order_number);
  assert_eq!(stock_of(&state, &item).await, 1);
}
