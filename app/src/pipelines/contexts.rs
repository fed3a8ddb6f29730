// app/src/pipelines/contexts.rs

//! Context data for each pipeline. Inputs are set by the caller; the
//! `Option` fields are filled in by the steps.

use crate::models::{Cart, Identity, IdentityRecord, Order, OrderStatus, Product, ShippingAddress};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone)]
pub struct CreateOrderCtxData {
  pub app_state: AppState,
  pub identity: Identity,
  pub shipping_address: ShippingAddress,
  pub payment_method: String,
  pub notes: Option<String>,

  pub cart: Option<Cart>,
  /// Stock taken so far in this run, as `(product, quantity)`.
  pub reserved: Vec<(Uuid, i32)>,
  pub order: Option<Order>,
}

impl CreateOrderCtxData {
  pub fn new(
    app_state: AppState,
    identity: Identity,
    shipping_address: ShippingAddress,
    payment_method: String,
    notes: Option<String>,
  ) -> Self {
    Self {
      app_state,
      identity,
      shipping_address,
      payment_method,
      notes,
      cart: None,
      reserved: Vec::new(),
      order: None,
    }
  }
}

#[derive(Clone)]
pub struct CancelOrderCtxData {
  pub app_state: AppState,
  pub owner_id: Uuid,
  pub order_id: Uuid,
  pub reason: Option<String>,

  pub cancelled: Option<Order>,
}

impl CancelOrderCtxData {
  pub fn new(app_state: AppState, owner_id: Uuid, order_id: Uuid, reason: Option<String>) -> Self {
    Self {
      app_state,
      owner_id,
      order_id,
      reason,
      cancelled: None,
    }
  }
}

#[derive(Clone)]
pub struct UpdateStatusCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub new_status: OrderStatus,

  pub current: Option<Order>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub updated: Option<Order>,
}

impl UpdateStatusCtxData {
  pub fn new(app_state: AppState, order_id: Uuid, new_status: OrderStatus) -> Self {
    Self {
      app_state,
      order_id,
      new_status,
      current: None,
      delivered_at: None,
      updated: None,
    }
  }
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub owner_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,

  pub product: Option<Product>,
  pub cart: Option<Cart>,
}

impl AddToCartCtxData {
  pub fn new(app_state: AppState, owner_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
    Self {
      app_state,
      owner_id,
      product_id,
      quantity,
      product: None,
      cart: None,
    }
  }
}

#[derive(Clone)]
pub struct LoginCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  /// Session cookie already on the request; replaced on success.
  pub existing_session_id: Option<String>,

  pub record: Option<IdentityRecord>,
  pub token: Option<String>,
  pub session_id: Option<String>,
}

impl LoginCtxData {
  pub fn new(app_state: AppState, email: String, password: String, existing_session_id: Option<String>) -> Self {
    Self {
      app_state,
      email,
      password,
      existing_session_id,
      record: None,
      token: None,
      session_id: None,
    }
  }
}

impl std::fmt::Debug for LoginCtxData {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LoginCtxData")
      .field("email", &self.email)
      .field("password", &"[REDACTED]")
      .field("has_record", &self.record.is_some())
      .field("has_token", &self.token.is_some())
      .finish()
  }
}
