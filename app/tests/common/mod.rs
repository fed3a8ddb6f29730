// tests/common/mod.rs
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use medimart::auth::password::hash_password;
use medimart::errors::AppError;
use medimart::models::{CartItem, Identity, IdentityRecord, Order, Product, Role, ShippingAddress};
use medimart::pipelines::contexts::CreateOrderCtxData;
use medimart::pipelines::run_to_completion;
use medimart::store::Stores;
use medimart::{AppConfig, AppState};
use medimart_core::ContextData;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tracing::Level;

pub const TEST_SECRET: &str = "medimart-test-signing-secret";
pub const TEST_PASSWORD: &str = "Sup3r-Secret!";

// One hash for every test identity; argon2 is deliberately slow.
static PASSWORD_HASH: Lazy<String> =
  Lazy::new(|| hash_password(TEST_PASSWORD).expect("hashing the test password should succeed"));

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  AppConfig::with_secret(TEST_SECRET)
}

pub fn test_state() -> AppState {
  test_state_with(test_config())
}

pub fn test_state_with(config: AppConfig) -> AppState {
  setup_tracing();
  AppState::new(Stores::in_memory(), config)
}

pub async fn add_identity(state: &AppState, email: &str, role: Role, verified: bool) -> Identity {
  add_identity_with(state, email, role, verified, None).await
}

pub async fn add_identity_with(
  state: &AppState,
  email: &str,
  role: Role,
  verified: bool,
  locked_until: Option<DateTime<Utc>>,
) -> Identity {
  let mut record = IdentityRecord::new(email, "Test", "User", role, PASSWORD_HASH.clone());
  record.email_verified = verified;
  record.locked_until = locked_until;
  state
    .stores
    .identities
    .insert(&record)
    .await
    .expect("inserting a test identity should succeed");
  Identity::from(record)
}

pub async fn add_product(state: &AppState, name: &str, price: Decimal, stock: i32) -> Product {
  let product = Product::new(name, price, stock);
  state
    .stores
    .stock
    .insert_product(&product)
    .await
    .expect("inserting a test product should succeed");
  product
}

pub async fn stock_of(state: &AppState, product: &Product) -> i32 {
  state
    .stores
    .stock
    .find_product(product.id)
    .await
    .unwrap()
    .expect("product should exist")
    .stock
}

/// Puts a line straight into the cart, bypassing the stock check.
pub async fn put_in_cart(state: &AppState, owner: &Identity, product: &Product, quantity: i32) {
  state
    .stores
    .carts
    .add_item(
      owner.id,
      CartItem {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity,
        unit_price: product.price,
        added_at: Utc::now(),
      },
    )
    .await
    .expect("adding to cart should succeed");
}

pub fn token_for(state: &AppState, identity: &Identity) -> String {
  state.tokens.issue(identity.id).expect("token issue should succeed")
}

pub fn shipping_address() -> ShippingAddress {
  ShippingAddress {
    street: "1 Clinic Road".to_string(),
    city: "Springfield".to_string(),
    state: "IL".to_string(),
    zip_code: "62701".to_string(),
    country: "US".to_string(),
  }
}

pub async fn place_order(state: &AppState, identity: &Identity) -> Result<Order, AppError> {
  let ctx_data = ContextData::new(CreateOrderCtxData::new(
    state.clone(),
    identity.clone(),
    shipping_address(),
    "card".to_string(),
    None,
  ));
  run_to_completion(&state.pipelines, ctx_data.clone()).await?;
  let order = ctx_data.read().order.clone();
  Ok(order.expect("completed pipeline should leave an order"))
}

pub fn dec(s: &str) -> Decimal {
  s.parse().expect("test decimal literal")
}
