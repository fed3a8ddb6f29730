// app/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Cart;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::pipelines::run_to_completion;
use crate::state::AppState;
use crate::web::extractors::CustomerIdentity;
use medimart_core::ContextData;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

fn cart_body(cart: &Cart) -> serde_json::Value {
  json!({
    "items": cart.items,
    "itemCount": cart.item_count(),
    "subtotal": cart.subtotal(),
  })
}

#[instrument(name = "handler::get_cart", skip_all, fields(user_id = %customer.0.id))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  customer: CustomerIdentity,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.stores.carts.load(customer.0.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "cart": cart_body(&cart) })))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, customer),
  fields(user_id = %customer.0.id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  customer: CustomerIdentity,
  req_payload: web::Json<AddToCartRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(AddToCartCtxData::new(
    app_state.get_ref().clone(),
    customer.0.id,
    req_payload.product_id,
    req_payload.quantity,
  ));
  run_to_completion(&app_state.pipelines, ctx_data.clone()).await?;

  let cart = ctx_data
    .read()
    .cart
    .clone()
    .ok_or_else(|| AppError::Internal("cart update completed without a cart".to_string()))?;
  info!(lines = cart.items.len(), "Item added to cart.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Item added to cart",
    "cart": cart_body(&cart),
  })))
}
