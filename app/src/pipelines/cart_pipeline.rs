// app/src/pipelines/cart_pipeline.rs

use crate::errors::AppError;
use crate::models::CartItem;
use crate::pipelines::contexts::AddToCartCtxData;
use chrono::Utc;
use medimart_core::{ContextData, Pipeline, PipelineControl, PipelineRegistry};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_add_to_cart_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(
    "add_to_cart",
    &[
      ("validate_cart_input", false, None),
      ("fetch_product_for_cart", false, None),
      ("check_product_stock_for_cart", false, None),
      ("add_or_update_cart_item", false, None),
    ],
  );

  p.on_root("validate_cart_input", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let quantity = ctx_data.read().quantity;
      if quantity <= 0 {
        warn!(quantity, "Add to cart rejected: quantity must be positive.");
        return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("fetch_product_for_cart", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (product_id, stores) = {
        let guard = ctx_data.read();
        (guard.product_id, guard.app_state.stores.clone())
      };
      let product = stores
        .stock
        .find_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
      ctx_data.write().product = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Counts what is already in the cart, so repeated adds cannot exceed stock.
  p.on_root("check_product_stock_for_cart", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (owner_id, product, requested, stores) = {
        let guard = ctx_data.read();
        (
          guard.owner_id,
          guard.product.clone(),
          guard.quantity,
          guard.app_state.stores.clone(),
        )
      };
      let product = product.ok_or_else(|| AppError::Internal("product missing at stock check".to_string()))?;
      let in_cart: i32 = stores
        .carts
        .load(owner_id)
        .await?
        .items
        .iter()
        .filter(|i| i.product_id == product.id)
        .map(|i| i.quantity)
        .sum();

      let wanted = in_cart.checked_add(requested).ok_or_else(|| {
        warn!(in_cart, requested, "Add to cart rejected: quantity out of range.");
        AppError::Validation("Quantity is too large.".to_string())
      })?;
      if product.stock < wanted {
        warn!(
          product_id = %product.id,
          available = product.stock,
          in_cart,
          requested,
          "Add to cart rejected: insufficient stock."
        );
        return Err(AppError::Validation(format!(
          "Insufficient stock. Only {} available.",
          product.stock
        )));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("add_or_update_cart_item", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (owner_id, product, quantity, stores) = {
        let guard = ctx_data.read();
        (
          guard.owner_id,
          guard.product.clone(),
          guard.quantity,
          guard.app_state.stores.clone(),
        )
      };
      let product = product.ok_or_else(|| AppError::Internal("product missing at cart update".to_string()))?;
      let cart = stores
        .carts
        .add_item(
          owner_id,
          CartItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            added_at: Utc::now(),
          },
        )
        .await?;
      info!(%owner_id, product_id = %product.id, quantity, "Cart updated.");
      ctx_data.write().cart = Some(cart);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
