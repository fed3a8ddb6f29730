// app/src/pipelines/create_order_pipeline.rs

//! Cart to order conversion.
//!
//! Stock is taken with one conditional decrement per line, so the check and
//! the decrement cannot interleave with another order. If a later line is
//! short, or the order cannot be stored, everything taken by this run is put
//! back. The cart is cleared only once the order is stored, and a failure
//! to clear it does not undo the order.

use crate::errors::AppError;
use crate::models::{Order, OrderItem, OrderStatus};
use crate::orders::{OrderError, PricingPolicy};
use crate::pipelines::contexts::CreateOrderCtxData;
use crate::store::{StockLedger, StockOutcome, StoreError};
use chrono::Utc;
use medimart_core::{ContextData, Pipeline, PipelineControl, PipelineRegistry};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A freshly numbered order is tried this many times before giving up.
const ORDER_NUMBER_ATTEMPTS: u32 = 3;

pub fn register_create_order_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let mut p = Pipeline::<CreateOrderCtxData, AppError>::new(
    "create_order",
    &[
      ("validate_order_input", false, None),
      ("load_cart", false, None),
      ("ensure_cart_not_empty", false, None),
      ("reserve_stock", false, None),
      ("price_order", false, None),
      ("persist_order", false, None),
    ],
  );

  p.on_root("validate_order_input", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (missing, payment_blank) = {
        let guard = ctx_data.read();
        (
          guard.shipping_address.missing_fields(),
          guard.payment_method.trim().is_empty(),
        )
      };
      if !missing.is_empty() {
        return Err(AppError::Validation(format!(
          "Shipping address is missing: {}",
          missing.join(", ")
        )));
      }
      if payment_blank {
        return Err(AppError::Validation("Payment method is required".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_cart", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (owner_id, stores) = {
        let guard = ctx_data.read();
        (guard.identity.id, guard.app_state.stores.clone())
      };
      let cart = stores.carts.load(owner_id).await?;
      info!(%owner_id, lines = cart.items.len(), "Cart loaded for order.");
      ctx_data.write().cart = Some(cart);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("ensure_cart_not_empty", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let empty = ctx_data.with(|d| d.cart.as_ref().map_or(true, |c| c.is_empty()));
      if empty {
        warn!("Order rejected: cart is empty.");
        return Err(AppError::from(OrderError::EmptyCart));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("reserve_stock", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (lines, stores) = {
        let guard = ctx_data.read();
        let lines: Vec<(Uuid, i32)> = guard
          .cart
          .as_ref()
          .map(|c| c.items.iter().map(|i| (i.product_id, i.quantity)).collect())
          .unwrap_or_default();
        (lines, guard.app_state.stores.clone())
      };

      let mut reserved: Vec<(Uuid, i32)> = Vec::with_capacity(lines.len());
      for (product_id, quantity) in lines {
        let outcome = match stores.stock.try_decrement(product_id, quantity).await {
          Ok(outcome) => outcome,
          Err(e) => {
            release_reservations(stores.stock.as_ref(), &reserved).await;
            return Err(AppError::from(e));
          }
        };
        match outcome {
          StockOutcome::Reserved => reserved.push((product_id, quantity)),
          StockOutcome::Insufficient {
            product_name,
            available,
          } => {
            warn!(%product_id, requested = quantity, available, "Insufficient stock.");
            release_reservations(stores.stock.as_ref(), &reserved).await;
            return Err(AppError::from(OrderError::InsufficientStock(product_name)));
          }
          StockOutcome::UnknownProduct => {
            warn!(%product_id, "Cart references a product that no longer exists.");
            release_reservations(stores.stock.as_ref(), &reserved).await;
            return Err(AppError::from(OrderError::ProductUnavailable(product_id)));
          }
        }
      }
      ctx_data.write().reserved = reserved;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("price_order", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let cart = guard
        .cart
        .as_ref()
        .ok_or_else(|| AppError::Internal("cart missing at pricing".to_string()))?;
      let items: Vec<OrderItem> = cart
        .items
        .iter()
        .map(|line| OrderItem {
          product_id: line.product_id,
          product_name: line.product_name.clone(),
          quantity: line.quantity,
          unit_price: line.unit_price,
          line_total: PricingPolicy::line_total(line.unit_price, line.quantity),
        })
        .collect();
      let totals = guard
        .app_state
        .config
        .pricing
        .totals(items.iter().map(|i| i.line_total));

      let id = Uuid::new_v4();
      let now = Utc::now();
      let order = Order {
        id,
        order_number: Order::number_for(id, now),
        owner_id: guard.identity.id,
        items,
        subtotal: totals.subtotal,
        tax: totals.tax,
        shipping: totals.shipping,
        total: totals.total,
        status: OrderStatus::Pending,
        payment_method: guard.payment_method.trim().to_string(),
        shipping_address: guard.shipping_address.clone(),
        notes: guard.notes.clone().filter(|n| !n.trim().is_empty()),
        cancellation_reason: None,
        cancelled_at: None,
        delivered_at: None,
        created_at: now,
        updated_at: now,
      };
      guard.order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_order", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (order, reserved, stores) = {
        let guard = ctx_data.read();
        (guard.order.clone(), guard.reserved.clone(), guard.app_state.stores.clone())
      };
      let mut order = order.ok_or_else(|| AppError::Internal("order missing at persistence".to_string()))?;

      let mut attempt = 1;
      loop {
        match stores.orders.insert(&order).await {
          Ok(()) => break,
          Err(StoreError::Duplicate(what)) if attempt < ORDER_NUMBER_ATTEMPTS => {
            warn!(order_number = %order.order_number, %what, attempt, "Order number taken; renumbering.");
            order.id = Uuid::new_v4();
            order.order_number = Order::number_for(order.id, order.created_at);
            attempt += 1;
          }
          Err(e) => {
            error!(order_id = %order.id, error = %e, "Storing order failed; releasing reserved stock.");
            release_reservations(stores.stock.as_ref(), &reserved).await;
            ctx_data.write().reserved.clear();
            return Err(AppError::from(e));
          }
        }
      }
      info!(order_id = %order.id, order_number = %order.order_number, total = %order.total, "Order stored.");
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // The order is already stored; a cart that cannot be cleared is logged only.
  p.after_root("persist_order", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (owner_id, stores) = {
        let guard = ctx_data.read();
        (guard.identity.id, guard.app_state.stores.clone())
      };
      if let Err(e) = stores.carts.clear(owner_id).await {
        error!(%owner_id, error = %e, "Order stored but the cart could not be cleared.");
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}

/// Puts back stock taken earlier in the same run. Failures are logged; the
/// caller is already returning an error.
async fn release_reservations(stock: &dyn StockLedger, reserved: &[(Uuid, i32)]) {
  for (product_id, quantity) in reserved {
    if let Err(e) = stock.increment(*product_id, *quantity).await {
      error!(%product_id, quantity, error = %e, "Failed to release reserved stock.");
    }
  }
}
