// app/src/orders/error.rs

use crate::models::OrderStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
  #[error("Cart is empty")]
  EmptyCart,

  #[error("Insufficient stock for {0}")]
  InsufficientStock(String),

  #[error("Product {0} is no longer available")]
  ProductUnavailable(Uuid),

  #[error("Only pending orders can be cancelled")]
  NotPending(OrderStatus),

  #[error("Cannot change order status from {from} to {to}")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  #[error("Order not found")]
  NotFound,
}
