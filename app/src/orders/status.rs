// app/src/orders/status.rs

use crate::models::OrderStatus;
use std::str::FromStr;

/// Which administrative status changes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
  /// Any status may be set from any status.
  #[default]
  Permissive,
  /// Only moves further along `pending -> processing -> shipped -> delivered`,
  /// plus `pending -> cancelled`.
  ForwardOnly,
}

impl TransitionPolicy {
  pub fn allows(self, from: OrderStatus, to: OrderStatus) -> bool {
    match self {
      TransitionPolicy::Permissive => true,
      TransitionPolicy::ForwardOnly => match (from, to) {
        (OrderStatus::Pending, OrderStatus::Cancelled) => true,
        _ => match (fulfilment_rank(from), fulfilment_rank(to)) {
          (Some(a), Some(b)) => b > a,
          _ => false,
        },
      },
    }
  }
}

fn fulfilment_rank(status: OrderStatus) -> Option<u8> {
  match status {
    OrderStatus::Pending => Some(0),
    OrderStatus::Processing => Some(1),
    OrderStatus::Shipped => Some(2),
    OrderStatus::Delivered => Some(3),
    OrderStatus::Cancelled => None,
  }
}

impl FromStr for TransitionPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "permissive" => Ok(TransitionPolicy::Permissive),
      "forward_only" | "forward-only" => Ok(TransitionPolicy::ForwardOnly),
      other => Err(format!("expected 'permissive' or 'forward_only', got '{}'", other)),
    }
  }
}
