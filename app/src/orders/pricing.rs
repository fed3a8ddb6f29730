// app/src/orders/pricing.rs

use rust_decimal::Decimal;
use serde::Serialize;

/// Tax and shipping rules applied when an order is assembled.
///
/// Amounts are exact decimals and are not rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
  pub tax_rate: Decimal,
  /// Shipping is free only when the subtotal is strictly above this.
  pub free_shipping_threshold: Decimal,
  pub flat_shipping: Decimal,
}

impl Default for PricingPolicy {
  fn default() -> Self {
    Self {
      tax_rate: Decimal::new(10, 2),
      free_shipping_threshold: Decimal::from(100),
      flat_shipping: Decimal::from(10),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
  pub subtotal: Decimal,
  pub tax: Decimal,
  pub shipping: Decimal,
  pub total: Decimal,
}

impl PricingPolicy {
  pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
  }

  pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
    if subtotal > self.free_shipping_threshold {
      Decimal::ZERO
    } else {
      self.flat_shipping
    }
  }

  pub fn totals<I>(&self, line_totals: I) -> OrderTotals
  where
    I: IntoIterator<Item = Decimal>,
  {
    let subtotal: Decimal = line_totals.into_iter().sum();
    let tax = subtotal * self.tax_rate;
    let shipping = self.shipping_for(subtotal);
    OrderTotals {
      subtotal,
      tax,
      shipping,
      total: subtotal + tax + shipping,
    }
  }
}
