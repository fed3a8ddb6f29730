// app/src/orders/mod.rs

//! Order pricing and the status transition rules.

pub mod error;
pub mod pricing;
pub mod status;

pub use error::OrderError;
pub use pricing::{OrderTotals, PricingPolicy};
pub use status::TransitionPolicy;
