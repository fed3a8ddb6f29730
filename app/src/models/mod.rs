// app/src/models/mod.rs

//! Data structures for stored entities and the values handed to clients.

pub mod cart;
pub mod identity;
pub mod order;
pub mod product;
pub mod session;

pub use cart::{Cart, CartItem};
pub use identity::{Identity, IdentityRecord, Role};
pub use order::{Order, OrderItem, OrderStatus, OrderSummary, Page, PageRequest, Pagination, ShippingAddress};
pub use product::Product;
pub use session::SessionRecord;
