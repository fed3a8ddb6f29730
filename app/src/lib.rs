// app/src/lib.rs

//! medimart: authentication, sessions and the order workflow of a healthcare
//! storefront, served over actix-web.

pub mod auth;
pub mod config;
pub mod errors;
pub mod models;
pub mod orders;
pub mod pipelines;
pub mod seed;
pub mod state;
pub mod store;
pub mod web;

pub use config::AppConfig;
pub use errors::AppError;
pub use state::AppState;
