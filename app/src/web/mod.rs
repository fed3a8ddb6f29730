// app/src/web/mod.rs

pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod session_cookie;

pub use routes::configure_app_routes;
pub use session_cookie::issue_session_cookie;
