// app/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{auth_handlers, cart_handlers, order_handlers};
use actix_web::{web, HttpResponse};
use serde_json::json;

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "success": true, "status": "ok" }))
}

/// Malformed bodies, queries and path segments all answer 400 in the
/// standard envelope.
fn configure_extractor_errors(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(
      web::JsonConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into()),
    )
    .app_data(
      web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid query string: {}", err)).into()),
    )
    .app_data(
      web::PathConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid path parameter: {}", err)).into()),
    );
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  configure_extractor_errors(cfg);
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/me", web::get().to(auth_handlers::me_handler))
          .route("/status", web::get().to(auth_handlers::auth_status_handler)),
      )
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler))
          .route("/items", web::post().to(cart_handlers::add_to_cart_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_my_orders_handler))
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("/admin/all", web::get().to(order_handlers::list_all_orders_handler))
          .route("/{id}", web::get().to(order_handlers::get_my_order_handler))
          .route("/{id}/cancel", web::put().to(order_handlers::cancel_order_handler))
          .route("/{id}/status", web::put().to(order_handlers::update_order_status_handler)),
      ),
  );
}
