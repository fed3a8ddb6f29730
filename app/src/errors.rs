// app/src/errors.rs

use crate::auth::{AuthError, AuthFailure};
use crate::orders::OrderError;
use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use medimart_core::PipelineError;
use serde_json::json;
use thiserror::Error;

const GENERIC_FAILURE: &str = "An internal error occurred";

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(AuthFailure),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Order Error: {0}")]
  Order(#[from] OrderError),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(#[from] StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: PipelineError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  /// A pipeline returned `Stopped` where the handler needed it to complete.
  #[error("Pipeline execution was halted by a handler.")]
  PipelineHaltedByHandler,
}

impl From<AuthFailure> for AppError {
  fn from(failure: AuthFailure) -> Self {
    AppError::Auth(failure)
  }
}

impl From<AuthError> for AppError {
  fn from(err: AuthError) -> Self {
    match err {
      AuthError::Failure(f) => AppError::Auth(f),
      AuthError::Store(e) => AppError::Store(e),
      AuthError::Signing(m) | AuthError::Hashing(m) => AppError::Internal(m),
    }
  }
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    AppError::Store(StoreError::from(err))
  }
}

impl AppError {
  /// The message sent to the client. Server-side failures never expose detail.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::NotFound(m) => m.clone(),
      AppError::Auth(f) => f.to_string(),
      AppError::Order(e) => e.to_string(),
      _ => GENERIC_FAILURE.to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(AuthFailure::AccountLocked { .. }) => StatusCode::LOCKED,
      AppError::Auth(AuthFailure::Forbidden | AuthFailure::EmailNotVerified) => StatusCode::FORBIDDEN,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) | AppError::Order(OrderError::NotFound) => StatusCode::NOT_FOUND,
      AppError::Order(_) => StatusCode::BAD_REQUEST,
      AppError::Config(_)
      | AppError::Store(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_)
      | AppError::PipelineHaltedByHandler => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::info!(status = status.as_u16(), application_error = %self, "Request rejected");
    }
    HttpResponse::build(status).json(json!({
      "success": false,
      "message": self.public_message(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
