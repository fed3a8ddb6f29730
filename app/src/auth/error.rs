// app/src/auth/error.rs

use crate::store::StoreError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Why a request could not be authenticated or authorized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
  #[error("Access token required")]
  MissingToken,

  #[error("Invalid token")]
  InvalidSignature,

  #[error("Token expired")]
  Expired,

  #[error("User not found")]
  UnknownIdentity,

  #[error("Account is temporarily locked due to multiple failed login attempts. Please try again later.")]
  AccountLocked { until: DateTime<Utc> },

  #[error("Authentication required")]
  Unauthenticated,

  #[error("Invalid email or password")]
  InvalidCredentials,

  #[error("Access denied. Insufficient permissions.")]
  Forbidden,

  #[error("Please verify your email address before accessing this feature.")]
  EmailNotVerified,
}

#[derive(Debug, Error)]
pub enum AuthError {
  #[error(transparent)]
  Failure(#[from] AuthFailure),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("Token signing failed: {0}")]
  Signing(String),

  #[error("Password hashing failed: {0}")]
  Hashing(String),
}

impl AuthError {
  pub fn failure(&self) -> Option<&AuthFailure> {
    match self {
      AuthError::Failure(f) => Some(f),
      _ => None,
    }
  }
}
