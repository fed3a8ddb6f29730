// app/src/models/session.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Server-side mapping from an opaque cookie value to an identity.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SessionRecord {
  pub id: String,
  pub identity_id: Uuid,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl SessionRecord {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}
