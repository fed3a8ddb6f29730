// app/src/models/identity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Doctor,
  Patient,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Role::Admin => "admin",
      Role::Doctor => "doctor",
      Role::Patient => "patient",
    };
    f.write_str(s)
  }
}

/// An authenticated user as seen by the rest of the application.
///
/// There is deliberately no password hash on this type; the only way to
/// obtain one is through [`IdentityRecord`], which never leaves the auth layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  pub id: Uuid,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  pub email_verified: bool,
  pub locked_until: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

/// The stored row, secrets included.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRecord {
  pub id: Uuid,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  pub email_verified: bool,
  pub locked_until: Option<DateTime<Utc>>,
  pub password_hash: String,
  pub failed_login_attempts: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
  /// A fresh, unlocked record with the given argon2 hash.
  pub fn new(
    email: impl Into<String>,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
    role: Role,
    password_hash: String,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      email: email.into().trim().to_lowercase(),
      first_name: first_name.into(),
      last_name: last_name.into(),
      role,
      email_verified: false,
      locked_until: None,
      password_hash,
      failed_login_attempts: 0,
      created_at: now,
      updated_at: now,
    }
  }
}

impl From<IdentityRecord> for Identity {
  fn from(record: IdentityRecord) -> Self {
    Identity {
      id: record.id,
      email: record.email,
      first_name: record.first_name,
      last_name: record.last_name,
      role: record.role,
      email_verified: record.email_verified,
      locked_until: record.locked_until,
      created_at: record.created_at,
    }
  }
}
