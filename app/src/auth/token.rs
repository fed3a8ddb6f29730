// app/src/auth/token.rs

use crate::auth::{AuthError, AuthFailure};
use crate::models::Identity;
use crate::store::IdentityStore;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub iat: i64,
  pub exp: i64,
}

/// Extracts the credential from an `Authorization: Bearer <token>` value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
  header
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|token| !token.is_empty())
}

/// HS256 signing and validation with zero leeway.
#[derive(Clone)]
pub struct TokenService {
  encoding: EncodingKey,
  decoding: DecodingKey,
  validation: Validation,
  ttl: Duration,
}

impl TokenService {
  pub fn new(secret: &str, ttl: Duration) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      validation,
      ttl,
    }
  }

  pub fn issue(&self, identity_id: Uuid) -> Result<String, AuthError> {
    self.issue_with_expiry(identity_id, Utc::now() + self.ttl)
  }

  pub fn issue_with_expiry(&self, identity_id: Uuid, expires_at: DateTime<Utc>) -> Result<String, AuthError> {
    let claims = Claims {
      sub: identity_id,
      iat: Utc::now().timestamp(),
      exp: expires_at.timestamp(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| AuthError::Signing(e.to_string()))
  }

  pub fn decode(&self, token: &str) -> Result<Claims, AuthFailure> {
    decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthFailure::Expired,
        _ => {
          debug!(error = %e, "Token rejected.");
          AuthFailure::InvalidSignature
        }
      })
  }
}

/// Turns a bearer token into an [`Identity`].
///
/// Checks run in a fixed order: presence, signature and expiry, existence of
/// the identity, and only then the account lock.
#[derive(Clone)]
pub struct CredentialVerifier {
  tokens: TokenService,
  identities: Arc<dyn IdentityStore>,
}

impl CredentialVerifier {
  pub fn new(tokens: TokenService, identities: Arc<dyn IdentityStore>) -> Self {
    Self { tokens, identities }
  }

  #[instrument(name = "credential_verifier::verify", skip_all, fields(identity_id = tracing::field::Empty))]
  pub async fn verify(&self, token: Option<&str>) -> Result<Identity, AuthError> {
    let token = token.filter(|t| !t.is_empty()).ok_or(AuthFailure::MissingToken)?;
    let claims = self.tokens.decode(token)?;
    tracing::Span::current().record("identity_id", tracing::field::display(claims.sub));

    let record = self
      .identities
      .find_by_id(claims.sub)
      .await?
      .ok_or(AuthFailure::UnknownIdentity)?;
    let identity = Identity::from(record);

    if let Some(until) = identity.locked_until.filter(|until| *until > Utc::now()) {
      warn!(identity_id = %identity.id, %until, "Token presented for a locked account.");
      return Err(AuthFailure::AccountLocked { until }.into());
    }
    Ok(identity)
  }
}
