// app/src/auth/session.rs

//! Dual-source identity resolution.
//!
//! Sources are tried in order and the first one that yields an identity wins:
//! the server session named by the request cookie, then the bearer token. An
//! identity found through the token is written through to a session so the
//! next request can be served from the cookie alone.

use crate::auth::{AuthError, AuthFailure, CredentialVerifier};
use crate::models::{Identity, SessionRecord};
use crate::store::{IdentityStore, SessionStore, StoreError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// The credential-bearing parts of an incoming request.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
  pub session_id: Option<String>,
  pub bearer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
  pub identity: Identity,
  /// Set when a session id was minted for this request and the client must
  /// be handed the cookie.
  pub issued_session: Option<String>,
}

/// What a source found. `bind_session` asks the resolver to persist the
/// identity against the request's session.
pub struct SourceMatch {
  pub identity: Identity,
  pub bind_session: bool,
}

#[async_trait]
pub trait IdentitySource: Send + Sync {
  fn name(&self) -> &'static str;

  async fn resolve(&self, request: &AuthRequest) -> Result<Option<SourceMatch>, StoreError>;
}

pub struct SessionSource {
  sessions: Arc<dyn SessionStore>,
  identities: Arc<dyn IdentityStore>,
}

#[async_trait]
impl IdentitySource for SessionSource {
  fn name(&self) -> &'static str {
    "session"
  }

  async fn resolve(&self, request: &AuthRequest) -> Result<Option<SourceMatch>, StoreError> {
    let Some(session_id) = request.session_id.as_deref() else {
      return Ok(None);
    };
    let Some(session) = self.sessions.get(session_id).await? else {
      return Ok(None);
    };
    if session.is_expired_at(Utc::now()) {
      debug!("Session expired; discarding.");
      self.sessions.delete(session_id).await?;
      return Ok(None);
    }
    let identity = self.identities.find_by_id(session.identity_id).await?;
    Ok(identity.map(|record| SourceMatch {
      identity: Identity::from(record),
      bind_session: false,
    }))
  }
}

/// Token failures are logged and treated as "no identity from this source".
pub struct BearerSource {
  verifier: CredentialVerifier,
}

#[async_trait]
impl IdentitySource for BearerSource {
  fn name(&self) -> &'static str {
    "bearer"
  }

  async fn resolve(&self, request: &AuthRequest) -> Result<Option<SourceMatch>, StoreError> {
    if request.bearer.is_none() {
      return Ok(None);
    }
    match self.verifier.verify(request.bearer.as_deref()).await {
      Ok(identity) => Ok(Some(SourceMatch {
        identity,
        bind_session: true,
      })),
      Err(AuthError::Failure(failure)) => {
        warn!(%failure, "Bearer token rejected during session resolution.");
        Ok(None)
      }
      Err(AuthError::Store(e)) => Err(e),
      Err(other) => {
        warn!(error = %other, "Bearer token could not be verified.");
        Ok(None)
      }
    }
  }
}

pub struct SessionResolver {
  sources: Vec<Box<dyn IdentitySource>>,
  sessions: Arc<dyn SessionStore>,
  session_ttl: Duration,
}

impl SessionResolver {
  /// Session cookie first, bearer token second.
  pub fn new(
    verifier: CredentialVerifier,
    sessions: Arc<dyn SessionStore>,
    identities: Arc<dyn IdentityStore>,
    session_ttl: Duration,
  ) -> Self {
    let sources: Vec<Box<dyn IdentitySource>> = vec![
      Box::new(SessionSource {
        sessions: sessions.clone(),
        identities,
      }),
      Box::new(BearerSource { verifier }),
    ];
    Self::with_sources(sources, sessions, session_ttl)
  }

  pub fn with_sources(
    sources: Vec<Box<dyn IdentitySource>>,
    sessions: Arc<dyn SessionStore>,
    session_ttl: Duration,
  ) -> Self {
    Self {
      sources,
      sessions,
      session_ttl,
    }
  }

  /// Fails with `Unauthenticated` when no source yields an identity.
  pub async fn resolve(&self, request: &AuthRequest) -> Result<Resolution, AuthError> {
    self
      .resolve_optional(request)
      .await?
      .ok_or_else(|| AuthError::Failure(AuthFailure::Unauthenticated))
  }

  #[instrument(name = "session_resolver::resolve", skip_all, fields(source = tracing::field::Empty))]
  pub async fn resolve_optional(&self, request: &AuthRequest) -> Result<Option<Resolution>, AuthError> {
    for source in &self.sources {
      let Some(found) = source.resolve(request).await? else {
        continue;
      };
      tracing::Span::current().record("source", source.name());

      let issued_session = if found.bind_session {
        self.bind(request, &found.identity).await?
      } else {
        None
      };
      return Ok(Some(Resolution {
        identity: found.identity,
        issued_session,
      }));
    }
    debug!("No identity source matched.");
    Ok(None)
  }

  /// Writes the identity through to the request's session. A cookie that
  /// names no live session is never adopted; a fresh id is minted instead and
  /// returned so the client gets the new cookie.
  async fn bind(&self, request: &AuthRequest, identity: &Identity) -> Result<Option<String>, AuthError> {
    let live = match request.session_id.as_deref() {
      Some(existing) => self
        .sessions
        .get(existing)
        .await?
        .filter(|s| !s.is_expired_at(Utc::now()))
        .map(|s| s.id),
      None => None,
    };
    let (session_id, minted) = match live {
      Some(existing) => (existing, false),
      None => (new_session_id(), true),
    };
    let now = Utc::now();
    self
      .sessions
      .put(&SessionRecord {
        id: session_id.clone(),
        identity_id: identity.id,
        expires_at: now + self.session_ttl,
        created_at: now,
      })
      .await?;
    info!(identity_id = %identity.id, minted, "Bearer identity bound to session.");
    Ok(minted.then_some(session_id))
  }
}

/// 244 random bits from two v4 UUIDs.
pub fn new_session_id() -> String {
  format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
