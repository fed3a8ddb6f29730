// app/src/web/extractors.rs

//! Request extractors that authenticate the caller.
//!
//! | extractor                 | credential       | failure                   |
//! |---------------------------|------------------|---------------------------|
//! | [`BearerIdentity`]        | bearer token     | 401 / 423                 |
//! | [`CustomerIdentity`]      | bearer token     | as above, 403 unverified  |
//! | [`Authorized<P>`]         | bearer token     | as above, 403 wrong role  |
//! | [`SessionIdentity`]       | session, bearer  | 401                       |
//! | [`OptionalSessionIdentity`] | session, bearer | never                    |

use crate::auth::gate::RolePolicy;
use crate::auth::{authorize, bearer_token, require_verified_email, AuthRequest, Resolution};
use crate::config::SESSION_COOKIE_NAME;
use crate::errors::AppError;
use crate::models::Identity;
use crate::state::AppState;
use crate::web::session_cookie::IssuedSession;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::marker::PhantomData;
use tracing::debug;

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, AppError> {
  req
    .app_data::<web::Data<AppState>>()
    .cloned()
    .ok_or_else(|| AppError::Internal("application state is not configured".to_string()))
}

fn bearer_from(req: &HttpRequest) -> Option<String> {
  let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
  bearer_token(header).map(str::to_owned)
}

pub fn auth_request(req: &HttpRequest) -> AuthRequest {
  AuthRequest {
    session_id: req
      .cookie(SESSION_COOKIE_NAME)
      .map(|c| c.value().to_string())
      .filter(|v| !v.is_empty()),
    bearer: bearer_from(req),
  }
}

/// Identity from a valid bearer token.
#[derive(Debug, Clone)]
pub struct BearerIdentity(pub Identity);

impl FromRequest for BearerIdentity {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = app_state(req);
    let token = bearer_from(req);
    Box::pin(async move {
      let identity = state?.verifier().verify(token.as_deref()).await?;
      Ok(BearerIdentity(identity))
    })
  }
}

/// A bearer identity that may use customer features. Patients need a
/// verified email unless the check is switched off in configuration.
#[derive(Debug, Clone)]
pub struct CustomerIdentity(pub Identity);

impl FromRequest for CustomerIdentity {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = app_state(req);
    let token = bearer_from(req);
    Box::pin(async move {
      let state = state?;
      let identity = state.verifier().verify(token.as_deref()).await?;
      if state.config.require_patient_email_verification {
        require_verified_email(&identity)?;
      }
      Ok(CustomerIdentity(identity))
    })
  }
}

/// A bearer identity whose role is in `P::ROLES`.
pub struct Authorized<P: RolePolicy> {
  pub identity: Identity,
  _policy: PhantomData<P>,
}

impl<P: RolePolicy + 'static> FromRequest for Authorized<P> {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = app_state(req);
    let token = bearer_from(req);
    Box::pin(async move {
      let identity = state?.verifier().verify(token.as_deref()).await?;
      authorize(Some(&identity), P::ROLES)?;
      Ok(Authorized {
        identity,
        _policy: PhantomData,
      })
    })
  }
}

/// Records a newly minted session id so the response carries the cookie.
fn remember_issued(req: &HttpRequest, resolution: &Resolution) {
  if let Some(session_id) = &resolution.issued_session {
    debug!("Session minted during resolution.");
    req.extensions_mut().insert(IssuedSession(session_id.clone()));
  }
}

/// Identity from the server session, falling back to the bearer token.
#[derive(Debug, Clone)]
pub struct SessionIdentity(pub Identity);

impl FromRequest for SessionIdentity {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move {
      let resolution = app_state(&req)?.session_resolver().resolve(&auth_request(&req)).await?;
      remember_issued(&req, &resolution);
      Ok(SessionIdentity(resolution.identity))
    })
  }
}

/// Like [`SessionIdentity`], but an anonymous caller yields `None`.
#[derive(Debug, Clone)]
pub struct OptionalSessionIdentity(pub Option<Identity>);

impl FromRequest for OptionalSessionIdentity {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move {
      let resolution = app_state(&req)?
        .session_resolver()
        .resolve_optional(&auth_request(&req))
        .await?;
      if let Some(resolution) = &resolution {
        remember_issued(&req, resolution);
      }
      Ok(OptionalSessionIdentity(resolution.map(|r| r.identity)))
    })
  }
}
