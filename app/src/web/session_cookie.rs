// app/src/web/session_cookie.rs

use crate::config::SESSION_COOKIE_NAME;
use crate::state::AppState;
use actix_web::body::MessageBody;
use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, HttpMessage};

/// Request extension set when an extractor minted a session id.
#[derive(Debug, Clone)]
pub struct IssuedSession(pub String);

pub fn session_cookie(session_id: String, secure: bool, ttl: chrono::Duration) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE_NAME, session_id)
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(secure)
    .max_age(time::Duration::seconds(ttl.num_seconds()))
    .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
  let mut cookie = Cookie::build(SESSION_COOKIE_NAME, "")
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .finish();
  cookie.make_removal();
  cookie
}

/// Adds the session cookie to responses whose request minted a session.
pub async fn issue_session_cookie(
  req: ServiceRequest,
  next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
  let mut res = next.call(req).await?;

  let issued = res.request().extensions().get::<IssuedSession>().cloned();
  let Some(IssuedSession(session_id)) = issued else {
    return Ok(res);
  };
  let (secure, ttl) = res
    .request()
    .app_data::<web::Data<AppState>>()
    .map(|s| (s.config.session_cookie_secure, s.config.session_ttl))
    .unwrap_or((false, chrono::Duration::minutes(1440)));

  res
    .response_mut()
    .add_cookie(&session_cookie(session_id, secure, ttl))
    .map_err(actix_web::error::ErrorInternalServerError)?;
  Ok(res)
}
