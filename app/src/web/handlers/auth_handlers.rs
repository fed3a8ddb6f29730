// app/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::config::SESSION_COOKIE_NAME;
use crate::errors::AppError;
use crate::models::Identity;
use crate::pipelines::contexts::LoginCtxData;
use crate::pipelines::run_to_completion;
use crate::state::AppState;
use crate::web::extractors::{OptionalSessionIdentity, SessionIdentity};
use crate::web::session_cookie::{removal_cookie, session_cookie};
use medimart_core::ContextData;

#[derive(Deserialize)]
pub struct LoginRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::login", skip(app_state, req, req_payload), fields(req_email = %req_payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let existing_session = req.cookie(SESSION_COOKIE_NAME).map(|c| c.value().to_string());
  let ctx_data = ContextData::new(LoginCtxData::new(
    app_state.get_ref().clone(),
    payload.email,
    payload.password,
    existing_session,
  ));

  run_to_completion(&app_state.pipelines, ctx_data.clone()).await?;

  let (token, session_id, user) = {
    let guard = ctx_data.read();
    (
      guard.token.clone(),
      guard.session_id.clone(),
      guard.record.clone().map(Identity::from),
    )
  };
  let (Some(token), Some(session_id), Some(user)) = (token, session_id, user) else {
    return Err(AppError::Internal(
      "login completed without token, session or identity".to_string(),
    ));
  };

  info!(identity_id = %user.id, role = %user.role, "User logged in.");
  let cookie = session_cookie(
    session_id,
    app_state.config.session_cookie_secure,
    app_state.config.session_ttl,
  );
  Ok(HttpResponse::Ok().cookie(cookie).json(json!({
    "success": true,
    "message": "Login successful",
    "token": token,
    "user": user,
  })))
}

#[instrument(name = "handler::logout", skip_all)]
pub async fn logout_handler(app_state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
  if let Some(cookie) = req.cookie(SESSION_COOKIE_NAME) {
    app_state.stores.sessions.delete(cookie.value()).await?;
    info!("Session destroyed.");
  }
  Ok(HttpResponse::Ok().cookie(removal_cookie()).json(json!({
    "success": true,
    "message": "Logged out successfully",
  })))
}

#[instrument(name = "handler::me", skip_all, fields(identity_id = %identity.0.id))]
pub async fn me_handler(identity: SessionIdentity) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "user": identity.0,
  })))
}

#[instrument(name = "handler::auth_status", skip_all)]
pub async fn auth_status_handler(identity: OptionalSessionIdentity) -> Result<HttpResponse, AppError> {
  let body = match identity.0 {
    Some(user) => json!({ "success": true, "authenticated": true, "user": user }),
    None => json!({ "success": true, "authenticated": false }),
  };
  Ok(HttpResponse::Ok().json(body))
}
