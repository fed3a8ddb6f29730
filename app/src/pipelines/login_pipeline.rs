// app/src/pipelines/login_pipeline.rs

//! Password login: lockout accounting, token issue and session creation.

use crate::auth::password::verify_password;
use crate::auth::session::new_session_id;
use crate::auth::AuthFailure;
use crate::errors::AppError;
use crate::models::{Identity, SessionRecord};
use crate::pipelines::contexts::LoginCtxData;
use chrono::Utc;
use medimart_core::{ContextData, Pipeline, PipelineControl, PipelineRegistry};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_login_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let mut p = Pipeline::<LoginCtxData, AppError>::new(
    "login",
    &[
      ("validate_login_input", false, None),
      ("fetch_identity_by_email", false, None),
      ("check_account_lock", false, None),
      ("verify_password", false, None),
      ("reset_login_failures", false, None),
      ("issue_token", false, None),
      ("open_session", false, None),
    ],
  );

  p.on_root("validate_login_input", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let (email_ok, password_ok) = ctx_data.with(|d| (d.email.contains('@'), !d.password.is_empty()));
      if !email_ok || !password_ok {
        return Err(AppError::Validation(
          "A valid email and password are required".to_string(),
        ));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("fetch_identity_by_email", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let (email, stores) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.stores.clone())
      };
      let Some(record) = stores.identities.find_by_email(&email).await? else {
        info!("Login failed: unknown email.");
        return Err(AppError::from(AuthFailure::InvalidCredentials));
      };
      ctx_data.write().record = Some(record);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("check_account_lock", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let locked_until = ctx_data.with(|d| {
        d.record
          .as_ref()
          .and_then(|r| r.locked_until)
          .filter(|until| *until > Utc::now())
      });
      if let Some(until) = locked_until {
        warn!(%until, "Login refused: account locked.");
        return Err(AppError::from(AuthFailure::AccountLocked { until }));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("verify_password", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let (record, password, stores, config) = {
        let guard = ctx_data.read();
        (
          guard.record.clone(),
          guard.password.clone(),
          guard.app_state.stores.clone(),
          guard.app_state.config.clone(),
        )
      };
      let record = record.ok_or_else(|| AppError::Internal("identity missing at password check".to_string()))?;

      if verify_password(&record.password_hash, &password)? {
        return Ok::<_, AppError>(PipelineControl::Continue);
      }

      let lock_until = Utc::now() + config.lockout;
      let updated = stores
        .identities
        .record_failed_login(record.id, config.max_login_attempts, lock_until)
        .await?;
      let locked = updated
        .as_ref()
        .and_then(|r| r.locked_until)
        .is_some_and(|until| until > Utc::now());
      warn!(identity_id = %record.id, locked, "Login failed: wrong password.");
      Err(AppError::from(AuthFailure::InvalidCredentials))
    })
  });

  p.on_root("reset_login_failures", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let (needs_reset, id, stores) = {
        let guard = ctx_data.read();
        let record = guard.record.as_ref();
        (
          record.is_some_and(|r| r.failed_login_attempts > 0 || r.locked_until.is_some()),
          record.map(|r| r.id),
          guard.app_state.stores.clone(),
        )
      };
      if let (true, Some(id)) = (needs_reset, id) {
        stores.identities.reset_failed_logins(id).await?;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("issue_token", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let (id, tokens) = {
        let guard = ctx_data.read();
        (guard.record.as_ref().map(|r| r.id), guard.app_state.tokens.clone())
      };
      let id = id.ok_or_else(|| AppError::Internal("identity missing at token issue".to_string()))?;
      let token = tokens.issue(id)?;
      ctx_data.write().token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("open_session", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let (identity, existing, stores, ttl) = {
        let guard = ctx_data.read();
        (
          guard.record.clone().map(Identity::from),
          guard.existing_session_id.clone(),
          guard.app_state.stores.clone(),
          guard.app_state.config.session_ttl,
        )
      };
      let identity = identity.ok_or_else(|| AppError::Internal("identity missing at session open".to_string()))?;
      // A fresh id on every login; a session id the client held before
      // authenticating is never promoted.
      if let Some(previous) = existing {
        stores.sessions.delete(&previous).await?;
      }
      let session_id = new_session_id();
      let now = Utc::now();
      stores
        .sessions
        .put(&SessionRecord {
          id: session_id.clone(),
          identity_id: identity.id,
          expires_at: now + ttl,
          created_at: now,
        })
        .await?;
      info!(identity_id = %identity.id, "Login succeeded; session opened.");
      ctx_data.write().session_id = Some(session_id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
