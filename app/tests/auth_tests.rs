// tests/auth_tests.rs
mod common;

use chrono::{Duration, Utc};
use common::*;
use medimart::auth::{AuthError, AuthFailure, AuthRequest, TokenService};
use medimart::errors::AppError;
use medimart::models::{Role, SessionRecord};
use medimart::pipelines::contexts::LoginCtxData;
use medimart::pipelines::run_to_completion;
use medimart_core::ContextData;
use uuid::Uuid;

fn failure(result: Result<impl std::fmt::Debug, AuthError>) -> AuthFailure {
  match result {
    Err(AuthError::Failure(f)) => f,
    other => panic!("expected an auth failure, got {:?}", other),
  }
}

#[tokio::test]
async fn valid_token_resolves_identity_without_secrets() {
  let state = test_state();
  let patient = add_identity(&state, "pat@example.com", Role::Patient, true).await;
  let token = token_for(&state, &patient);

  let identity = state.verifier().verify(Some(token.as_str())).await.unwrap();
  assert_eq!(identity, patient);

  let json = serde_json::to_value(&identity).unwrap();
  assert!(json.get("passwordHash").is_none());
  assert!(json.get("password_hash").is_none());
  assert_eq!(json["role"], "patient");
}

#[tokio::test]
async fn missing_token_is_reported() {
  let state = test_state();
  assert_eq!(failure(state.verifier().verify(None).await), AuthFailure::MissingToken);
  assert_eq!(failure(state.verifier().verify(Some("")).await), AuthFailure::MissingToken);
}

#[tokio::test]
async fn expired_token_is_rejected() {
  let state = test_state();
  let patient = add_identity(&state, "late@example.com", Role::Patient, true).await;
  let token = state
    .tokens
    .issue_with_expiry(patient.id, Utc::now() - Duration::seconds(60))
    .unwrap();

  assert_eq!(failure(state.verifier().verify(Some(token.as_str())).await), AuthFailure::Expired);
}

#[tokio::test]
async fn foreign_or_tampered_tokens_fail_signature_check() {
  let state = test_state();
  let patient = add_identity(&state, "sig@example.com", Role::Patient, true).await;

  let foreign = TokenService::new("some-other-secret", Duration::minutes(5))
    .issue(patient.id)
    .unwrap();
  assert_eq!(
    failure(state.verifier().verify(Some(foreign.as_str())).await),
    AuthFailure::InvalidSignature
  );
  assert_eq!(
    failure(state.verifier().verify(Some("not.a.jwt")).await),
    AuthFailure::InvalidSignature
  );
}

#[tokio::test]
async fn token_for_unknown_identity_is_rejected() {
  let state = test_state();
  let token = state.tokens.issue(Uuid::new_v4()).unwrap();
  assert_eq!(
    failure(state.verifier().verify(Some(token.as_str())).await),
    AuthFailure::UnknownIdentity
  );
}

#[tokio::test]
async fn locked_account_is_rejected_even_with_a_perfect_token() {
  let state = test_state();
  let until = Utc::now() + Duration::minutes(10);
  let locked = add_identity_with(&state, "locked@example.com", Role::Doctor, true, Some(until)).await;
  let token = token_for(&state, &locked);

  match failure(state.verifier().verify(Some(token.as_str())).await) {
    AuthFailure::AccountLocked { until: reported } => assert_eq!(reported, until),
    other => panic!("expected AccountLocked, got {:?}", other),
  }
}

#[tokio::test]
async fn lock_is_checked_after_expiry() {
  let state = test_state();
  let locked = add_identity_with(
    &state,
    "both@example.com",
    Role::Patient,
    true,
    Some(Utc::now() + Duration::minutes(10)),
  )
  .await;
  let token = state
    .tokens
    .issue_with_expiry(locked.id, Utc::now() - Duration::seconds(5))
    .unwrap();
  assert_eq!(failure(state.verifier().verify(Some(token.as_str())).await), AuthFailure::Expired);
}

#[tokio::test]
async fn elapsed_lock_no_longer_blocks() {
  let state = test_state();
  let formerly = add_identity_with(
    &state,
    "past@example.com",
    Role::Patient,
    true,
    Some(Utc::now() - Duration::minutes(1)),
  )
  .await;
  let token = token_for(&state, &formerly);
  assert!(state.verifier().verify(Some(token.as_str())).await.is_ok());
}

#[tokio::test]
async fn session_takes_precedence_over_bearer() {
  let state = test_state();
  let alice = add_identity(&state, "alice@example.com", Role::Patient, true).await;
  let bob = add_identity(&state, "bob@example.com", Role::Doctor, true).await;

  state
    .stores
    .sessions
    .put(&SessionRecord {
      id: "alice-session".to_string(),
      identity_id: alice.id,
      expires_at: Utc::now() + Duration::hours(1),
      created_at: Utc::now(),
    })
    .await
    .unwrap();

  let request = AuthRequest {
    session_id: Some("alice-session".to_string()),
    bearer: Some(token_for(&state, &bob)),
  };
  let resolution = state.session_resolver().resolve(&request).await.unwrap();
  assert_eq!(resolution.identity.id, alice.id);
  assert_eq!(resolution.issued_session, None);
}

#[tokio::test]
async fn bearer_fallback_mints_a_session_that_later_requests_can_use() {
  let state = test_state();
  let doctor = add_identity(&state, "doc@example.com", Role::Doctor, true).await;

  let first = state
    .session_resolver()
    .resolve(&AuthRequest {
      session_id: None,
      bearer: Some(token_for(&state, &doctor)),
    })
    .await
    .unwrap();
  let minted = first.issued_session.expect("a session id should be minted");

  let stored = state.stores.sessions.get(&minted).await.unwrap().unwrap();
  assert_eq!(stored.identity_id, doctor.id);

  let second = state
    .session_resolver()
    .resolve(&AuthRequest {
      session_id: Some(minted),
      bearer: None,
    })
    .await
    .unwrap();
  assert_eq!(second.identity.id, doctor.id);
}

#[tokio::test]
async fn bearer_fallback_never_adopts_an_unknown_cookie_value() {
  let state = test_state();
  let patient = add_identity(&state, "through@example.com", Role::Patient, true).await;

  let resolution = state
    .session_resolver()
    .resolve(&AuthRequest {
      session_id: Some("planted-cookie".to_string()),
      bearer: Some(token_for(&state, &patient)),
    })
    .await
    .unwrap();

  let minted = resolution.issued_session.expect("a fresh session id should be issued");
  assert_ne!(minted, "planted-cookie");
  assert!(state.stores.sessions.get("planted-cookie").await.unwrap().is_none());
  let stored = state.stores.sessions.get(&minted).await.unwrap().unwrap();
  assert_eq!(stored.identity_id, patient.id);
}

#[tokio::test]
async fn bad_token_falls_through_to_unauthenticated() {
  let state = test_state();
  let request = AuthRequest {
    session_id: None,
    bearer: Some("garbage".to_string()),
  };

  assert_eq!(
    failure(state.session_resolver().resolve(&request).await),
    AuthFailure::Unauthenticated
  );
  assert_eq!(state.session_resolver().resolve_optional(&request).await.unwrap(), None);
}

#[tokio::test]
async fn expired_session_is_ignored_and_removed() {
  let state = test_state();
  let patient = add_identity(&state, "exp@example.com", Role::Patient, true).await;
  state
    .stores
    .sessions
    .put(&SessionRecord {
      id: "old".to_string(),
      identity_id: patient.id,
      expires_at: Utc::now() - Duration::minutes(1),
      created_at: Utc::now() - Duration::days(2),
    })
    .await
    .unwrap();

  let resolved = state
    .session_resolver()
    .resolve_optional(&AuthRequest {
      session_id: Some("old".to_string()),
      bearer: None,
    })
    .await
    .unwrap();
  assert!(resolved.is_none());
  assert!(state.stores.sessions.get("old").await.unwrap().is_none());
}

async fn login(state: &medimart::AppState, email: &str, password: &str) -> Result<LoginCtxData, AppError> {
  let ctx_data = ContextData::new(LoginCtxData::new(
    state.clone(),
    email.to_string(),
    password.to_string(),
    None,
  ));
  run_to_completion(&state.pipelines, ctx_data.clone()).await?;
  let data = ctx_data.read().clone();
  Ok(data)
}

#[tokio::test]
async fn login_issues_a_verifiable_token_and_session() {
  let state = test_state();
  let patient = add_identity(&state, "login@example.com", Role::Patient, true).await;

  let done = login(&state, "LOGIN@example.com", TEST_PASSWORD).await.unwrap();
  let token = done.token.expect("token issued");
  let session_id = done.session_id.expect("session opened");

  assert_eq!(state.verifier().verify(Some(token.as_str())).await.unwrap().id, patient.id);
  let session = state.stores.sessions.get(&session_id).await.unwrap().unwrap();
  assert_eq!(session.identity_id, patient.id);
}

#[tokio::test]
async fn repeated_failures_lock_the_account() {
  let mut config = test_config();
  config.max_login_attempts = 3;
  let state = test_state_with(config);
  add_identity(&state, "guess@example.com", Role::Patient, true).await;

  for _ in 0..3 {
    let err = login(&state, "guess@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, AppError::Auth(AuthFailure::InvalidCredentials)));
  }

  let err = login(&state, "guess@example.com", TEST_PASSWORD).await.unwrap_err();
  assert!(matches!(err, AppError::Auth(AuthFailure::AccountLocked { .. })));
}

#[tokio::test]
async fn successful_login_resets_the_failure_counter() {
  let mut config = test_config();
  config.max_login_attempts = 2;
  let state = test_state_with(config);
  let patient = add_identity(&state, "reset@example.com", Role::Patient, true).await;

  login(&state, "reset@example.com", "wrong").await.unwrap_err();
  login(&state, "reset@example.com", TEST_PASSWORD).await.unwrap();

  let record = state.stores.identities.find_by_id(patient.id).await.unwrap().unwrap();
  assert_eq!(record.failed_login_attempts, 0);

  // One more failure alone must not lock.
  login(&state, "reset@example.com", "wrong").await.unwrap_err();
  login(&state, "reset@example.com", TEST_PASSWORD).await.unwrap();
}

#[tokio::test]
async fn unknown_email_is_indistinguishable_from_wrong_password() {
  let state = test_state();
  let err = login(&state, "nobody@example.com", "whatever").await.unwrap_err();
  assert!(matches!(err, AppError::Auth(AuthFailure::InvalidCredentials)));
}
