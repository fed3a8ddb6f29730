// app/src/config.rs

use crate::errors::{AppError, Result};
use crate::orders::{PricingPolicy, TransitionPolicy};
use chrono::Duration;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

pub const SESSION_COOKIE_NAME: &str = "medimart_session";

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the server against in-memory stores.
  pub database_url: Option<String>,

  pub jwt_secret: String,
  pub jwt_ttl: Duration,
  pub session_ttl: Duration,
  pub session_cookie_secure: bool,

  pub pricing: PricingPolicy,
  pub status_policy: TransitionPolicy,

  pub max_login_attempts: i32,
  pub lockout: Duration,
  pub require_patient_email_verification: bool,

  pub seed_db: bool,
}

impl AppConfig {
  /// Defaults for everything except the signing secret.
  pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: None,
      jwt_secret: jwt_secret.into(),
      jwt_ttl: Duration::minutes(1440),
      session_ttl: Duration::minutes(1440),
      session_cookie_secure: false,
      pricing: PricingPolicy::default(),
      status_policy: TransitionPolicy::default(),
      max_login_attempts: 5,
      lockout: Duration::minutes(5),
      require_patient_email_verification: true,
      seed_db: false,
    }
  }

  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let jwt_secret = env::var("JWT_SECRET")
      .map_err(|e| AppError::Config(format!("Missing environment variable 'JWT_SECRET': {}", e)))?;
    if jwt_secret.trim().is_empty() {
      return Err(AppError::Config("JWT_SECRET must not be empty".to_string()));
    }
    let defaults = Self::with_secret(jwt_secret);

    let server_host = env::var("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = parse_env("SERVER_PORT", defaults.server_port)?;
    let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());

    let jwt_ttl = minutes_env("JWT_TTL_MINUTES", 1440_i64)?;
    let session_ttl = minutes_env("SESSION_TTL_MINUTES", 1440_i64)?;
    let session_cookie_secure = parse_env("SESSION_COOKIE_SECURE", defaults.session_cookie_secure)?;

    let pricing = PricingPolicy {
      tax_rate: parse_env::<Decimal>("ORDER_TAX_RATE", defaults.pricing.tax_rate)?,
      free_shipping_threshold: parse_env::<Decimal>(
        "ORDER_FREE_SHIPPING_THRESHOLD",
        defaults.pricing.free_shipping_threshold,
      )?,
      flat_shipping: parse_env::<Decimal>("ORDER_FLAT_SHIPPING", defaults.pricing.flat_shipping)?,
    };
    if pricing.tax_rate.is_sign_negative() || pricing.flat_shipping.is_sign_negative() {
      return Err(AppError::Config(
        "ORDER_TAX_RATE and ORDER_FLAT_SHIPPING must not be negative".to_string(),
      ));
    }
    let status_policy = parse_env("ORDER_STATUS_POLICY", defaults.status_policy)?;

    let max_login_attempts = parse_env("MAX_LOGIN_ATTEMPTS", defaults.max_login_attempts)?;
    if max_login_attempts < 1 {
      return Err(AppError::Config("MAX_LOGIN_ATTEMPTS must be at least 1".to_string()));
    }
    let lockout = minutes_env("LOCKOUT_MINUTES", 5_i64)?;
    let require_patient_email_verification = parse_env(
      "REQUIRE_PATIENT_EMAIL_VERIFICATION",
      defaults.require_patient_email_verification,
    )?;
    let seed_db = parse_env("SEED_DB", defaults.seed_db)?;

    tracing::info!(
      host = %server_host,
      port = server_port,
      persistent = database_url.is_some(),
      status_policy = ?status_policy,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      jwt_ttl,
      session_ttl,
      session_cookie_secure,
      pricing,
      status_policy,
      max_login_attempts,
      lockout,
      require_patient_email_verification,
      seed_db,
      ..defaults
    })
  }
}

fn parse_env<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(var_name) {
    Ok(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e))),
    Err(_) => Ok(default),
  }
}

/// Whole minutes, rejecting values that do not fit a `Duration`.
fn minutes_env(var_name: &str, default: i64) -> Result<Duration> {
  let minutes = parse_env(var_name, default)?;
  Duration::try_minutes(minutes)
    .ok_or_else(|| AppError::Config(format!("{} value {} is out of range", var_name, minutes)))
}
