// app/src/state.rs

use crate::auth::{CredentialVerifier, SessionResolver, TokenService};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::store::Stores;
use medimart_core::PipelineRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub stores: Stores,
  pub pipelines: Arc<PipelineRegistry<AppError>>,
  pub config: Arc<AppConfig>,
  pub tokens: TokenService,
}

impl AppState {
  /// Builds the state and registers every pipeline against it.
  pub fn new(stores: Stores, config: AppConfig) -> Self {
    let tokens = TokenService::new(&config.jwt_secret, config.jwt_ttl);
    let registry = Arc::new(PipelineRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&registry, &config);
    Self {
      stores,
      pipelines: registry,
      config: Arc::new(config),
      tokens,
    }
  }

  pub fn verifier(&self) -> CredentialVerifier {
    CredentialVerifier::new(self.tokens.clone(), self.stores.identities.clone())
  }

  pub fn session_resolver(&self) -> SessionResolver {
    SessionResolver::new(
      self.verifier(),
      self.stores.sessions.clone(),
      self.stores.identities.clone(),
      self.config.session_ttl,
    )
  }
}
