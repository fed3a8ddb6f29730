// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the engine itself rather than by user handlers.
///
/// Pipelines are generic over their handler error type `Err`, which must be
/// `From<PipelineError>` so that these framework failures can be surfaced
/// through the same channel.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context data type {context_type}")]
  NotRegistered { context_type: &'static str },

  #[error("Context type mismatch in registry dispatch (expected {expected_type})")]
  TypeMismatch { expected_type: &'static str },

  #[error("Step '{step_name}' failed: {source}")]
  Handler {
    step_name: String,
    #[source]
    source: AnyhowError,
  },
}

impl PipelineError {
  /// Wraps any error raised inside a step as a `PipelineError::Handler`.
  pub fn handler(step_name: impl Into<String>, source: impl Into<AnyhowError>) -> Self {
    PipelineError::Handler {
      step_name: step_name.into(),
      source: source.into(),
    }
  }
}

/// Convenience for step bodies that call into `anyhow`-returning helpers.
pub trait PipelineResultExt<T> {
  fn in_step(self, step_name: &str) -> Result<T, PipelineError>;
}

impl<T, E> PipelineResultExt<T> for Result<T, E>
where
  E: Into<AnyhowError>,
{
  fn in_step(self, step_name: &str) -> Result<T, PipelineError> {
    self.map_err(|e| PipelineError::handler(step_name, e))
  }
}
