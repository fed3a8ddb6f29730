// core/src/registry.rs

//! A type-keyed registry of pipelines.
//!
//! Each pipeline is stored under the `TypeId` of the context data it runs on,
//! so callers dispatch by handing over a `ContextData<TData>` and never name
//! the pipeline directly.

use crate::context_data::ContextData;
use crate::control::PipelineResult;
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct TypedRunner<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, HandlerErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<TData, HandlerErr, AppErr> ErasedRunner<AppErr> for TypedRunner<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<PipelineError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<PipelineError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let ctx_data = match ctx.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        return Err(AppErr::from(PipelineError::TypeMismatch {
          expected_type: std::any::type_name::<ContextData<TData>>(),
        }))
      }
    };
    self.pipeline.run(ctx_data).await.map_err(AppErr::from)
  }
}

/// Registry returning the application's error type `AppErr` from every run.
pub struct PipelineRegistry<AppErr>
where
  AppErr: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  runners: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
}

impl<AppErr> Default for PipelineRegistry<AppErr>
where
  AppErr: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> PipelineRegistry<AppErr>
where
  AppErr: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for its context data type, replacing any previous one.
  pub fn register_pipeline<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<PipelineError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    let name = pipeline.name().to_string();
    let runner: Arc<dyn ErasedRunner<AppErr>> = Arc::new(TypedRunner::<TData, HandlerErr, AppErr> {
      pipeline: Arc::new(pipeline),
      _app_err: PhantomData,
    });
    let replaced = self.runners.write().insert(TypeId::of::<TData>(), runner).is_some();
    event!(
      Level::DEBUG,
      pipeline = %name,
      context_type = std::any::type_name::<TData>(),
      replaced,
      "Pipeline registered."
    );
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`.
  #[instrument(name = "PipelineRegistry::run", skip_all, fields(context_type = std::any::type_name::<TData>()))]
  pub async fn run<TData: 'static + Send + Sync>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr> {
    // Clone the Arc out so the registry lock is released before awaiting.
    let runner = self.runners.read().get(&TypeId::of::<TData>()).cloned();
    match runner {
      Some(runner) => runner.run_erased(Box::new(ctx_data)).await,
      None => {
        event!(Level::ERROR, "No pipeline registered for context type.");
        Err(AppErr::from(PipelineError::NotRegistered {
          context_type: std::any::type_name::<TData>(),
        }))
      }
    }
  }
}
