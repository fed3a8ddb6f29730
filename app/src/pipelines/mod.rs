// app/src/pipelines/mod.rs

pub mod cancel_order_pipeline;
pub mod cart_pipeline;
pub mod contexts;
pub mod create_order_pipeline;
pub mod login_pipeline;
pub mod order_status_pipeline;

use crate::config::AppConfig;
use crate::errors::AppError;
use medimart_core::{ContextData, PipelineRegistry, PipelineResult};
use std::sync::Arc;
use tracing::warn;

pub fn register_all_pipelines(registry: &Arc<PipelineRegistry<AppError>>, config: &AppConfig) {
  login_pipeline::register_login_pipeline(registry);
  cart_pipeline::register_add_to_cart_pipeline(registry);
  create_order_pipeline::register_create_order_pipeline(registry);
  cancel_order_pipeline::register_cancel_order_pipeline(registry);
  order_status_pipeline::register_order_status_pipeline(registry, config.status_policy);
  tracing::info!("All application pipelines registered.");
}

/// Runs the pipeline registered for `TData` and treats a stop as a failure:
/// none of these pipelines stop on purpose.
pub async fn run_to_completion<TData>(
  registry: &PipelineRegistry<AppError>,
  ctx_data: ContextData<TData>,
) -> Result<(), AppError>
where
  TData: 'static + Send + Sync,
{
  match registry.run(ctx_data).await? {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => {
      warn!(
        context_type = std::any::type_name::<TData>(),
        "Pipeline stopped before completing."
      );
      Err(AppError::PipelineHaltedByHandler)
    }
  }
}
