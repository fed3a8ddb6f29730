// app/src/pipelines/cancel_order_pipeline.rs

//! Owner cancellation. The status change is a conditional update on
//! `pending`, so a second cancel of the same order finds nothing to change and
//! stock is restored exactly once.

use crate::errors::AppError;
use crate::orders::OrderError;
use crate::pipelines::contexts::CancelOrderCtxData;
use crate::store::CancelOutcome;
use chrono::Utc;
use medimart_core::{ContextData, Pipeline, PipelineControl, PipelineRegistry};
use std::sync::Arc;
use tracing::{error, info, warn};

pub fn register_cancel_order_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let mut p = Pipeline::<CancelOrderCtxData, AppError>::new(
    "cancel_order",
    &[("cancel_pending_order", false, None), ("restore_stock", false, None)],
  );

  p.on_root("cancel_pending_order", |ctx_data: ContextData<CancelOrderCtxData>| {
    Box::pin(async move {
      let (order_id, owner_id, reason, stores) = {
        let guard = ctx_data.read();
        (
          guard.order_id,
          guard.owner_id,
          guard.reason.clone().filter(|r| !r.trim().is_empty()),
          guard.app_state.stores.clone(),
        )
      };

      match stores.orders.cancel_if_pending(order_id, owner_id, reason, Utc::now()).await? {
        CancelOutcome::Cancelled(order) => {
          info!(%order_id, "Order cancelled by owner.");
          ctx_data.write().cancelled = Some(order);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        CancelOutcome::NotPending(status) => {
          warn!(%order_id, %status, "Cancellation refused: order is not pending.");
          Err(AppError::from(OrderError::NotPending(status)))
        }
        CancelOutcome::NotFound => Err(AppError::from(OrderError::NotFound)),
      }
    })
  });

  p.on_root("restore_stock", |ctx_data: ContextData<CancelOrderCtxData>| {
    Box::pin(async move {
      let (items, stores) = {
        let guard = ctx_data.read();
        let items: Vec<_> = guard
          .cancelled
          .as_ref()
          .map(|o| o.items.iter().map(|i| (i.product_id, i.quantity)).collect())
          .unwrap_or_default();
        (items, guard.app_state.stores.clone())
      };
      for (product_id, quantity) in items {
        if let Err(e) = stores.stock.increment(product_id, quantity).await {
          error!(%product_id, quantity, error = %e, "Restoring stock after cancellation failed.");
          return Err(AppError::from(e));
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
