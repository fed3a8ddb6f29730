// app/src/pipelines/order_status_pipeline.rs

//! Administrative status changes. Under the permissive policy the
//! `check_transition` step has no handler and is skipped; otherwise each move
//! is checked against the configured [`TransitionPolicy`].

use crate::errors::AppError;
use crate::models::OrderStatus;
use crate::orders::{OrderError, TransitionPolicy};
use crate::pipelines::contexts::UpdateStatusCtxData;
use chrono::Utc;
use medimart_core::{ContextData, Pipeline, PipelineControl, PipelineRegistry, SkipCondition};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_order_status_pipeline(registry: &Arc<PipelineRegistry<AppError>>, policy: TransitionPolicy) {
  let not_delivered: SkipCondition<UpdateStatusCtxData> =
    Arc::new(|ctx_data: &ContextData<UpdateStatusCtxData>| ctx_data.with(|d| d.new_status != OrderStatus::Delivered));

  let mut p = Pipeline::<UpdateStatusCtxData, AppError>::new(
    "update_order_status",
    &[
      ("load_order", false, None),
      ("check_transition", true, None),
      ("stamp_delivery", false, Some(not_delivered)),
      ("apply_status", false, None),
    ],
  );

  p.on_root("load_order", |ctx_data: ContextData<UpdateStatusCtxData>| {
    Box::pin(async move {
      let (order_id, stores) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.app_state.stores.clone())
      };
      let order = stores
        .orders
        .find(order_id)
        .await?
        .ok_or(AppError::from(OrderError::NotFound))?;
      ctx_data.write().current = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  if policy != TransitionPolicy::Permissive {
    p.on_root("check_transition", move |ctx_data: ContextData<UpdateStatusCtxData>| {
      Box::pin(async move {
        let (from, to) = {
          let guard = ctx_data.read();
          (guard.current.as_ref().map(|o| o.status), guard.new_status)
        };
        let from = from.ok_or_else(|| AppError::Internal("order missing at transition check".to_string()))?;
        if !policy.allows(from, to) {
          warn!(%from, %to, ?policy, "Status transition refused.");
          return Err(AppError::from(OrderError::InvalidTransition { from, to }));
        }
        Ok::<_, AppError>(PipelineControl::Continue)
      })
    });
  }

  p.on_root("stamp_delivery", |ctx_data: ContextData<UpdateStatusCtxData>| {
    Box::pin(async move {
      ctx_data.write().delivered_at = Some(Utc::now());
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("apply_status", |ctx_data: ContextData<UpdateStatusCtxData>| {
    Box::pin(async move {
      let (order_id, status, delivered_at, stores) = {
        let guard = ctx_data.read();
        (
          guard.order_id,
          guard.new_status,
          guard.delivered_at,
          guard.app_state.stores.clone(),
        )
      };
      let updated = stores
        .orders
        .set_status(order_id, status, delivered_at, Utc::now())
        .await?
        .ok_or(AppError::from(OrderError::NotFound))?;
      info!(%order_id, %status, "Order status updated.");
      ctx_data.write().updated = Some(updated);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
