// app/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::gate::AdminOnly;
use crate::errors::AppError;
use crate::models::{OrderStatus, PageRequest, ShippingAddress};
use crate::orders::OrderError;
use crate::pipelines::contexts::{CancelOrderCtxData, CreateOrderCtxData, UpdateStatusCtxData};
use crate::pipelines::run_to_completion;
use crate::state::AppState;
use crate::web::extractors::{Authorized, CustomerIdentity};
use medimart_core::ContextData;

#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
  pub page: Option<u32>,
  pub limit: Option<u32>,
}

impl From<&PageQuery> for PageRequest {
  fn from(q: &PageQuery) -> Self {
    PageRequest::new(q.page, q.limit)
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequestPayload {
  pub shipping_address: ShippingAddress,
  pub payment_method: String,
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CancelOrderRequestPayload {
  #[serde(default)]
  pub reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusRequestPayload {
  pub status: OrderStatus,
}

#[instrument(name = "handler::list_my_orders", skip(app_state, customer), fields(user_id = %customer.0.id))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  customer: CustomerIdentity,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .stores
    .orders
    .list(Some(customer.0.id), PageRequest::from(&*query))
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "orders": page.items,
    "pagination": page.pagination(),
  })))
}

/// Orders belonging to someone else are reported as missing.
#[instrument(name = "handler::get_my_order", skip(app_state, customer), fields(user_id = %customer.0.id))]
pub async fn get_my_order_handler(
  app_state: web::Data<AppState>,
  customer: CustomerIdentity,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state
    .stores
    .orders
    .find(order_id)
    .await?
    .filter(|o| o.owner_id == customer.0.id)
    .ok_or(OrderError::NotFound)?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

#[instrument(name = "handler::create_order", skip(app_state, customer, req_payload), fields(user_id = %customer.0.id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  customer: CustomerIdentity,
  req_payload: web::Json<CreateOrderRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(CreateOrderCtxData::new(
    app_state.get_ref().clone(),
    customer.0,
    payload.shipping_address,
    payload.payment_method,
    payload.notes,
  ));
  run_to_completion(&app_state.pipelines, ctx_data.clone()).await?;

  let summary = ctx_data
    .read()
    .order
    .as_ref()
    .map(|o| o.summary())
    .ok_or_else(|| AppError::Internal("order pipeline completed without an order".to_string()))?;
  info!(order_id = %summary.id, order_number = %summary.order_number, "Order created.");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Order created successfully",
    "order": summary,
  })))
}

#[instrument(name = "handler::cancel_order", skip(app_state, customer, req_payload), fields(user_id = %customer.0.id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  customer: CustomerIdentity,
  path: web::Path<Uuid>,
  req_payload: Option<web::Json<CancelOrderRequestPayload>>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let reason = req_payload.and_then(|p| p.into_inner().reason);
  let ctx_data = ContextData::new(CancelOrderCtxData::new(
    app_state.get_ref().clone(),
    customer.0.id,
    order_id,
    reason,
  ));
  run_to_completion(&app_state.pipelines, ctx_data.clone()).await?;

  let order = ctx_data.read().cancelled.clone();
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order cancelled successfully",
    "order": order,
  })))
}

#[instrument(name = "handler::update_order_status", skip(app_state, admin, req_payload), fields(admin_id = %admin.identity.id))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  admin: Authorized<AdminOnly>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateStatusRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(UpdateStatusCtxData::new(
    app_state.get_ref().clone(),
    path.into_inner(),
    req_payload.status,
  ));
  run_to_completion(&app_state.pipelines, ctx_data.clone()).await?;

  let order = ctx_data.read().updated.clone();
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order status updated successfully",
    "order": order,
  })))
}

#[instrument(name = "handler::list_all_orders", skip(app_state, admin), fields(admin_id = %admin.identity.id))]
pub async fn list_all_orders_handler(
  app_state: web::Data<AppState>,
  admin: Authorized<AdminOnly>,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .stores
    .orders
    .list(None, PageRequest::from(&*query))
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "orders": page.items,
    "pagination": page.pagination(),
  })))
}
