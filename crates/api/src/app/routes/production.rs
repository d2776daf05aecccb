//! Production order endpoints.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use shopfloor_auth::Permission;
use shopfloor_core::ProductionOrderId;
use shopfloor_infra::services::{CreateOrderInput, OrderUpdate};
use shopfloor_infra::OrderFilter;

use crate::app::routes::common::{self, CmdAuth};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).put(update_order))
        .route("/:id/materials", get(order_materials))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<dto::ListOrdersQuery>, QueryRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::PRODUCTION_ORDERS_READ) {
        return res;
    }
    let Query(q) = match query {
        Ok(q) => q,
        Err(e) => return errors::query_rejection(e),
    };

    let page = dto::PageQuery { page: q.page, limit: q.limit }.request();
    let filter = OrderFilter {
        status: q.status,
        priority: q.priority,
        product_id: q.product_id,
    };

    match services.orders.list_orders(tenant.tenant_id(), filter, page).await {
        Ok(page) => dto::paginated(page),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateOrderRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let input = CreateOrderInput {
        product_id: body.product_id,
        quantity_planned: body.quantity_planned,
        start_date: body.start_date,
        due_date: body.due_date,
        priority: body.priority,
        notes: body.notes,
    };
    let input = match CmdAuth::new(input, Permission::PRODUCTION_ORDERS_CREATE).check(&tenant, &principal) {
        Ok(input) => input,
        Err(res) => return res,
    };

    match services.orders.create_order(tenant.tenant_id(), input, Utc::now()).await {
        Ok(order) => dto::created(order),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<ProductionOrderId>, PathRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::PRODUCTION_ORDERS_READ) {
        return res;
    }
    let Path(order_id) = match id {
        Ok(id) => id,
        Err(e) => return errors::path_rejection(e),
    };

    match services.orders.get_order(tenant.tenant_id(), order_id).await {
        Ok(order) => dto::ok(order),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Detail edits and status transitions share one endpoint.
pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<ProductionOrderId>, PathRejection>,
    body: Result<Json<dto::UpdateOrderRequest>, JsonRejection>,
) -> Response {
    let Path(order_id) = match id {
        Ok(id) => id,
        Err(e) => return errors::path_rejection(e),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let update = OrderUpdate {
        priority: body.priority,
        start_date: body.start_date,
        due_date: body.due_date,
        notes: body.notes,
        quantity_produced: body.quantity_produced,
        status: body.status,
    };
    let update = match CmdAuth::new(update, Permission::PRODUCTION_ORDERS_UPDATE).check(&tenant, &principal) {
        Ok(update) => update,
        Err(res) => return res,
    };

    match services
        .orders
        .update_order(tenant.tenant_id(), order_id, update, Utc::now())
        .await
    {
        Ok(order) => dto::ok(order),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn order_materials(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<ProductionOrderId>, PathRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::PRODUCTION_ORDERS_READ) {
        return res;
    }
    let Path(order_id) = match id {
        Ok(id) => id,
        Err(e) => return errors::path_rejection(e),
    };

    match services.orders.material_requirements(tenant.tenant_id(), order_id).await {
        Ok(materials) => dto::ok(materials),
        Err(e) => errors::service_error_to_response(e),
    }
}
