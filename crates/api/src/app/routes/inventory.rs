//! Inventory items and the transaction ledger.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use shopfloor_auth::Permission;
use shopfloor_infra::services::{ItemUpdate, NewItem, NewTransaction};
use shopfloor_infra::ItemFilter;
use shopfloor_inventory::InventoryItemId;

use crate::app::routes::common::{self, CmdAuth};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/alerts", get(low_stock_alerts))
        .route("/transactions", post(record_transaction))
        .route("/:id", get(get_item).put(update_item))
        .route("/:id/transactions", get(item_ledger))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<dto::ListItemsQuery>, QueryRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::INVENTORY_ITEMS_READ) {
        return res;
    }
    let Query(q) = match query {
        Ok(q) => q,
        Err(e) => return errors::query_rejection(e),
    };

    let page = dto::PageQuery { page: q.page, limit: q.limit }.request();
    let filter = ItemFilter {
        category: q.category,
        low_stock_only: q.low_stock,
        search: q.search.filter(|s| !s.trim().is_empty()),
    };

    match services.inventory.list_items(tenant.tenant_id(), filter, page).await {
        Ok(page) => dto::paginated(page),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateItemRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let input = NewItem {
        sku: body.sku,
        name: body.name,
        category: body.category,
        minimum_stock: body.minimum_stock,
        unit_cost: body.unit_cost,
        opening_stock: body.opening_stock,
    };
    let input = match CmdAuth::new(input, Permission::INVENTORY_ITEMS_CREATE).check(&tenant, &principal) {
        Ok(input) => input,
        Err(res) => return res,
    };

    match services.inventory.create_item(tenant.tenant_id(), input, Utc::now()).await {
        Ok(item) => dto::created(item),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<InventoryItemId>, PathRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::INVENTORY_ITEMS_READ) {
        return res;
    }
    let Path(item_id) = match id {
        Ok(id) => id,
        Err(e) => return errors::path_rejection(e),
    };

    match services.inventory.get_item(tenant.tenant_id(), item_id).await {
        Ok(detail) => dto::ok(detail),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<InventoryItemId>, PathRejection>,
    body: Result<Json<dto::UpdateItemRequest>, JsonRejection>,
) -> Response {
    let Path(item_id) = match id {
        Ok(id) => id,
        Err(e) => return errors::path_rejection(e),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let update = ItemUpdate {
        name: body.name,
        category: body.category,
        minimum_stock: body.minimum_stock,
        unit_cost: body.unit_cost,
    };
    let update = match CmdAuth::new(update, Permission::INVENTORY_ITEMS_CREATE).check(&tenant, &principal) {
        Ok(update) => update,
        Err(res) => return res,
    };

    match services
        .inventory
        .update_item(tenant.tenant_id(), item_id, update, Utc::now())
        .await
    {
        Ok(item) => dto::ok(item),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Apply one stock movement. Rejected movements leave no ledger row.
pub async fn record_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::TransactionRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let input = NewTransaction {
        item_id: body.item_id,
        kind: body.kind,
        quantity: body.quantity,
        production_order_id: body.production_order_id,
        note: body.note,
    };
    let input = match CmdAuth::new(input, Permission::INVENTORY_TRANSACTIONS_CREATE)
        .check(&tenant, &principal)
    {
        Ok(input) => input,
        Err(res) => return res,
    };

    match services
        .inventory
        .apply_transaction(tenant.tenant_id(), input, Utc::now())
        .await
    {
        Ok(applied) => dto::created(applied),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn item_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<InventoryItemId>, PathRejection>,
    query: Result<Query<dto::PageQuery>, QueryRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::INVENTORY_ITEMS_READ) {
        return res;
    }
    let Path(item_id) = match id {
        Ok(id) => id,
        Err(e) => return errors::path_rejection(e),
    };
    let Query(q) = match query {
        Ok(q) => q,
        Err(e) => return errors::query_rejection(e),
    };

    match services
        .inventory
        .item_ledger(tenant.tenant_id(), item_id, q.request())
        .await
    {
        Ok(page) => dto::paginated(page),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn low_stock_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::INVENTORY_ITEMS_READ) {
        return res;
    }

    match services.inventory.low_stock_alerts(tenant.tenant_id()).await {
        Ok(alerts) => dto::ok(alerts),
        Err(e) => errors::service_error_to_response(e),
    }
}
