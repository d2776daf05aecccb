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
use shopfloor_infra::services::NewProduct;
use shopfloor_products::ProductId;

use crate::app::routes::common::{self, CmdAuth};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product))
        .route("/:id/archive", post(archive_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<dto::PageQuery>, QueryRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::PRODUCTS_READ) {
        return res;
    }
    let Query(q) = match query {
        Ok(q) => q,
        Err(e) => return errors::query_rejection(e),
    };

    match services.products.list_products(tenant.tenant_id(), q.request()).await {
        Ok(page) => dto::paginated(page),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let input = NewProduct {
        sku: body.sku,
        name: body.name,
        components: body.components,
        finished_item: body.finished_item_id,
    };
    let input = match CmdAuth::new(input, Permission::PRODUCTS_CREATE).check(&tenant, &principal) {
        Ok(input) => input,
        Err(res) => return res,
    };

    match services.products.create_product(tenant.tenant_id(), input, Utc::now()).await {
        Ok(product) => dto::created(product),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<ProductId>, PathRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::PRODUCTS_READ) {
        return res;
    }
    let Path(product_id) = match id {
        Ok(id) => id,
        Err(e) => return errors::path_rejection(e),
    };

    match services.products.get_product(tenant.tenant_id(), product_id).await {
        Ok(product) => dto::ok(product),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn archive_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    id: Result<Path<ProductId>, PathRejection>,
) -> Response {
    if let Err(res) = common::require(&tenant, &principal, Permission::PRODUCTS_CREATE) {
        return res;
    }
    let Path(product_id) = match id {
        Ok(id) => id,
        Err(e) => return errors::path_rejection(e),
    };

    match services
        .products
        .archive_product(tenant.tenant_id(), product_id, Utc::now())
        .await
    {
        Ok(product) => dto::ok(product),
        Err(e) => errors::service_error_to_response(e),
    }
}
