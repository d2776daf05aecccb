use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{sse::Event as SseEvent, IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Current principal, resolved against the user store.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.users.me(tenant.tenant_id(), principal.principal_id()).await {
        Ok(user) => dto::ok(json!({
            "user": user,
            "tenant_id": tenant.tenant_id(),
            "roles": principal.role_names(),
        })),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::tenant_sse_stream(services, tenant.tenant_id())
}
