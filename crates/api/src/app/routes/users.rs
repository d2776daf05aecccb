use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::Response,
    Json,
};
use chrono::Utc;

use shopfloor_auth::{Permission, Role};
use shopfloor_infra::services::NewUser;

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

/// Create a user in the caller's tenant.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let input = NewUser {
        email: body.email,
        display_name: body.display_name,
        password: body.password,
        roles: body.roles.into_iter().map(Role::new).collect(),
    };
    let input = match CmdAuth::new(input, Permission::USERS_CREATE).check(&tenant, &principal) {
        Ok(input) => input,
        Err(res) => return res,
    };

    match services.users.create_user(tenant.tenant_id(), input, Utc::now()).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, created_by = %principal.principal_id(), "user created");
            dto::created(user)
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
