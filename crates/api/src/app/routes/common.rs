use axum::response::Response;

use shopfloor_auth::{CommandAuthorization, Permission};

use crate::app::errors;
use crate::context::{PrincipalContext, TenantContext};

/// Small helper wrapper to associate required permissions with an operation.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

impl<C> CmdAuth<C> {
    pub fn new(inner: C, required: Permission) -> Self {
        Self {
            inner,
            required: vec![required],
        }
    }

    /// Authorize and hand back the wrapped operation, or a 403 response.
    pub fn check(self, tenant: &TenantContext, principal: &PrincipalContext) -> Result<C, Response> {
        match crate::authz::authorize_command(tenant, principal, &self) {
            Ok(()) => Ok(self.inner),
            Err(e) => {
                tracing::info!(
                    principal_id = %principal.principal_id(),
                    error = %e,
                    "permission denied"
                );
                Err(errors::forbidden(e))
            }
        }
    }
}

/// Read-only guard: no operation payload, just the permission.
pub fn require(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    permission: Permission,
) -> Result<(), Response> {
    CmdAuth::new((), permission).check(tenant, principal)
}
