//! API-side authorization guard.
//!
//! Permissions are checked at the handler boundary, before any service call,
//! so services and domain crates stay auth-agnostic.

use shopfloor_auth::{AuthzError, CommandAuthorization, authorize};

use crate::context::{PrincipalContext, TenantContext};

/// Check every permission the operation requires in the current request context.
pub fn authorize_command<C: CommandAuthorization>(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = principal.principal_in(tenant);

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::routes::common::CmdAuth;
    use shopfloor_auth::{Permission, PrincipalId, Role};
    use shopfloor_core::TenantId;

    fn ctx(roles: Vec<Role>) -> (TenantContext, PrincipalContext) {
        (
            TenantContext::new(TenantId::new()),
            PrincipalContext::new(PrincipalId::new(), roles),
        )
    }

    #[test]
    fn viewer_can_read_but_not_write_orders() {
        let (tenant, principal) = ctx(vec![Role::VIEWER]);
        let read = CmdAuth { inner: (), required: vec![Permission::PRODUCTION_ORDERS_READ] };
        let write = CmdAuth { inner: (), required: vec![Permission::PRODUCTION_ORDERS_CREATE] };

        assert!(authorize_command(&tenant, &principal, &read).is_ok());
        assert_eq!(
            authorize_command(&tenant, &principal, &write),
            Err(AuthzError::Forbidden("production.orders.create".into()))
        );
    }

    #[test]
    fn admin_passes_everything() {
        let (tenant, principal) = ctx(vec![Role::ADMIN]);
        let cmd = CmdAuth {
            inner: (),
            required: vec![Permission::USERS_CREATE, Permission::INVENTORY_TRANSACTIONS_CREATE],
        };
        assert!(authorize_command(&tenant, &principal, &cmd).is_ok());
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        let (tenant, principal) = ctx(vec![Role::new("auditor")]);
        let cmd = CmdAuth { inner: (), required: vec![Permission::PRODUCTS_READ] };
        assert!(authorize_command(&tenant, &principal, &cmd).is_err());
    }
}
