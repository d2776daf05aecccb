use std::collections::HashSet;

use thiserror::Error;

use shopfloor_core::TenantId;

use crate::{Permission, PrincipalId, Role, TenantMembership};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

impl Principal {
    /// Resolve a principal whose permissions come from its roles.
    pub fn from_roles(principal_id: PrincipalId, tenant_id: TenantId, roles: &[Role]) -> Self {
        let mut permissions: Vec<Permission> = Vec::new();
        for role in roles {
            for p in role.permissions() {
                if !permissions.contains(&p) {
                    permissions.push(p);
                }
            }
        }

        Self {
            principal_id,
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles: roles.to_vec(),
                permissions,
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Permission requirements of an operation, checked before it runs.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize a principal within its active tenant context.
///
/// Pure policy check: no IO, no business logic.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clerk_may_record_transactions_but_not_create_orders() {
        let p = Principal::from_roles(PrincipalId::new(), TenantId::new(), &[Role::INVENTORY_CLERK]);
        assert!(authorize(&p, &Permission::INVENTORY_TRANSACTIONS_CREATE).is_ok());
        assert_eq!(
            authorize(&p, &Permission::PRODUCTION_ORDERS_CREATE),
            Err(AuthzError::Forbidden("production.orders.create".to_string()))
        );
    }

    #[test]
    fn admin_wildcard_grants_anything() {
        let p = Principal::from_roles(PrincipalId::new(), TenantId::new(), &[Role::ADMIN]);
        assert!(authorize(&p, &Permission::USERS_CREATE).is_ok());
        assert!(authorize(&p, &Permission::new("anything.at.all")).is_ok());
    }

    #[test]
    fn roles_combine() {
        let p = Principal::from_roles(
            PrincipalId::new(),
            TenantId::new(),
            &[Role::VIEWER, Role::INVENTORY_CLERK],
        );
        assert!(authorize(&p, &Permission::INVENTORY_ITEMS_CREATE).is_ok());
        assert!(authorize(&p, &Permission::USERS_CREATE).is_err());
    }

    #[test]
    fn membership_in_other_tenant_is_rejected() {
        let mut p = Principal::from_roles(PrincipalId::new(), TenantId::new(), &[Role::ADMIN]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(
            authorize(&p, &Permission::PRODUCTS_READ),
            Err(AuthzError::TenantMismatch)
        );
    }
}
