//! Request extensions set by the auth middleware once a bearer token checks out.

use shopfloor_auth::{JwtClaims, Principal, PrincipalId, Role};
use shopfloor_core::TenantId;

/// Split verified claims into the two extensions handlers extract.
pub fn from_claims(claims: JwtClaims) -> (TenantContext, PrincipalContext) {
    (
        TenantContext { tenant_id: claims.tenant_id },
        PrincipalContext {
            principal_id: claims.sub,
            roles: claims.roles,
        },
    )
}

/// The shop a request acts on. Every store call is scoped by it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// The signed-in user and the roles their token carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, roles: Vec<Role>) -> Self {
        Self { principal_id, roles }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Role names as they appear in the token, for `/api/auth/me`.
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(Role::as_str).collect()
    }

    /// Resolve the roles to permissions within `tenant`.
    pub fn principal_in(&self, tenant: &TenantContext) -> Principal {
        Principal::from_roles(self.principal_id, tenant.tenant_id, &self.roles)
    }
}
