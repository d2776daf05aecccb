use serde::{Deserialize, Serialize};

use shopfloor_core::{TenantId, uuid_id};

uuid_id!(
    /// Identity of an authenticated principal (the user id for human users).
    pub PrincipalId
);

/// A principal's membership in a tenant.
///
/// States *which tenant* the principal is acting within and which
/// roles/permissions are granted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<crate::Role>,
    pub permissions: Vec<crate::Permission>,
}
