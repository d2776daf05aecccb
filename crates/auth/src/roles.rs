use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const PRODUCTION_MANAGER: Role = Role(Cow::Borrowed("production_manager"));
    pub const INVENTORY_CLERK: Role = Role(Cow::Borrowed("inventory_clerk"));
    pub const VIEWER: Role = Role(Cow::Borrowed("viewer"));

    /// Roles the policy knows how to map to permissions.
    pub const KNOWN: [Role; 4] = [
        Role::ADMIN,
        Role::PRODUCTION_MANAGER,
        Role::INVENTORY_CLERK,
        Role::VIEWER,
    ];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        Role::KNOWN.iter().any(|r| r == self)
    }

    /// Permissions granted by this role. Unknown roles grant nothing.
    pub fn permissions(&self) -> Vec<Permission> {
        match self.as_str() {
            "admin" => vec![Permission::WILDCARD],
            "production_manager" => vec![
                Permission::PRODUCTION_ORDERS_READ,
                Permission::PRODUCTION_ORDERS_CREATE,
                Permission::PRODUCTION_ORDERS_UPDATE,
                Permission::PRODUCTS_READ,
                Permission::PRODUCTS_CREATE,
                Permission::INVENTORY_ITEMS_READ,
            ],
            "inventory_clerk" => vec![
                Permission::INVENTORY_ITEMS_READ,
                Permission::INVENTORY_ITEMS_CREATE,
                Permission::INVENTORY_TRANSACTIONS_CREATE,
                Permission::PRODUCTS_READ,
                Permission::PRODUCTION_ORDERS_READ,
            ],
            "viewer" => vec![
                Permission::PRODUCTION_ORDERS_READ,
                Permission::INVENTORY_ITEMS_READ,
                Permission::PRODUCTS_READ,
            ],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_wildcard() {
        assert_eq!(Role::ADMIN.permissions(), vec![Permission::WILDCARD]);
    }

    #[test]
    fn viewer_cannot_write() {
        let perms = Role::VIEWER.permissions();
        assert!(perms.iter().all(|p| p.as_str().ends_with(".read")));
    }

    #[test]
    fn unknown_role_grants_nothing() {
        let role = Role::new("janitor");
        assert!(!role.is_known());
        assert!(role.permissions().is_empty());
    }
}
