use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque dotted strings (e.g. "inventory.items.read").
/// The wildcard `"*"` grants everything within the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub const PRODUCTION_ORDERS_READ: Permission = Permission(Cow::Borrowed("production.orders.read"));
    pub const PRODUCTION_ORDERS_CREATE: Permission =
        Permission(Cow::Borrowed("production.orders.create"));
    pub const PRODUCTION_ORDERS_UPDATE: Permission =
        Permission(Cow::Borrowed("production.orders.update"));

    pub const INVENTORY_ITEMS_READ: Permission = Permission(Cow::Borrowed("inventory.items.read"));
    pub const INVENTORY_ITEMS_CREATE: Permission = Permission(Cow::Borrowed("inventory.items.create"));
    pub const INVENTORY_TRANSACTIONS_CREATE: Permission =
        Permission(Cow::Borrowed("inventory.transactions.create"));

    pub const PRODUCTS_READ: Permission = Permission(Cow::Borrowed("products.read"));
    pub const PRODUCTS_CREATE: Permission = Permission(Cow::Borrowed("products.create"));

    pub const USERS_CREATE: Permission = Permission(Cow::Borrowed("users.create"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
