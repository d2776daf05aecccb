//! Persistence boundary.
//!
//! Reads go straight to [`ErpStore`]; every write happens inside a
//! [`UnitOfWork`] that either commits as a whole or is discarded when dropped.
//!
//! ## Locking
//!
//! `lock_*` methods take row locks held until commit/drop. Callers lock the
//! production order first, then inventory items; [`UnitOfWork::lock_items`]
//! always locks in ascending id order so concurrent units never deadlock.

use async_trait::async_trait;
use thiserror::Error;

use shopfloor_auth::{PrincipalId, User};
use shopfloor_core::{Page, PageRequest, ProductionOrderId, TenantId};
use shopfloor_inventory::{InventoryItemId, InventoryItemSnapshot, InventoryTransaction};
use shopfloor_production::{Priority, ProductionOrderSnapshot, ProductionOrderStatus};
use shopfloor_products::{ProductId, ProductSnapshot};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryErpStore;
pub use postgres::PostgresErpStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was hit (duplicate sku, order number, email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A row expected to exist (e.g. the target of an update) was missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection, query or decoding failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Filters for listing production orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<ProductionOrderStatus>,
    pub priority: Option<Priority>,
    pub product_id: Option<ProductId>,
}

impl OrderFilter {
    pub fn matches(&self, o: &ProductionOrderSnapshot) -> bool {
        self.status.is_none_or(|s| s == o.status)
            && self.priority.is_none_or(|p| p == o.priority)
            && self.product_id.is_none_or(|p| p == o.product_id)
    }
}

/// Filters for listing inventory items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub low_stock_only: bool,
    /// Case-insensitive substring of sku or name.
    pub search: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, i: &InventoryItemSnapshot) -> bool {
        if let Some(category) = &self.category {
            if i.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if self.low_stock_only && i.current_stock > i.minimum_stock {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !i.sku.to_lowercase().contains(&needle) && !i.name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Read side of the store plus the entry point for writes.
#[async_trait]
pub trait ErpStore: Send + Sync {
    /// Start a unit of work (one database transaction).
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    async fn get_order(
        &self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Option<ProductionOrderSnapshot>, StoreError>;

    /// Newest first.
    async fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Page<ProductionOrderSnapshot>, StoreError>;

    async fn get_item(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> Result<Option<InventoryItemSnapshot>, StoreError>;

    async fn get_items(
        &self,
        tenant_id: TenantId,
        item_ids: &[InventoryItemId],
    ) -> Result<Vec<InventoryItemSnapshot>, StoreError>;

    /// Ordered by sku.
    async fn list_items(
        &self,
        tenant_id: TenantId,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<Page<InventoryItemSnapshot>, StoreError>;

    /// Newest entry first.
    async fn item_ledger(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
        page: PageRequest,
    ) -> Result<Page<InventoryTransaction>, StoreError>;

    /// Signed sum of all ledger entries of an item.
    async fn ledger_balance(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> Result<i64, StoreError>;

    async fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError>;

    /// Ordered by sku.
    async fn list_products(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
    ) -> Result<Page<ProductSnapshot>, StoreError>;

    /// Lookup by normalized email across tenants (login happens before a
    /// tenant is known).
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn get_user(
        &self,
        tenant_id: TenantId,
        user_id: PrincipalId,
    ) -> Result<Option<User>, StoreError>;
}

/// Transactional write scope.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every staged change.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn lock_order(
        &mut self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Option<ProductionOrderSnapshot>, StoreError>;

    /// Fails with `Conflict` if the tenant already has this order number.
    async fn insert_order(&mut self, order: &ProductionOrderSnapshot) -> Result<(), StoreError>;

    async fn update_order(&mut self, order: &ProductionOrderSnapshot) -> Result<(), StoreError>;

    /// Highest order-number sequence used by the tenant in `year`.
    async fn last_order_sequence(
        &mut self,
        tenant_id: TenantId,
        year: i32,
    ) -> Result<Option<u32>, StoreError>;

    /// Ledger entries caused by an order, oldest first.
    async fn order_transactions(
        &mut self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Vec<InventoryTransaction>, StoreError>;

    /// Lock the given items in ascending id order and return those that exist.
    async fn lock_items(
        &mut self,
        tenant_id: TenantId,
        item_ids: &[InventoryItemId],
    ) -> Result<Vec<InventoryItemSnapshot>, StoreError>;

    /// Fails with `Conflict` if the tenant already has this sku.
    async fn insert_item(&mut self, item: &InventoryItemSnapshot) -> Result<(), StoreError>;

    async fn update_item(&mut self, item: &InventoryItemSnapshot) -> Result<(), StoreError>;

    async fn append_transaction(&mut self, entry: &InventoryTransaction) -> Result<(), StoreError>;

    async fn lock_product(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError>;

    /// Fails with `Conflict` if the tenant already has this sku.
    async fn insert_product(&mut self, product: &ProductSnapshot) -> Result<(), StoreError>;

    async fn update_product(&mut self, product: &ProductSnapshot) -> Result<(), StoreError>;

    /// Fails with `Conflict` if the email is taken.
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
