//! In-memory store for tests and local development.
//!
//! A single async mutex guards all tables. A unit of work holds the lock for
//! its whole lifetime and stages changes on a copy, so units are fully
//! serialized (a coarse stand-in for row locks) and an uncommitted unit leaves
//! no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use shopfloor_auth::{PrincipalId, User};
use shopfloor_core::{Page, PageRequest, ProductionOrderId, TenantId};
use shopfloor_inventory::{InventoryItemId, InventoryItemSnapshot, InventoryTransaction};
use shopfloor_production::ProductionOrderSnapshot;
use shopfloor_products::{ProductId, ProductSnapshot};

use super::{ErpStore, ItemFilter, OrderFilter, StoreError, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: BTreeMap<ProductionOrderId, ProductionOrderSnapshot>,
    items: BTreeMap<InventoryItemId, InventoryItemSnapshot>,
    transactions: Vec<InventoryTransaction>,
    products: BTreeMap<ProductId, ProductSnapshot>,
    users: BTreeMap<PrincipalId, User>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryErpStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryErpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ErpStore for InMemoryErpStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, working }))
    }

    async fn get_order(
        &self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Option<ProductionOrderSnapshot>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.orders
            .get(&order_id)
            .filter(|o| o.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Page<ProductionOrderSnapshot>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<ProductionOrderSnapshot> = t
            .orders
            .values()
            .filter(|o| o.tenant_id == tenant_id && filter.matches(o))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page.slice(rows))
    }

    async fn get_item(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> Result<Option<InventoryItemSnapshot>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.items
            .get(&item_id)
            .filter(|i| i.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_items(
        &self,
        tenant_id: TenantId,
        item_ids: &[InventoryItemId],
    ) -> Result<Vec<InventoryItemSnapshot>, StoreError> {
        let t = self.tables.lock().await;
        Ok(item_ids
            .iter()
            .filter_map(|id| t.items.get(id))
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn list_items(
        &self,
        tenant_id: TenantId,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<Page<InventoryItemSnapshot>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<InventoryItemSnapshot> = t
            .items
            .values()
            .filter(|i| i.tenant_id == tenant_id && filter.matches(i))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(page.slice(rows))
    }

    async fn item_ledger(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
        page: PageRequest,
    ) -> Result<Page<InventoryTransaction>, StoreError> {
        let t = self.tables.lock().await;
        let rows: Vec<InventoryTransaction> = t
            .transactions
            .iter()
            .rev()
            .filter(|e| e.tenant_id == tenant_id && e.item_id == item_id)
            .cloned()
            .collect();
        Ok(page.slice(rows))
    }

    async fn ledger_balance(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> Result<i64, StoreError> {
        let t = self.tables.lock().await;
        Ok(shopfloor_inventory::ledger_balance(
            t.transactions
                .iter()
                .filter(|e| e.tenant_id == tenant_id && e.item_id == item_id),
        ))
    }

    async fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.products
            .get(&product_id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_products(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
    ) -> Result<Page<ProductSnapshot>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<ProductSnapshot> = t
            .products
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(page.slice(rows))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user(
        &self,
        tenant_id: TenantId,
        user_id: PrincipalId,
    ) -> Result<Option<User>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.users
            .get(&user_id)
            .filter(|u| u.tenant_id == tenant_id)
            .cloned())
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl InMemoryUnitOfWork {
    fn replace<K: Ord + core::fmt::Display + Copy, V>(
        map: &mut BTreeMap<K, V>,
        key: K,
        value: V,
    ) -> Result<(), StoreError> {
        match map.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_order(
        &mut self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Option<ProductionOrderSnapshot>, StoreError> {
        Ok(self
            .working
            .orders
            .get(&order_id)
            .filter(|o| o.tenant_id == tenant_id)
            .cloned())
    }

    async fn insert_order(&mut self, order: &ProductionOrderSnapshot) -> Result<(), StoreError> {
        let taken = self
            .working
            .orders
            .values()
            .any(|o| o.tenant_id == order.tenant_id && o.order_number == order.order_number);
        if taken {
            return Err(StoreError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &ProductionOrderSnapshot) -> Result<(), StoreError> {
        Self::replace(&mut self.working.orders, order.id, order.clone())
    }

    async fn last_order_sequence(
        &mut self,
        tenant_id: TenantId,
        year: i32,
    ) -> Result<Option<u32>, StoreError> {
        Ok(self
            .working
            .orders
            .values()
            .filter(|o| o.tenant_id == tenant_id && o.order_number.year() == year)
            .map(|o| o.order_number.sequence())
            .max())
    }

    async fn order_transactions(
        &mut self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Vec<InventoryTransaction>, StoreError> {
        Ok(self
            .working
            .transactions
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.production_order_id == Some(order_id))
            .cloned()
            .collect())
    }

    async fn lock_items(
        &mut self,
        tenant_id: TenantId,
        item_ids: &[InventoryItemId],
    ) -> Result<Vec<InventoryItemSnapshot>, StoreError> {
        let mut ids = item_ids.to_vec();
        ids.sort();
        ids.dedup();
        Ok(ids
            .iter()
            .filter_map(|id| self.working.items.get(id))
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn insert_item(&mut self, item: &InventoryItemSnapshot) -> Result<(), StoreError> {
        let taken = self
            .working
            .items
            .values()
            .any(|i| i.tenant_id == item.tenant_id && i.sku == item.sku);
        if taken {
            return Err(StoreError::Conflict(format!("sku {} already exists", item.sku)));
        }
        self.working.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &InventoryItemSnapshot) -> Result<(), StoreError> {
        Self::replace(&mut self.working.items, item.id, item.clone())
    }

    async fn append_transaction(&mut self, entry: &InventoryTransaction) -> Result<(), StoreError> {
        self.working.transactions.push(entry.clone());
        Ok(())
    }

    async fn lock_product(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        Ok(self
            .working
            .products
            .get(&product_id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned())
    }

    async fn insert_product(&mut self, product: &ProductSnapshot) -> Result<(), StoreError> {
        let taken = self
            .working
            .products
            .values()
            .any(|p| p.tenant_id == product.tenant_id && p.sku == product.sku);
        if taken {
            return Err(StoreError::Conflict(format!(
                "product sku {} already exists",
                product.sku
            )));
        }
        self.working.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&mut self, product: &ProductSnapshot) -> Result<(), StoreError> {
        Self::replace(&mut self.working.products, product.id, product.clone())
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self.working.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} already exists", user.email)));
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
