//! Shared fixture for service tests.

use std::sync::Arc;

use chrono::{Duration, Utc};

use shopfloor_auth::Hs256JwtIssuer;
use shopfloor_core::TenantId;
use shopfloor_inventory::InventoryItemId;
use shopfloor_products::{BomComponent, ProductId};

use super::{ErpServices, NewItem, NewProduct};
use crate::store::InMemoryErpStore;

pub(crate) struct Fixture {
    pub services: ErpServices,
    pub tenant_id: TenantId,
}

impl Fixture {
    pub const JWT_SECRET: &'static str = "service-test-secret";

    pub fn new() -> Self {
        let store = Arc::new(InMemoryErpStore::new());
        let issuer = Hs256JwtIssuer::new(Self::JWT_SECRET, Duration::minutes(60));
        Self {
            services: ErpServices::new(store, issuer),
            tenant_id: TenantId::new(),
        }
    }

    /// Same store and services, different tenant.
    pub fn other_tenant(&self) -> Self {
        Self {
            services: self.services.clone(),
            tenant_id: TenantId::new(),
        }
    }

    pub fn new_item(sku: &str, opening_stock: i64) -> NewItem {
        NewItem {
            sku: sku.to_string(),
            name: sku.to_lowercase(),
            category: None,
            minimum_stock: 0,
            unit_cost: 100,
            opening_stock,
        }
    }

    pub async fn item(&self, sku: &str, opening_stock: i64) -> InventoryItemId {
        self.services
            .inventory
            .create_item(self.tenant_id, Self::new_item(sku, opening_stock), Utc::now())
            .await
            .unwrap()
            .id
    }

    pub async fn product(
        &self,
        sku: &str,
        components: &[(InventoryItemId, i64)],
        finished_item: Option<InventoryItemId>,
    ) -> ProductId {
        let input = NewProduct {
            sku: sku.to_string(),
            name: sku.to_lowercase(),
            components: components
                .iter()
                .map(|(item_id, quantity_per_unit)| BomComponent {
                    item_id: *item_id,
                    quantity_per_unit: *quantity_per_unit,
                })
                .collect(),
            finished_item,
        };
        self.services
            .products
            .create_product(self.tenant_id, input, Utc::now())
            .await
            .unwrap()
            .id
    }

    pub async fn stock(&self, item_id: InventoryItemId) -> i64 {
        let detail = self
            .services
            .inventory
            .get_item(self.tenant_id, item_id)
            .await
            .unwrap();
        assert!(detail.ledger_consistent, "stock drifted from ledger");
        detail.item.current_stock
    }
}
