//! Inventory items and the transaction ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use shopfloor_core::pagination::MAX_PAGE_LIMIT;
use shopfloor_core::{Aggregate, DomainError, Page, PageRequest, ProductionOrderId, TenantId};
use shopfloor_inventory::{
    CreateItem, InventoryCommand, InventoryItem, InventoryItemId, InventoryItemSnapshot,
    InventoryTransaction, LowStockAlert, RecordTransaction, TransactionId, TransactionType,
    UpdateItemDetails,
};

use super::{publish_low_stock, record_movement};
use crate::error::{ServiceError, ServiceResult};
use crate::realtime::{RealtimeHub, TOPIC_TRANSACTION_RECORDED};
use crate::store::{ErpStore, ItemFilter, UnitOfWork};

const OPENING_BALANCE_NOTE: &str = "opening balance";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub minimum_stock: i64,
    pub unit_cost: u64,
    /// Booked as a receipt so the ledger explains the starting stock.
    pub opening_stock: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub minimum_stock: Option<i64>,
    pub unit_cost: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub item_id: InventoryItemId,
    pub kind: TransactionType,
    pub quantity: i64,
    pub production_order_id: Option<ProductionOrderId>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedTransaction {
    pub transaction: InventoryTransaction,
    pub item: InventoryItemSnapshot,
    pub low_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: InventoryItemSnapshot,
    pub low_stock: bool,
    pub ledger_balance: i64,
    pub ledger_consistent: bool,
}

/// Result of recomputing an item's stock from its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerCheck {
    pub item_id: InventoryItemId,
    pub current_stock: i64,
    pub ledger_balance: i64,
    pub consistent: bool,
}

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn ErpStore>,
    realtime: RealtimeHub,
}

impl InventoryService {
    pub fn new(store: Arc<dyn ErpStore>, realtime: RealtimeHub) -> Self {
        Self { store, realtime }
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, sku = %input.sku))]
    pub async fn create_item(
        &self,
        tenant_id: TenantId,
        input: NewItem,
        now: DateTime<Utc>,
    ) -> ServiceResult<InventoryItemSnapshot> {
        if input.opening_stock < 0 {
            return Err(DomainError::validation("opening_stock", "cannot be negative").into());
        }

        let item_id = InventoryItemId::new();
        let mut item = InventoryItem::empty(item_id);
        item.execute(&InventoryCommand::CreateItem(CreateItem {
            tenant_id,
            item_id,
            sku: input.sku,
            name: input.name,
            category: input.category,
            minimum_stock: input.minimum_stock,
            unit_cost: input.unit_cost,
            occurred_at: now,
        }))?;

        let mut uow = self.store.begin().await?;
        uow.insert_item(&item_snapshot(&item)?).await?;
        if input.opening_stock > 0 {
            record_movement(
                uow.as_mut(),
                &mut item,
                RecordTransaction {
                    tenant_id,
                    item_id,
                    transaction_id: TransactionId::new(),
                    kind: TransactionType::Receipt,
                    quantity: input.opening_stock,
                    production_order_id: None,
                    note: Some(OPENING_BALANCE_NOTE.to_string()),
                    occurred_at: now,
                },
            )
            .await?;
        }
        uow.commit().await?;

        tracing::info!(item_id = %item_id, "inventory item created");
        item_snapshot(&item)
    }

    /// Change descriptive fields; stock is never touched here.
    #[instrument(skip(self, update), fields(tenant_id = %tenant_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
        update: ItemUpdate,
        now: DateTime<Utc>,
    ) -> ServiceResult<InventoryItemSnapshot> {
        let mut uow = self.store.begin().await?;
        let mut item = lock_item(uow.as_mut(), tenant_id, item_id).await?;

        item.execute(&InventoryCommand::UpdateItemDetails(UpdateItemDetails {
            tenant_id,
            item_id,
            name: update.name,
            category: update.category,
            minimum_stock: update.minimum_stock,
            unit_cost: update.unit_cost,
            occurred_at: now,
        }))?;

        let snapshot = item_snapshot(&item)?;
        uow.update_item(&snapshot).await?;
        uow.commit().await?;

        publish_low_stock(&self.realtime, [&item]);
        Ok(snapshot)
    }

    /// Record one stock movement with the item row locked.
    #[instrument(
        skip(self, input),
        fields(tenant_id = %tenant_id, item_id = %input.item_id, kind = %input.kind.as_str(), quantity = input.quantity)
    )]
    pub async fn apply_transaction(
        &self,
        tenant_id: TenantId,
        input: NewTransaction,
        now: DateTime<Utc>,
    ) -> ServiceResult<AppliedTransaction> {
        let mut uow = self.store.begin().await?;

        if let Some(order_id) = input.production_order_id {
            // lock order before item, same as the order lifecycle
            if uow.lock_order(tenant_id, order_id).await?.is_none() {
                return Err(DomainError::validation(
                    "production_order_id",
                    "production order does not exist",
                )
                .into());
            }
        }

        let mut item = lock_item(uow.as_mut(), tenant_id, input.item_id).await?;
        let transaction = record_movement(
            uow.as_mut(),
            &mut item,
            RecordTransaction {
                tenant_id,
                item_id: input.item_id,
                transaction_id: TransactionId::new(),
                kind: input.kind,
                quantity: input.quantity,
                production_order_id: input.production_order_id,
                note: input.note,
                occurred_at: now,
            },
        )
        .await?;
        uow.commit().await?;

        let snapshot = item_snapshot(&item)?;
        tracing::info!(current_stock = snapshot.current_stock, "inventory transaction recorded");

        match serde_json::to_value(&transaction) {
            Ok(payload) => self.realtime.publish(tenant_id, TOPIC_TRANSACTION_RECORDED, payload),
            Err(e) => tracing::warn!(error = %e, "failed to encode ledger entry"),
        }
        publish_low_stock(&self.realtime, [&item]);

        Ok(AppliedTransaction {
            transaction,
            low_stock: item.is_low_stock(),
            item: snapshot,
        })
    }

    pub async fn get_item(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> ServiceResult<ItemDetail> {
        let item = self.find_item(tenant_id, item_id).await?;
        let ledger_balance = self.store.ledger_balance(tenant_id, item_id).await?;
        Ok(ItemDetail {
            low_stock: item.current_stock <= item.minimum_stock,
            ledger_consistent: ledger_balance == item.current_stock,
            ledger_balance,
            item,
        })
    }

    pub async fn list_items(
        &self,
        tenant_id: TenantId,
        filter: ItemFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<InventoryItemSnapshot>> {
        Ok(self.store.list_items(tenant_id, &filter, page).await?)
    }

    /// Ledger of one item, newest entry first.
    pub async fn item_ledger(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
        page: PageRequest,
    ) -> ServiceResult<Page<InventoryTransaction>> {
        self.find_item(tenant_id, item_id).await?;
        Ok(self.store.item_ledger(tenant_id, item_id, page).await?)
    }

    /// Every item at or below its minimum, ordered by sku.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn low_stock_alerts(&self, tenant_id: TenantId) -> ServiceResult<Vec<LowStockAlert>> {
        let filter = ItemFilter {
            low_stock_only: true,
            ..ItemFilter::default()
        };

        let mut alerts = Vec::new();
        let mut page_no = 1;
        loop {
            let page = PageRequest::new(Some(page_no), Some(MAX_PAGE_LIMIT), MAX_PAGE_LIMIT);
            let page = self.store.list_items(tenant_id, &filter, page).await?;
            let last = u64::from(page_no) >= page.total_pages();
            alerts.extend(
                page.items
                    .into_iter()
                    .filter_map(|s| InventoryItem::restore(s).low_stock_alert()),
            );
            if last {
                break;
            }
            page_no += 1;
        }
        Ok(alerts)
    }

    /// Recompute the item's stock from its ledger and compare.
    pub async fn verify_ledger(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> ServiceResult<LedgerCheck> {
        let item = self.find_item(tenant_id, item_id).await?;
        let ledger_balance = self.store.ledger_balance(tenant_id, item_id).await?;
        if ledger_balance != item.current_stock {
            tracing::error!(
                %tenant_id,
                %item_id,
                current_stock = item.current_stock,
                ledger_balance,
                "stock does not match ledger"
            );
        }
        Ok(LedgerCheck {
            item_id,
            current_stock: item.current_stock,
            ledger_balance,
            consistent: ledger_balance == item.current_stock,
        })
    }

    async fn find_item(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> ServiceResult<InventoryItemSnapshot> {
        self.store
            .get_item(tenant_id, item_id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }
}

async fn lock_item(
    uow: &mut dyn UnitOfWork,
    tenant_id: TenantId,
    item_id: InventoryItemId,
) -> ServiceResult<InventoryItem> {
    uow.lock_items(tenant_id, &[item_id])
        .await?
        .into_iter()
        .next()
        .map(InventoryItem::restore)
        .ok_or_else(|| DomainError::not_found().into())
}

fn item_snapshot(item: &InventoryItem) -> ServiceResult<InventoryItemSnapshot> {
    item.snapshot()
        .ok_or_else(|| ServiceError::internal("inventory item has no state"))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::realtime::TOPIC_LOW_STOCK;
    use crate::services::testing::Fixture;

    fn issue(item_id: InventoryItemId, quantity: i64) -> NewTransaction {
        NewTransaction {
            item_id,
            kind: TransactionType::Issue,
            quantity,
            production_order_id: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn opening_stock_is_booked_as_receipt() {
        let fx = Fixture::new();
        let item = fx.item("BOLT", 40).await;

        let detail = fx.services.inventory.get_item(fx.tenant_id, item).await.unwrap();
        assert_eq!(detail.item.current_stock, 40);
        assert_eq!(detail.ledger_balance, 40);
        assert!(detail.ledger_consistent);

        let ledger = fx.services.inventory.item_ledger(fx.tenant_id, item, PageRequest::default()).await.unwrap();
        assert_eq!(ledger.items[0].kind, TransactionType::Receipt);
        assert_eq!(ledger.items[0].note.as_deref(), Some(OPENING_BALANCE_NOTE));
    }

    #[tokio::test]
    async fn duplicate_sku_is_conflict() {
        let fx = Fixture::new();
        fx.item("BOLT", 0).await;
        let err = fx
            .services
            .inventory
            .create_item(fx.tenant_id, Fixture::new_item("BOLT", 0), Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn every_transaction_type_moves_stock_by_its_signed_delta() {
        let fx = Fixture::new();
        let item = fx.item("STEEL", 100).await;
        let inv = &fx.services.inventory;

        let cases = [
            (TransactionType::Receipt, 20, 120),
            (TransactionType::Issue, 30, 90),
            (TransactionType::Return, 5, 95),
            (TransactionType::Transfer, -15, 80),
            (TransactionType::Adjustment, 3, 83),
        ];
        for (kind, quantity, expected) in cases {
            let applied = inv
                .apply_transaction(
                    fx.tenant_id,
                    NewTransaction { item_id: item, kind, quantity, production_order_id: None, note: None },
                    Utc::now(),
                )
                .await
                .unwrap();
            assert_eq!(applied.item.current_stock, expected, "{kind:?}");
        }

        let check = inv.verify_ledger(fx.tenant_id, item).await.unwrap();
        assert!(check.consistent);
        assert_eq!(check.ledger_balance, 83);
    }

    #[tokio::test]
    async fn overdraw_is_rejected_and_nothing_is_written() {
        let fx = Fixture::new();
        let item = fx.item("STEEL", 10).await;

        let err = fx
            .services
            .inventory
            .apply_transaction(fx.tenant_id, issue(item, 11), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Domain(DomainError::InsufficientStock {
                sku: "STEEL".into(),
                available: 10,
                requested: 11,
            })
        );

        let ledger = fx.services.inventory.item_ledger(fx.tenant_id, item, PageRequest::default()).await.unwrap();
        assert_eq!(ledger.total, 1);
    }

    #[tokio::test]
    async fn invalid_quantities_are_validation_errors() {
        let fx = Fixture::new();
        let item = fx.item("STEEL", 10).await;
        let inv = &fx.services.inventory;

        for (kind, quantity) in [
            (TransactionType::Receipt, 0),
            (TransactionType::Issue, -1),
            (TransactionType::Adjustment, 0),
        ] {
            let err = inv
                .apply_transaction(
                    fx.tenant_id,
                    NewTransaction { item_id: item, kind, quantity, production_order_id: None, note: None },
                    Utc::now(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))), "{kind:?}");
        }
    }

    #[tokio::test]
    async fn unknown_item_and_order_reference() {
        let fx = Fixture::new();
        let inv = &fx.services.inventory;

        let err = inv
            .apply_transaction(fx.tenant_id, issue(InventoryItemId::new(), 1), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::NotFound));

        let item = fx.item("STEEL", 10).await;
        let mut input = issue(item, 1);
        input.production_order_id = Some(ProductionOrderId::new());
        let err = inv.apply_transaction(fx.tenant_id, input, Utc::now()).await.unwrap_err();
        match err {
            ServiceError::Domain(DomainError::Validation(v)) => assert_eq!(v.field, "production_order_id"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_issues_never_drive_stock_negative() {
        let fx = Fixture::new();
        let item = fx.item("STEEL", 30).await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let inv = fx.services.inventory.clone();
            let tenant_id = fx.tenant_id;
            handles.push(tokio::spawn(async move {
                inv.apply_transaction(tenant_id, issue(item, 1), Utc::now()).await
            }));
        }

        let mut ok = 0;
        let mut short = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(applied) => {
                    assert!(applied.item.current_stock >= 0);
                    ok += 1;
                }
                Err(ServiceError::Domain(DomainError::InsufficientStock { .. })) => short += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(ok, 30);
        assert_eq!(short, 20);
        let check = fx.services.inventory.verify_ledger(fx.tenant_id, item).await.unwrap();
        assert_eq!(check.current_stock, 0);
        assert!(check.consistent);
    }

    #[tokio::test]
    async fn low_stock_is_detected_and_broadcast() {
        let fx = Fixture::new();
        let mut rx = fx.services.realtime.subscribe();
        let item = fx.item("BOLT", 10).await;
        fx.services
            .inventory
            .update_item(
                fx.tenant_id,
                item,
                ItemUpdate { minimum_stock: Some(5), ..ItemUpdate::default() },
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(fx.services.inventory.low_stock_alerts(fx.tenant_id).await.unwrap().is_empty());

        let applied = fx
            .services
            .inventory
            .apply_transaction(fx.tenant_id, issue(item, 6), Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert!(applied.low_stock);

        let alerts = fx.services.inventory.low_stock_alerts(fx.tenant_id).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].shortfall, 1);

        let mut topics = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            topics.push(msg.topic);
        }
        assert!(topics.iter().any(|t| t == TOPIC_LOW_STOCK));
    }

    #[tokio::test]
    async fn list_filters_by_category_and_search() {
        let fx = Fixture::new();
        let inv = &fx.services.inventory;
        for (sku, category) in [("BOLT-M8", "fasteners"), ("BOLT-M10", "fasteners"), ("STEEL", "raw")] {
            let mut input = Fixture::new_item(sku, 0);
            input.category = Some(category.to_string());
            inv.create_item(fx.tenant_id, input, Utc::now()).await.unwrap();
        }

        let fasteners = inv
            .list_items(
                fx.tenant_id,
                ItemFilter { category: Some("fasteners".into()), ..ItemFilter::default() },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(fasteners.total, 2);
        assert_eq!(fasteners.items[0].sku, "BOLT-M10");

        let search = inv
            .list_items(
                fx.tenant_id,
                ItemFilter { search: Some("steel".into()), ..ItemFilter::default() },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(search.total, 1);
    }
}
