//! Application services.
//!
//! Each operation runs in one [`UnitOfWork`]: load and lock the rows it
//! touches, let the aggregates decide, stage the resulting rows and commit.
//! Realtime hints are published only after a successful commit.

use std::sync::Arc;

use shopfloor_auth::Hs256JwtIssuer;
use shopfloor_core::{Aggregate, DomainError};
use shopfloor_inventory::{
    InventoryCommand, InventoryEvent, InventoryItem, InventoryTransaction, RecordTransaction,
};

use crate::error::{ServiceError, ServiceResult};
use crate::realtime::{RealtimeHub, TOPIC_LOW_STOCK};
use crate::store::{ErpStore, UnitOfWork};

pub mod inventory;
pub mod orders;
pub mod products;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use inventory::{AppliedTransaction, InventoryService, ItemDetail, ItemUpdate, LedgerCheck, NewItem, NewTransaction};
pub use orders::{CreateOrderInput, OrderMaterials, OrderService, OrderUpdate};
pub use products::{NewProduct, ProductService};
pub use users::{LoginOutcome, NewUser, UserService};

/// Attempts at allocating an order number before giving up with `Conflict`.
pub const ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// All services over one store and one realtime hub.
#[derive(Clone)]
pub struct ErpServices {
    pub orders: OrderService,
    pub inventory: InventoryService,
    pub products: ProductService,
    pub users: UserService,
    pub realtime: RealtimeHub,
}

impl ErpServices {
    pub fn new(store: Arc<dyn ErpStore>, issuer: Hs256JwtIssuer) -> Self {
        let realtime = RealtimeHub::new();
        Self {
            orders: OrderService::new(store.clone(), realtime.clone()),
            inventory: InventoryService::new(store.clone(), realtime.clone()),
            products: ProductService::new(store.clone()),
            users: UserService::new(store, issuer),
            realtime,
        }
    }
}

/// Record one ledger entry against a locked item and stage both rows.
pub(crate) async fn record_movement(
    uow: &mut dyn UnitOfWork,
    item: &mut InventoryItem,
    cmd: RecordTransaction,
) -> ServiceResult<InventoryTransaction> {
    let events = item.execute(&InventoryCommand::RecordTransaction(cmd))?;
    let entry = events
        .into_iter()
        .find_map(|e| match e {
            InventoryEvent::TransactionRecorded(t) => Some(t),
            _ => None,
        })
        .ok_or_else(|| ServiceError::internal("transaction produced no ledger entry"))?;

    let snapshot = item
        .snapshot()
        .ok_or_else(|| DomainError::invariant("item disappeared while recording"))?;
    uow.append_transaction(&entry).await?;
    uow.update_item(&snapshot).await?;
    Ok(entry)
}

/// Broadcast a low-stock hint for every item left at or below its minimum.
pub(crate) fn publish_low_stock<'a>(
    realtime: &RealtimeHub,
    items: impl IntoIterator<Item = &'a InventoryItem>,
) {
    for item in items {
        let (Some(alert), Some(tenant_id)) = (item.low_stock_alert(), item.tenant_id()) else {
            continue;
        };
        tracing::info!(%tenant_id, sku = %alert.sku, current_stock = alert.current_stock, "item is low on stock");
        match serde_json::to_value(&alert) {
            Ok(payload) => realtime.publish(tenant_id, TOPIC_LOW_STOCK, payload),
            Err(e) => tracing::warn!(error = %e, "failed to encode low-stock alert"),
        }
    }
}
