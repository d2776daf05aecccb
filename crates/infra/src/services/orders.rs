//! Production order lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::instrument;

use shopfloor_core::{Aggregate, DomainError, Page, PageRequest, ProductionOrderId, TenantId};
use shopfloor_inventory::{
    InventoryItem, InventoryItemId, InventoryTransaction, RecordTransaction, TransactionId,
    TransactionType,
};
use shopfloor_production::{
    ChangeStatus, CreateProductionOrder, MaterialRequirement, OrderNumber, Priority,
    ProductionOrder, ProductionOrderCommand, ProductionOrderSnapshot, ProductionOrderStatus,
    UpdateOrderDetails, cancellation_returns, material_requirements,
};
use shopfloor_products::{Product, ProductId};

use super::{ORDER_NUMBER_ATTEMPTS, publish_low_stock, record_movement};
use crate::error::{ServiceError, ServiceResult};
use crate::realtime::{RealtimeHub, TOPIC_ORDER_CREATED, TOPIC_ORDER_STATUS_CHANGED};
use crate::store::{ErpStore, OrderFilter, StoreError, UnitOfWork};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderInput {
    pub product_id: ProductId,
    pub quantity_planned: i64,
    pub start_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

/// Partial update of an order; `status` requests a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub quantity_produced: Option<i64>,
    pub status: Option<ProductionOrderStatus>,
}

/// BOM explosion of an order against current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderMaterials {
    pub order_id: ProductionOrderId,
    pub order_number: OrderNumber,
    pub product_id: ProductId,
    pub quantity_planned: i64,
    pub requirements: Vec<MaterialRequirement>,
    /// True when every component is covered.
    pub ready: bool,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn ErpStore>,
    realtime: RealtimeHub,
}

impl OrderService {
    pub fn new(store: Arc<dyn ErpStore>, realtime: RealtimeHub) -> Self {
        Self { store, realtime }
    }

    /// Create a planned order with the next free number of the year.
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, product_id = %input.product_id))]
    pub async fn create_order(
        &self,
        tenant_id: TenantId,
        input: CreateOrderInput,
        now: DateTime<Utc>,
    ) -> ServiceResult<ProductionOrderSnapshot> {
        let year = now.year();

        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let mut uow = self.store.begin().await?;

            let product = uow
                .lock_product(tenant_id, input.product_id)
                .await?
                .map(Product::restore)
                .ok_or_else(|| DomainError::validation("product_id", "product does not exist"))?;
            if !product.can_be_produced() {
                return Err(DomainError::validation("product_id", "product is archived").into());
            }

            let last = uow.last_order_sequence(tenant_id, year).await?;
            let order_number = OrderNumber::next_after(year, last)?;

            let order_id = ProductionOrderId::new();
            let mut order = ProductionOrder::empty(order_id);
            order.execute(&ProductionOrderCommand::Create(CreateProductionOrder {
                tenant_id,
                order_id,
                order_number: order_number.clone(),
                product_id: input.product_id,
                quantity_planned: input.quantity_planned,
                start_date: input.start_date,
                due_date: input.due_date,
                priority: input.priority,
                notes: input.notes.clone(),
                occurred_at: now,
            }))?;
            let snapshot = created_snapshot(&order)?;

            match uow.insert_order(&snapshot).await {
                Ok(()) => {}
                Err(StoreError::Conflict(reason)) => {
                    tracing::warn!(attempt, %order_number, %reason, "order number taken, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            uow.commit().await?;

            tracing::info!(order_id = %snapshot.id, %order_number, "production order created");
            self.publish_order(TOPIC_ORDER_CREATED, &snapshot);
            return Ok(snapshot);
        }

        Err(DomainError::conflict(format!(
            "could not allocate an order number after {ORDER_NUMBER_ATTEMPTS} attempts"
        ))
        .into())
    }

    /// Move an order to `target`, applying the inventory side effects of the
    /// step in the same unit of work.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id, target = %target))]
    pub async fn transition_status(
        &self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
        target: ProductionOrderStatus,
        quantity_produced: Option<i64>,
        now: DateTime<Utc>,
    ) -> ServiceResult<ProductionOrderSnapshot> {
        let mut uow = self.store.begin().await?;
        let mut order = lock_order(uow.as_mut(), tenant_id, order_id).await?;

        let touched =
            apply_transition(uow.as_mut(), &mut order, target, quantity_produced, now).await?;

        let snapshot = created_snapshot(&order)?;
        uow.update_order(&snapshot).await?;
        uow.commit().await?;

        tracing::info!(status = %snapshot.status, "production order status changed");
        self.publish_order(TOPIC_ORDER_STATUS_CHANGED, &snapshot);
        publish_low_stock(&self.realtime, &touched);
        Ok(snapshot)
    }

    /// Edit order details and optionally transition it, atomically.
    ///
    /// When the update both sets `quantity_produced` and completes the
    /// order, the quantity is recorded by the completion.
    #[instrument(skip(self, update), fields(tenant_id = %tenant_id, order_id = %order_id))]
    pub async fn update_order(
        &self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
        update: OrderUpdate,
        now: DateTime<Utc>,
    ) -> ServiceResult<ProductionOrderSnapshot> {
        let mut uow = self.store.begin().await?;
        let mut order = lock_order(uow.as_mut(), tenant_id, order_id).await?;
        let from = order.status();

        let target = update.status.filter(|s| *s != from);
        let completing = target == Some(ProductionOrderStatus::Completed);
        let (detail_quantity, completion_quantity) = if completing {
            (None, update.quantity_produced)
        } else {
            (update.quantity_produced, None)
        };

        order.execute(&ProductionOrderCommand::UpdateDetails(UpdateOrderDetails {
            tenant_id,
            order_id,
            priority: update.priority,
            start_date: update.start_date,
            due_date: update.due_date,
            notes: update.notes,
            quantity_produced: detail_quantity,
            occurred_at: now,
        }))?;

        let touched = match target {
            Some(target) => {
                apply_transition(uow.as_mut(), &mut order, target, completion_quantity, now).await?
            }
            None => Vec::new(),
        };

        let snapshot = created_snapshot(&order)?;
        uow.update_order(&snapshot).await?;
        uow.commit().await?;

        if target.is_some() {
            tracing::info!(%from, to = %snapshot.status, "production order updated with transition");
            self.publish_order(TOPIC_ORDER_STATUS_CHANGED, &snapshot);
            publish_low_stock(&self.realtime, &touched);
        }
        Ok(snapshot)
    }

    pub async fn get_order(
        &self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> ServiceResult<ProductionOrderSnapshot> {
        self.store
            .get_order(tenant_id, order_id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub async fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: OrderFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<ProductionOrderSnapshot>> {
        Ok(self.store.list_orders(tenant_id, &filter, page).await?)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id))]
    pub async fn material_requirements(
        &self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> ServiceResult<OrderMaterials> {
        let order = self.get_order(tenant_id, order_id).await?;
        let product = self
            .store
            .get_product(tenant_id, order.product_id)
            .await?
            .map(Product::restore)
            .ok_or_else(|| ServiceError::internal("order references a missing product"))?;

        let ids: Vec<InventoryItemId> = product.components().iter().map(|c| c.item_id).collect();
        let stock = self.store.get_items(tenant_id, &ids).await?;
        let requirements = material_requirements(&product, order.quantity_planned, &stock);
        let ready = requirements.iter().all(|r| r.shortfall == 0);

        Ok(OrderMaterials {
            order_id: order.id,
            order_number: order.order_number,
            product_id: order.product_id,
            quantity_planned: order.quantity_planned,
            requirements,
            ready,
        })
    }

    fn publish_order(&self, topic: &str, order: &ProductionOrderSnapshot) {
        self.realtime.publish(
            order.tenant_id,
            topic,
            serde_json::json!({
                "order_id": order.id,
                "order_number": order.order_number,
                "status": order.status,
            }),
        );
    }
}

fn created_snapshot(order: &ProductionOrder) -> ServiceResult<ProductionOrderSnapshot> {
    order
        .snapshot()
        .ok_or_else(|| ServiceError::internal("production order has no state"))
}

async fn lock_order(
    uow: &mut dyn UnitOfWork,
    tenant_id: TenantId,
    order_id: ProductionOrderId,
) -> ServiceResult<ProductionOrder> {
    uow.lock_order(tenant_id, order_id)
        .await?
        .map(ProductionOrder::restore)
        .ok_or_else(|| DomainError::not_found().into())
}

/// Change the order's status and stage the ledger entries the step implies.
///
/// Returns the inventory items that were moved, in their post-movement state.
async fn apply_transition(
    uow: &mut dyn UnitOfWork,
    order: &mut ProductionOrder,
    target: ProductionOrderStatus,
    quantity_produced: Option<i64>,
    now: DateTime<Utc>,
) -> ServiceResult<Vec<InventoryItem>> {
    let tenant_id = order
        .tenant_id()
        .ok_or_else(|| ServiceError::internal("production order has no tenant"))?;
    let order_id = order.id_typed();

    order.execute(&ProductionOrderCommand::ChangeStatus(ChangeStatus {
        tenant_id,
        order_id,
        target,
        quantity_produced,
        occurred_at: now,
    }))?;

    let movements: Vec<(InventoryItemId, TransactionType, i64)> = match target {
        ProductionOrderStatus::Released => {
            let product = order_product(uow, order).await?;
            product
                .requirements(order.quantity_planned())
                .into_iter()
                .filter(|(_, qty)| *qty > 0)
                .map(|(item, qty)| (item, TransactionType::Issue, qty))
                .collect()
        }
        ProductionOrderStatus::Completed => {
            let product = order_product(uow, order).await?;
            match product.finished_item() {
                Some(item) if order.quantity_produced() > 0 => {
                    vec![(item, TransactionType::Receipt, order.quantity_produced())]
                }
                _ => Vec::new(),
            }
        }
        ProductionOrderStatus::Cancelled => {
            let ledger = uow.order_transactions(tenant_id, order_id).await?;
            cancellation_returns(&ledger)
                .into_iter()
                .map(|(item, qty)| (item, TransactionType::Return, qty))
                .collect()
        }
        ProductionOrderStatus::Planned | ProductionOrderStatus::InProgress => Vec::new(),
    };

    if movements.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<InventoryItemId> = movements.iter().map(|(id, _, _)| *id).collect();
    let mut items: Vec<InventoryItem> = uow
        .lock_items(tenant_id, &ids)
        .await?
        .into_iter()
        .map(InventoryItem::restore)
        .collect();

    let note = format!("production order {}", order_number_of(order));
    let mut recorded: Vec<InventoryTransaction> = Vec::with_capacity(movements.len());
    for (item_id, kind, quantity) in movements {
        let item = items
            .iter_mut()
            .find(|i| i.id_typed() == item_id)
            .ok_or_else(|| ServiceError::internal(format!("inventory item {item_id} is missing")))?;
        let entry = record_movement(
            uow,
            item,
            RecordTransaction {
                tenant_id,
                item_id,
                transaction_id: TransactionId::new(),
                kind,
                quantity,
                production_order_id: Some(order_id),
                note: Some(note.clone()),
                occurred_at: now,
            },
        )
        .await?;
        recorded.push(entry);
    }

    tracing::debug!(entries = recorded.len(), "ledger entries staged for transition");
    Ok(items)
}

async fn order_product(uow: &mut dyn UnitOfWork, order: &ProductionOrder) -> ServiceResult<Product> {
    let (Some(tenant_id), Some(product_id)) = (order.tenant_id(), order.product_id()) else {
        return Err(ServiceError::internal("production order has no product"));
    };
    uow.lock_product(tenant_id, product_id)
        .await?
        .map(Product::restore)
        .ok_or_else(|| ServiceError::internal(format!("product {product_id} is missing")))
}

fn order_number_of(order: &ProductionOrder) -> String {
    order
        .order_number()
        .map(ToString::to_string)
        .unwrap_or_else(|| order.id_typed().to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use shopfloor_inventory::TransactionType;

    use super::*;
    use crate::services::testing::Fixture;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn input(product_id: ProductId, quantity_planned: i64) -> CreateOrderInput {
        CreateOrderInput {
            product_id,
            quantity_planned,
            start_date: None,
            due_date: (now() + Duration::days(15)).date_naive(),
            priority: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn order_numbers_are_sequential_per_tenant_and_year() {
        let fx = Fixture::new();
        let steel = fx.item("STEEL", 1_000).await;
        let product = fx.product("FRAME", &[(steel, 2)], None).await;

        let first = fx.services.orders.create_order(fx.tenant_id, input(product, 10), now()).await.unwrap();
        let second = fx.services.orders.create_order(fx.tenant_id, input(product, 10), now()).await.unwrap();

        assert_eq!(first.order_number.to_string(), "PO-2025-0001");
        assert_eq!(second.order_number.to_string(), "PO-2025-0002");
        assert_eq!(first.status, ProductionOrderStatus::Planned);
        assert_eq!(first.priority, Priority::Medium);

        let other = fx.other_tenant();
        let steel = other.item("STEEL", 1_000).await;
        let product = other.product("FRAME", &[(steel, 2)], None).await;
        let third = other.services.orders.create_order(other.tenant_id, input(product, 1), now()).await.unwrap();
        assert_eq!(third.order_number.to_string(), "PO-2025-0001");
    }

    #[tokio::test]
    async fn create_rejects_unknown_and_archived_products() {
        let fx = Fixture::new();
        let err = fx
            .services
            .orders
            .create_order(fx.tenant_id, input(ProductId::new(), 10), now())
            .await
            .unwrap_err();
        match err {
            ServiceError::Domain(DomainError::Validation(v)) => assert_eq!(v.field, "product_id"),
            other => panic!("unexpected error: {other:?}"),
        }

        let product = fx.product("OLD", &[], None).await;
        fx.services.products.archive_product(fx.tenant_id, product, now()).await.unwrap();
        let err = fx.services.orders.create_order(fx.tenant_id, input(product, 10), now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn release_with_insufficient_stock_leaves_order_planned() {
        let fx = Fixture::new();
        let steel = fx.item("STEEL", 150).await;
        let bolts = fx.item("BOLT", 1_000).await;
        let product = fx.product("FRAME", &[(bolts, 4), (steel, 2)], None).await;
        let order = fx.services.orders.create_order(fx.tenant_id, input(product, 100), now()).await.unwrap();

        let err = fx
            .services
            .orders
            .transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Released, None, now())
            .await
            .unwrap_err();
        match err {
            ServiceError::Domain(DomainError::InsufficientStock { sku, available, requested }) => {
                assert_eq!(sku, "STEEL");
                assert_eq!(available, 150);
                assert_eq!(requested, 200);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let reloaded = fx.services.orders.get_order(fx.tenant_id, order.id).await.unwrap();
        assert_eq!(reloaded.status, ProductionOrderStatus::Planned);
        assert_eq!(fx.stock(bolts).await, 1_000);
        assert_eq!(fx.stock(steel).await, 150);
    }

    #[tokio::test]
    async fn full_lifecycle_issues_materials_and_receives_goods() {
        let fx = Fixture::new();
        let steel = fx.item("STEEL", 500).await;
        let frame = fx.item("FRAME-FG", 0).await;
        let product = fx.product("FRAME", &[(steel, 2)], Some(frame)).await;
        let order = fx.services.orders.create_order(fx.tenant_id, input(product, 100), now()).await.unwrap();
        let orders = &fx.services.orders;

        orders.transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Released, None, now()).await.unwrap();
        assert_eq!(fx.stock(steel).await, 300);

        let later = now() + Duration::days(1);
        let started = orders
            .transition_status(fx.tenant_id, order.id, ProductionOrderStatus::InProgress, None, later)
            .await
            .unwrap();
        assert_eq!(started.start_date, Some(later.date_naive()));

        let done = orders
            .transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Completed, Some(95), later)
            .await
            .unwrap();
        assert_eq!(done.quantity_produced, 95);
        assert_eq!(done.completed_at, Some(later));
        assert_eq!(fx.stock(frame).await, 95);

        let ledger = fx
            .services
            .inventory
            .item_ledger(fx.tenant_id, frame, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(ledger.items.len(), 1);
        assert_eq!(ledger.items[0].kind, TransactionType::Receipt);
        assert_eq!(ledger.items[0].production_order_id, Some(order.id));

        let err = orders
            .transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Released, None, later)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn completing_beyond_plan_is_rejected_without_side_effects() {
        let fx = Fixture::new();
        let frame = fx.item("FRAME-FG", 0).await;
        let product = fx.product("FRAME", &[], Some(frame)).await;
        let order = fx.services.orders.create_order(fx.tenant_id, input(product, 10), now()).await.unwrap();
        for status in [ProductionOrderStatus::Released, ProductionOrderStatus::InProgress] {
            fx.services.orders.transition_status(fx.tenant_id, order.id, status, None, now()).await.unwrap();
        }

        let err = fx
            .services
            .orders
            .transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Completed, Some(11), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert_eq!(fx.stock(frame).await, 0);
    }

    #[tokio::test]
    async fn cancelling_a_released_order_returns_issued_materials() {
        let fx = Fixture::new();
        let steel = fx.item("STEEL", 500).await;
        let bolts = fx.item("BOLT", 100).await;
        let product = fx.product("FRAME", &[(steel, 2), (bolts, 1)], None).await;
        let order = fx.services.orders.create_order(fx.tenant_id, input(product, 50), now()).await.unwrap();
        let orders = &fx.services.orders;

        orders.transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Released, None, now()).await.unwrap();
        assert_eq!(fx.stock(steel).await, 400);
        assert_eq!(fx.stock(bolts).await, 50);

        let cancelled = orders
            .transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Cancelled, None, now())
            .await
            .unwrap();
        assert_eq!(cancelled.status, ProductionOrderStatus::Cancelled);
        assert_eq!(fx.stock(steel).await, 500);
        assert_eq!(fx.stock(bolts).await, 100);

        let err = orders
            .transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Planned, None, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn cancelling_a_planned_order_moves_no_stock() {
        let fx = Fixture::new();
        let steel = fx.item("STEEL", 500).await;
        let product = fx.product("FRAME", &[(steel, 2)], None).await;
        let order = fx.services.orders.create_order(fx.tenant_id, input(product, 50), now()).await.unwrap();

        fx.services
            .orders
            .transition_status(fx.tenant_id, order.id, ProductionOrderStatus::Cancelled, None, now())
            .await
            .unwrap();
        let ledger = fx.services.inventory.item_ledger(fx.tenant_id, steel, PageRequest::default()).await.unwrap();
        assert_eq!(ledger.total, 1, "only the opening receipt");
    }

    #[tokio::test]
    async fn update_edits_details_and_transitions_atomically() {
        let fx = Fixture::new();
        let frame = fx.item("FRAME-FG", 0).await;
        let product = fx.product("FRAME", &[], Some(frame)).await;
        let order = fx.services.orders.create_order(fx.tenant_id, input(product, 10), now()).await.unwrap();
        let orders = &fx.services.orders;

        let updated = orders
            .update_order(
                fx.tenant_id,
                order.id,
                OrderUpdate {
                    priority: Some(Priority::Urgent),
                    notes: Some("rush".into()),
                    status: Some(ProductionOrderStatus::Released),
                    ..OrderUpdate::default()
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(updated.priority, Priority::Urgent);
        assert_eq!(updated.status, ProductionOrderStatus::Released);

        // a rejected transition discards the detail edit too
        let err = orders
            .update_order(
                fx.tenant_id,
                order.id,
                OrderUpdate {
                    priority: Some(Priority::Low),
                    status: Some(ProductionOrderStatus::Completed),
                    ..OrderUpdate::default()
                },
                now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidTransition { .. })));
        let reloaded = orders.get_order(fx.tenant_id, order.id).await.unwrap();
        assert_eq!(reloaded.priority, Priority::Urgent);

        orders
            .update_order(
                fx.tenant_id,
                order.id,
                OrderUpdate { status: Some(ProductionOrderStatus::InProgress), ..OrderUpdate::default() },
                now(),
            )
            .await
            .unwrap();
        let done = orders
            .update_order(
                fx.tenant_id,
                order.id,
                OrderUpdate {
                    quantity_produced: Some(7),
                    status: Some(ProductionOrderStatus::Completed),
                    ..OrderUpdate::default()
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(done.quantity_produced, 7);
        assert_eq!(fx.stock(frame).await, 7);

        let err = orders
            .update_order(
                fx.tenant_id,
                order.id,
                OrderUpdate { notes: Some("late edit".into()), ..OrderUpdate::default() },
                now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn material_view_reports_shortfalls() {
        let fx = Fixture::new();
        let steel = fx.item("STEEL", 150).await;
        let product = fx.product("FRAME", &[(steel, 2)], None).await;
        let order = fx.services.orders.create_order(fx.tenant_id, input(product, 100), now()).await.unwrap();

        let materials = fx.services.orders.material_requirements(fx.tenant_id, order.id).await.unwrap();
        assert!(!materials.ready);
        assert_eq!(materials.requirements[0].required, 200);
        assert_eq!(materials.requirements[0].shortfall, 50);
        assert_eq!(materials.requirements[0].sku.as_deref(), Some("STEEL"));
    }

    #[tokio::test]
    async fn orders_are_invisible_to_other_tenants() {
        let fx = Fixture::new();
        let product = fx.product("FRAME", &[], None).await;
        let order = fx.services.orders.create_order(fx.tenant_id, input(product, 1), now()).await.unwrap();

        let err = fx.services.orders.get_order(TenantId::new(), order.id).await.unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::NotFound));
        let err = fx
            .services
            .orders
            .transition_status(TenantId::new(), order.id, ProductionOrderStatus::Released, None, now())
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::NotFound));
    }
}
