use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::{Aggregate, AggregateRoot, DomainError, ProductionOrderId, TenantId};
use shopfloor_products::ProductId;

use crate::number::OrderNumber;
use crate::status::{Priority, ProductionOrderStatus};

/// Persisted state of a production order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOrderSnapshot {
    pub id: ProductionOrderId,
    pub tenant_id: TenantId,
    pub order_number: OrderNumber,
    pub product_id: ProductId,
    pub quantity_planned: i64,
    pub quantity_produced: i64,
    pub start_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub status: ProductionOrderStatus,
    pub priority: Priority,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate root: ProductionOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionOrder {
    id: ProductionOrderId,
    tenant_id: Option<TenantId>,
    order_number: Option<OrderNumber>,
    product_id: Option<ProductId>,
    quantity_planned: i64,
    quantity_produced: i64,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    status: ProductionOrderStatus,
    priority: Priority,
    notes: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl ProductionOrder {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductionOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            order_number: None,
            product_id: None,
            quantity_planned: 0,
            quantity_produced: 0,
            start_date: None,
            due_date: None,
            status: ProductionOrderStatus::Planned,
            priority: Priority::default(),
            notes: None,
            created_at: None,
            updated_at: None,
            completed_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn restore(s: ProductionOrderSnapshot) -> Self {
        Self {
            id: s.id,
            tenant_id: Some(s.tenant_id),
            order_number: Some(s.order_number),
            product_id: Some(s.product_id),
            quantity_planned: s.quantity_planned,
            quantity_produced: s.quantity_produced,
            start_date: s.start_date,
            due_date: Some(s.due_date),
            status: s.status,
            priority: s.priority,
            notes: s.notes,
            created_at: Some(s.created_at),
            updated_at: Some(s.updated_at),
            completed_at: s.completed_at,
            version: 0,
            created: true,
        }
    }

    pub fn snapshot(&self) -> Option<ProductionOrderSnapshot> {
        if !self.created {
            return None;
        }
        Some(ProductionOrderSnapshot {
            id: self.id,
            tenant_id: self.tenant_id?,
            order_number: self.order_number.clone()?,
            product_id: self.product_id?,
            quantity_planned: self.quantity_planned,
            quantity_produced: self.quantity_produced,
            start_date: self.start_date,
            due_date: self.due_date?,
            status: self.status,
            priority: self.priority,
            notes: self.notes.clone(),
            created_at: self.created_at?,
            updated_at: self.updated_at?,
            completed_at: self.completed_at,
        })
    }

    pub fn id_typed(&self) -> ProductionOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn order_number(&self) -> Option<&OrderNumber> {
        self.order_number.as_ref()
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn quantity_planned(&self) -> i64 {
        self.quantity_planned
    }

    pub fn quantity_produced(&self) -> i64 {
        self.quantity_produced
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn status(&self) -> ProductionOrderStatus {
        self.status
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for ProductionOrder {
    type Id = ProductionOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProductionOrder.
///
/// The caller resolves the product and allocates the order number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProductionOrder {
    pub tenant_id: TenantId,
    pub order_id: ProductionOrderId,
    pub order_number: OrderNumber,
    pub product_id: ProductId,
    pub quantity_planned: i64,
    pub start_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
///
/// `quantity_produced` is only meaningful when completing; it defaults to
/// whatever was recorded so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub tenant_id: TenantId,
    pub order_id: ProductionOrderId,
    pub target: ProductionOrderStatus,
    pub quantity_produced: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateOrderDetails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderDetails {
    pub tenant_id: TenantId,
    pub order_id: ProductionOrderId,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Progress reporting while the order is in progress.
    pub quantity_produced: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

impl UpdateOrderDetails {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none()
            && self.start_date.is_none()
            && self.due_date.is_none()
            && self.notes.is_none()
            && self.quantity_produced.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionOrderCommand {
    Create(CreateProductionOrder),
    ChangeStatus(ChangeStatus),
    UpdateDetails(UpdateOrderDetails),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub tenant_id: TenantId,
    pub order_id: ProductionOrderId,
    pub order_number: OrderNumber,
    pub product_id: ProductId,
    pub quantity_planned: i64,
    pub start_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub tenant_id: TenantId,
    pub order_id: ProductionOrderId,
    pub from: ProductionOrderStatus,
    pub to: ProductionOrderStatus,
    pub quantity_produced: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderDetailsUpdated (full post-update values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetailsUpdated {
    pub tenant_id: TenantId,
    pub order_id: ProductionOrderId,
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub quantity_produced: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionOrderEvent {
    OrderCreated(OrderCreated),
    StatusChanged(StatusChanged),
    OrderDetailsUpdated(OrderDetailsUpdated),
}

impl ProductionOrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ProductionOrderEvent::OrderCreated(_) => "production.order.created",
            ProductionOrderEvent::StatusChanged(_) => "production.order.status_changed",
            ProductionOrderEvent::OrderDetailsUpdated(_) => "production.order.details_updated",
        }
    }
}

impl Aggregate for ProductionOrder {
    type Command = ProductionOrderCommand;
    type Event = ProductionOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductionOrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.order_number = Some(e.order_number.clone());
                self.product_id = Some(e.product_id);
                self.quantity_planned = e.quantity_planned;
                self.quantity_produced = 0;
                self.start_date = e.start_date;
                self.due_date = Some(e.due_date);
                self.status = ProductionOrderStatus::Planned;
                self.priority = e.priority;
                self.notes = e.notes.clone();
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            ProductionOrderEvent::StatusChanged(e) => {
                self.status = e.to;
                self.quantity_produced = e.quantity_produced;
                match e.to {
                    ProductionOrderStatus::InProgress if self.start_date.is_none() => {
                        self.start_date = Some(e.occurred_at.date_naive());
                    }
                    ProductionOrderStatus::Completed => {
                        self.completed_at = Some(e.occurred_at);
                    }
                    _ => {}
                }
                self.updated_at = Some(e.occurred_at);
            }
            ProductionOrderEvent::OrderDetailsUpdated(e) => {
                self.priority = e.priority;
                self.start_date = e.start_date;
                self.due_date = Some(e.due_date);
                self.notes = e.notes.clone();
                self.quantity_produced = e.quantity_produced;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductionOrderCommand::Create(cmd) => self.handle_create(cmd),
            ProductionOrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            ProductionOrderCommand::UpdateDetails(cmd) => self.handle_update(cmd),
        }
    }
}

impl ProductionOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: ProductionOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreateProductionOrder,
    ) -> Result<Vec<ProductionOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("production order already exists"));
        }
        if cmd.quantity_planned <= 0 {
            return Err(DomainError::validation(
                "quantity_planned",
                "must be greater than zero",
            ));
        }
        if cmd.due_date < cmd.occurred_at.date_naive() {
            return Err(DomainError::validation("due_date", "cannot be in the past"));
        }
        if let Some(start) = cmd.start_date {
            if start > cmd.due_date {
                return Err(DomainError::validation("start_date", "must not be after due_date"));
            }
        }

        Ok(vec![ProductionOrderEvent::OrderCreated(OrderCreated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            product_id: cmd.product_id,
            quantity_planned: cmd.quantity_planned,
            start_date: cmd.start_date,
            due_date: cmd.due_date,
            priority: cmd.priority.unwrap_or_default(),
            notes: normalize(cmd.notes.as_deref()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeStatus,
    ) -> Result<Vec<ProductionOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if !self.status.can_transition_to(cmd.target) {
            return Err(DomainError::invalid_transition(self.status, cmd.target));
        }

        let quantity_produced = match (cmd.target, cmd.quantity_produced) {
            (ProductionOrderStatus::Completed, produced) => {
                let produced = produced.unwrap_or(self.quantity_produced);
                if produced < 0 {
                    return Err(DomainError::validation(
                        "quantity_produced",
                        "cannot be negative",
                    ));
                }
                if produced > self.quantity_planned {
                    return Err(DomainError::validation(
                        "quantity_produced",
                        format!("cannot exceed quantity_planned ({})", self.quantity_planned),
                    ));
                }
                produced
            }
            (_, Some(_)) => {
                return Err(DomainError::validation(
                    "quantity_produced",
                    "can only be set when completing the order",
                ));
            }
            (_, None) => self.quantity_produced,
        };

        Ok(vec![ProductionOrderEvent::StatusChanged(StatusChanged {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.target,
            quantity_produced,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(
        &self,
        cmd: &UpdateOrderDetails,
    ) -> Result<Vec<ProductionOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if cmd.is_empty() {
            return Ok(vec![]);
        }
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "cannot edit a {} order",
                self.status
            )));
        }

        let due_date = match cmd.due_date {
            Some(d) if d < cmd.occurred_at.date_naive() => {
                return Err(DomainError::validation("due_date", "cannot be in the past"));
            }
            Some(d) => d,
            None => self.due_date.ok_or_else(|| DomainError::invariant("order without due_date"))?,
        };
        let start_date = cmd.start_date.or(self.start_date);
        if let Some(start) = start_date {
            if start > due_date {
                return Err(DomainError::validation("start_date", "must not be after due_date"));
            }
        }

        let quantity_produced = match cmd.quantity_produced {
            Some(_) if self.status != ProductionOrderStatus::InProgress => {
                return Err(DomainError::validation(
                    "quantity_produced",
                    "can only be recorded while the order is in progress",
                ));
            }
            Some(q) if q < 0 => {
                return Err(DomainError::validation("quantity_produced", "cannot be negative"));
            }
            Some(q) => q,
            None => self.quantity_produced,
        };

        let notes = match &cmd.notes {
            Some(n) => normalize(Some(n)),
            None => self.notes.clone(),
        };

        Ok(vec![ProductionOrderEvent::OrderDetailsUpdated(OrderDetailsUpdated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            priority: cmd.priority.unwrap_or(self.priority),
            start_date,
            due_date,
            notes,
            quantity_produced,
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
