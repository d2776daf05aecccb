use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::{Aggregate, AggregateRoot, DomainError, ProductionOrderId, TenantId};

use crate::transaction::{
    InventoryItemId, InventoryTransaction, TransactionId, TransactionType, signed_delta,
};

/// Persisted state of an inventory item.
///
/// Stores hand this back to [`InventoryItem::restore`]; it is not a way to
/// change stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItemSnapshot {
    pub id: InventoryItemId,
    pub tenant_id: TenantId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub current_stock: i64,
    pub minimum_stock: i64,
    /// Cost in smallest currency unit (e.g., cents).
    pub unit_cost: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate root: InventoryItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: InventoryItemId,
    tenant_id: Option<TenantId>,
    sku: String,
    name: String,
    category: Option<String>,
    current_stock: i64,
    minimum_stock: i64,
    unit_cost: u64,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

/// Derived low-stock condition (never stored).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockAlert {
    pub item_id: InventoryItemId,
    pub sku: String,
    pub name: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub shortfall: i64,
}

impl InventoryItem {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: InventoryItemId) -> Self {
        Self {
            id,
            tenant_id: None,
            sku: String::new(),
            name: String::new(),
            category: None,
            current_stock: 0,
            minimum_stock: 0,
            unit_cost: 0,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    /// Rebuild an item from persisted state.
    pub fn restore(s: InventoryItemSnapshot) -> Self {
        Self {
            id: s.id,
            tenant_id: Some(s.tenant_id),
            sku: s.sku,
            name: s.name,
            category: s.category,
            current_stock: s.current_stock,
            minimum_stock: s.minimum_stock,
            unit_cost: s.unit_cost,
            created_at: Some(s.created_at),
            updated_at: Some(s.updated_at),
            version: 0,
            created: true,
        }
    }

    /// Persistable state. `None` until the item has been created.
    pub fn snapshot(&self) -> Option<InventoryItemSnapshot> {
        if !self.created {
            return None;
        }
        Some(InventoryItemSnapshot {
            id: self.id,
            tenant_id: self.tenant_id?,
            sku: self.sku.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            current_stock: self.current_stock,
            minimum_stock: self.minimum_stock,
            unit_cost: self.unit_cost,
            created_at: self.created_at?,
            updated_at: self.updated_at?,
        })
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn current_stock(&self) -> i64 {
        self.current_stock
    }

    pub fn minimum_stock(&self) -> i64 {
        self.minimum_stock
    }

    pub fn unit_cost(&self) -> u64 {
        self.unit_cost
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_low_stock(&self) -> bool {
        self.created && self.current_stock <= self.minimum_stock
    }

    pub fn low_stock_alert(&self) -> Option<LowStockAlert> {
        if !self.is_low_stock() {
            return None;
        }
        Some(LowStockAlert {
            item_id: self.id,
            sku: self.sku.clone(),
            name: self.name.clone(),
            current_stock: self.current_stock,
            minimum_stock: self.minimum_stock,
            shortfall: self.minimum_stock - self.current_stock,
        })
    }
}

impl AggregateRoot for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub minimum_stock: i64,
    pub unit_cost: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordTransaction (the only way stock changes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTransaction {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub transaction_id: TransactionId,
    pub kind: TransactionType,
    pub quantity: i64,
    pub production_order_id: Option<ProductionOrderId>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItemDetails (descriptive fields only, never stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemDetails {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub minimum_stock: Option<i64>,
    pub unit_cost: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    CreateItem(CreateItem),
    RecordTransaction(RecordTransaction),
    UpdateItemDetails(UpdateItemDetails),
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub minimum_stock: i64,
    pub unit_cost: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetailsUpdated {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub name: String,
    pub category: Option<String>,
    pub minimum_stock: i64,
    pub unit_cost: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemCreated(ItemCreated),
    TransactionRecorded(InventoryTransaction),
    ItemDetailsUpdated(ItemDetailsUpdated),
}

impl InventoryEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemCreated(_) => "inventory.item.created",
            InventoryEvent::TransactionRecorded(_) => "inventory.item.transaction_recorded",
            InventoryEvent::ItemDetailsUpdated(_) => "inventory.item.details_updated",
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemCreated(e) => {
                self.id = e.item_id;
                self.tenant_id = Some(e.tenant_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.current_stock = 0;
                self.minimum_stock = e.minimum_stock;
                self.unit_cost = e.unit_cost;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            InventoryEvent::TransactionRecorded(t) => {
                // deltas were range-checked when recorded
                self.current_stock = self.current_stock.saturating_add(t.delta);
                self.updated_at = Some(t.occurred_at);
            }
            InventoryEvent::ItemDetailsUpdated(e) => {
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.minimum_stock = e.minimum_stock;
                self.unit_cost = e.unit_cost;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::CreateItem(cmd) => self.handle_create(cmd),
            InventoryCommand::RecordTransaction(cmd) => self.handle_record(cmd),
            InventoryCommand::UpdateItemDetails(cmd) => self.handle_update(cmd),
        }
    }
}

impl InventoryItem {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_item_id(&self, item_id: InventoryItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("item already exists"));
        }
        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("sku", "cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name", "cannot be empty"));
        }
        if cmd.minimum_stock < 0 {
            return Err(DomainError::validation("minimum_stock", "cannot be negative"));
        }

        Ok(vec![InventoryEvent::ItemCreated(ItemCreated {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            sku: cmd.sku.trim().to_string(),
            name: cmd.name.trim().to_string(),
            category: normalize(cmd.category.as_deref()),
            minimum_stock: cmd.minimum_stock,
            unit_cost: cmd.unit_cost,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record(&self, cmd: &RecordTransaction) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_item_id(cmd.item_id)?;

        let delta = signed_delta(cmd.kind, cmd.quantity)?;
        let out_of_range = || DomainError::validation("quantity", "out of range");
        let resulting = self.current_stock.checked_add(delta).ok_or_else(out_of_range)?;
        if resulting < 0 {
            return Err(DomainError::InsufficientStock {
                sku: self.sku.clone(),
                available: self.current_stock,
                requested: delta.checked_neg().ok_or_else(out_of_range)?,
            });
        }

        Ok(vec![InventoryEvent::TransactionRecorded(InventoryTransaction {
            id: cmd.transaction_id,
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            kind: cmd.kind,
            quantity: cmd.quantity,
            delta,
            production_order_id: cmd.production_order_id,
            note: normalize(cmd.note.as_deref()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateItemDetails) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_item_id(cmd.item_id)?;

        let name = match &cmd.name {
            Some(n) if n.trim().is_empty() => {
                return Err(DomainError::validation("name", "cannot be empty"));
            }
            Some(n) => n.trim().to_string(),
            None => self.name.clone(),
        };
        let minimum_stock = cmd.minimum_stock.unwrap_or(self.minimum_stock);
        if minimum_stock < 0 {
            return Err(DomainError::validation("minimum_stock", "cannot be negative"));
        }
        let category = match &cmd.category {
            Some(c) => normalize(Some(c)),
            None => self.category.clone(),
        };

        Ok(vec![InventoryEvent::ItemDetailsUpdated(ItemDetailsUpdated {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            name,
            category,
            minimum_stock,
            unit_cost: cmd.unit_cost.unwrap_or(self.unit_cost),
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
