use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::{Aggregate, AggregateRoot, DomainError, TenantId, uuid_id};
use shopfloor_inventory::InventoryItemId;

uuid_id!(
    /// Product identifier (tenant-scoped via `tenant_id` fields in commands).
    pub ProductId
);

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }
}

impl core::str::FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ProductStatus::Active),
            "archived" => Ok(ProductStatus::Archived),
            _ => Err(DomainError::validation("status", "must be active or archived")),
        }
    }
}

/// One line of a bill of materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomComponent {
    pub item_id: InventoryItemId,
    /// Units of the item consumed per unit produced.
    pub quantity_per_unit: i64,
}

/// Persisted state of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub sku: String,
    pub name: String,
    pub status: ProductStatus,
    pub components: Vec<BomComponent>,
    pub finished_item: Option<InventoryItemId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    tenant_id: Option<TenantId>,
    sku: String,
    name: String,
    status: ProductStatus,
    components: Vec<BomComponent>,
    finished_item: Option<InventoryItemId>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            tenant_id: None,
            sku: String::new(),
            name: String::new(),
            status: ProductStatus::Active,
            components: Vec::new(),
            finished_item: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn restore(s: ProductSnapshot) -> Self {
        Self {
            id: s.id,
            tenant_id: Some(s.tenant_id),
            sku: s.sku,
            name: s.name,
            status: s.status,
            components: s.components,
            finished_item: s.finished_item,
            created_at: Some(s.created_at),
            updated_at: Some(s.updated_at),
            version: 0,
            created: true,
        }
    }

    pub fn snapshot(&self) -> Option<ProductSnapshot> {
        if !self.created {
            return None;
        }
        Some(ProductSnapshot {
            id: self.id,
            tenant_id: self.tenant_id?,
            sku: self.sku.clone(),
            name: self.name.clone(),
            status: self.status,
            components: self.components.clone(),
            finished_item: self.finished_item,
            created_at: self.created_at?,
            updated_at: self.updated_at?,
        })
    }

    pub fn id_typed(&self) -> ProductId {
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

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn components(&self) -> &[BomComponent] {
        &self.components
    }

    pub fn finished_item(&self) -> Option<InventoryItemId> {
        self.finished_item
    }

    /// Only active products can be scheduled for production.
    pub fn can_be_produced(&self) -> bool {
        self.created && self.status == ProductStatus::Active
    }

    /// Explode the bill of materials for `quantity` units.
    ///
    /// Returns `(item, total quantity)` pairs in BOM order.
    pub fn requirements(&self, quantity: i64) -> Vec<(InventoryItemId, i64)> {
        self.components
            .iter()
            .map(|c| (c.item_id, c.quantity_per_unit.saturating_mul(quantity)))
            .collect()
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
///
/// Referenced inventory items must be checked for existence by the caller;
/// the aggregate only sees their ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub components: Vec<BomComponent>,
    pub finished_item: Option<InventoryItemId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ArchiveProduct(ArchiveProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub components: Vec<BomComponent>,
    pub finished_item: Option<InventoryItemId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArchived {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductArchived(ProductArchived),
}

impl ProductEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductArchived(_) => "products.product.archived",
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.tenant_id = Some(e.tenant_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.status = ProductStatus::Active;
                self.components = e.components.clone();
                self.finished_item = e.finished_item;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            ProductEvent::ProductArchived(e) => {
                self.status = ProductStatus::Archived;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ArchiveProduct(cmd) => self.handle_archive(cmd),
        }
    }
}

impl Product {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("sku", "cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name", "cannot be empty"));
        }

        let mut seen = HashSet::new();
        for (idx, c) in cmd.components.iter().enumerate() {
            if c.quantity_per_unit <= 0 {
                return Err(DomainError::validation(
                    format!("components[{idx}].quantity_per_unit"),
                    "must be greater than zero",
                ));
            }
            if !seen.insert(c.item_id) {
                return Err(DomainError::validation(
                    format!("components[{idx}].item_id"),
                    "duplicate component",
                ));
            }
        }

        // SKU uniqueness per tenant is enforced by the store.
        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            sku: cmd.sku.trim().to_string(),
            name: cmd.name.trim().to_string(),
            components: cmd.components.clone(),
            finished_item: cmd.finished_item,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;

        if self.status == ProductStatus::Archived {
            return Err(DomainError::conflict("product is already archived"));
        }

        Ok(vec![ProductEvent::ProductArchived(ProductArchived {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(tenant_id: TenantId, product_id: ProductId, components: Vec<BomComponent>) -> ProductCommand {
        ProductCommand::CreateProduct(CreateProduct {
            tenant_id,
            product_id,
            sku: "FRAME-A1".to_string(),
            name: "Bike frame A1".to_string(),
            components,
            finished_item: None,
            occurred_at: test_time(),
        })
    }

    fn component(quantity_per_unit: i64) -> BomComponent {
        BomComponent {
            item_id: InventoryItemId::new(),
            quantity_per_unit,
        }
    }

    #[test]
    fn create_product_starts_active() {
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        product
            .execute(&create_cmd(test_tenant_id(), product_id, vec![component(2)]))
            .unwrap();

        assert!(product.can_be_produced());
        assert_eq!(product.status(), ProductStatus::Active);
        assert_eq!(product.components().len(), 1);
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let product_id = ProductId::new();
        let product = Product::empty(product_id);
        let cmd = ProductCommand::CreateProduct(CreateProduct {
            tenant_id: test_tenant_id(),
            product_id,
            sku: "FRAME-A1".to_string(),
            name: "   ".to_string(),
            components: vec![],
            finished_item: None,
            occurred_at: test_time(),
        });

        match product.handle(&cmd).unwrap_err() {
            DomainError::Validation(v) => assert_eq!(v.field, "name"),
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn create_product_rejects_non_positive_component_quantity() {
        let product_id = ProductId::new();
        let product = Product::empty(product_id);
        let err = product
            .handle(&create_cmd(test_tenant_id(), product_id, vec![component(1), component(0)]))
            .unwrap_err();

        match err {
            DomainError::Validation(v) => assert_eq!(v.field, "components[1].quantity_per_unit"),
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn create_product_rejects_duplicate_components() {
        let product_id = ProductId::new();
        let product = Product::empty(product_id);
        let c = component(3);
        let err = product
            .handle(&create_cmd(test_tenant_id(), product_id, vec![c, c]))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn requirements_scale_with_quantity() {
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        let steel = component(2);
        let bolts = component(8);
        product
            .execute(&create_cmd(test_tenant_id(), product_id, vec![steel, bolts]))
            .unwrap();

        assert_eq!(
            product.requirements(100),
            vec![(steel.item_id, 200), (bolts.item_id, 800)]
        );
    }

    #[test]
    fn archive_twice_is_conflict() {
        let tenant_id = test_tenant_id();
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        product.execute(&create_cmd(tenant_id, product_id, vec![])).unwrap();

        let archive = ProductCommand::ArchiveProduct(ArchiveProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        });
        product.execute(&archive).unwrap();
        assert!(!product.can_be_produced());

        assert!(matches!(
            product.handle(&archive).unwrap_err(),
            DomainError::Conflict(_)
        ));
    }

    #[test]
    fn archive_from_other_tenant_is_rejected() {
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        product
            .execute(&create_cmd(test_tenant_id(), product_id, vec![]))
            .unwrap();

        let err = product
            .handle(&ProductCommand::ArchiveProduct(ArchiveProduct {
                tenant_id: test_tenant_id(),
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: exploding `a + b` units needs exactly what `a` and `b`
            /// units need separately.
            #[test]
            fn requirements_are_additive(
                per_unit in prop::collection::vec(1i64..50, 0..6),
                a in 0i64..10_000,
                b in 0i64..10_000,
            ) {
                let product_id = ProductId::new();
                let mut product = Product::empty(product_id);
                let components = per_unit.into_iter().map(component).collect();
                product.execute(&create_cmd(test_tenant_id(), product_id, components)).unwrap();

                let sum: Vec<i64> = product
                    .requirements(a)
                    .into_iter()
                    .zip(product.requirements(b))
                    .map(|((_, x), (_, y))| x + y)
                    .collect();
                let whole: Vec<i64> = product.requirements(a + b).into_iter().map(|(_, q)| q).collect();
                prop_assert_eq!(sum, whole);
            }
        }
    }
}
