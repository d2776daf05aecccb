//! Material planning for production orders.

use std::collections::BTreeMap;

use serde::Serialize;

use shopfloor_inventory::{InventoryItemId, InventoryItemSnapshot, InventoryTransaction, TransactionType};
use shopfloor_products::Product;

/// One line of a BOM explosion with current availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialRequirement {
    pub item_id: InventoryItemId,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub quantity_per_unit: i64,
    pub required: i64,
    pub available: i64,
    pub shortfall: i64,
}

/// Explode `product`'s BOM for `quantity` units against the given stock.
///
/// Items missing from `stock` count as zero available.
pub fn material_requirements(
    product: &Product,
    quantity: i64,
    stock: &[InventoryItemSnapshot],
) -> Vec<MaterialRequirement> {
    product
        .components()
        .iter()
        .map(|c| {
            let item = stock.iter().find(|i| i.id == c.item_id);
            let required = c.quantity_per_unit.saturating_mul(quantity);
            let available = item.map(|i| i.current_stock).unwrap_or(0);
            MaterialRequirement {
                item_id: c.item_id,
                sku: item.map(|i| i.sku.clone()),
                name: item.map(|i| i.name.clone()),
                quantity_per_unit: c.quantity_per_unit,
                required,
                available,
                shortfall: (required - available).max(0),
            }
        })
        .collect()
}

/// Quantities to return when an order is cancelled.
///
/// Net issued per item is issues minus returns among the order's ledger
/// entries; only positive balances produce a return. Sorted by item id.
pub fn cancellation_returns(order_ledger: &[InventoryTransaction]) -> Vec<(InventoryItemId, i64)> {
    let mut net: BTreeMap<InventoryItemId, i64> = BTreeMap::new();
    for t in order_ledger {
        let signed = match t.kind {
            TransactionType::Issue => t.quantity,
            TransactionType::Return => -t.quantity,
            _ => continue,
        };
        *net.entry(t.item_id).or_default() += signed;
    }
    net.into_iter().filter(|(_, q)| *q > 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shopfloor_core::{Aggregate, ProductionOrderId, TenantId};
    use shopfloor_inventory::{TransactionId, signed_delta};
    use shopfloor_products::{BomComponent, CreateProduct, ProductCommand, ProductId};

    fn entry(item_id: InventoryItemId, kind: TransactionType, quantity: i64) -> InventoryTransaction {
        InventoryTransaction {
            id: TransactionId::new(),
            tenant_id: TenantId::new(),
            item_id,
            kind,
            quantity,
            delta: signed_delta(kind, quantity).unwrap(),
            production_order_id: Some(ProductionOrderId::new()),
            note: None,
            occurred_at: Utc::now(),
        }
    }

    fn stock(id: InventoryItemId, sku: &str, current_stock: i64) -> InventoryItemSnapshot {
        InventoryItemSnapshot {
            id,
            tenant_id: TenantId::new(),
            sku: sku.to_string(),
            name: sku.to_lowercase(),
            category: None,
            current_stock,
            minimum_stock: 0,
            unit_cost: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn requirements_report_shortfall() {
        let steel = InventoryItemId::new();
        let bolts = InventoryItemId::new();
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        product
            .execute(&ProductCommand::CreateProduct(CreateProduct {
                tenant_id: TenantId::new(),
                product_id,
                sku: "FRAME".to_string(),
                name: "Frame".to_string(),
                components: vec![
                    BomComponent { item_id: steel, quantity_per_unit: 2 },
                    BomComponent { item_id: bolts, quantity_per_unit: 4 },
                ],
                finished_item: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let reqs = material_requirements(&product, 100, &[stock(steel, "STEEL", 500)]);
        assert_eq!(reqs[0].required, 200);
        assert_eq!(reqs[0].shortfall, 0);
        assert_eq!(reqs[1].required, 400);
        assert_eq!(reqs[1].available, 0);
        assert_eq!(reqs[1].shortfall, 400);
        assert_eq!(reqs[1].sku, None);
    }

    #[test]
    fn cancellation_returns_only_net_issued() {
        let a = InventoryItemId::new();
        let b = InventoryItemId::new();
        let ledger = vec![
            entry(a, TransactionType::Issue, 30),
            entry(b, TransactionType::Issue, 5),
            entry(b, TransactionType::Return, 5),
            entry(a, TransactionType::Return, 10),
        ];

        assert_eq!(cancellation_returns(&ledger), vec![(a, 20)]);
    }

    #[test]
    fn nothing_to_return_for_unreleased_order() {
        assert!(cancellation_returns(&[]).is_empty());
    }
}
