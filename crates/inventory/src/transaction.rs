//! Inventory ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::{DomainError, ProductionOrderId, TenantId, uuid_id};

uuid_id!(
    /// Inventory item identifier (tenant-scoped via `tenant_id` fields).
    pub InventoryItemId
);

uuid_id!(
    /// Identifier of a single ledger entry.
    pub TransactionId
);

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Receipt,
    Issue,
    Transfer,
    Adjustment,
    Return,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::Receipt,
        TransactionType::Issue,
        TransactionType::Transfer,
        TransactionType::Adjustment,
        TransactionType::Return,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receipt => "receipt",
            TransactionType::Issue => "issue",
            TransactionType::Transfer => "transfer",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Return => "return",
        }
    }

    /// Whether the quantity carries its own sign.
    ///
    /// Receipts, issues and returns take a positive quantity and imply the
    /// direction; transfers and adjustments take a signed quantity.
    pub fn is_signed(&self) -> bool {
        matches!(self, TransactionType::Transfer | TransactionType::Adjustment)
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::validation(
                    "type",
                    "must be one of: receipt, issue, transfer, adjustment, return",
                )
            })
    }
}

/// Compute the signed stock delta for a movement.
pub fn signed_delta(kind: TransactionType, quantity: i64) -> Result<i64, DomainError> {
    if kind.is_signed() {
        if quantity == 0 {
            return Err(DomainError::validation("quantity", "must not be zero"));
        }
        return Ok(quantity);
    }

    if quantity <= 0 {
        return Err(DomainError::validation(
            "quantity",
            "must be greater than zero",
        ));
    }

    Ok(match kind {
        TransactionType::Issue => -quantity,
        _ => quantity,
    })
}

/// Append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Quantity as submitted.
    pub quantity: i64,
    /// Signed effect on `current_stock`.
    pub delta: i64,
    pub production_order_id: Option<ProductionOrderId>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Signed sum of a ledger; equals the item's `current_stock`.
pub fn ledger_balance<'a>(entries: impl IntoIterator<Item = &'a InventoryTransaction>) -> i64 {
    entries.into_iter().map(|e| e.delta).sum()
}
