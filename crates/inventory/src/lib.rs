//! Inventory domain module.
//!
//! Business rules for stock keeping, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage). Stock only moves through
//! recorded [`InventoryTransaction`] ledger entries.

pub mod item;
pub mod transaction;

pub use item::{
    CreateItem, InventoryCommand, InventoryEvent, InventoryItem, InventoryItemSnapshot,
    ItemCreated, ItemDetailsUpdated, LowStockAlert, RecordTransaction, UpdateItemDetails,
};
pub use transaction::{
    InventoryItemId, InventoryTransaction, TransactionId, TransactionType, ledger_balance,
    signed_delta,
};
