//! Production domain module.
//!
//! Production orders move through a fixed status table
//! (`planned → released → in_progress → completed`, or any non-terminal state
//! to `cancelled`). The inventory side effects of each step are planned here
//! as plain data and carried out by the service layer.

pub mod number;
pub mod order;
pub mod planning;
pub mod status;

pub use number::{OrderNumber, MAX_SEQUENCE};
pub use order::{
    ChangeStatus, CreateProductionOrder, OrderCreated, OrderDetailsUpdated, ProductionOrder,
    ProductionOrderCommand, ProductionOrderEvent, ProductionOrderSnapshot, StatusChanged,
    UpdateOrderDetails,
};
pub use planning::{MaterialRequirement, cancellation_returns, material_requirements};
pub use status::{Priority, ProductionOrderStatus};
