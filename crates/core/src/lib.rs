//! `shopfloor-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod pagination;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult, FieldViolation};
pub use id::{ProductionOrderId, TenantId};
pub use pagination::{Page, PageRequest};
