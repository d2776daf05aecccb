//! Infrastructure layer: persistence, application services, realtime fan-out.
//!
//! Domain crates decide; this crate loads and locks state, runs the domain
//! decision inside a unit of work and persists the outcome.

pub mod error;
pub mod realtime;
pub mod services;
pub mod store;

pub use error::{ServiceError, ServiceResult};
pub use realtime::{RealtimeHub, RealtimeMessage};
pub use services::ErpServices;
pub use store::{ErpStore, InMemoryErpStore, ItemFilter, OrderFilter, PostgresErpStore, StoreError, UnitOfWork};
