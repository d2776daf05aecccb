//! Service-level error model.

use thiserror::Error;

use shopfloor_core::DomainError;

use crate::store::StoreError;

/// Failure of a service operation.
///
/// Domain failures pass through unchanged so callers can map each business
/// error to its own response; storage failures are folded into the nearest
/// business meaning (`Conflict`, `NotFound`) or reported as `Internal`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Bad credentials or an unusable account.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::Domain(DomainError::Conflict(msg)),
            StoreError::NotFound(_) => ServiceError::Domain(DomainError::NotFound),
            StoreError::Backend(msg) => ServiceError::Internal(msg),
        }
    }
}

impl ServiceError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Domain(DomainError::Conflict(_)))
    }
}
