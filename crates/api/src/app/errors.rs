//! Failure envelope: `{"success": false, "error", "message", "details"}`.
//!
//! Every error response of the API is built here so codes and statuses stay
//! consistent across handlers and middleware.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value as JsonValue, json};

use shopfloor_auth::AuthzError;
use shopfloor_core::{DomainError, FieldViolation};
use shopfloor_infra::ServiceError;

pub const VALIDATION_ERROR: &str = "ValidationError";
pub const AUTH_ERROR: &str = "AuthError";
pub const FORBIDDEN: &str = "Forbidden";
pub const NOT_FOUND: &str = "NotFound";
pub const INVALID_TRANSITION: &str = "InvalidTransition";
pub const INSUFFICIENT_STOCK: &str = "InsufficientStock";
pub const CONFLICT: &str = "Conflict";
pub const RATE_LIMITED: &str = "RateLimited";
pub const INTERNAL_ERROR: &str = "InternalError";

const INTERNAL_MESSAGE: &str = "an unexpected error occurred";

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    json_error_with_details(status, code, message, JsonValue::Null)
}

pub fn json_error_with_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: JsonValue,
) -> Response {
    let mut body = json!({
        "success": false,
        "error": code,
        "message": message.into(),
    });
    if !details.is_null() {
        body["details"] = details;
    }
    (status, axum::Json(body)).into_response()
}

pub fn validation_error(violations: Vec<FieldViolation>) -> Response {
    let message = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    json_error_with_details(
        StatusCode::BAD_REQUEST,
        VALIDATION_ERROR,
        message,
        json!(violations),
    )
}

pub fn invalid_field(field: &str, message: impl Into<String>) -> Response {
    validation_error(vec![FieldViolation::new(field, message)])
}

pub fn forbidden(err: AuthzError) -> Response {
    json_error(StatusCode::FORBIDDEN, FORBIDDEN, err.to_string())
}

pub fn unauthorized(message: impl Into<String>) -> Response {
    json_error(StatusCode::UNAUTHORIZED, AUTH_ERROR, message)
}

pub fn internal() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR, INTERNAL_MESSAGE)
}

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Unauthorized(msg) => unauthorized(msg),
        ServiceError::Internal(msg) => {
            tracing::error!(error = %msg, "request failed with internal error");
            internal()
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(v) => validation_error(vec![v]),
        DomainError::InvalidId(msg) => invalid_field("id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, NOT_FOUND, "resource not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, CONFLICT, msg),
        DomainError::InvalidTransition { from, to } => json_error_with_details(
            StatusCode::CONFLICT,
            INVALID_TRANSITION,
            format!("cannot move an order from '{from}' to '{to}'"),
            json!({ "from": from, "to": to }),
        ),
        DomainError::InsufficientStock { sku, available, requested } => json_error_with_details(
            StatusCode::CONFLICT,
            INSUFFICIENT_STOCK,
            format!("insufficient stock for '{sku}': available {available}, requested {requested}"),
            json!({ "item": sku, "available": available, "requested": requested }),
        ),
        DomainError::InvariantViolation(msg) => {
            tracing::error!(error = %msg, "domain invariant violated");
            internal()
        }
    }
}

pub fn json_rejection(err: JsonRejection) -> Response {
    invalid_field("body", err.body_text())
}

pub fn query_rejection(err: QueryRejection) -> Response {
    invalid_field("query", err.body_text())
}

pub fn path_rejection(err: PathRejection) -> Response {
    invalid_field("path", err.body_text())
}
