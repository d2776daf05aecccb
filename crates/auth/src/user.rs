//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::{DomainError, TenantId};

use crate::{PrincipalId, Role};

/// Shortest password accepted for new accounts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A user account.
///
/// # Invariants
/// - A user belongs to exactly one tenant.
/// - `email` is stored trimmed and lowercased; it is unique across tenants
///   because login happens before a tenant is known.
/// - Every role is one the policy knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: PrincipalId,
    pub tenant_id: TenantId,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Validate the inputs for a new account.
    ///
    /// The password is checked here but hashed by the caller, so the hash
    /// never has to pass through validation.
    pub fn validate_new(
        email: &str,
        display_name: &str,
        password: &str,
        roles: &[Role],
    ) -> Result<(), DomainError> {
        let email = normalize_email(email);
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(DomainError::validation("email", "must be a valid email address")),
        }
        if display_name.trim().is_empty() {
            return Err(DomainError::validation("display_name", "cannot be empty"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if roles.is_empty() {
            return Err(DomainError::validation("roles", "at least one role is required"));
        }
        if let Some(unknown) = roles.iter().find(|r| !r.is_known()) {
            return Err(DomainError::validation(
                "roles",
                format!("unknown role '{unknown}'"),
            ));
        }
        Ok(())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_input() {
        assert!(User::validate_new("Ops@Example.com ", "Ops", "longenough", &[Role::VIEWER]).is_ok());
    }

    #[test]
    fn rejects_bad_fields() {
        let cases = [
            ("nope", "Ops", "longenough", vec![Role::VIEWER], "email"),
            ("ops@example.com", " ", "longenough", vec![Role::VIEWER], "display_name"),
            ("ops@example.com", "Ops", "short", vec![Role::VIEWER], "password"),
            ("ops@example.com", "Ops", "longenough", vec![], "roles"),
            ("ops@example.com", "Ops", "longenough", vec![Role::new("root")], "roles"),
        ];

        for (email, name, password, roles, field) in cases {
            match User::validate_new(email, name, password, &roles) {
                Err(DomainError::Validation(v)) => assert_eq!(v.field, field),
                other => panic!("expected validation error on {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: PrincipalId::new(),
            tenant_id: TenantId::new(),
            email: "ops@example.com".to_string(),
            display_name: "Ops".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            roles: vec![Role::VIEWER],
            active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
