//! `shopfloor-auth`: authentication/authorization boundary.
//!
//! Token handling, password hashing and role/permission checks. This crate is
//! decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtIssuer, Hs256JwtValidator, JwtValidator};
pub use password::{DUMMY_PASSWORD_HASH, PasswordError, hash_password, verify_password};
pub use permissions::Permission;
pub use principal::{PrincipalId, TenantMembership};
pub use roles::Role;
pub use user::{User, normalize_email};
