//! Strongly-typed identifiers used across the domain.
//!
//! Every identifier is a UUIDv7 newtype. Domain crates declare their own ids
//! through [`uuid_id!`](crate::uuid_id) so parsing, display and serde stay
//! uniform across the workspace.

/// Declare a `Copy` UUID newtype with `Display`, `FromStr` and serde support.
///
/// `FromStr` failures are reported as [`DomainError::InvalidId`](crate::DomainError::InvalidId)
/// prefixed with the type name.
#[macro_export]
macro_rules! uuid_id {
    ($(#[$meta:meta])* $vis:vis $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name(::uuid::Uuid);

        impl $name {
            /// Create a new, time-ordered identifier.
            pub fn new() -> Self {
                Self(::uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &::uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(value: ::uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| $crate::DomainError::invalid_id(format!("{}: {}", stringify!($name), e)))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a tenant (multi-tenant boundary).
    pub TenantId
);

uuid_id!(
    /// Identifier of a production order.
    ///
    /// Lives here rather than in the production crate because inventory
    /// ledger entries reference the order that caused them.
    pub ProductionOrderId
);


#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;

    #[test]
    fn parse_roundtrips_display() {
        let id = TenantId::new();
        let parsed: TenantId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_failure_names_the_type() {
        let err = "not-a-uuid".parse::<TenantId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.starts_with("TenantId")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
