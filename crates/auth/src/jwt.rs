//! HS256 token signing and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use shopfloor_core::TenantId;

use crate::{JwtClaims, PrincipalId, Role, TokenValidationError, validate_claims};

/// Verifies bearer tokens and yields their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Shared-secret (HS256) validator.
#[derive(Clone)]
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Claims carry RFC 3339 timestamps rather than numeric `exp`/`iat`;
        // the time window is checked by `validate_claims`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Shared-secret (HS256) token issuer.
#[derive(Clone)]
pub struct Hs256JwtIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl Hs256JwtIssuer {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token valid from `now` for the configured TTL.
    pub fn issue(
        &self,
        sub: PrincipalId,
        tenant_id: TenantId,
        roles: Vec<Role>,
        now: DateTime<Utc>,
    ) -> Result<(String, JwtClaims), jsonwebtoken::errors::Error> {
        let claims = JwtClaims {
            sub,
            tenant_id,
            roles,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;
        Ok((token, claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_validates() {
        let issuer = Hs256JwtIssuer::new(SECRET, Duration::minutes(10));
        let validator = Hs256JwtValidator::new(SECRET);
        let now = Utc::now();
        let tenant_id = TenantId::new();

        let (token, _) = issuer
            .issue(PrincipalId::new(), tenant_id, vec![Role::ADMIN], now)
            .unwrap();
        let claims = validator.validate(&token, now).unwrap();

        assert_eq!(claims.tenant_id, tenant_id);
        assert_eq!(claims.roles, vec![Role::ADMIN]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = Hs256JwtIssuer::new(SECRET, Duration::minutes(10));
        let validator = Hs256JwtValidator::new("another-secret");
        let now = Utc::now();

        let (token, _) = issuer
            .issue(PrincipalId::new(), TenantId::new(), vec![], now)
            .unwrap();
        assert!(matches!(
            validator.validate(&token, now),
            Err(TokenValidationError::Invalid(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = Hs256JwtIssuer::new(SECRET, Duration::minutes(1));
        let validator = Hs256JwtValidator::new(SECRET);
        let issued = Utc::now() - Duration::minutes(2);

        let (token, _) = issuer
            .issue(PrincipalId::new(), TenantId::new(), vec![], issued)
            .unwrap();
        assert_eq!(
            validator.validate(&token, Utc::now()),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        let validator = Hs256JwtValidator::new(SECRET);
        assert!(validator.validate("not.a.jwt", Utc::now()).is_err());
    }
}
