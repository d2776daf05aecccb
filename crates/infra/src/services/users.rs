//! User accounts and login.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use shopfloor_auth::{
    DUMMY_PASSWORD_HASH, Hs256JwtIssuer, PrincipalId, Role, User, hash_password, normalize_email, verify_password,
};
use shopfloor_core::{DomainError, TenantId};

use crate::error::{ServiceError, ServiceResult};
use crate::store::ErpStore;

/// Same message for every login failure so callers cannot probe accounts.
const INVALID_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn ErpStore>,
    issuer: Hs256JwtIssuer,
}

impl UserService {
    pub fn new(store: Arc<dyn ErpStore>, issuer: Hs256JwtIssuer) -> Self {
        Self { store, issuer }
    }

    /// Exchange credentials for a signed access token.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<LoginOutcome> {
        let user = self.store.find_user_by_email(&normalize_email(email)).await?;

        // unknown accounts still pay for one hash check
        let hash = user
            .as_ref()
            .map_or_else(|| DUMMY_PASSWORD_HASH.to_string(), |u| u.password_hash.clone());
        let candidate = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
            .await
            .map_err(|e| ServiceError::internal(format!("password check aborted: {e}")))?;

        let Some(user) = user else {
            tracing::info!("login failed: unknown email");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !matches || !user.active {
            tracing::info!(user_id = %user.id, active = user.active, "login failed");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let (token, claims) = self
            .issuer
            .issue(user.id, user.tenant_id, user.roles.clone(), now)
            .map_err(|e| ServiceError::internal(format!("failed to sign token: {e}")))?;

        tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "login succeeded");
        Ok(LoginOutcome {
            token,
            token_type: "Bearer",
            expires_at: claims.expires_at,
            user,
        })
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant_id))]
    pub async fn create_user(
        &self,
        tenant_id: TenantId,
        input: NewUser,
        now: DateTime<Utc>,
    ) -> ServiceResult<User> {
        User::validate_new(&input.email, &input.display_name, &input.password, &input.roles)?;

        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::internal(format!("password hashing aborted: {e}")))?
            .map_err(|e| ServiceError::internal(e.to_string()))?;

        let user = User {
            id: PrincipalId::new(),
            tenant_id,
            email: normalize_email(&input.email),
            display_name: input.display_name.trim().to_string(),
            password_hash,
            roles: input.roles,
            active: true,
            created_at: now,
        };

        let mut uow = self.store.begin().await?;
        uow.insert_user(&user).await?;
        uow.commit().await?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Create the first admin unless the email is already registered.
    ///
    /// Returns the new user, or `None` when nothing had to be done.
    #[instrument(skip(self, password))]
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        tenant_id: Option<TenantId>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<User>> {
        if self.store.find_user_by_email(&normalize_email(email)).await?.is_some() {
            tracing::debug!("bootstrap admin already exists");
            return Ok(None);
        }

        let tenant_id = tenant_id.unwrap_or_default();
        let user = self
            .create_user(
                tenant_id,
                NewUser {
                    email: email.to_string(),
                    display_name: "Administrator".to_string(),
                    password: password.to_string(),
                    roles: vec![Role::ADMIN],
                },
                now,
            )
            .await?;

        tracing::warn!(%tenant_id, user_id = %user.id, "bootstrap admin created");
        Ok(Some(user))
    }

    /// The account behind an authenticated principal.
    pub async fn me(&self, tenant_id: TenantId, user_id: PrincipalId) -> ServiceResult<User> {
        self.store
            .get_user(tenant_id, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Fixture;
    use shopfloor_auth::{Hs256JwtValidator, JwtValidator};

    fn admin(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            display_name: "Ada".to_string(),
            password: "correct horse".to_string(),
            roles: vec![Role::ADMIN],
        }
    }

    #[tokio::test]
    async fn login_issues_a_token_for_valid_credentials() {
        let fx = Fixture::new();
        let users = &fx.services.users;
        let created = users.create_user(fx.tenant_id, admin("Ada@Example.com "), Utc::now()).await.unwrap();
        assert_eq!(created.email, "ada@example.com");

        let now = Utc::now();
        let outcome = users.login("ada@example.com", "correct horse", now).await.unwrap();
        let claims = Hs256JwtValidator::new(Fixture::JWT_SECRET).validate(&outcome.token, now).unwrap();
        assert_eq!(claims.sub, created.id);
        assert_eq!(claims.tenant_id, fx.tenant_id);
        assert_eq!(claims.roles, vec![Role::ADMIN]);

        let me = users.me(fx.tenant_id, claims.sub).await.unwrap();
        assert_eq!(me.email, "ada@example.com");
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let fx = Fixture::new();
        let users = &fx.services.users;
        users.create_user(fx.tenant_id, admin("ada@example.com"), Utc::now()).await.unwrap();

        let wrong = users.login("ada@example.com", "nope nope", Utc::now()).await.unwrap_err();
        let unknown = users.login("bob@example.com", "correct horse", Utc::now()).await.unwrap_err();
        assert_eq!(wrong, unknown);
        assert_eq!(wrong, ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    #[tokio::test]
    async fn unknown_email_costs_a_password_check() {
        let fx = Fixture::new();
        let users = &fx.services.users;
        users.create_user(fx.tenant_id, admin("ada@example.com"), Utc::now()).await.unwrap();

        let started = std::time::Instant::now();
        users.login("ada@example.com", "nope nope", Utc::now()).await.unwrap_err();
        let wrong_password = started.elapsed();

        let started = std::time::Instant::now();
        users.login("bob@example.com", "nope nope", Utc::now()).await.unwrap_err();
        let unknown_email = started.elapsed();

        assert!(
            unknown_email * 4 >= wrong_password,
            "unknown email answered in {unknown_email:?}, wrong password in {wrong_password:?}"
        );
    }

    #[tokio::test]
    async fn emails_are_unique() {
        let fx = Fixture::new();
        let users = &fx.services.users;
        users.create_user(fx.tenant_id, admin("ada@example.com"), Utc::now()).await.unwrap();
        let err = users
            .create_user(TenantId::new(), admin("ADA@example.com"), Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn weak_input_is_rejected() {
        let fx = Fixture::new();
        let mut input = admin("ada@example.com");
        input.password = "short".into();
        let err = fx.services.users.create_user(fx.tenant_id, input, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn bootstrap_runs_once() {
        let fx = Fixture::new();
        let users = &fx.services.users;

        let first = users
            .bootstrap_admin("root@example.com", "bootstrap-pass", Some(fx.tenant_id), Utc::now())
            .await
            .unwrap();
        assert_eq!(first.map(|u| u.roles), Some(vec![Role::ADMIN]));

        let second = users
            .bootstrap_admin("root@example.com", "bootstrap-pass", None, Utc::now())
            .await
            .unwrap();
        assert!(second.is_none());
    }
}
