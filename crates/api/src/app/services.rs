//! Service wiring: pick a store, build the token issuer, seed the first admin.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::Utc;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use shopfloor_auth::Hs256JwtIssuer;
use shopfloor_core::TenantId;
use shopfloor_infra::{
    ErpServices, ErpStore, InMemoryErpStore, PostgresErpStore, ServiceError, StoreError,
};

use crate::config::ApiConfig;

/// Services shared by every handler.
pub type AppServices = ErpServices;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("bootstrap admin failed: {0}")]
    Bootstrap(#[from] ServiceError),
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StartupError> {
    let store: Arc<dyn ErpStore> = match &config.database_url {
        Some(url) => {
            let store =
                PostgresErpStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            tracing::info!(max_connections = config.database_max_connections, "using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Arc::new(InMemoryErpStore::new())
        }
    };

    let issuer = Hs256JwtIssuer::new(config.jwt_secret.as_bytes(), config.jwt_ttl);
    let services = ErpServices::new(store, issuer);

    if let Some(admin) = &config.bootstrap_admin {
        if let Some(user) = services
            .users
            .bootstrap_admin(&admin.email, &admin.password, admin.tenant_id, Utc::now())
            .await?
        {
            tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "bootstrap admin created");
        }
    }

    Ok(services)
}

/// SSE stream of realtime hints for one tenant.
pub fn tenant_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.tenant_id == tenant_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
