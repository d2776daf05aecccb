//! Realtime notifications.
//!
//! Services publish small hints after a unit of work commits; the API fans
//! them out to SSE subscribers of the same tenant. Delivery is lossy: with no
//! subscriber, or a subscriber that lags, messages are dropped.

use serde::Serialize;
use tokio::sync::broadcast;

use shopfloor_core::TenantId;

/// Buffered messages per subscriber before it starts lagging.
pub const CHANNEL_CAPACITY: usize = 256;

pub const TOPIC_LOW_STOCK: &str = "inventory.low_stock";
pub const TOPIC_TRANSACTION_RECORDED: &str = "inventory.transaction_recorded";
pub const TOPIC_ORDER_CREATED: &str = "production.order.created";
pub const TOPIC_ORDER_STATUS_CHANGED: &str = "production.order.status_changed";

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeMessage {
    pub tenant_id: TenantId,
    pub topic: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<RealtimeMessage>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.tx.subscribe()
    }

    /// Fire-and-forget publish.
    pub fn publish(&self, tenant_id: TenantId, topic: &str, payload: serde_json::Value) {
        let delivered = self
            .tx
            .send(RealtimeMessage {
                tenant_id,
                topic: topic.to_string(),
                payload,
            })
            .unwrap_or(0);
        tracing::debug!(%tenant_id, topic, delivered, "realtime message published");
    }
}
