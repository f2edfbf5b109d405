use async_trait::async_trait;
use voyara_shared::ServiceRequestEvent;

use crate::CoreResult;

/// Outbound notifications. Callers treat delivery as best-effort.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &ServiceRequestEvent) -> CoreResult<()>;
}

pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: &ServiceRequestEvent) -> CoreResult<()> {
        tracing::debug!("Dropping event {} for request {}", event.kind.as_str(), event.request_id);
        Ok(())
    }
}
