use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use voyara_core::events::EventPublisher;
use voyara_core::CoreResult;
use voyara_shared::ServiceRequestEvent;

use crate::auth::AuthUser;
use crate::state::AppState;

/// Sends every event to the SSE channel, then to the downstream publisher
/// (Kafka) when one is configured.
pub struct FanoutPublisher {
    sse_tx: broadcast::Sender<ServiceRequestEvent>,
    downstream: Option<Arc<dyn EventPublisher>>,
}

impl FanoutPublisher {
    pub fn new(sse_tx: broadcast::Sender<ServiceRequestEvent>, downstream: Option<Arc<dyn EventPublisher>>) -> Self {
        Self { sse_tx, downstream }
    }
}

#[async_trait]
impl EventPublisher for FanoutPublisher {
    async fn publish(&self, event: &ServiceRequestEvent) -> CoreResult<()> {
        // No subscribers is fine
        let _ = self.sse_tx.send(event.clone());

        match &self.downstream {
            Some(downstream) => downstream.publish(event).await,
            None => Ok(()),
        }
    }
}

/// Live feed of the events that involve the caller, as agent or provider.
pub async fn stream_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sse_tx.subscribe();
    tracing::debug!("SSE subscriber {} connected", user.id);

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.involves(user.id) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event(event.kind.as_str()).data(data)))
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("SSE subscriber {} lagged: {}", user.id, e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use voyara_shared::ServiceRequestEventKind;

    #[tokio::test]
    async fn test_fanout_reaches_broadcast_without_downstream() {
        let (tx, mut rx) = broadcast::channel(8);
        let publisher = FanoutPublisher::new(tx, None);
        let event = ServiceRequestEvent {
            request_id: Uuid::new_v4(),
            kind: ServiceRequestEventKind::Created,
            agent_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            status: "pending".to_string(),
            requested_quantity: 2,
            actor_id: None,
            timestamp: 0,
        };

        publisher.publish(&event).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.request_id, event.request_id);
    }
}
