use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use voyara_core::repository::{RequestFilter, ServiceRequestRepository};
use voyara_core::{
    Allocation, CoreError, CoreResult, NewServiceRequest, RequestStatus, ServiceRequest,
};
use voyara_shared::ServiceRequestEventKind;

use crate::approval::ApprovalService;
use crate::intake::{RequestIntake, ServiceRequestInput};
use crate::ownership::{is_self_owned, OwnershipCheck};
use crate::quantity::QuantityResolver;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListScope {
    #[default]
    Agent,
    Provider,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: ServiceRequest,
    pub allocations: Vec<Allocation>,
}

/// Create flow: intake → quantity → ownership → (auto-)approval.
pub struct RequestOrchestrator {
    intake: RequestIntake,
    quantity: Arc<QuantityResolver>,
    ownership: OwnershipCheck,
    approval: Arc<ApprovalService>,
    requests: Arc<dyn ServiceRequestRepository>,
    request_ttl: Duration,
}

impl RequestOrchestrator {
    pub fn new(
        intake: RequestIntake,
        quantity: Arc<QuantityResolver>,
        ownership: OwnershipCheck,
        approval: Arc<ApprovalService>,
        requests: Arc<dyn ServiceRequestRepository>,
        request_ttl: Duration,
    ) -> Self {
        Self {
            intake,
            quantity,
            ownership,
            approval,
            requests,
            request_ttl,
        }
    }

    pub async fn create(
        &self,
        agent_id: Uuid,
        input: ServiceRequestInput,
        now: DateTime<Utc>,
    ) -> CoreResult<ServiceRequest> {
        let normalized = self.intake.normalize(agent_id, input, now.date_naive()).await?;
        let requested_quantity = self.quantity.resolve(&normalized).await?;
        let owner_id = self.ownership.owner_of(agent_id, normalized.package_id).await?;

        let request = ServiceRequest::new(
            NewServiceRequest {
                agent_id,
                provider_id: normalized.entity.provider_id,
                provider_type: normalized.entity.provider_type,
                entity_id: normalized.entity.id,
                package_id: normalized.package_id,
                requested_quantity,
                range: normalized.range,
                metadata: normalized.metadata,
            },
            now,
            self.request_ttl,
        );

        self.requests.insert(&request).await?;
        info!(
            "Service request {} created by {} for {} {} ({} unit(s))",
            request.id, agent_id, request.provider_type, request.entity_id, requested_quantity
        );
        self.approval
            .notify(&request, ServiceRequestEventKind::Created, Some(agent_id))
            .await;

        if is_self_owned(owner_id, request.provider_id) {
            return self.approval.auto_approve(request, now).await;
        }
        Ok(request)
    }

    /// A request with its allocations, visible to its agent and provider only.
    pub async fn detail(&self, id: Uuid, viewer: Uuid) -> CoreResult<RequestDetail> {
        let request = self
            .requests
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Service request {}", id)))?;
        if !request.is_party(viewer) {
            return Err(CoreError::Forbidden("not a party to this request".to_string()));
        }

        let allocations = self.approval.allocations(id).await?;
        Ok(RequestDetail { request, allocations })
    }

    pub async fn list(
        &self,
        viewer: Uuid,
        scope: ListScope,
        status: Option<RequestStatus>,
    ) -> CoreResult<Vec<ServiceRequest>> {
        let filter = match scope {
            ListScope::Agent => RequestFilter {
                agent_id: Some(viewer),
                status,
                ..Default::default()
            },
            ListScope::Provider => RequestFilter {
                provider_id: Some(viewer),
                status,
                ..Default::default()
            },
        };
        self.requests.list(&filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voyara_core::events::NoopPublisher;
    use voyara_core::{InventoryUnit, ProviderType, ServiceEntity};
    use voyara_store::MemoryStore;

    struct Fixture {
        orchestrator: RequestOrchestrator,
        hotel: ServiceEntity,
        flight: ServiceEntity,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let hotel = ServiceEntity {
            id: Uuid::new_v4(),
            provider_type: ProviderType::Hotel,
            provider_id: Uuid::new_v4(),
            name: "Harbour View".to_string(),
        };
        let flight = ServiceEntity {
            id: Uuid::new_v4(),
            provider_type: ProviderType::Flight,
            provider_id: Uuid::new_v4(),
            name: "VY 101".to_string(),
        };
        store.add_entity(hotel.clone()).await;
        store.add_entity(flight.clone()).await;
        store.set_capacity(hotel.id, InventoryUnit::Room { occupancy: 4 }, 2).await;
        store.set_capacity(hotel.id, InventoryUnit::Room { occupancy: 2 }, 5).await;
        store.set_capacity(flight.id, InventoryUnit::Pool, 4).await;

        let approval = Arc::new(ApprovalService::new(store.clone(), store.clone(), Arc::new(NoopPublisher)));
        let orchestrator = RequestOrchestrator::new(
            RequestIntake::new(store.clone()),
            Arc::new(QuantityResolver::new(store.clone(), 3)),
            OwnershipCheck::new(store.clone()),
            approval,
            store,
            Duration::hours(48),
        );
        Fixture { orchestrator, hotel, flight }
    }

    fn input(entity: &ServiceEntity, guests: i64) -> ServiceRequestInput {
        let start = Utc::now().date_naive() + Duration::days(30);
        ServiceRequestInput {
            provider_type: Some(json!(entity.provider_type.as_str())),
            entity_id: Some(json!(entity.id)),
            start_date: Some(json!(start.to_string())),
            end_date: Some(json!((start + Duration::days(3)).to_string())),
            guest_count: Some(json!(guests)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_resolves_room_count() {
        let f = fixture().await;
        let agent = Uuid::new_v4();

        let request = f.orchestrator.create(agent, input(&f.hotel, 10), Utc::now()).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.requested_quantity, 3);
        assert_eq!(request.provider_id, f.hotel.provider_id);
        assert!(!request.auto_approved);

        let listed = f.orchestrator.list(agent, ListScope::Agent, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        let for_provider = f
            .orchestrator
            .list(f.hotel.provider_id, ListScope::Provider, Some(RequestStatus::Pending))
            .await
            .unwrap();
        assert_eq!(for_provider.len(), 1);
    }

    #[tokio::test]
    async fn test_self_owned_request_is_auto_approved() {
        let f = fixture().await;
        let owner = f.flight.provider_id;

        let request = f.orchestrator.create(owner, input(&f.flight, 3), Utc::now()).await.unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert!(request.auto_approved);

        let detail = f.orchestrator.detail(request.id, owner).await.unwrap();
        assert_eq!(detail.allocations.len(), 1);
        assert_eq!(detail.allocations[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_self_owned_without_inventory_stays_pending() {
        let f = fixture().await;
        let owner = f.flight.provider_id;

        let request = f.orchestrator.create(owner, input(&f.flight, 5), Utc::now()).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(!request.auto_approved);
    }

    #[tokio::test]
    async fn test_detail_is_private_to_parties() {
        let f = fixture().await;
        let agent = Uuid::new_v4();
        let request = f.orchestrator.create(agent, input(&f.hotel, 2), Utc::now()).await.unwrap();

        assert!(f.orchestrator.detail(request.id, f.hotel.provider_id).await.is_ok());
        assert!(matches!(
            f.orchestrator.detail(request.id, Uuid::new_v4()).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            f.orchestrator.detail(Uuid::new_v4(), agent).await,
            Err(CoreError::NotFound(_))
        ));
    }
}
