use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Ad, AdInteraction, Allocation, DateRange, Hold, ProviderType, RequestStatus, ServiceEntity,
    ServiceRequest, UnitAvailability,
};
use crate::CoreResult;

/// Narrows a request listing; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub agent_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn matches(&self, request: &ServiceRequest) -> bool {
        self.agent_id.map_or(true, |id| request.agent_id == id)
            && self.provider_id.map_or(true, |id| request.provider_id == id)
            && self.status.map_or(true, |status| request.status == status)
    }
}

/// Repository trait for service request persistence
#[async_trait]
pub trait ServiceRequestRepository: Send + Sync {
    async fn insert(&self, request: &ServiceRequest) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<Option<ServiceRequest>>;

    /// Newest first.
    async fn list(&self, filter: &RequestFilter) -> CoreResult<Vec<ServiceRequest>>;

    /// Persists a transitioned request only if the stored status still equals
    /// `expected`; otherwise fails with `CoreError::Conflict`.
    async fn save_transition(
        &self,
        request: &ServiceRequest,
        expected: RequestStatus,
    ) -> CoreResult<()>;

    /// Pending requests whose deadline is at or before `now`.
    async fn list_overdue(&self, now: DateTime<Utc>, limit: u32) -> CoreResult<Vec<ServiceRequest>>;
}

/// Repository trait for held inventory
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Free units per inventory unit over the range, or `None` when the entity
    /// has no inventory on record.
    async fn availability(
        &self,
        entity_id: Uuid,
        range: DateRange,
    ) -> CoreResult<Option<Vec<UnitAvailability>>>;

    /// Atomically re-checks availability and holds every line, or none.
    async fn hold(&self, request_id: Uuid, holds: &[Hold]) -> CoreResult<Vec<Allocation>>;

    /// Returns what was released; empty when the request held nothing.
    async fn release(&self, request_id: Uuid) -> CoreResult<Vec<Allocation>>;

    /// Saves `request` under the same compare-and-set as
    /// `ServiceRequestRepository::save_transition` and releases its
    /// allocations, both or neither.
    async fn release_with_transition(
        &self,
        request: &ServiceRequest,
        expected: RequestStatus,
    ) -> CoreResult<Vec<Allocation>>;

    async fn allocations_for(&self, request_id: Uuid) -> CoreResult<Vec<Allocation>>;
}

/// Lookup of bookable records and their owners
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    async fn find_entity(
        &self,
        provider_type: ProviderType,
        entity_id: Uuid,
    ) -> CoreResult<Option<ServiceEntity>>;
}

/// Lookup of package/draft owners
#[async_trait]
pub trait PackageDirectory: Send + Sync {
    async fn package_owner(&self, package_id: Uuid) -> CoreResult<Option<Uuid>>;
}

/// Repository trait for ad serving and tracking
#[async_trait]
pub trait AdRepository: Send + Sync {
    async fn active_ads(&self, placement: &str, limit: u32) -> CoreResult<Vec<Ad>>;

    /// Bumps the counter of an active ad and returns the updated record.
    async fn record(&self, ad_id: Uuid, interaction: AdInteraction) -> CoreResult<Ad>;
}
