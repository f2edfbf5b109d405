use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;
use voyara_catalog::InventoryLedger;
use voyara_core::limits::RateLimiter;
use voyara_core::repository::{
    AdRepository, EntityDirectory, InventoryRepository, PackageDirectory, RequestFilter,
    ServiceRequestRepository,
};
use voyara_core::{
    Ad, AdInteraction, Allocation, CoreError, CoreResult, DateRange, Hold, InventoryUnit,
    ProviderType, RequestStatus, ServiceEntity, ServiceRequest, UnitAvailability,
};

/// Process-local backend for every repository port. Backs the test suites and
/// `storage.backend = "memory"`.
#[derive(Default)]
pub struct MemoryStore {
    requests: RwLock<HashMap<Uuid, ServiceRequest>>,
    ledger: Mutex<InventoryLedger>,
    entities: RwLock<HashMap<Uuid, ServiceEntity>>,
    packages: RwLock<HashMap<Uuid, Uuid>>,
    ads: RwLock<HashMap<Uuid, Ad>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_entity(&self, entity: ServiceEntity) {
        self.entities.write().await.insert(entity.id, entity);
    }

    pub async fn add_package(&self, package_id: Uuid, owner_id: Uuid) {
        self.packages.write().await.insert(package_id, owner_id);
    }

    pub async fn set_capacity(&self, entity_id: Uuid, unit: InventoryUnit, total: u32) {
        self.ledger.lock().await.set_capacity(entity_id, unit, total);
    }

    pub async fn add_ad(&self, ad: Ad) {
        self.ads.write().await.insert(ad.id, ad);
    }
}

#[async_trait]
impl ServiceRequestRepository for MemoryStore {
    async fn insert(&self, request: &ServiceRequest) -> CoreResult<()> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(CoreError::Conflict(format!("request {} already exists", request.id)));
        }
        requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<ServiceRequest>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &RequestFilter) -> CoreResult<Vec<ServiceRequest>> {
        let mut matched: Vec<ServiceRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matched)
    }

    async fn save_transition(&self, request: &ServiceRequest, expected: RequestStatus) -> CoreResult<()> {
        let mut requests = self.requests.write().await;
        compare_and_set(&mut requests, request, expected)
    }

    async fn list_overdue(&self, now: DateTime<Utc>, limit: u32) -> CoreResult<Vec<ServiceRequest>> {
        let mut overdue: Vec<ServiceRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.is_overdue(now))
            .cloned()
            .collect();
        overdue.sort_by_key(|r| r.expires_at);
        overdue.truncate(limit as usize);
        Ok(overdue)
    }
}

#[async_trait]
impl InventoryRepository for MemoryStore {
    async fn availability(
        &self,
        entity_id: Uuid,
        range: DateRange,
    ) -> CoreResult<Option<Vec<UnitAvailability>>> {
        Ok(self.ledger.lock().await.availability(entity_id, range))
    }

    async fn hold(&self, request_id: Uuid, holds: &[Hold]) -> CoreResult<Vec<Allocation>> {
        let allocations = self.ledger.lock().await.reserve(request_id, holds, Utc::now())?;
        Ok(allocations)
    }

    async fn release(&self, request_id: Uuid) -> CoreResult<Vec<Allocation>> {
        Ok(self.ledger.lock().await.release(request_id))
    }

    async fn release_with_transition(
        &self,
        request: &ServiceRequest,
        expected: RequestStatus,
    ) -> CoreResult<Vec<Allocation>> {
        // Requests before ledger, same order everywhere both are taken
        let mut requests = self.requests.write().await;
        let mut ledger = self.ledger.lock().await;
        compare_and_set(&mut requests, request, expected)?;
        Ok(ledger.release(request.id))
    }

    async fn allocations_for(&self, request_id: Uuid) -> CoreResult<Vec<Allocation>> {
        Ok(self.ledger.lock().await.allocations_for(request_id))
    }
}

fn compare_and_set(
    requests: &mut HashMap<Uuid, ServiceRequest>,
    request: &ServiceRequest,
    expected: RequestStatus,
) -> CoreResult<()> {
    let stored = requests
        .get_mut(&request.id)
        .ok_or_else(|| CoreError::NotFound(format!("Service request {}", request.id)))?;
    if stored.status != expected {
        return Err(CoreError::Conflict(format!(
            "request {} is no longer {}",
            request.id, expected
        )));
    }
    *stored = request.clone();
    Ok(())
}

#[async_trait]
impl EntityDirectory for MemoryStore {
    async fn find_entity(
        &self,
        provider_type: ProviderType,
        entity_id: Uuid,
    ) -> CoreResult<Option<ServiceEntity>> {
        Ok(self
            .entities
            .read()
            .await
            .get(&entity_id)
            .filter(|e| e.provider_type == provider_type)
            .cloned())
    }
}

#[async_trait]
impl PackageDirectory for MemoryStore {
    async fn package_owner(&self, package_id: Uuid) -> CoreResult<Option<Uuid>> {
        Ok(self.packages.read().await.get(&package_id).copied())
    }
}

#[async_trait]
impl AdRepository for MemoryStore {
    async fn active_ads(&self, placement: &str, limit: u32) -> CoreResult<Vec<Ad>> {
        let mut ads: Vec<Ad> = self
            .ads
            .read()
            .await
            .values()
            .filter(|ad| ad.is_active && ad.placement == placement)
            .cloned()
            .collect();
        // Least-shown first
        ads.sort_by(|a, b| a.impressions.cmp(&b.impressions).then(a.id.cmp(&b.id)));
        ads.truncate(limit as usize);
        Ok(ads)
    }

    async fn record(&self, ad_id: Uuid, interaction: AdInteraction) -> CoreResult<Ad> {
        let mut ads = self.ads.write().await;
        let ad = ads
            .get_mut(&ad_id)
            .filter(|ad| ad.is_active)
            .ok_or_else(|| CoreError::NotFound(format!("Ad {}", ad_id)))?;
        match interaction {
            AdInteraction::Impression => ad.impressions += 1,
            AdInteraction::Click => ad.clicks += 1,
        }
        Ok(ad.clone())
    }
}

/// Fixed-window limiter kept in process memory.
#[derive(Default)]
pub struct MemoryRateLimiter {
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(&self, key: &str, limit: u32, window_seconds: u64) -> CoreResult<bool> {
        let window = Duration::from_secs(window_seconds);
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= window {
            *entry = (now, 0);
        }
        entry.1 = entry.1.saturating_add(1);
        Ok(entry.1 <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use voyara_core::{NewServiceRequest, RequestMetadata};

    fn request(agent_id: Uuid, created: DateTime<Utc>) -> ServiceRequest {
        let start = created.date_naive() + ChronoDuration::days(10);
        ServiceRequest::new(
            NewServiceRequest {
                agent_id,
                provider_id: Uuid::new_v4(),
                provider_type: ProviderType::Flight,
                entity_id: Uuid::new_v4(),
                package_id: None,
                requested_quantity: 2,
                range: DateRange::new(start, start),
                metadata: RequestMetadata::default(),
            },
            created,
            ChronoDuration::hours(48),
        )
    }

    #[tokio::test]
    async fn test_save_transition_compares_status() {
        let store = MemoryStore::new();
        let mut req = request(Uuid::new_v4(), Utc::now());
        store.insert(&req).await.unwrap();

        let provider = req.provider_id;
        req.approve(provider, Utc::now()).unwrap();
        store.save_transition(&req, RequestStatus::Pending).await.unwrap();

        // Second writer still believes the request is pending
        let err = store.save_transition(&req, RequestStatus::Pending).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        let stored = store.get(req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_release_with_transition_is_all_or_nothing() {
        let store = MemoryStore::new();
        let mut req = request(Uuid::new_v4(), Utc::now());
        store.set_capacity(req.entity_id, InventoryUnit::Pool, 5).await;
        store.insert(&req).await.unwrap();

        let provider = req.provider_id;
        req.approve(provider, Utc::now()).unwrap();
        let hold = Hold {
            entity_id: req.entity_id,
            unit: InventoryUnit::Pool,
            quantity: 2,
            range: req.range(),
        };
        store.hold(req.id, &[hold]).await.unwrap();
        store.save_transition(&req, RequestStatus::Pending).await.unwrap();

        let agent = req.agent_id;
        req.cancel(agent, Utc::now()).unwrap();

        // Stale expectation: neither the status nor the allocations move
        let err = store.release_with_transition(&req, RequestStatus::Pending).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(store.get(req.id).await.unwrap().unwrap().status, RequestStatus::Approved);
        assert_eq!(store.allocations_for(req.id).await.unwrap().len(), 1);

        let released = store.release_with_transition(&req, RequestStatus::Approved).await.unwrap();
        assert_eq!(released.len(), 1);
        assert_eq!(store.get(req.id).await.unwrap().unwrap().status, RequestStatus::Cancelled);
        assert!(store.allocations_for(req.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_overdue_is_pending_only() {
        let store = MemoryStore::new();
        let agent = Uuid::new_v4();
        let now = Utc::now();
        let older = request(agent, now - ChronoDuration::hours(72));
        let newer = request(agent, now);
        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();
        store.insert(&request(Uuid::new_v4(), now)).await.unwrap();

        let filter = RequestFilter { agent_id: Some(agent), ..Default::default() };
        let listed = store.list(&filter).await.unwrap();
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let overdue = store.list_overdue(now, 10).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, older.id);
    }

    #[tokio::test]
    async fn test_find_entity_checks_provider_type() {
        let store = MemoryStore::new();
        let entity = ServiceEntity {
            id: Uuid::new_v4(),
            provider_type: ProviderType::Transport,
            provider_id: Uuid::new_v4(),
            name: "Airport shuttle".to_string(),
        };
        store.add_entity(entity.clone()).await;

        assert!(store.find_entity(ProviderType::Transport, entity.id).await.unwrap().is_some());
        assert!(store.find_entity(ProviderType::Hotel, entity.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ads_rotate_and_count() {
        let store = MemoryStore::new();
        let ad = |impressions| Ad {
            id: Uuid::new_v4(),
            placement: "home".to_string(),
            title: "Spring sale".to_string(),
            image_url: None,
            target_url: "https://example.com".to_string(),
            is_active: true,
            impressions,
            clicks: 0,
        };
        let busy = ad(10);
        let fresh = ad(0);
        let mut retired = ad(0);
        retired.is_active = false;
        store.add_ad(busy.clone()).await;
        store.add_ad(fresh.clone()).await;
        store.add_ad(retired.clone()).await;

        let served = store.active_ads("home", 5).await.unwrap();
        assert_eq!(served.iter().map(|a| a.id).collect::<Vec<_>>(), vec![fresh.id, busy.id]);

        let clicked = store.record(busy.id, AdInteraction::Click).await.unwrap();
        assert_eq!(clicked.clicks, 1);
        assert!(matches!(
            store.record(retired.id, AdInteraction::Impression).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limiter_window() {
        let limiter = MemoryRateLimiter::new();
        assert!(limiter.check("ip:1", 2, 60).await.unwrap());
        assert!(limiter.check("ip:1", 2, 60).await.unwrap());
        assert!(!limiter.check("ip:1", 2, 60).await.unwrap());
        assert!(limiter.check("ip:2", 2, 60).await.unwrap());
        // Zero-length window resets on every hit
        assert!(limiter.check("ip:3", 1, 0).await.unwrap());
        assert!(limiter.check("ip:3", 1, 0).await.unwrap());
    }
}
