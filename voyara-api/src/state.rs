use chrono::Duration;
use std::sync::Arc;
use tokio::sync::broadcast;
use voyara_core::events::EventPublisher;
use voyara_core::limits::RateLimiter;
use voyara_core::repository::{
    AdRepository, EntityDirectory, InventoryRepository, PackageDirectory, ServiceRequestRepository,
};
use voyara_request::{ApprovalService, OwnershipCheck, QuantityResolver, RequestIntake, RequestOrchestrator};
use voyara_shared::ServiceRequestEvent;
use voyara_store::app_config::{BusinessRules, RateLimits};
use voyara_store::{
    DbClient, MemoryStore, PgAdRepository, PgDirectory, PgInventoryRepository,
    PgServiceRequestRepository,
};

use crate::events::FanoutPublisher;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Knobs the handlers read at request time.
#[derive(Clone)]
pub struct Settings {
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub rate_limits: RateLimits,
    pub debug: bool,
}

/// The storage ports, backed either by Postgres or by one `MemoryStore`.
#[derive(Clone)]
pub struct Repositories {
    pub requests: Arc<dyn ServiceRequestRepository>,
    pub inventory: Arc<dyn InventoryRepository>,
    pub entities: Arc<dyn EntityDirectory>,
    pub packages: Arc<dyn PackageDirectory>,
    pub ads: Arc<dyn AdRepository>,
}

impl Repositories {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            requests: store.clone(),
            inventory: store.clone(),
            entities: store.clone(),
            packages: store.clone(),
            ads: store,
        }
    }

    pub fn postgres(db: &DbClient) -> Self {
        let directory = Arc::new(PgDirectory::new(db.pool.clone()));
        Self {
            requests: Arc::new(PgServiceRequestRepository::new(db.pool.clone())),
            inventory: Arc::new(PgInventoryRepository::new(db.pool.clone())),
            entities: directory.clone(),
            packages: directory,
            ads: Arc::new(PgAdRepository::new(db.pool.clone())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RequestOrchestrator>,
    pub approval: Arc<ApprovalService>,
    pub quantity: Arc<QuantityResolver>,
    pub ads: Arc<dyn AdRepository>,
    pub limiter: Arc<dyn RateLimiter>,
    pub sse_tx: broadcast::Sender<ServiceRequestEvent>,
    pub settings: Settings,
}

impl AppState {
    /// Wires the request services over `repos`. Every event goes to the SSE
    /// channel and, when given, to `downstream` as well.
    pub fn new(
        repos: Repositories,
        limiter: Arc<dyn RateLimiter>,
        downstream: Option<Arc<dyn EventPublisher>>,
        settings: Settings,
    ) -> Self {
        let (sse_tx, _) = broadcast::channel(100);
        let publisher = Arc::new(FanoutPublisher::new(sse_tx.clone(), downstream));

        let approval = Arc::new(ApprovalService::new(
            repos.requests.clone(),
            repos.inventory.clone(),
            publisher,
        ));
        let quantity = Arc::new(QuantityResolver::new(
            repos.inventory.clone(),
            settings.business_rules.default_room_occupancy,
        ));
        // Capped at a century to stay inside chrono's range
        let ttl_hours = settings.business_rules.request_ttl_hours.min(876_000) as i64;
        let orchestrator = Arc::new(RequestOrchestrator::new(
            RequestIntake::new(repos.entities),
            quantity.clone(),
            OwnershipCheck::new(repos.packages),
            approval.clone(),
            repos.requests,
            Duration::hours(ttl_hours),
        ));

        Self {
            orchestrator,
            approval,
            quantity,
            ads: repos.ads,
            limiter,
            sse_tx,
            settings,
        }
    }
}
