use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use voyara_catalog::{select_rooms, RoomInventory};
use voyara_core::events::EventPublisher;
use voyara_core::repository::{InventoryRepository, ServiceRequestRepository};
use voyara_core::{
    Allocation, CoreError, CoreResult, Hold, InventoryUnit, ProviderType, RequestStatus,
    ServiceRequest, ValidationErrors,
};
use voyara_shared::{ServiceRequestEvent, ServiceRequestEventKind};

pub const MAX_REJECTION_REASON: usize = 500;

/// Applies provider decisions: moves requests through their lifecycle and
/// holds or releases the inventory behind them.
pub struct ApprovalService {
    requests: Arc<dyn ServiceRequestRepository>,
    inventory: Arc<dyn InventoryRepository>,
    events: Arc<dyn EventPublisher>,
}

impl ApprovalService {
    pub fn new(
        requests: Arc<dyn ServiceRequestRepository>,
        inventory: Arc<dyn InventoryRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            requests,
            inventory,
            events,
        }
    }

    /// Provider approves a pending request; its inventory is held first.
    pub async fn approve(&self, id: Uuid, actor: Uuid, now: DateTime<Utc>) -> CoreResult<ServiceRequest> {
        let request = self.load(id).await?;
        if request.provider_id != actor {
            return Err(CoreError::Forbidden("only the provider can approve this request".to_string()));
        }
        let request = self.expire_if_overdue(request, RequestStatus::Approved, now).await?;
        self.commit_approval(request, actor, false, now).await
    }

    /// Approval of a self-owned request at creation. Lack of inventory leaves
    /// the request pending for a manual decision instead of failing creation.
    pub async fn auto_approve(&self, request: ServiceRequest, now: DateTime<Utc>) -> CoreResult<ServiceRequest> {
        let provider = request.provider_id;
        match self.commit_approval(request.clone(), provider, true, now).await {
            Ok(approved) => Ok(approved),
            Err(CoreError::InsufficientInventory { requested, available }) => {
                warn!(
                    "Auto-approval of request {} skipped: requested {}, available {}",
                    request.id, requested, available
                );
                Ok(request)
            }
            Err(CoreError::NotFound(what)) => {
                warn!("Auto-approval of request {} skipped: {} not found", request.id, what);
                Ok(request)
            }
            Err(err) => Err(err),
        }
    }

    /// Provider turns down a pending request.
    pub async fn reject(
        &self,
        id: Uuid,
        actor: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<ServiceRequest> {
        let request = self.load(id).await?;
        if request.provider_id != actor {
            return Err(CoreError::Forbidden("only the provider can reject this request".to_string()));
        }

        let reason = reason.map(|r| r.trim().to_string()).unwrap_or_default();
        if reason.is_empty() {
            return Err(ValidationErrors::single("reason", "The reason field is required.").into());
        }
        if reason.chars().count() > MAX_REJECTION_REASON {
            return Err(ValidationErrors::single(
                "reason",
                format!("The reason may not be greater than {} characters.", MAX_REJECTION_REASON),
            )
            .into());
        }

        let mut request = self.expire_if_overdue(request, RequestStatus::Rejected, now).await?;

        request.reject(actor, reason, now)?;
        self.requests.save_transition(&request, RequestStatus::Pending).await?;
        info!("Service request {} rejected by {}", request.id, actor);

        self.notify(&request, ServiceRequestEventKind::Rejected, Some(actor)).await;
        Ok(request)
    }

    /// Agent or provider cancels; an approved request gives its inventory back.
    pub async fn cancel(&self, id: Uuid, actor: Uuid, now: DateTime<Utc>) -> CoreResult<ServiceRequest> {
        let mut request = self.load(id).await?;
        if !request.is_party(actor) {
            return Err(CoreError::Forbidden("not a party to this request".to_string()));
        }

        let previous = request.status;
        request.cancel(actor, now)?;

        if previous == RequestStatus::Approved {
            let released = self.inventory.release_with_transition(&request, previous).await?;
            info!("Released {} allocation(s) of cancelled request {}", released.len(), request.id);
        } else {
            self.requests.save_transition(&request, previous).await?;
        }
        info!("Service request {} cancelled by {}", request.id, actor);

        self.notify(&request, ServiceRequestEventKind::Cancelled, Some(actor)).await;
        Ok(request)
    }

    /// Expires every overdue pending request; returns how many were expired.
    pub async fn expire_overdue(&self, now: DateTime<Utc>, batch_size: u32) -> CoreResult<usize> {
        let overdue = self.requests.list_overdue(now, batch_size).await?;
        let mut expired = 0;

        for mut request in overdue {
            if request.expire(now).is_err() {
                continue;
            }
            match self.requests.save_transition(&request, RequestStatus::Pending).await {
                Ok(()) => {
                    expired += 1;
                    self.notify(&request, ServiceRequestEventKind::Expired, None).await;
                }
                Err(CoreError::Conflict(_)) => {
                    debug!("Request {} changed before it could expire", request.id);
                }
                Err(err) => {
                    error!("Failed to expire request {}: {}", request.id, err);
                }
            }
        }

        if expired > 0 {
            info!("Expired {} overdue service request(s)", expired);
        }
        Ok(expired)
    }

    pub async fn allocations(&self, request_id: Uuid) -> CoreResult<Vec<Allocation>> {
        self.inventory.allocations_for(request_id).await
    }

    pub(crate) async fn notify(&self, request: &ServiceRequest, kind: ServiceRequestEventKind, actor_id: Option<Uuid>) {
        let event = ServiceRequestEvent {
            request_id: request.id,
            kind,
            agent_id: request.agent_id,
            provider_id: request.provider_id,
            status: request.status.as_str().to_string(),
            requested_quantity: request.requested_quantity,
            actor_id,
            timestamp: Utc::now().timestamp(),
        };

        if let Err(err) = self.events.publish(&event).await {
            warn!("Failed to publish {} for request {}: {}", kind.as_str(), request.id, err);
        }
    }

    async fn load(&self, id: Uuid) -> CoreResult<ServiceRequest> {
        self.requests
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Service request {}", id)))
    }

    /// A pending request past its deadline is expired on the spot; deciding on
    /// it is then an invalid transition.
    async fn expire_if_overdue(
        &self,
        mut request: ServiceRequest,
        attempted: RequestStatus,
        now: DateTime<Utc>,
    ) -> CoreResult<ServiceRequest> {
        if !request.is_overdue(now) {
            return Ok(request);
        }

        request.expire(now)?;
        match self.requests.save_transition(&request, RequestStatus::Pending).await {
            Ok(()) => self.notify(&request, ServiceRequestEventKind::Expired, None).await,
            Err(CoreError::Conflict(_)) => {}
            Err(err) => return Err(err),
        }

        Err(CoreError::InvalidTransition {
            from: RequestStatus::Expired.as_str().to_string(),
            to: attempted.as_str().to_string(),
        })
    }

    async fn commit_approval(
        &self,
        request: ServiceRequest,
        actor: Uuid,
        auto: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<ServiceRequest> {
        let mut approved = request;
        if auto {
            approved.auto_approve(now)?;
        } else {
            approved.approve(actor, now)?;
        }

        let holds = self.plan_holds(&approved).await?;
        let allocations = self.inventory.hold(approved.id, &holds).await?;

        if let Err(err) = self.requests.save_transition(&approved, RequestStatus::Pending).await {
            // Lost the race for the status; give the inventory back.
            if let Err(release_err) = self.inventory.release(approved.id).await {
                error!("Failed to release inventory of request {}: {}", approved.id, release_err);
            }
            return Err(err);
        }

        info!(
            "Service request {} approved by {} ({} allocation(s){})",
            approved.id,
            actor,
            allocations.len(),
            if auto { ", auto" } else { "" }
        );

        let kind = if auto {
            ServiceRequestEventKind::AutoApproved
        } else {
            ServiceRequestEventKind::Approved
        };
        self.notify(&approved, kind, Some(actor)).await;
        Ok(approved)
    }

    /// Which units to hold: hotels take rooms largest-first, flights and
    /// transport draw from their single pool.
    async fn plan_holds(&self, request: &ServiceRequest) -> CoreResult<Vec<Hold>> {
        let range = request.range();
        let units = self
            .inventory
            .availability(request.entity_id, range)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Inventory of {} {}", request.provider_type, request.entity_id))
            })?;

        match request.provider_type {
            ProviderType::Hotel => {
                let rooms = RoomInventory::from_availability(&units);
                let selection = select_rooms(request.requested_quantity, &rooms)?;
                Ok(selection
                    .into_iter()
                    .map(|tier| Hold {
                        entity_id: request.entity_id,
                        unit: InventoryUnit::Room { occupancy: tier.occupancy },
                        quantity: tier.rooms,
                        range,
                    })
                    .collect())
            }
            ProviderType::Flight | ProviderType::Transport => {
                let available = units
                    .iter()
                    .find(|u| u.unit == InventoryUnit::Pool)
                    .map(|u| u.available)
                    .unwrap_or(0);
                if available < request.requested_quantity {
                    return Err(CoreError::InsufficientInventory {
                        requested: request.requested_quantity,
                        available,
                    });
                }
                Ok(vec![Hold {
                    entity_id: request.entity_id,
                    unit: InventoryUnit::Pool,
                    quantity: request.requested_quantity,
                    range,
                }])
            }
        }
    }
}
