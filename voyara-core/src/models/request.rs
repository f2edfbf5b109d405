use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use voyara_shared::MaskedEmail;

use super::entity::{DateRange, ProviderType};
use crate::{CoreError, CoreResult};

/// Service request status in the approval lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Expired | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Approved, Cancelled)
        )
    }

    pub fn ensure_transition(&self, next: RequestStatus) -> CoreResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestMetadata {
    pub guest_count: Option<u32>,
    pub special_requirements: Option<String>,
    pub contact_email: Option<MaskedEmail>,
}

/// Normalized input for a new request, before it gets an id and a status.
#[derive(Debug, Clone)]
pub struct NewServiceRequest {
    pub agent_id: Uuid,
    pub provider_id: Uuid,
    pub provider_type: ProviderType,
    pub entity_id: Uuid,
    pub package_id: Option<Uuid>,
    pub requested_quantity: u32,
    pub range: DateRange,
    pub metadata: RequestMetadata,
}

/// An agent's ask for a provider's rooms, seats or vehicles over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub provider_id: Uuid,
    pub provider_type: ProviderType,
    pub entity_id: Uuid,
    pub package_id: Option<Uuid>,
    pub status: RequestStatus,
    pub requested_quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metadata: RequestMetadata,
    pub auto_approved: bool,
    pub expires_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn new(draft: NewServiceRequest, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: draft.agent_id,
            provider_id: draft.provider_id,
            provider_type: draft.provider_type,
            entity_id: draft.entity_id,
            package_id: draft.package_id,
            status: RequestStatus::Pending,
            requested_quantity: draft.requested_quantity,
            start_date: draft.range.start,
            end_date: draft.range.end,
            metadata: draft.metadata,
            auto_approved: false,
            expires_at: now + ttl,
            decided_at: None,
            decided_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.agent_id == user_id || self.provider_id == user_id
    }

    /// Pending past its deadline; the sweeper has simply not reached it yet.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::Pending && now >= self.expires_at
    }

    /// Transition: Pending → Approved
    pub fn approve(&mut self, actor: Uuid, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(RequestStatus::Approved, now)?;
        self.decided_by = Some(actor);
        Ok(())
    }

    /// Approval on behalf of the provider when the agent owns the inventory.
    pub fn auto_approve(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.approve(self.provider_id, now)?;
        self.auto_approved = true;
        Ok(())
    }

    /// Transition: Pending → Rejected
    pub fn reject(&mut self, actor: Uuid, reason: String, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(RequestStatus::Rejected, now)?;
        self.decided_by = Some(actor);
        self.rejection_reason = Some(reason);
        Ok(())
    }

    /// Transition: Pending | Approved → Cancelled
    pub fn cancel(&mut self, actor: Uuid, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(RequestStatus::Cancelled, now)?;
        self.decided_by = Some(actor);
        Ok(())
    }

    /// Transition: Pending → Expired
    pub fn expire(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(RequestStatus::Expired, now)
    }

    fn transition(&mut self, next: RequestStatus, now: DateTime<Utc>) -> CoreResult<()> {
        self.status.ensure_transition(next)?;
        self.status = next;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
