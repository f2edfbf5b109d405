use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceRequestEventKind {
    Created,
    AutoApproved,
    Approved,
    Rejected,
    Cancelled,
    Expired,
}

impl ServiceRequestEventKind {
    /// Event name used on the SSE stream and as the Kafka record header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "service_request.created",
            Self::AutoApproved => "service_request.auto_approved",
            Self::Approved => "service_request.approved",
            Self::Rejected => "service_request.rejected",
            Self::Cancelled => "service_request.cancelled",
            Self::Expired => "service_request.expired",
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ServiceRequestEvent {
    pub request_id: Uuid,
    pub kind: ServiceRequestEventKind,
    pub agent_id: Uuid,
    pub provider_id: Uuid,
    pub status: String,
    pub requested_quantity: u32,
    /// `None` for system-driven changes (expiry).
    pub actor_id: Option<Uuid>,
    pub timestamp: i64,
}

impl ServiceRequestEvent {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.agent_id == user_id || self.provider_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_visibility() {
        let agent = Uuid::new_v4();
        let provider = Uuid::new_v4();
        let event = ServiceRequestEvent {
            request_id: Uuid::new_v4(),
            kind: ServiceRequestEventKind::Created,
            agent_id: agent,
            provider_id: provider,
            status: "pending".to_string(),
            requested_quantity: 2,
            actor_id: Some(agent),
            timestamp: 0,
        };

        assert!(event.involves(agent));
        assert!(event.involves(provider));
        assert!(!event.involves(Uuid::new_v4()));
    }

    #[test]
    fn test_kind_wire_format() {
        let json = serde_json::to_string(&ServiceRequestEventKind::AutoApproved).unwrap();
        assert_eq!(json, "\"AUTO_APPROVED\"");
    }
}
