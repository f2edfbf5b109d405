use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use voyara_catalog::{plan_room_allocation, AllocationPlan, RoomInventory};
use voyara_core::repository::InventoryRepository;
use voyara_core::{CoreResult, DateRange, ProviderType};

use crate::intake::NormalizedRequest;

#[derive(Debug, Clone, Serialize)]
pub struct RoomQuote {
    pub hotel_id: Uuid,
    pub guests: u32,
    pub rooms: u32,
    pub hotel_found: bool,
    pub plan: AllocationPlan,
}

/// Turns a guest count into a unit count when the agent gave none.
pub struct QuantityResolver {
    inventory: Arc<dyn InventoryRepository>,
    default_occupancy: u32,
}

impl QuantityResolver {
    pub fn new(inventory: Arc<dyn InventoryRepository>, default_occupancy: u32) -> Self {
        Self {
            inventory,
            default_occupancy: default_occupancy.max(1),
        }
    }

    pub async fn resolve(&self, request: &NormalizedRequest) -> CoreResult<u32> {
        if let Some(quantity) = request.requested_quantity {
            return Ok(quantity);
        }

        let guests = request.metadata.guest_count.unwrap_or(1).max(1);
        match request.entity.provider_type {
            ProviderType::Hotel => Ok(self.quote_rooms(request.entity.id, guests, request.range).await?.rooms),
            // One seat per traveller
            ProviderType::Flight => Ok(guests),
            ProviderType::Transport => Ok(1),
        }
    }

    /// Rooms needed for `guests` given what the hotel has free over `range`.
    pub async fn quote_rooms(&self, hotel_id: Uuid, guests: u32, range: DateRange) -> CoreResult<RoomQuote> {
        let availability = self.inventory.availability(hotel_id, range).await?;
        let hotel_found = availability.is_some();
        let rooms = availability
            .map(|units| RoomInventory::from_availability(&units))
            .unwrap_or_default();

        let plan = plan_room_allocation(guests, &rooms, self.default_occupancy);
        if plan.used_default {
            debug!(
                "No free rooms on record for hotel {}, assuming {} guests per room",
                hotel_id, self.default_occupancy
            );
        }

        Ok(RoomQuote {
            hotel_id,
            guests,
            rooms: plan.total_rooms(),
            hotel_found,
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use voyara_core::{InventoryUnit, RequestMetadata, ServiceEntity};
    use voyara_store::MemoryStore;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
        )
    }

    fn request(provider_type: ProviderType, entity_id: Uuid, quantity: Option<u32>, guests: Option<u32>) -> NormalizedRequest {
        NormalizedRequest {
            agent_id: Uuid::new_v4(),
            entity: ServiceEntity {
                id: entity_id,
                provider_type,
                provider_id: Uuid::new_v4(),
                name: "entity".to_string(),
            },
            package_id: None,
            range: range(),
            requested_quantity: quantity,
            metadata: RequestMetadata {
                guest_count: guests,
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_hotel_rooms_from_tiers() {
        let store = Arc::new(MemoryStore::new());
        let hotel = Uuid::new_v4();
        store.set_capacity(hotel, InventoryUnit::Room { occupancy: 4 }, 2).await;
        store.set_capacity(hotel, InventoryUnit::Room { occupancy: 2 }, 5).await;
        let resolver = QuantityResolver::new(store, 3);

        let quantity = resolver.resolve(&request(ProviderType::Hotel, hotel, None, Some(10))).await.unwrap();
        assert_eq!(quantity, 3);
    }

    #[tokio::test]
    async fn test_unknown_hotel_uses_default() {
        let resolver = QuantityResolver::new(Arc::new(MemoryStore::new()), 3);
        let quote = resolver.quote_rooms(Uuid::new_v4(), 7, range()).await.unwrap();
        assert!(!quote.hotel_found);
        assert!(quote.plan.used_default);
        assert_eq!(quote.rooms, 3);
    }

    #[tokio::test]
    async fn test_explicit_quantity_and_other_types() {
        let resolver = QuantityResolver::new(Arc::new(MemoryStore::new()), 3);
        let id = Uuid::new_v4();

        assert_eq!(resolver.resolve(&request(ProviderType::Hotel, id, Some(5), Some(2))).await.unwrap(), 5);
        assert_eq!(resolver.resolve(&request(ProviderType::Flight, id, None, Some(6))).await.unwrap(), 6);
        assert_eq!(resolver.resolve(&request(ProviderType::Transport, id, None, Some(6))).await.unwrap(), 1);
    }
}
