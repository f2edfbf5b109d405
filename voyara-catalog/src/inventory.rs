use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use voyara_core::{Allocation, CoreError, DateRange, Hold, InventoryUnit, UnitAvailability};

/// In-memory inventory ledger: unit capacities plus the holds of approved
/// requests. Availability is capacity minus every hold overlapping the range.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    capacity: HashMap<Uuid, BTreeMap<InventoryUnit, u32>>,
    allocations: HashMap<Uuid, Vec<Allocation>>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the total number of units an entity owns
    pub fn set_capacity(&mut self, entity_id: Uuid, unit: InventoryUnit, total: u32) {
        self.capacity.entry(entity_id).or_default().insert(unit, total);
    }

    pub fn availability(&self, entity_id: Uuid, range: DateRange) -> Option<Vec<UnitAvailability>> {
        let units = self.capacity.get(&entity_id)?;
        Some(
            units
                .keys()
                .map(|unit| UnitAvailability {
                    unit: *unit,
                    available: self.available(entity_id, *unit, range),
                })
                .collect(),
        )
    }

    fn available(&self, entity_id: Uuid, unit: InventoryUnit, range: DateRange) -> u32 {
        let total = self
            .capacity
            .get(&entity_id)
            .and_then(|units| units.get(&unit))
            .copied()
            .unwrap_or(0);

        let held: u32 = self
            .allocations
            .values()
            .flatten()
            .filter(|a| a.entity_id == entity_id && a.unit == unit && a.range().overlaps(&range))
            .map(|a| a.quantity)
            .sum();

        total.saturating_sub(held)
    }

    /// Hold every line for `request_id` or nothing at all
    pub fn reserve(
        &mut self,
        request_id: Uuid,
        holds: &[Hold],
        now: DateTime<Utc>,
    ) -> Result<Vec<Allocation>, InventoryError> {
        if self.allocations.get(&request_id).is_some_and(|held| !held.is_empty()) {
            return Err(InventoryError::AlreadyHeld(request_id));
        }

        let mut demand: BTreeMap<(Uuid, InventoryUnit), (u32, DateRange)> = BTreeMap::new();
        for hold in holds {
            let entry = demand
                .entry((hold.entity_id, hold.unit))
                .or_insert((0, hold.range));
            entry.0 += hold.quantity;
        }

        for ((entity_id, unit), (quantity, range)) in &demand {
            let known = self
                .capacity
                .get(entity_id)
                .is_some_and(|units| units.contains_key(unit));
            if !known {
                return Err(InventoryError::NotFound(entity_id.to_string()));
            }

            let available = self.available(*entity_id, *unit, *range);
            if available < *quantity {
                return Err(InventoryError::InsufficientInventory {
                    requested: *quantity,
                    available,
                });
            }
        }

        let allocations: Vec<Allocation> = holds
            .iter()
            .filter(|hold| hold.quantity > 0)
            .map(|hold| Allocation::from_hold(request_id, hold, now))
            .collect();
        self.allocations.insert(request_id, allocations.clone());

        Ok(allocations)
    }

    /// Release the holds of a request (cancelled after approval)
    pub fn release(&mut self, request_id: Uuid) -> Vec<Allocation> {
        self.allocations.remove(&request_id).unwrap_or_default()
    }

    pub fn allocations_for(&self, request_id: Uuid) -> Vec<Allocation> {
        self.allocations.get(&request_id).cloned().unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Inventory not found: {0}")]
    NotFound(String),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    #[error("Inventory already held for request {0}")]
    AlreadyHeld(Uuid),
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(id) => CoreError::NotFound(format!("Inventory for {}", id)),
            InventoryError::InsufficientInventory { requested, available } => {
                CoreError::InsufficientInventory { requested, available }
            }
            InventoryError::AlreadyHeld(id) => {
                CoreError::Conflict(format!("inventory already held for request {}", id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2026, 12, start).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, end).unwrap(),
        )
    }

    fn room(occupancy: u32) -> InventoryUnit {
        InventoryUnit::Room { occupancy }
    }

    #[test]
    fn test_hold_lifecycle() {
        let mut ledger = InventoryLedger::new();
        let hotel = Uuid::new_v4();
        ledger.set_capacity(hotel, room(4), 2);
        ledger.set_capacity(hotel, room(2), 5);

        let request = Uuid::new_v4();
        let holds = [
            Hold { entity_id: hotel, unit: room(4), quantity: 2, range: range(1, 4) },
            Hold { entity_id: hotel, unit: room(2), quantity: 1, range: range(1, 4) },
        ];
        let allocations = ledger.reserve(request, &holds, Utc::now()).unwrap();
        assert_eq!(allocations.len(), 2);

        // Overlapping stay sees the held rooms as gone
        let during = ledger.availability(hotel, range(3, 5)).unwrap();
        assert!(during.contains(&UnitAvailability { unit: room(4), available: 0 }));
        assert!(during.contains(&UnitAvailability { unit: room(2), available: 4 }));

        // Checkout day is free again
        let after = ledger.availability(hotel, range(4, 6)).unwrap();
        assert!(after.contains(&UnitAvailability { unit: room(4), available: 2 }));

        // Release
        assert_eq!(ledger.release(request).len(), 2);
        assert!(ledger.allocations_for(request).is_empty());
        let freed = ledger.availability(hotel, range(1, 4)).unwrap();
        assert!(freed.contains(&UnitAvailability { unit: room(4), available: 2 }));
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let mut ledger = InventoryLedger::new();
        let flight = Uuid::new_v4();
        ledger.set_capacity(flight, InventoryUnit::Pool, 3);

        let too_many = [Hold { entity_id: flight, unit: InventoryUnit::Pool, quantity: 4, range: range(2, 2) }];
        let result = ledger.reserve(Uuid::new_v4(), &too_many, Utc::now());
        assert!(matches!(
            result,
            Err(InventoryError::InsufficientInventory { requested: 4, available: 3 })
        ));
        assert_eq!(ledger.availability(flight, range(2, 2)).unwrap()[0].available, 3);
    }

    #[test]
    fn test_unknown_entity_and_double_hold() {
        let mut ledger = InventoryLedger::new();
        assert!(ledger.availability(Uuid::new_v4(), range(1, 2)).is_none());

        let transport = Uuid::new_v4();
        ledger.set_capacity(transport, InventoryUnit::Pool, 2);
        let request = Uuid::new_v4();
        let hold = [Hold { entity_id: transport, unit: InventoryUnit::Pool, quantity: 1, range: range(5, 6) }];
        ledger.reserve(request, &hold, Utc::now()).unwrap();
        assert!(matches!(
            ledger.reserve(request, &hold, Utc::now()),
            Err(InventoryError::AlreadyHeld(_))
        ));

        let missing = [Hold { entity_id: Uuid::new_v4(), unit: InventoryUnit::Pool, quantity: 1, range: range(5, 6) }];
        assert!(matches!(
            ledger.reserve(Uuid::new_v4(), &missing, Utc::now()),
            Err(InventoryError::NotFound(_))
        ));
    }
}
