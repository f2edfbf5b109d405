use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use voyara_core::{InventoryUnit, UnitAvailability};

/// Free rooms of a hotel grouped by maximum occupancy (occupancy → count).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInventory(BTreeMap<u32, u32>);

impl RoomInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, occupancy: u32, count: u32) -> Self {
        self.add(occupancy, count);
        self
    }

    /// Zero-occupancy tiers cannot seat anyone and are dropped.
    pub fn add(&mut self, occupancy: u32, count: u32) {
        if occupancy == 0 {
            return;
        }
        *self.0.entry(occupancy).or_default() += count;
    }

    /// Keeps only room units; pool units belong to flights and transport.
    pub fn from_availability(units: &[UnitAvailability]) -> Self {
        units
            .iter()
            .filter_map(|u| match u.unit {
                InventoryUnit::Room { occupancy } => Some((occupancy, u.available)),
                InventoryUnit::Pool => None,
            })
            .collect()
    }

    /// Tiers with at least one free room, largest occupancy first.
    pub fn tiers_desc(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0
            .iter()
            .rev()
            .filter(|(_, count)| **count > 0)
            .map(|(occupancy, count)| (*occupancy, *count))
    }

    pub fn total_rooms(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn smallest_occupancy(&self) -> Option<u32> {
        self.tiers_desc().last().map(|(occupancy, _)| occupancy)
    }
}

impl FromIterator<(u32, u32)> for RoomInventory {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        let mut rooms = Self::new();
        for (occupancy, count) in iter {
            rooms.add(occupancy, count);
        }
        rooms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_skip_empty_and_zero_occupancy() {
        let rooms: RoomInventory = [(2, 5), (4, 0), (0, 9), (3, 1)].into_iter().collect();
        let tiers: Vec<_> = rooms.tiers_desc().collect();
        assert_eq!(tiers, vec![(3, 1), (2, 5)]);
        assert_eq!(rooms.smallest_occupancy(), Some(2));
        assert_eq!(rooms.total_rooms(), 6);
    }

    #[test]
    fn test_from_availability_ignores_pools() {
        let units = [
            UnitAvailability { unit: InventoryUnit::Room { occupancy: 4 }, available: 2 },
            UnitAvailability { unit: InventoryUnit::Pool, available: 100 },
        ];
        let rooms = RoomInventory::from_availability(&units);
        assert_eq!(rooms, RoomInventory::new().with_tier(4, 2));
    }
}
