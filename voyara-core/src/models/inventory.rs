use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::DateRange;

/// Unit in which an entity's inventory is counted.
///
/// Hotels keep one counter per room occupancy tier; flights and transport keep
/// a single pool (seats, vehicles).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InventoryUnit {
    Pool,
    Room { occupancy: u32 },
}

impl InventoryUnit {
    pub fn occupancy(&self) -> Option<u32> {
        match self {
            Self::Room { occupancy } => Some(*occupancy),
            Self::Pool => None,
        }
    }

    pub fn from_occupancy(occupancy: Option<u32>) -> Self {
        match occupancy {
            Some(occupancy) => Self::Room { occupancy },
            None => Self::Pool,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitAvailability {
    pub unit: InventoryUnit,
    pub available: u32,
}

/// Inventory about to be held for a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hold {
    pub entity_id: Uuid,
    pub unit: InventoryUnit,
    pub quantity: u32,
    pub range: DateRange,
}

/// Inventory held by an approved request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    pub id: Uuid,
    pub request_id: Uuid,
    pub entity_id: Uuid,
    pub unit: InventoryUnit,
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Allocation {
    pub fn from_hold(request_id: Uuid, hold: &Hold, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            entity_id: hold.entity_id,
            unit: hold.unit,
            quantity: hold.quantity,
            start_date: hold.range.start,
            end_date: hold.range.end,
            created_at: now,
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}
