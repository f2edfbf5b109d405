use serde::Serialize;

use crate::inventory::InventoryError;
use crate::rooms::RoomInventory;

/// Guests per room assumed when a hotel has no usable room inventory.
pub const DEFAULT_ROOM_OCCUPANCY: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierAssignment {
    pub occupancy: u32,
    pub rooms: u32,
}

/// Greedy room plan for a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    pub participants: u32,
    pub assignments: Vec<TierAssignment>,
    /// Rooms beyond what the inventory holds, sized at `overflow_occupancy`.
    pub overflow_rooms: u32,
    pub overflow_occupancy: Option<u32>,
    /// No tier had a free room; the plan is the per-room heuristic.
    pub used_default: bool,
}

impl AllocationPlan {
    pub fn total_rooms(&self) -> u32 {
        let assigned: u32 = self.assignments.iter().map(|a| a.rooms).sum();
        (assigned + self.overflow_rooms).max(1)
    }

    pub fn seats(&self) -> u32 {
        let assigned: u32 = self.assignments.iter().map(|a| a.rooms * a.occupancy).sum();
        assigned + self.overflow_rooms * self.overflow_occupancy.unwrap_or(0)
    }
}

fn div_ceil(value: u32, divisor: u32) -> u32 {
    value.div_ceil(divisor.max(1))
}

/// Plans rooms for `participants`, filling the largest tiers first and never
/// taking more rooms of a tier than the remaining group needs.
///
/// Guests left over once every tier is used are counted in rooms of the
/// smallest available occupancy, so the plan may exceed inventory. With no
/// free rooms at all the plan falls back to `default_occupancy` guests per room.
pub fn plan_room_allocation(
    participants: u32,
    rooms: &RoomInventory,
    default_occupancy: u32,
) -> AllocationPlan {
    let Some(smallest) = rooms.smallest_occupancy() else {
        let occupancy = default_occupancy.max(1);
        return AllocationPlan {
            participants,
            assignments: Vec::new(),
            overflow_rooms: div_ceil(participants, occupancy).max(1),
            overflow_occupancy: Some(occupancy),
            used_default: true,
        };
    };

    let mut remaining = participants;
    let mut assignments = Vec::new();

    for (occupancy, available) in rooms.tiers_desc() {
        if remaining == 0 {
            break;
        }
        let used = available.min(div_ceil(remaining, occupancy));
        remaining = remaining.saturating_sub(used.saturating_mul(occupancy));
        assignments.push(TierAssignment { occupancy, rooms: used });
    }

    let overflow_rooms = div_ceil(remaining, smallest);

    AllocationPlan {
        participants,
        assignments,
        overflow_rooms,
        overflow_occupancy: (overflow_rooms > 0).then_some(smallest),
        used_default: false,
    }
}

/// Minimum number of rooms (at least one) that seats `participants`.
pub fn optimize_room_allocation(participants: u32, rooms: &RoomInventory) -> u32 {
    plan_room_allocation(participants, rooms, DEFAULT_ROOM_OCCUPANCY).total_rooms()
}

/// Picks `rooms_needed` free rooms, largest occupancy first.
pub fn select_rooms(
    rooms_needed: u32,
    rooms: &RoomInventory,
) -> Result<Vec<TierAssignment>, InventoryError> {
    let mut remaining = rooms_needed;
    let mut selection = Vec::new();

    for (occupancy, available) in rooms.tiers_desc() {
        if remaining == 0 {
            break;
        }
        let taken = available.min(remaining);
        remaining -= taken;
        selection.push(TierAssignment { occupancy, rooms: taken });
    }

    if remaining > 0 {
        return Err(InventoryError::InsufficientInventory {
            requested: rooms_needed,
            available: rooms_needed - remaining,
        });
    }

    Ok(selection)
}
