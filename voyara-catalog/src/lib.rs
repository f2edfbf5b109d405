pub mod allocation;
pub mod inventory;
pub mod rooms;

pub use allocation::{
    optimize_room_allocation, plan_room_allocation, select_rooms, AllocationPlan, TierAssignment,
    DEFAULT_ROOM_OCCUPANCY,
};
pub use inventory::{InventoryError, InventoryLedger};
pub use rooms::RoomInventory;
