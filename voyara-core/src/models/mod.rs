pub mod ad;
pub mod entity;
pub mod inventory;
pub mod request;

pub use ad::{Ad, AdInteraction};
pub use entity::{DateRange, ProviderType, ServiceEntity};
pub use inventory::{Allocation, Hold, InventoryUnit, UnitAvailability};
pub use request::{NewServiceRequest, RequestMetadata, RequestStatus, ServiceRequest};
