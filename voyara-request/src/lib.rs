pub mod approval;
pub mod intake;
pub mod orchestrator;
pub mod ownership;
pub mod quantity;
pub mod sweeper;

pub use approval::ApprovalService;
pub use intake::{NormalizedRequest, RequestIntake, RoomQuoteInput, ServiceRequestInput};
pub use orchestrator::{ListScope, RequestDetail, RequestOrchestrator};
pub use ownership::{is_self_owned, OwnershipCheck};
pub use quantity::{QuantityResolver, RoomQuote};
pub use sweeper::{start_expiry_sweeper, sweep_once};
