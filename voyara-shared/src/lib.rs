pub mod models;
pub mod pii;

pub use models::events::{ServiceRequestEvent, ServiceRequestEventKind};
pub use pii::MaskedEmail;
