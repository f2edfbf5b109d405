pub mod ad_repo;
pub mod app_config;
pub mod database;
pub mod directory_repo;
pub mod events;
pub mod inventory_repo;
pub mod memory;
pub mod redis_repo;
pub mod request_repo;

pub use ad_repo::PgAdRepository;
pub use database::DbClient;
pub use directory_repo::PgDirectory;
pub use events::EventProducer;
pub use inventory_repo::PgInventoryRepository;
pub use memory::{MemoryRateLimiter, MemoryStore};
pub use redis_repo::RedisClient;
pub use request_repo::PgServiceRequestRepository;

use voyara_core::CoreError;

pub(crate) fn storage_error(err: sqlx::Error) -> CoreError {
    CoreError::Storage(err.to_string())
}
