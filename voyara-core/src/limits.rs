use async_trait::async_trait;

use crate::CoreResult;

/// Fixed-window request counter.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one hit against `key` and reports whether it is within `limit`
    /// for the current window.
    async fn check(&self, key: &str, limit: u32, window_seconds: u64) -> CoreResult<bool>;
}
