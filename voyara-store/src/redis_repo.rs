use async_trait::async_trait;
use redis::RedisResult;
use tracing::warn;
use voyara_core::limits::RateLimiter;
use voyara_core::{CoreError, CoreResult};

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed window: the first hit starts the TTL, later hits only count.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .cmd("EXPIRE")
            .arg(key)
            .arg(window_seconds)
            .arg("NX")
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[async_trait]
impl RateLimiter for RedisClient {
    async fn check(&self, key: &str, limit: u32, window_seconds: u64) -> CoreResult<bool> {
        let key = format!("rate_limit:{}", key);
        self.check_rate_limit(&key, i64::from(limit), window_seconds as i64)
            .await
            .map_err(|e| {
                warn!("Rate limit check failed for {}: {}", key, e);
                CoreError::Storage(e.to_string())
            })
    }
}
