use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

const WINDOW_SECONDS: u64 = 60;

/// Per-IP budget of an ad tracking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPolicy {
    Impressions,
    Clicks,
}

impl RateLimitPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Impressions => "impression",
            Self::Clicks => "click",
        }
    }

    pub fn limit(&self, state: &AppState) -> u32 {
        match self {
            Self::Impressions => state.settings.rate_limits.impressions_per_minute,
            Self::Clicks => state.settings.rate_limits.clicks_per_minute,
        }
    }
}

/// Peer address when served with connect info, else the first
/// `X-Forwarded-For` hop.
pub fn client_ip(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(policy: RateLimitPolicy, state: AppState, req: Request, next: Next) -> Response {
    let key = format!("ads:{}:{}", policy.name(), client_ip(&req));

    match state.limiter.check(&key, policy.limit(&state), WINDOW_SECONDS).await {
        Ok(true) => next.run(req).await,
        Ok(false) => AppError::RateLimited.into_response(),
        Err(e) => {
            // Fail open
            warn!("Rate limiter unavailable for {}: {}", key, e);
            next.run(req).await
        }
    }
}

pub async fn impression_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(RateLimitPolicy::Impressions, state, req, next).await
}

pub async fn click_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(RateLimitPolicy::Clicks, state, req, next).await
}
