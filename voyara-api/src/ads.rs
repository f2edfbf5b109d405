use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voyara_core::{AdInteraction, ValidationErrors};

use crate::error::AppError;
use crate::middleware::{click_rate_limit, impression_rate_limit};
use crate::response::ok;
use crate::state::AppState;

const DEFAULT_AD_LIMIT: u32 = 5;
const MAX_AD_LIMIT: u32 = 20;

/// Public storefront routes; tracking endpoints are throttled per client IP.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/ads", get(serve_ads))
        .route(
            "/v1/ads/{id}/impression",
            post(track_impression).route_layer(from_fn_with_state(state.clone(), impression_rate_limit)),
        )
        .route(
            "/v1/ads/{id}/click",
            post(track_click).route_layer(from_fn_with_state(state, click_rate_limit)),
        )
}

#[derive(Debug, Deserialize)]
struct AdQuery {
    placement: Option<String>,
    limit: Option<u32>,
}

async fn serve_ads(
    State(state): State<AppState>,
    Query(query): Query<AdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let placement = query
        .placement
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::ValidationError(ValidationErrors::single("placement", "The placement field is required."))
        })?;
    let limit = query.limit.unwrap_or(DEFAULT_AD_LIMIT).clamp(1, MAX_AD_LIMIT);

    let ads = state.ads.active_ads(placement, limit).await?;
    Ok(ok(ads))
}

#[derive(Debug, Serialize)]
struct TrackedCounts {
    id: Uuid,
    impressions: i64,
    clicks: i64,
}

async fn track(state: &AppState, id: Uuid, interaction: AdInteraction) -> Result<TrackedCounts, AppError> {
    let ad = state.ads.record(id, interaction).await?;
    tracing::debug!("Tracked {} on ad {}", interaction.as_str(), id);
    Ok(TrackedCounts {
        id: ad.id,
        impressions: ad.impressions,
        clicks: ad.clicks,
    })
}

async fn track_impression(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(track(&state, id, AdInteraction::Impression).await?))
}

async fn track_click(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(track(&state, id, AdInteraction::Click).await?))
}
