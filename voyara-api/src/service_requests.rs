use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use voyara_core::{RequestStatus, ValidationErrors};
use voyara_request::{ListScope, ServiceRequestInput};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::events;
use crate::response::{ok, ok_with_message, AppJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/service-requests", post(create_request).get(list_requests))
        .route("/v1/service-requests/events", get(events::stream_events))
        .route("/v1/service-requests/{id}", get(show_request))
        .route("/v1/service-requests/{id}/approve", post(approve_request))
        .route("/v1/service-requests/{id}/reject", post(reject_request))
        .route("/v1/service-requests/{id}/cancel", post(cancel_request))
}

async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<ServiceRequestInput>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.orchestrator.create(user.id, input, Utc::now()).await?;

    let message = if request.auto_approved {
        "Service request created and auto-approved."
    } else {
        "Service request created successfully."
    };
    Ok((StatusCode::CREATED, ok_with_message(request, message)))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(rename = "as", default)]
    scope: ListScope,
    status: Option<String>,
}

async fn list_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => Some(raw.parse::<RequestStatus>().map_err(|_| {
            AppError::ValidationError(ValidationErrors::single("status", "The selected status is invalid."))
        })?),
    };

    let requests = state.orchestrator.list(user.id, query.scope, status).await?;
    Ok(ok(requests))
}

async fn show_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.orchestrator.detail(id, user.id).await?;
    Ok(ok(detail))
}

async fn approve_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.approval.approve(id, user.id, Utc::now()).await?;
    Ok(ok_with_message(request, "Service request approved."))
}

#[derive(Debug, Default, Deserialize)]
struct RejectBody {
    reason: Option<String>,
}

async fn reject_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<RejectBody>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.approval.reject(id, user.id, body.reason, Utc::now()).await?;
    Ok(ok_with_message(request, "Service request rejected."))
}

async fn cancel_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.approval.cancel(id, user.id, Utc::now()).await?;
    Ok(ok_with_message(request, "Service request cancelled."))
}
