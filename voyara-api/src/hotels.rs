use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use uuid::Uuid;
use voyara_request::RoomQuoteInput;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::response::{ok, AppJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/hotels/{id}/room-allocation", post(quote_room_allocation))
}

/// Rooms a group of guests needs at this hotel for the given stay.
async fn quote_room_allocation(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(hotel_id): Path<Uuid>,
    AppJson(input): AppJson<RoomQuoteInput>,
) -> Result<impl IntoResponse, AppError> {
    let (guests, range) = input.validate()?;
    let quote = state.quantity.quote_rooms(hotel_id, guests, range).await?;
    Ok(ok(quote))
}
