use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod ads;
pub mod auth;
pub mod error;
pub mod events;
pub mod hotels;
pub mod middleware;
pub mod response;
pub mod service_requests;
pub mod state;

pub use state::{AppState, AuthConfig, Repositories, Settings};

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/health", get(health))
        .merge(service_requests::routes())
        .merge(hotels::routes())
        .merge(ads::routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(state.clone(), expose_error_detail))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// With `app.debug` on, 500 bodies carry the underlying error.
async fn expose_error_detail(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if !state.settings.debug {
        return response;
    }

    let Some(detail) = response.extensions().get::<error::ErrorDetail>().cloned() else {
        return response;
    };
    let body = Json(json!({
        "success": false,
        "message": "Server Error",
        "debug": detail.0,
    }));
    (response.status(), body).into_response()
}
