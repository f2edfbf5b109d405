use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use voyara_core::{CoreError, ValidationErrors};

pub const VALIDATION_MESSAGE: &str = "The given data was invalid.";

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    BadRequest(String),
    ValidationError(ValidationErrors),
    NotFoundError(String),
    ConflictError(String),
    RateLimited,
    InternalServerError(String),
}

/// Detail of a 500, attached to the response so the debug layer can expose it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::ValidationError(errors) => {
                let body = Json(json!({
                    "success": false,
                    "message": VALIDATION_MESSAGE,
                    "errors": errors,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Too many requests.".to_string(), None),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string(), Some(msg))
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        let mut response = (status, body).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(errors) => AppError::ValidationError(errors),
            CoreError::NotFound(what) => AppError::NotFoundError(format!("{} not found", what)),
            CoreError::Forbidden(msg) => AppError::AuthorizationError(msg),
            err @ (CoreError::InvalidTransition { .. }
            | CoreError::InsufficientInventory { .. }
            | CoreError::Conflict(_)) => AppError::ConflictError(err.to_string()),
            CoreError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON of the wrong shape is a validation failure
            JsonRejection::JsonDataError(err) => {
                tracing::debug!("Rejected request body: {}", err.body_text());
                AppError::ValidationError(ValidationErrors::single(
                    "body",
                    "The request body must be a JSON object.",
                ))
            }
            other => AppError::BadRequest(other.body_text()),
        }
    }
}
