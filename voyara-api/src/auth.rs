use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The caller behind a valid bearer token. Tokens are issued by the accounts
/// service; `sub` carries the user id.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::AuthenticationError("Unauthenticated.".to_string()))?;

        let user_id = verify_token(&state.settings.auth.secret, bearer.token())?;
        Ok(AuthUser { id: user_id })
    }
}

pub fn verify_token(secret: &str, token: &str) -> Result<Uuid, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::AuthenticationError("Unauthenticated.".to_string())
    })?;

    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::AuthenticationError("Unauthenticated.".to_string()))
}

pub fn issue_token(secret: &str, user_id: Uuid, ttl_seconds: i64) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + ttl_seconds).max(0) as usize,
    };

    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip_and_rejections() {
        let user = Uuid::new_v4();
        let token = issue_token("secret", user, 3600).unwrap();
        assert_eq!(verify_token("secret", &token).unwrap(), user);

        assert!(matches!(
            verify_token("other-secret", &token),
            Err(AppError::AuthenticationError(_))
        ));

        let expired = issue_token("secret", user, -3600).unwrap();
        assert!(verify_token("secret", &expired).is_err());
    }
}
