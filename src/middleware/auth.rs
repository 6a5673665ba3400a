use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

/// The authenticated caller, resolved from the `Authorization` header.
///
/// Accepts `Bearer <jwt>` as well as the bare token. A missing header is
/// `401`; anything that fails to verify is `403`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Callers may only act on their own account.
pub fn ensure_self(user: &AuthUser, user_id: Uuid) -> Result<(), AppError> {
    if user.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized)?;

        let auth_str = auth_header.to_str().map_err(|_| AppError::Forbidden)?;
        let token = auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.auth.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            AppError::Forbidden
        })?;

        let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Forbidden)?;

        Ok(AuthUser { user_id })
    }
}
