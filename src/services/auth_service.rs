use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    dto::auth::{AvailableMoney, Claims, LoginRequest, LoginResponse, RegisterRequest, UserProfile},
    error::{AppError, AppResult, UserError},
    middleware::auth::{AuthUser, ensure_self},
    models::NewUser,
    response::{ApiResponse, Meta},
    state::{AppState, AuthSettings},
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

/// Sign a token for `user_id` valid for the configured lifetime.
pub fn issue_token(settings: &AuthSettings, user_id: Uuid) -> AppResult<String> {
    let expiration = Duration::try_hours(settings.jwt_ttl_hours)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    let RegisterRequest { username, password } = payload;
    let username = username.trim().to_string();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".into(),
        ));
    }

    if state.store.find_user_by_username(&username).await?.is_some() {
        return Err(UserError::UsernameAlreadyExists.into());
    }

    let password_hash = hash_password(&password)?;
    let user = state
        .store
        .insert_user(NewUser {
            username,
            password_hash,
            available_money: state.starting_balance,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(ApiResponse::success(
        "User registered successfully",
        UserProfile::from(user),
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let user = state
        .store
        .find_user_by_username(username.trim())
        .await?
        .ok_or(UserError::NoUserFound)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(UserError::WrongCredentials.into());
    }

    let token = issue_token(&state.auth, user.id)?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token,
            user_id: user.id,
        },
        Some(Meta::empty()),
    ))
}

pub async fn available_money(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<AvailableMoney>> {
    ensure_self(user, user_id)?;
    let record = state
        .store
        .find_user(user_id)
        .await?
        .ok_or(UserError::NoUserFound)?;

    Ok(ApiResponse::success(
        "OK",
        AvailableMoney {
            available_money: record.available_money,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_against_the_original_password() {
        let hash = hash_password("hunter2").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"hunter2", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"hunter3", &parsed).is_err());
    }

    #[test]
    fn out_of_range_token_lifetime_is_an_error() {
        let settings = AuthSettings {
            jwt_secret: "secret".into(),
            jwt_ttl_hours: i64::MAX,
        };
        let err = issue_token(&settings, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind(), "INTERNAL");

        let settings = AuthSettings {
            jwt_ttl_hours: 1,
            ..settings
        };
        assert!(issue_token(&settings, Uuid::new_v4()).is_ok());
    }
}
