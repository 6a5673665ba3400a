use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

/// Reasons a checkout is refused. None of them leaves a mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("User not found")]
    UserNotFound,

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Insufficient stock for product {product_id} (requested {requested})")]
    InsufficientStock { product_id: Uuid, requested: u32 },

    #[error("Insufficient funds (required {required})")]
    InsufficientFunds { required: i64 },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: i64 },
}

impl CheckoutError {
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::UserNotFound => "USER_NOT_FOUND",
            CheckoutError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            CheckoutError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CheckoutError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            CheckoutError::EmptyCart => "EMPTY_CART",
            CheckoutError::InvalidQuantity { .. } => "INVALID_QUANTITY",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CheckoutError::UserNotFound | CheckoutError::ProductNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("Username is already taken")]
    UsernameAlreadyExists,

    #[error("No user found")]
    NoUserFound,

    #[error("Wrong username or password")]
    WrongCredentials,
}

impl UserError {
    pub fn kind(&self) -> &'static str {
        match self {
            UserError::UsernameAlreadyExists => "USERNAME_ALREADY_EXISTS",
            UserError::NoUserFound => "NO_USER_FOUND",
            UserError::WrongCredentials => "WRONG_CREDENTIALS",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Checkout(err) => err.kind(),
            AppError::User(err) => err.kind(),
            AppError::DbError(_) | AppError::OrmError(_) => "STORE_FAILURE",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::User(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Checkout(err) => err.status(),
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorData {
    pub error: String,
    pub kind: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                kind: self.kind().to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_errors_are_client_errors() {
        let missing: AppError = CheckoutError::ProductNotFound("ghost".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.kind(), "PRODUCT_NOT_FOUND");

        let broke: AppError = CheckoutError::InsufficientFunds { required: 10 }.into();
        assert_eq!(broke.status(), StatusCode::BAD_REQUEST);
        assert_eq!(broke.kind(), "INSUFFICIENT_FUNDS");
    }

    #[test]
    fn store_failures_are_reported_as_such() {
        let err: AppError = sea_orm::DbErr::Custom("boom".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "STORE_FAILURE");
    }
}
