use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        checkout::{CheckoutRequest, CheckoutResponse},
        products::{ProductList, PurchasedItems},
    },
    error::AppResult,
    middleware::{auth::AuthUser, json::ApiJson},
    response::ApiResponse,
    routes::params::Pagination,
    services::{checkout_service, product_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/checkout", post(checkout))
        .route("/purchased-items/{user_id}", get(purchased_items))
}

#[utoipa::path(
    get,
    path = "/api/product",
    params(Pagination),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>),
        (status = 401, description = "Missing token")
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/product/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Purchase committed", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Insufficient stock or funds, or an invalid cart"),
        (status = 403, description = "Invalid token or another customer's id"),
        (status = 404, description = "Unknown customer or product")
    ),
    tag = "Products"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = checkout_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/purchased-items/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Purchased products", body = ApiResponse<PurchasedItems>),
        (status = 403, description = "Invalid token or another user's id")
    ),
    tag = "Products"
)]
pub async fn purchased_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchasedItems>>> {
    let resp = product_service::purchased_items(&state, &user, user_id).await?;
    Ok(Json(resp))
}
