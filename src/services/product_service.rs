use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    dto::products::{ProductList, PurchasedItems},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_self},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let (items, total) = state
        .store
        .list_products(limit as u64, offset as u64)
        .await?;

    let meta = Meta::new(page, limit, total as i64);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

/// The caller's purchase history as products, oldest purchase first.
pub async fn purchased_items(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<PurchasedItems>> {
    ensure_self(user, user_id)?;

    let ids = state.store.purchased_items(user_id).await?;
    let mut distinct = ids.clone();
    distinct.sort_unstable();
    distinct.dedup();

    let by_id: HashMap<Uuid, _> = state
        .store
        .find_products(&distinct)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let purchased_items: Vec<_> = ids
        .iter()
        .filter_map(|id| by_id.get(id).cloned())
        .collect();
    let total = purchased_items.len() as i64;

    Ok(ApiResponse::success(
        "OK",
        PurchasedItems { purchased_items },
        Some(Meta::all(total)),
    ))
}
