use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Body of `POST /api/product/checkout`.
///
/// Field names follow the storefront client (`customerID`, `cartItems`);
/// snake_case spellings are accepted too.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(rename = "customerID", alias = "customer_id")]
    pub customer_id: Uuid,
    /// Product id -> requested quantity.
    #[serde(rename = "cartItems", alias = "cart_items")]
    pub cart_items: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub purchased_items: Vec<Uuid>,
}
