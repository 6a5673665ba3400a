use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Purchase history resolved to products, one entry per purchased unit.
#[derive(Serialize, ToSchema)]
pub struct PurchasedItems {
    pub purchased_items: Vec<Product>,
}
