use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AvailableMoney, LoginRequest, LoginResponse, RegisterRequest, UserProfile},
        checkout::{CheckoutRequest, CheckoutResponse},
        products::{ProductList, PurchasedItems},
    },
    error::ErrorData,
    models::Product,
    response::{ApiResponse, Meta},
    routes::{health, params, products, user},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        // the storefront sends the bare token; `Bearer <token>` is accepted too
        components.add_security_scheme(
            "token_auth",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        user::register,
        user::login,
        user::available_money,
        products::list_products,
        products::checkout,
        products::purchased_items
    ),
    components(
        schemas(
            Product,
            UserProfile,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AvailableMoney,
            CheckoutRequest,
            CheckoutResponse,
            ProductList,
            PurchasedItems,
            ErrorData,
            params::Pagination,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<ErrorData>
        )
    ),
    security(
        ("token_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "User", description = "Registration, login and balance"),
        (name = "Products", description = "Catalogue, checkout and purchase history"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_checkout_path() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/product/checkout"));
        assert!(doc.paths.paths.contains_key("/api/user/login"));
    }
}
