use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::checkout_service::CheckoutProcessor,
    store::ShopStore,
};

/// Token signing settings handed to the auth extractor and login.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ShopStore>,
    pub checkout: CheckoutProcessor,
    pub auth: AuthSettings,
    pub starting_balance: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn ShopStore>, config: &AppConfig) -> Self {
        Self {
            checkout: CheckoutProcessor::new(store.clone(), config.stock_decrement),
            store,
            auth: AuthSettings {
                jwt_secret: config.jwt_secret.clone(),
                jwt_ttl_hours: config.jwt_ttl_hours,
            },
            starting_balance: config.starting_balance,
        }
    }
}
