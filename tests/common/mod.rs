#![allow(dead_code)]

use std::{collections::BTreeMap, sync::Arc};

use shop_checkout_api::{
    config::AppConfig,
    models::{NewProduct, NewUser, Product, User},
    services::{auth_service::hash_password, checkout_service::{Cart, StockDecrement}},
    state::AppState,
    store::{MemoryStore, ShopStore},
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn config(stock_decrement: StockDecrement) -> AppConfig {
    AppConfig {
        database_url: None,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        jwt_ttl_hours: 1,
        starting_balance: 5000,
        stock_decrement,
    }
}

pub fn memory_state(stock_decrement: StockDecrement) -> (MemoryStore, AppState) {
    let store = MemoryStore::new();
    let state = AppState::new(Arc::new(store.clone()), &config(stock_decrement));
    (store, state)
}

pub async fn seed_user(store: &dyn ShopStore, username: &str, money: i64) -> User {
    store
        .insert_user(NewUser {
            username: username.into(),
            password_hash: hash_password("secret").unwrap(),
            available_money: money,
        })
        .await
        .unwrap()
}

pub async fn seed_product(store: &dyn ShopStore, name: &str, price: i64, stock: i32) -> Product {
    store
        .insert_product(NewProduct {
            name: name.into(),
            description: Some(format!("{name} for testing")),
            price,
            stock_quantity: stock,
            image_url: None,
        })
        .await
        .unwrap()
}

pub fn cart(entries: &[(Uuid, i64)]) -> Cart {
    let items: BTreeMap<String, i64> = entries
        .iter()
        .map(|(id, qty)| (id.to_string(), *qty))
        .collect();
    Cart::from_items(&items).unwrap()
}

/// Balance, stock per product and purchase count, for before/after comparisons.
pub async fn snapshot(
    store: &dyn ShopStore,
    user_id: Uuid,
    product_ids: &[Uuid],
) -> (i64, Vec<(Uuid, i32)>, usize) {
    let money = store
        .find_user(user_id)
        .await
        .unwrap()
        .map(|u| u.available_money)
        .unwrap_or_default();
    let mut stock: Vec<(Uuid, i32)> = store
        .find_products(product_ids)
        .await
        .unwrap()
        .into_iter()
        .map(|p| (p.id, p.stock_quantity))
        .collect();
    stock.sort();
    let purchases = store.purchased_items(user_id).await.unwrap().len();
    (money, stock, purchases)
}
