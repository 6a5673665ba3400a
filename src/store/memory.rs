use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppResult, CheckoutError, UserError},
    models::{NewProduct, NewUser, Product, User},
    services::checkout_service::CheckoutPlan,
    store::ShopStore,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    purchases: HashMap<Uuid, Vec<Uuid>>,
}

/// A thread-safe in-memory store.
///
/// All tables sit behind one `RwLock`, so a checkout holding the write lock
/// sees and mutates a consistent snapshot.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(UserError::UsernameAlreadyExists.into());
        }
        let record = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            available_money: user.available_money,
            created_at: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> AppResult<Product> {
        let record = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            stock_quantity: product.stock_quantity,
            image_url: product.image_url,
            created_at: Utc::now(),
        };
        let mut tables = self.tables.write().await;
        tables.products.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_products(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)> {
        let tables = self.tables.read().await;
        let mut all: Vec<&Product> = tables.products.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        let total = all.len() as u64;
        let page = all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn find_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id))
            .cloned()
            .collect())
    }

    async fn purchased_items(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(tables.purchases.get(&user_id).cloned().unwrap_or_default())
    }

    async fn apply_checkout(&self, plan: &CheckoutPlan) -> AppResult<Vec<Uuid>> {
        let mut tables = self.tables.write().await;

        let funds = tables
            .users
            .get(&plan.user_id)
            .map(|u| u.available_money)
            .ok_or(CheckoutError::UserNotFound)?;
        if funds < plan.total {
            return Err(CheckoutError::InsufficientFunds {
                required: plan.total,
            }
            .into());
        }
        for line in &plan.lines {
            let stock = tables
                .products
                .get(&line.product_id)
                .map(|p| p.stock_quantity)
                .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.to_string()))?;
            if i64::from(stock) < i64::from(line.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                }
                .into());
            }
        }

        // every check passed; nothing below can fail
        for line in &plan.lines {
            if let Some(product) = tables.products.get_mut(&line.product_id) {
                product.stock_quantity -= line.stock_decrement;
            }
        }
        if let Some(user) = tables.users.get_mut(&plan.user_id) {
            user.available_money -= plan.total;
        }
        let history = tables.purchases.entry(plan.user_id).or_default();
        history.extend(plan.purchased_units());
        Ok(history.clone())
    }
}
