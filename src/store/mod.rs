//! Persistence behind the checkout processor and the user/product endpoints.
//!
//! [`PgStore`] is the production backend; [`MemoryStore`] keeps everything in
//! process and backs the test suite and database-less runs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{NewProduct, NewUser, Product, User},
    services::checkout_service::CheckoutPlan,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ShopStore: Send + Sync {
    /// Fails with `UserError::UsernameAlreadyExists` when the username is taken.
    async fn insert_user(&self, user: NewUser) -> AppResult<User>;

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn insert_product(&self, product: NewProduct) -> AppResult<Product>;

    /// A page of products ordered by name, plus the total product count.
    async fn list_products(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)>;

    /// Products whose id is in `ids`. Unknown ids are silently skipped.
    async fn find_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>>;

    /// Purchased product ids of a user, oldest first, one entry per unit.
    async fn purchased_items(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Apply a validated plan as one atomic unit and return the user's full
    /// purchase history.
    ///
    /// Funds and stock are re-checked while applying; if a concurrent checkout
    /// consumed them in the meantime nothing is written and the matching
    /// `CheckoutError` is returned.
    async fn apply_checkout(&self, plan: &CheckoutPlan) -> AppResult<Vec<Uuid>>;
}
