use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    entity::{
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
        purchased_items::{
            ActiveModel as PurchaseActive, Column as PurchaseCol, Entity as PurchasedItems,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult, CheckoutError, UserError},
    models::{NewProduct, NewUser, Product, User},
    services::checkout_service::CheckoutPlan,
    store::ShopStore,
};

/// Rows per purchase-history INSERT. Each row binds two parameters and
/// Postgres caps a statement at 65535.
const PURCHASE_INSERT_BATCH: usize = 10_000;

/// PostgreSQL backend. Each checkout runs in a single transaction whose
/// funds and stock updates are conditional on the balance and stock still
/// being sufficient.
#[derive(Clone)]
pub struct PgStore {
    orm: OrmConn,
}

impl PgStore {
    pub fn new(orm: OrmConn) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl ShopStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let active = UserActive {
            id: Set(Uuid::new_v4()),
            username: Set(user.username),
            password_hash: Set(user.password_hash),
            available_money: Set(user.available_money),
            created_at: NotSet,
        };
        match active.insert(&self.orm).await {
            Ok(model) => Ok(user_from_entity(model)),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(UserError::UsernameAlreadyExists.into())
                }
                _ => Err(err.into()),
            },
        }
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = Users::find_by_id(id).one(&self.orm).await?;
        Ok(user.map(user_from_entity))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = Users::find()
            .filter(UserCol::Username.eq(username))
            .one(&self.orm)
            .await?;
        Ok(user.map(user_from_entity))
    }

    async fn insert_product(&self, product: NewProduct) -> AppResult<Product> {
        let active = ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            stock_quantity: Set(product.stock_quantity),
            image_url: Set(product.image_url),
            created_at: NotSet,
        };
        let model = active.insert(&self.orm).await?;
        Ok(product_from_entity(model))
    }

    async fn list_products(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)> {
        let finder = Products::find().order_by_asc(ProdCol::Name);
        let total = finder.clone().count(&self.orm).await?;
        let items = finder
            .limit(limit)
            .offset(offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok((items, total))
    }

    async fn find_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = Products::find()
            .filter(ProdCol::Id.is_in(ids.iter().copied()))
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok(items)
    }

    async fn purchased_items(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = PurchasedItems::find()
            .select_only()
            .column(PurchaseCol::ProductId)
            .filter(PurchaseCol::UserId.eq(user_id))
            .order_by_asc(PurchaseCol::Id)
            .into_tuple::<Uuid>()
            .all(&self.orm)
            .await?;
        Ok(ids)
    }

    async fn apply_checkout(&self, plan: &CheckoutPlan) -> AppResult<Vec<Uuid>> {
        // dropping `txn` without commit rolls everything back
        let txn = self.orm.begin().await?;

        let debited = Users::update_many()
            .col_expr(
                UserCol::AvailableMoney,
                Expr::col(UserCol::AvailableMoney).sub(plan.total),
            )
            .filter(UserCol::Id.eq(plan.user_id))
            .filter(UserCol::AvailableMoney.gte(plan.total))
            .exec(&txn)
            .await?;
        if debited.rows_affected == 0 {
            return Err(AppError::from(CheckoutError::InsufficientFunds {
                required: plan.total,
            }));
        }

        for line in &plan.lines {
            let updated = Products::update_many()
                .col_expr(
                    ProdCol::StockQuantity,
                    Expr::col(ProdCol::StockQuantity).sub(line.stock_decrement),
                )
                .filter(ProdCol::Id.eq(line.product_id))
                .filter(ProdCol::StockQuantity.gte(line.quantity as i32))
                .exec(&txn)
                .await?;
            if updated.rows_affected == 0 {
                return Err(AppError::from(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                }));
            }
        }

        let units: Vec<Uuid> = plan.purchased_units().collect();
        for chunk in units.chunks(PURCHASE_INSERT_BATCH) {
            let rows = chunk.iter().map(|&product_id| PurchaseActive {
                id: NotSet,
                user_id: Set(plan.user_id),
                product_id: Set(product_id),
                created_at: NotSet,
            });
            PurchasedItems::insert_many(rows).exec(&txn).await?;
        }

        let history = PurchasedItems::find()
            .select_only()
            .column(PurchaseCol::ProductId)
            .filter(PurchaseCol::UserId.eq(plan.user_id))
            .order_by_asc(PurchaseCol::Id)
            .into_tuple::<Uuid>()
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(history)
    }
}

fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        username: model.username,
        password_hash: model.password_hash,
        available_money: model.available_money,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock_quantity: model.stock_quantity,
        image_url: model.image_url,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
