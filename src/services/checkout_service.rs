use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dto::checkout::{CheckoutRequest, CheckoutResponse},
    error::{AppError, AppResult, CheckoutError},
    middleware::auth::{AuthUser, ensure_self},
    models::{Product, User},
    response::{ApiResponse, Meta},
    state::AppState,
    store::ShopStore,
};

/// How much stock a cart line consumes on commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockDecrement {
    /// Stock drops by the purchased quantity.
    PerUnit,
    /// Stock drops by one per distinct product, whatever the quantity.
    #[default]
    PerLine,
}

impl FromStr for StockDecrement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_unit" => Ok(StockDecrement::PerUnit),
            "per_line" => Ok(StockDecrement::PerLine),
            other => Err(anyhow::anyhow!(
                "unknown stock decrement `{other}`, expected per_unit or per_line"
            )),
        }
    }
}

impl fmt::Display for StockDecrement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockDecrement::PerUnit => f.write_str("per_unit"),
            StockDecrement::PerLine => f.write_str("per_line"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// A cart that passed boundary validation: non-empty, positive quantities,
/// one line per product id in ascending id order. Lines with quantity 0 are
/// dropped; the storefront leaves removed items in the cart that way.
///
/// Keys that are not product ids are kept aside; they can never match a
/// product and surface as `ProductNotFound` once the customer is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    unresolved: Vec<String>,
}

impl Cart {
    pub fn from_items(items: &BTreeMap<String, i64>) -> Result<Self, CheckoutError> {
        let mut merged: BTreeMap<Uuid, u32> = BTreeMap::new();
        let mut unresolved = Vec::new();
        for (key, &quantity) in items {
            let invalid = || CheckoutError::InvalidQuantity {
                product_id: key.clone(),
                quantity,
            };
            if quantity == 0 {
                continue;
            }
            if quantity < 0 || quantity > i64::from(i32::MAX) {
                return Err(invalid());
            }
            let quantity = u32::try_from(quantity).map_err(|_| invalid())?;

            match Uuid::parse_str(key.trim()) {
                Ok(id) => {
                    let slot = merged.entry(id).or_insert(0);
                    *slot = slot
                        .checked_add(quantity)
                        .filter(|q| *q <= i32::MAX as u32)
                        .ok_or_else(invalid)?;
                }
                Err(_) => unresolved.push(key.clone()),
            }
        }

        if merged.is_empty() && unresolved.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let lines = merged
            .into_iter()
            .map(|(product_id, quantity)| CartLine {
                product_id,
                quantity,
            })
            .collect();
        Ok(Self { lines, unresolved })
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.lines.iter().map(|line| line.product_id).collect()
    }

    /// Total number of units requested.
    pub fn units(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub stock_decrement: i32,
}

/// A priced, validated checkout ready to be applied by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub user_id: Uuid,
    pub total: i64,
    pub lines: Vec<PlannedLine>,
}

impl CheckoutPlan {
    /// Product ids to append to the purchase history, one per unit.
    pub fn purchased_units(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.lines.iter().flat_map(|line| {
            std::iter::repeat_n(line.product_id, line.quantity as usize)
        })
    }
}

/// Validate a cart against freshly loaded user and product records.
pub fn plan_checkout(
    user: &User,
    products: &[Product],
    cart: &Cart,
    stock_decrement: StockDecrement,
) -> Result<CheckoutPlan, CheckoutError> {
    if let Some(key) = cart.unresolved.first() {
        return Err(CheckoutError::ProductNotFound(key.clone()));
    }

    let find = |id: Uuid| products.iter().find(|product| product.id == id);

    if products.len() != cart.lines.len() {
        let missing = cart
            .lines
            .iter()
            .find(|line| find(line.product_id).is_none())
            .map(|line| line.product_id.to_string())
            .unwrap_or_default();
        return Err(CheckoutError::ProductNotFound(missing));
    }

    let mut total: i64 = 0;
    let mut lines = Vec::with_capacity(cart.lines.len());
    for line in &cart.lines {
        let product = find(line.product_id)
            .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.to_string()))?;

        if i64::from(product.stock_quantity) < i64::from(line.quantity) {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id,
                requested: line.quantity,
            });
        }

        total = total.saturating_add(product.price.saturating_mul(i64::from(line.quantity)));

        let stock_decrement = match stock_decrement {
            // quantity <= stock_quantity <= i32::MAX here
            StockDecrement::PerUnit => line.quantity as i32,
            StockDecrement::PerLine => 1,
        };
        lines.push(PlannedLine {
            product_id: product.id,
            quantity: line.quantity,
            stock_decrement,
        });
    }

    if user.available_money < total {
        return Err(CheckoutError::InsufficientFunds { required: total });
    }

    Ok(CheckoutPlan {
        user_id: user.id,
        total,
        lines,
    })
}

/// Validate-then-commit checkout over a [`ShopStore`].
#[derive(Clone)]
pub struct CheckoutProcessor {
    store: Arc<dyn ShopStore>,
    stock_decrement: StockDecrement,
}

impl CheckoutProcessor {
    pub fn new(store: Arc<dyn ShopStore>, stock_decrement: StockDecrement) -> Self {
        Self {
            store,
            stock_decrement,
        }
    }

    pub fn stock_decrement(&self) -> StockDecrement {
        self.stock_decrement
    }

    /// Returns the customer's full purchase history on success.
    pub async fn checkout(&self, customer_id: Uuid, cart: &Cart) -> AppResult<Vec<Uuid>> {
        let result = self.try_checkout(customer_id, cart).await;
        if let Err(AppError::Checkout(err)) = &result {
            tracing::warn!(%customer_id, kind = err.kind(), error = %err, "checkout rejected");
        }
        result
    }

    async fn try_checkout(&self, customer_id: Uuid, cart: &Cart) -> AppResult<Vec<Uuid>> {
        let user = self
            .store
            .find_user(customer_id)
            .await?
            .ok_or(CheckoutError::UserNotFound)?;

        let products = self.store.find_products(&cart.product_ids()).await?;
        let plan = plan_checkout(&user, &products, cart, self.stock_decrement)?;

        let purchased = self.store.apply_checkout(&plan).await?;
        tracing::info!(
            %customer_id,
            total = plan.total,
            lines = plan.lines.len(),
            units = cart.units(),
            "checkout committed"
        );
        Ok(purchased)
    }
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    ensure_self(user, payload.customer_id)?;
    let cart = Cart::from_items(&payload.cart_items)?;

    let purchased_items = state.checkout.checkout(payload.customer_id, &cart).await?;

    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutResponse { purchased_items },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(money: i64) -> User {
        User {
            id: Uuid::new_v4(),
            username: "shopper".into(),
            password_hash: "x".into(),
            available_money: money,
            created_at: Utc::now(),
        }
    }

    fn product(price: i64, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: format!("item-{price}-{stock}"),
            description: None,
            price,
            stock_quantity: stock,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn cart(entries: &[(String, i64)]) -> Cart {
        let items: BTreeMap<String, i64> = entries.iter().cloned().collect();
        Cart::from_items(&items).unwrap()
    }

    #[test]
    fn plans_total_and_units() {
        let buyer = user(100);
        let p1 = product(30, 5);
        let c = cart(&[(p1.id.to_string(), 2)]);

        let plan = plan_checkout(&buyer, &[p1.clone()], &c, StockDecrement::PerUnit).unwrap();
        assert_eq!(plan.total, 60);
        assert_eq!(plan.lines[0].stock_decrement, 2);
        assert_eq!(plan.purchased_units().collect::<Vec<_>>(), vec![p1.id, p1.id]);
    }

    #[test]
    fn per_line_decrements_by_one() {
        let buyer = user(100);
        let p1 = product(30, 5);
        let c = cart(&[(p1.id.to_string(), 2)]);

        let plan = plan_checkout(&buyer, &[p1], &c, StockDecrement::PerLine).unwrap();
        assert_eq!(plan.lines[0].stock_decrement, 1);
        assert_eq!(plan.purchased_units().count(), 2);
    }

    #[test]
    fn rejects_more_than_stock() {
        let buyer = user(100);
        let p1 = product(1, 5);
        let c = cart(&[(p1.id.to_string(), 10)]);

        let err = plan_checkout(&buyer, &[p1.clone()], &c, StockDecrement::PerUnit).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                product_id: p1.id,
                requested: 10
            }
        );
    }

    #[test]
    fn rejects_when_total_exceeds_funds() {
        let buyer = user(50);
        let p1 = product(30, 5);
        let c = cart(&[(p1.id.to_string(), 2)]);

        let err = plan_checkout(&buyer, &[p1], &c, StockDecrement::PerUnit).unwrap_err();
        assert_eq!(err, CheckoutError::InsufficientFunds { required: 60 });
    }

    #[test]
    fn huge_totals_saturate_instead_of_wrapping() {
        let buyer = user(i64::MAX - 1);
        let p1 = product(i64::MAX, 5);
        let c = cart(&[(p1.id.to_string(), 3)]);

        let err = plan_checkout(&buyer, &[p1], &c, StockDecrement::PerUnit).unwrap_err();
        assert_eq!(err, CheckoutError::InsufficientFunds { required: i64::MAX });
    }

    #[test]
    fn missing_product_is_reported() {
        let buyer = user(100);
        let p1 = product(30, 5);
        let ghost = Uuid::new_v4();
        let c = cart(&[(p1.id.to_string(), 1), (ghost.to_string(), 1)]);

        let err = plan_checkout(&buyer, &[p1], &c, StockDecrement::PerUnit).unwrap_err();
        assert_eq!(err, CheckoutError::ProductNotFound(ghost.to_string()));
    }

    #[test]
    fn non_uuid_keys_are_unknown_products() {
        let buyer = user(100);
        let c = cart(&[("ghost".to_string(), 1)]);

        let err = plan_checkout(&buyer, &[], &c, StockDecrement::PerUnit).unwrap_err();
        assert_eq!(err, CheckoutError::ProductNotFound("ghost".into()));
    }

    #[test]
    fn cart_rejects_empty_and_out_of_range_quantities() {
        assert_eq!(
            Cart::from_items(&BTreeMap::new()).unwrap_err(),
            CheckoutError::EmptyCart
        );

        let id = Uuid::new_v4().to_string();
        for bad in [-3, -1, i64::from(i32::MAX) + 1] {
            let items = BTreeMap::from([(id.clone(), bad)]);
            assert!(matches!(
                Cart::from_items(&items),
                Err(CheckoutError::InvalidQuantity { .. })
            ));
        }
    }

    #[test]
    fn cart_drops_lines_with_zero_quantity() {
        let kept = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let items = BTreeMap::from([(kept.to_string(), 1), (removed.to_string(), 0)]);
        let c = Cart::from_items(&items).unwrap();
        assert_eq!(
            c.lines(),
            &[CartLine {
                product_id: kept,
                quantity: 1
            }]
        );

        let only_zeroes = BTreeMap::from([(removed.to_string(), 0), ("ghost".to_string(), 0)]);
        assert_eq!(
            Cart::from_items(&only_zeroes).unwrap_err(),
            CheckoutError::EmptyCart
        );
    }

    #[test]
    fn cart_merges_case_variants_of_one_id() {
        let id = Uuid::new_v4();
        let items = BTreeMap::from([
            (id.to_string(), 2),
            (id.to_string().to_uppercase(), 3),
        ]);
        let c = Cart::from_items(&items).unwrap();
        assert_eq!(
            c.lines(),
            &[CartLine {
                product_id: id,
                quantity: 5
            }]
        );
        assert_eq!(c.units(), 5);
    }

    #[test]
    fn stock_decrement_parses_from_config_values() {
        assert_eq!("per_line".parse::<StockDecrement>().unwrap(), StockDecrement::PerLine);
        assert_eq!(" PER_UNIT ".parse::<StockDecrement>().unwrap(), StockDecrement::PerUnit);
        assert!("flat".parse::<StockDecrement>().is_err());
        assert_eq!(StockDecrement::default(), StockDecrement::PerLine);
    }
}
