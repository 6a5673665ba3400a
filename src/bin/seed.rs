use anyhow::Context;
use shop_checkout_api::{
    db::{DbPool, create_pool, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let starting_balance = std::env::var("STARTING_BALANCE")
        .ok()
        .and_then(|b| b.parse::<i64>().ok())
        .unwrap_or(5000);

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let user_id = ensure_user(&pool, "shopper", "shopper123", starting_balance).await?;
    seed_products(&pool).await?;

    println!("Seed completed. User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    username: &str,
    password: &str,
    available_money: i64,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, password_hash, available_money)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (username) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .bind(available_money)
    .fetch_optional(pool)
    .await?;

    // already seeded on an earlier run
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE username = $1")
                .bind(username)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {username}");
    Ok(user_id)
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    let products = vec![
        ("Ferris Plush", "Soft crab for your desk", 120, 20, "/img/ferris.png"),
        ("Borrow Checker Mug", "Holds exactly one mutable coffee", 45, 50, "/img/mug.png"),
        ("Lifetime Hoodie", "Outlives every scope", 300, 10, "/img/hoodie.png"),
        ("Unsafe Sticker Pack", "Use sparingly", 15, 200, "/img/stickers.png"),
    ];

    for (name, desc, price, stock, image) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock_quantity, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price as i64)
        .bind(stock as i32)
        .bind(image)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
