mod common;

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Statement};
use shop_checkout_api::{
    db::{create_pool, orm_from_pool, run_migrations},
    services::checkout_service::{CheckoutProcessor, StockDecrement},
    store::{PgStore, ShopStore},
};

use common::{cart, seed_product, seed_user, snapshot};

// Integration flow against a real database: checkout, rollback on failure, and
// concurrent buyers racing for the last units.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn postgres_checkout_is_atomic_and_race_free() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run the postgres flow."
            );
            return Ok(());
        }
    };

    let store = setup_store(&database_url).await?;
    let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
    let processor = CheckoutProcessor::new(shared, StockDecrement::PerUnit);

    let ann = seed_user(&store, "pg-ann", 100).await;
    let p1 = seed_product(&store, "PG Widget", 30, 5).await;

    let purchased = processor.checkout(ann.id, &cart(&[(p1.id, 2)])).await?;
    assert_eq!(purchased, vec![p1.id, p1.id]);
    let (money, stock, purchases) = snapshot(&store, ann.id, &[p1.id]).await;
    assert_eq!(money, 40);
    assert_eq!(stock, vec![(p1.id, 3)]);
    assert_eq!(purchases, 2);

    // too expensive now: nothing may change
    let before = snapshot(&store, ann.id, &[p1.id]).await;
    let err = processor
        .checkout(ann.id, &cart(&[(p1.id, 2)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "INSUFFICIENT_FUNDS");
    assert_eq!(snapshot(&store, ann.id, &[p1.id]).await, before);

    // twelve buyers, three units left
    let mut handles = Vec::new();
    for i in 0..12 {
        let buyer = seed_user(&store, &format!("pg-buyer-{i}"), 1000).await;
        let processor = processor.clone();
        let request = cart(&[(p1.id, 1)]);
        handles.push(tokio::spawn(async move {
            processor.checkout(buyer.id, &request).await
        }));
    }
    let mut sold = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            sold += 1;
        }
    }
    assert_eq!(sold, 3);
    assert_eq!(store.find_products(&[p1.id]).await?[0].stock_quantity, 0);

    // more units than fit in a single INSERT
    let bulk = seed_user(&store, "pg-bulk", 1_000_000).await;
    let screws = seed_product(&store, "PG Screw", 1, 50_000).await;
    let purchased = processor
        .checkout(bulk.id, &cart(&[(screws.id, 40_000)]))
        .await?;
    assert_eq!(purchased.len(), 40_000);
    assert!(purchased.iter().all(|id| *id == screws.id));
    let (money, stock, purchases) = snapshot(&store, bulk.id, &[screws.id]).await;
    assert_eq!(money, 960_000);
    assert_eq!(stock, vec![(screws.id, 10_000)]);
    assert_eq!(purchases, 40_000);

    Ok(())
}

async fn setup_store(database_url: &str) -> anyhow::Result<PgStore> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    let orm = orm_from_pool(&pool);

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE purchased_items, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(PgStore::new(orm))
}
