mod common;

use sea_orm::{ActiveModelTrait, Set};
use std::collections::HashMap;
use uuid::Uuid;

use common::{seed_store_product, setup};
use marketplace_api::{entities::store_product, query::ListQuery};

fn query(pairs: &[(&str, &str)]) -> ListQuery {
    ListQuery(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    )
}

#[tokio::test]
async fn catalog_defaults_to_confirmed_listings() {
    let app = setup().await;
    let store_id = Uuid::new_v4();

    seed_store_product(&app.db, store_id, 1_000, 5).await;
    let unconfirmed = seed_store_product(&app.db, store_id, 2_000, 5).await;
    let mut active: store_product::ActiveModel = unconfirmed.into();
    active.admin_confirmed = Set(false);
    active.update(&*app.db).await.unwrap();

    let page = app.services.store_products.list(&query(&[])).await.unwrap();
    assert_eq!(page.count.total, 1);

    // The default is overridable, like any recognized key.
    let page = app
        .services
        .store_products
        .list(&query(&[("confirmed", "false")]))
        .await
        .unwrap();
    assert_eq!(page.count.total, 1);
    assert!(!page.data[0].admin_confirmed);
}

#[tokio::test]
async fn stock_and_price_filters_combine() {
    let app = setup().await;
    let store_id = Uuid::new_v4();

    seed_store_product(&app.db, store_id, 500, 0).await;
    seed_store_product(&app.db, store_id, 1_500, 3).await;
    seed_store_product(&app.db, store_id, 5_000, 3).await;

    let page = app
        .services
        .store_products
        .list(&query(&[("in_stock", "true")]))
        .await
        .unwrap();
    assert_eq!(page.count.total, 2);

    let page = app
        .services
        .store_products
        .list(&query(&[
            ("in_stock", "true"),
            ("min_price", "1000"),
            ("max_price", "2000"),
        ]))
        .await
        .unwrap();
    assert_eq!(page.count.total, 1);
    assert_eq!(page.data[0].store_price, 1_500);
}

#[tokio::test]
async fn scoping_to_a_store() {
    let app = setup().await;
    let store_a = Uuid::new_v4();
    let store_b = Uuid::new_v4();

    seed_store_product(&app.db, store_a, 1_000, 5).await;
    seed_store_product(&app.db, store_b, 1_000, 5).await;
    seed_store_product(&app.db, store_b, 2_000, 5).await;

    let page = app
        .services
        .store_products
        .list(&query(&[("store_id", &store_b.to_string())]))
        .await
        .unwrap();
    assert_eq!(page.count.total, 2);
}
