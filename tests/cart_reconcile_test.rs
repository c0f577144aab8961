mod common;

use assert_matches::assert_matches;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, ActiveModelTrait};
use uuid::Uuid;

use common::{seed_cart_line, seed_discount, seed_store_product, setup, setup_with_config, test_config};
use marketplace_api::{
    entities::{cart_line, store_product, CartLine, DiscountType},
    errors::ServiceError,
    services::cart::{AddLineInput, CountDelta},
};

#[tokio::test]
async fn exhausted_lines_are_removed_and_block_payment() {
    let app = setup().await;
    let user_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();

    let in_stock = seed_store_product(&app.db, store_id, 1_000, 5).await;
    let sold_out = seed_store_product(&app.db, store_id, 2_000, 0).await;
    seed_cart_line(&app.db, user_id, &in_stock, 1, None).await;
    seed_cart_line(&app.db, user_id, &sold_out, 1, None).await;

    let pre = app
        .services
        .carts
        .pre_invoice(user_id, store_id)
        .await
        .unwrap();

    assert!(!pre.payment_state);
    assert_eq!(pre.lines.len(), 1);
    assert_eq!(pre.lines[0].line.product_id, in_stock.id);

    // The sold-out line is gone from storage, not just the response.
    let remaining = CartLine::find()
        .filter(cart_line::Column::UserId.eq(user_id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn price_drift_refreshes_the_snapshot_once() {
    let app = setup().await;
    let user_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();

    let product = seed_store_product(&app.db, store_id, 1_000, 5).await;
    seed_cart_line(&app.db, user_id, &product, 2, None).await;

    let mut active: store_product::ActiveModel = product.clone().into();
    active.store_price = Set(1_500);
    active.update(&*app.db).await.unwrap();

    let pre = app
        .services
        .carts
        .pre_invoice(user_id, store_id)
        .await
        .unwrap();
    assert!(!pre.payment_state);
    assert!(pre.lines[0].price_changed);
    assert_eq!(pre.lines[0].line.current_price, 1_500);
    assert_eq!(pre.total_price, 3_000);

    // The refreshed snapshot matches on the next pass.
    let pre = app
        .services
        .carts
        .pre_invoice(user_id, store_id)
        .await
        .unwrap();
    assert!(pre.payment_state);
    assert!(!pre.lines[0].price_changed);
}

#[tokio::test]
async fn discount_drift_blocks_payment_and_costs_full_price() {
    let app = setup().await;
    let user_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();

    let product = seed_store_product(&app.db, store_id, 10_000, 5).await;
    // Snapshot references a rule that no longer exists.
    seed_cart_line(
        &app.db,
        user_id,
        &product,
        1,
        Some("price-1000-9000".to_string()),
    )
    .await;

    let pre = app
        .services
        .carts
        .pre_invoice(user_id, store_id)
        .await
        .unwrap();
    assert!(!pre.payment_state);
    assert!(pre.lines[0].discount_changed);
    // Drifted discounts never silently reprice.
    assert_eq!(pre.final_price, 10_000);
    assert_eq!(pre.discount_price, 0);
}

#[tokio::test]
async fn discount_drift_passes_through_when_configured() {
    let mut config = test_config();
    config.pass_discount_changed = true;
    let app = setup_with_config(config).await;
    let user_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();

    let product = seed_store_product(&app.db, store_id, 10_000, 5).await;
    seed_cart_line(
        &app.db,
        user_id,
        &product,
        1,
        Some("price-1000-9000".to_string()),
    )
    .await;

    let pre = app
        .services
        .carts
        .pre_invoice(user_id, store_id)
        .await
        .unwrap();
    // Drift is still reported, but does not gate checkout.
    assert!(pre.lines[0].discount_changed);
    assert!(pre.payment_state);
}

#[tokio::test]
async fn valid_discount_snapshot_prices_the_line() {
    let app = setup().await;
    let user_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();

    let product = seed_store_product(&app.db, store_id, 10_000, 5).await;
    seed_discount(&app.db, product.id, DiscountType::Price, 1_000, 9_000).await;
    seed_cart_line(
        &app.db,
        user_id,
        &product,
        2,
        Some("price-1000-9000".to_string()),
    )
    .await;

    let pre = app
        .services
        .carts
        .pre_invoice(user_id, store_id)
        .await
        .unwrap();
    assert!(pre.payment_state);
    assert_eq!(pre.total_price, 20_000);
    assert_eq!(pre.final_price, 18_000);
    assert_eq!(pre.discount_price, 2_000);
    assert!(pre.is_discount);
    assert_eq!(pre.discount_percent, 10.0);
}

#[tokio::test]
async fn adding_the_same_listing_twice_conflicts() {
    let app = setup().await;
    let user_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();

    let product = seed_store_product(&app.db, store_id, 1_000, 5).await;

    let input = AddLineInput {
        store_product_id: product.id,
        is_payment_cash: false,
        discount_id: None,
    };
    app.services.carts.add_line(user_id, input).await.unwrap();

    let input = AddLineInput {
        store_product_id: product.id,
        is_payment_cash: false,
        discount_id: None,
    };
    let err = app.services.carts.add_line(user_id, input).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn increment_clamps_at_live_stock() {
    let app = setup().await;
    let user_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();

    let product = seed_store_product(&app.db, store_id, 1_000, 2).await;
    seed_cart_line(&app.db, user_id, &product, 2, None).await;

    // Already at stock: the count stays put.
    let line = app
        .services
        .carts
        .change_count(user_id, product.id, CountDelta::Increment)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line.count, 2);
}

#[tokio::test]
async fn decrement_below_one_deletes_the_line() {
    let app = setup().await;
    let user_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();

    let product = seed_store_product(&app.db, store_id, 1_000, 5).await;
    seed_cart_line(&app.db, user_id, &product, 1, None).await;

    let line = app
        .services
        .carts
        .change_count(user_id, product.id, CountDelta::Decrement)
        .await
        .unwrap();
    assert!(line.is_none());

    let remaining = CartLine::find()
        .filter(cart_line::Column::UserId.eq(user_id))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn changing_an_absent_line_is_a_no_op() {
    let app = setup().await;

    let result = app
        .services
        .carts
        .change_count(Uuid::new_v4(), Uuid::new_v4(), CountDelta::Increment)
        .await
        .unwrap();
    assert!(result.is_none());
}
