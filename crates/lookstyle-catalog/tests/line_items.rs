//! Stock ledger behaviour through the line item and sale managers.

mod common;

use common::{sale, seed, stock_of, variant_with_stock};
use lookstyle_catalog::{CatalogError, ErrorKind, LineItemManager, SaleManager};
use lookstyle_core::{LineItemChanges, NewLineItem, NewSale, SaleChanges};
use rust_decimal::Decimal;

fn item(sale_id: i64, variant_id: i64, quantity: i32) -> NewLineItem {
    NewLineItem {
        sale_id,
        variant_id,
        quantity,
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_update_delete_scenario_moves_stock_exactly(pool: sqlx::PgPool) {
    let fixture = seed(&pool).await;
    let variant_id = variant_with_stock(&pool, &fixture, 10).await;
    let sale_id = sale(&pool).await;
    let mgr = LineItemManager::new(pool.clone());

    let created = mgr.create(item(sale_id, variant_id, 4)).await.unwrap();
    assert_eq!(stock_of(&pool, variant_id).await, 6);

    mgr.update(
        created.id,
        LineItemChanges {
            variant_id: None,
            quantity: Some(7),
        },
    )
    .await
    .unwrap();
    assert_eq!(stock_of(&pool, variant_id).await, 3);

    let deleted = mgr.delete(created.id).await.unwrap();
    assert_eq!(deleted.quantity, 7);
    assert_eq!(stock_of(&pool, variant_id).await, 10);

    let err = mgr.create(item(sale_id, variant_id, 11)).await.unwrap_err();
    assert!(
        matches!(
            err,
            CatalogError::InsufficientStock {
                requested: 11,
                available: 10,
                ..
            }
        ),
        "got {err:?}"
    );
    assert_eq!(stock_of(&pool, variant_id).await, 10);

    let line_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_line_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(line_items, 0, "failed create must not leave a row");
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_delete_is_not_found_and_does_not_restore_twice(pool: sqlx::PgPool) {
    let fixture = seed(&pool).await;
    let variant_id = variant_with_stock(&pool, &fixture, 5).await;
    let sale_id = sale(&pool).await;
    let mgr = LineItemManager::new(pool.clone());

    let created = mgr.create(item(sale_id, variant_id, 2)).await.unwrap();
    mgr.delete(created.id).await.unwrap();
    let err = mgr.delete(created.id).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(stock_of(&pool, variant_id).await, 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_beyond_stock_fails_without_mutation(pool: sqlx::PgPool) {
    let fixture = seed(&pool).await;
    let variant_id = variant_with_stock(&pool, &fixture, 5).await;
    let sale_id = sale(&pool).await;
    let mgr = LineItemManager::new(pool.clone());

    let created = mgr.create(item(sale_id, variant_id, 3)).await.unwrap();
    let err = mgr
        .update(
            created.id,
            LineItemChanges {
                variant_id: None,
                quantity: Some(6),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(stock_of(&pool, variant_id).await, 2);
    let stored: i32 = sqlx::query_scalar("SELECT quantity FROM sale_line_items WHERE id = $1")
        .bind(created.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn moving_to_another_variant_restores_old_and_takes_new(pool: sqlx::PgPool) {
    let fixture = seed(&pool).await;
    let first = variant_with_stock(&pool, &fixture, 10).await;
    let second = variant_with_stock(&pool, &fixture, 4).await;
    let sale_id = sale(&pool).await;
    let mgr = LineItemManager::new(pool.clone());

    let created = mgr.create(item(sale_id, first, 3)).await.unwrap();
    assert_eq!(stock_of(&pool, first).await, 7);

    let moved = mgr
        .update(
            created.id,
            LineItemChanges {
                variant_id: Some(second),
                quantity: Some(4),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.variant_id, second);
    assert_eq!(stock_of(&pool, first).await, 10);
    assert_eq!(stock_of(&pool, second).await, 0);

    let err = mgr
        .update(
            created.id,
            LineItemChanges {
                variant_id: Some(first + second + 1_000),
                quantity: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_sales_of_last_units_allow_one(pool: sqlx::PgPool) {
    let fixture = seed(&pool).await;
    let variant_id = variant_with_stock(&pool, &fixture, 3).await;
    let sale_id = sale(&pool).await;
    let mgr = LineItemManager::new(pool.clone());

    let (a, b) = tokio::join!(
        mgr.create(item(sale_id, variant_id, 3)),
        mgr.create(item(sale_id, variant_id, 3)),
    );

    let outcomes = [a, b];
    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1, "exactly one sale should win: {outcomes:?}");
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(CatalogError::InsufficientStock { available: 0, .. })
    )));
    assert_eq!(stock_of(&pool, variant_id).await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_validates_input_and_references(pool: sqlx::PgPool) {
    let fixture = seed(&pool).await;
    let variant_id = variant_with_stock(&pool, &fixture, 5).await;
    let sale_id = sale(&pool).await;
    let mgr = LineItemManager::new(pool.clone());

    for bad in [
        item(sale_id, variant_id, 0),
        item(sale_id + 1_000, variant_id, 1),
        item(sale_id, variant_id + 1_000, 1),
    ] {
        let err = mgr.create(bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "input {bad:?} gave {err:?}");
    }
    assert_eq!(stock_of(&pool, variant_id).await, 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_a_sale_restores_every_line_item(pool: sqlx::PgPool) {
    let fixture = seed(&pool).await;
    let first = variant_with_stock(&pool, &fixture, 10).await;
    let second = variant_with_stock(&pool, &fixture, 6).await;
    let sales = SaleManager::new(pool.clone());
    let items = LineItemManager::new(pool.clone());

    let sale = sales
        .create(NewSale {
            user_id: 42,
            total: Decimal::new(15000, 2),
        })
        .await
        .unwrap();
    items.create(item(sale.id, first, 2)).await.unwrap();
    items.create(item(sale.id, first, 3)).await.unwrap();
    items.create(item(sale.id, second, 6)).await.unwrap();
    assert_eq!(stock_of(&pool, first).await, 5);
    assert_eq!(stock_of(&pool, second).await, 0);

    let listed = sales.list_line_items(sale.id).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].product_name, "Linen Shirt");
    assert_eq!(listed[0].color_name, "Navy");

    assert_eq!(sales.delete(sale.id).await.unwrap(), 3);
    assert_eq!(stock_of(&pool, first).await, 10);
    assert_eq!(stock_of(&pool, second).await, 6);

    assert_eq!(sales.get(sale.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(sales.delete(sale.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        sales.list_line_items(sale.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn sale_partial_update_and_validation(pool: sqlx::PgPool) {
    let sales = SaleManager::new(pool.clone());

    let err = sales
        .create(NewSale {
            user_id: 1,
            total: Decimal::new(-1, 0),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let sale = sales
        .create(NewSale {
            user_id: 1,
            total: Decimal::new(2500, 2),
        })
        .await
        .unwrap();

    let updated = sales
        .update(
            sale.id,
            SaleChanges {
                total: Some(Decimal::new(3000, 2)),
                ..SaleChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.user_id, 1);
    assert_eq!(updated.sold_at, sale.sold_at);
    assert_eq!(updated.total, Decimal::new(3000, 2));

    assert_eq!(sales.list().await.unwrap(), vec![updated]);
    assert_eq!(
        sales
            .update(sale.id + 1, SaleChanges::default())
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}
