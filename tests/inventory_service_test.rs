mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::{product, FakeCatalog};
use inventory_scan::{
    errors::InventoryError,
    models::{ProductId, Stock},
    scan::{Barcode, DraftEdit, PendingNewProduct},
    services::{InventoryService, ProductQuery, ProductUpdate, SortDirection, SortField},
};
use rust_decimal_macros::dec;

fn service(catalog: std::sync::Arc<FakeCatalog>) -> InventoryService {
    InventoryService::new(catalog)
}

#[tokio::test]
async fn stock_adjustment_commits_the_new_quantity() {
    let catalog = FakeCatalog::new(vec![product(1, "Drill", "12345678", dec!(90))]);
    let service = service(catalog.clone());

    let updated = service
        .adjust_stock(&ProductId::Number(1), 1, -3)
        .await
        .unwrap();

    assert_eq!(updated.stock(1).map(|s| s.quantity), Some(1));
    assert_eq!(catalog.update_calls(), 1);
    assert_eq!(catalog.products()[0].total_quantity(), 1);
}

#[tokio::test]
async fn stock_adjustment_below_zero_is_never_committed() {
    let catalog = FakeCatalog::new(vec![product(1, "Drill", "12345678", dec!(90))]);
    let service = service(catalog.clone());

    let result = service.adjust_stock(&ProductId::Number(1), 1, -5).await;

    assert_matches!(
        result,
        Err(InventoryError::NegativeQuantity {
            stock_id: 1,
            quantity: -1
        })
    );
    assert_eq!(catalog.update_calls(), 0);
    assert_eq!(catalog.products()[0].total_quantity(), 4);
}

#[tokio::test]
async fn unknown_stock_or_product_is_reported() {
    let catalog = FakeCatalog::new(vec![product(1, "Drill", "12345678", dec!(90))]);
    let service = service(catalog.clone());

    assert_matches!(
        service.adjust_stock(&ProductId::Number(1), 9, 1).await,
        Err(InventoryError::UnknownStock { stock_id: 9, .. })
    );
    assert_matches!(
        service.adjust_stock(&ProductId::Number(2), 1, 1).await,
        Err(InventoryError::NotFound(ProductId::Number(2)))
    );
    assert_eq!(catalog.update_calls(), 0);
}

#[tokio::test]
async fn list_applies_search_and_sort() {
    let catalog = FakeCatalog::new(vec![
        product(1, "Drill", "12345678", dec!(90)),
        product(2, "hammer", "87654321", dec!(12)),
        product(3, "Saw", "11112222", dec!(35)),
    ]);
    let service = service(catalog);

    let by_price = service
        .list_products(&ProductQuery {
            search: None,
            sort: SortField::Price,
            direction: SortDirection::Desc,
        })
        .await
        .unwrap();
    let names: Vec<_> = by_price.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Drill", "Saw", "hammer"]);

    let searched = service
        .list_products(&ProductQuery {
            search: Some("HAM".into()),
            ..ProductQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].name, "hammer");
}

#[tokio::test]
async fn update_keeps_barcode_and_rejects_negative_price() {
    let catalog = FakeCatalog::new(vec![product(1, "Drill", "12345678", dec!(90))]);
    let service = service(catalog.clone());

    let updated = service
        .update_product(
            &ProductId::Number(1),
            ProductUpdate {
                name: Some("Cordless drill".into()),
                city: Some("Fes".into()),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Cordless drill");
    assert_eq!(updated.city, "Fes");
    assert_eq!(updated.barcode, "12345678");

    let rejected = service
        .update_product(
            &ProductId::Number(1),
            ProductUpdate {
                price: Some(dec!(-1)),
                ..ProductUpdate::default()
            },
        )
        .await;
    assert_matches!(rejected, Err(InventoryError::ValidationError(_)));
    assert_eq!(catalog.update_calls(), 1);
}

#[tokio::test]
async fn create_with_initial_stock() {
    let catalog = FakeCatalog::empty();
    let service = service(catalog.clone());

    let mut draft = PendingNewProduct::for_barcode(&Barcode::parse("12345678").unwrap());
    draft.apply(DraftEdit {
        name: Some("Glue".into()),
        product_type: Some("Office".into()),
        price: Some("2.10".into()),
        supplier: Some("Acme".into()),
        image: None,
    });

    let stock = Stock::new(1, 20, "Main");
    let created = service.create_product(&draft, Some(stock)).await.unwrap();

    assert_eq!(created.total_quantity(), 20);
    assert!(created.created_at.unwrap() <= Utc::now());

    let negative = Stock::new(1, -1, "Main");
    assert_matches!(
        service.create_product(&draft, Some(negative)).await,
        Err(InventoryError::NegativeQuantity { .. })
    );
    assert_eq!(catalog.create_calls(), 1);
}

#[tokio::test]
async fn statistics_cover_the_whole_catalog() {
    let mut empty = product(3, "Saw", "11112222", dec!(35));
    empty.stocks.clear();
    empty.city = "Fes".into();
    let catalog = FakeCatalog::new(vec![
        product(1, "Drill", "12345678", dec!(90)),
        product(2, "Hammer", "87654321", dec!(12.5)),
        empty,
    ]);

    let stats = service(catalog).statistics().await.unwrap();

    assert_eq!(stats.total_products, 3);
    assert_eq!(stats.total_cities, 2);
    assert_eq!(stats.out_of_stock, 1);
    assert_eq!(stats.total_inventory_value, dec!(137.5));
    assert_eq!(stats.recently_added.len(), 3);
}
