//! End-to-end suite: the ledger state machine over the SQLite backend.

use std::sync::Arc;

use estoque_core::{Actor, LedgerError, MovementFilter, MovementKind, NewProduct};
use estoque_db::{Database, DbConfig, MovementRepository, ProductRepository};
use estoque_ledger::{LedgerService, ScanIngestor};

async fn sqlite_ledger() -> (Database, LedgerService<ProductRepository, MovementRepository>) {
    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database");
    let ledger = LedgerService::new(Arc::new(db.products()), Arc::new(db.movements()));
    (db, ledger)
}

fn seed_product() -> NewProduct {
    NewProduct {
        sku: "SKU-01".to_string(),
        name: "Sabonete Lava Jato".to_string(),
        category: Some("Higiene".to_string()),
        supplier: None,
        unit_price_cents: 1290,
        quantity: 50,
    }
}

#[tokio::test]
async fn scan_out_deducts_and_logs_over_sqlite() {
    let (db, ledger) = sqlite_ledger().await;
    db.products().insert(seed_product()).await.unwrap();

    let receipt = ledger
        .apply_movement("SKU-01", MovementKind::Out, 5, &Actor::named("u1", "Ana"))
        .await
        .unwrap();
    assert_eq!(receipt.product.quantity, 45);
    assert_eq!(receipt.product.total_value_cents, 58050);

    let err = ledger
        .apply_movement("SKU-01", MovementKind::Out, 100, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientStock { .. }));

    let stored = db.products().get_by_sku("SKU-01").await.unwrap().unwrap();
    assert_eq!(stored.quantity, 45);

    let log = db
        .movements()
        .query_filtered(&MovementFilter::for_sku("SKU-01"))
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].qty, 5);
    assert_eq!(log[0].actor_name, "Ana");
}

#[tokio::test]
async fn racing_scans_never_oversell_over_sqlite() {
    let (db, ledger) = sqlite_ledger().await;
    let mut product = seed_product();
    product.quantity = 10;
    db.products().insert(product).await.unwrap();

    let barrier = Arc::new(tokio::sync::Barrier::new(2));
    let mut handles = Vec::new();
    for actor_id in ["staff-a", "staff-b"] {
        let ledger = ledger.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            ledger
                .apply_movement("SKU-01", MovementKind::Out, 7, &Actor::new(actor_id))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::InsufficientStock { available, .. }) => assert_eq!(available, 3),
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }
    assert_eq!(successes, 1);

    let stored = db.products().get_by_sku("SKU-01").await.unwrap().unwrap();
    assert_eq!(stored.quantity, 3);

    let log = db
        .movements()
        .query_filtered(&MovementFilter::for_sku("SKU-01"))
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn scan_ingestor_runs_against_sqlite() {
    let (db, ledger) = sqlite_ledger().await;
    db.products().insert(seed_product()).await.unwrap();

    let ingestor = ScanIngestor::with_identity(ledger);
    let receipt = ingestor
        .handle_scan("SKU-01", 3, &Actor::new("u1"))
        .await
        .unwrap();
    assert_eq!(receipt.product.quantity, 47);
    assert_eq!(receipt.movement.kind, MovementKind::Out);
}
