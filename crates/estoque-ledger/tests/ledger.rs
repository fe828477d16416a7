//! Integration tests for the ledger state machine against the in-memory
//! backend, including the concurrency, contention, partial-commit, and
//! deadline behavior.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use estoque_core::{
    Actor, LedgerError, MovementFilter, MovementKind, MovementLog, NewMovement, NewProduct,
    Product, ProductPatch, ProductStore, StockMovement, StoreError,
};
use estoque_ledger::{
    IdentityResolver, LedgerConfig, LedgerService, MemoryStore, ScanIngestor, TableResolver,
};

fn new_product(sku: &str, quantity: i64, unit_price_cents: i64) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: format!("Produto {sku}"),
        category: None,
        supplier: None,
        unit_price_cents,
        quantity,
    }
}

async fn seeded_ledger(
    sku: &str,
    quantity: i64,
    unit_price_cents: i64,
) -> (Arc<MemoryStore>, LedgerService<MemoryStore, MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .create(new_product(sku, quantity, unit_price_cents))
        .await
        .unwrap();
    let ledger = LedgerService::new(Arc::clone(&store), Arc::clone(&store));
    (store, ledger)
}

// ─── Test doubles ────────────────────────────────────────────────────────────

/// A store whose CAS keeps losing races until the injected conflict budget
/// is spent. Everything else delegates to the inner store.
struct ConflictingStore {
    inner: MemoryStore,
    conflicts_remaining: AtomicU32,
}

impl ConflictingStore {
    fn new(conflicts: u32) -> Self {
        ConflictingStore {
            inner: MemoryStore::new(),
            conflicts_remaining: AtomicU32::new(conflicts),
        }
    }
}

impl ProductStore for ConflictingStore {
    async fn get(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        self.inner.get(sku).await
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        self.inner.create(product).await
    }

    async fn compare_and_set_quantity(
        &self,
        sku: &str,
        expected_quantity: i64,
        new_quantity: i64,
        new_total_value_cents: i64,
    ) -> Result<Product, StoreError> {
        if self.conflicts_remaining.load(Ordering::SeqCst) > 0 {
            self.conflicts_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::Conflict(sku.to_string()));
        }
        self.inner
            .compare_and_set_quantity(sku, expected_quantity, new_quantity, new_total_value_cents)
            .await
    }

    async fn update(&self, sku: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        self.inner.update(sku, patch).await
    }

    async fn delete(&self, sku: &str) -> Result<(), StoreError> {
        self.inner.delete(sku).await
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        self.inner.list().await
    }
}

/// A store whose reads and writes hang far past any deadline.
struct SlowStore {
    inner: MemoryStore,
}

impl SlowStore {
    fn new() -> Self {
        SlowStore {
            inner: MemoryStore::new(),
        }
    }

    async fn stall() {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}

impl ProductStore for SlowStore {
    async fn get(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        SlowStore::stall().await;
        self.inner.get(sku).await
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        // Seeding skips the stall so tests can set up state.
        self.inner.create(product).await
    }

    async fn compare_and_set_quantity(
        &self,
        sku: &str,
        expected_quantity: i64,
        new_quantity: i64,
        new_total_value_cents: i64,
    ) -> Result<Product, StoreError> {
        SlowStore::stall().await;
        self.inner
            .compare_and_set_quantity(sku, expected_quantity, new_quantity, new_total_value_cents)
            .await
    }

    async fn update(&self, sku: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        self.inner.update(sku, patch).await
    }

    async fn delete(&self, sku: &str) -> Result<(), StoreError> {
        self.inner.delete(sku).await
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        self.inner.list().await
    }
}

/// A movement log that is down.
struct FailingLog;

impl MovementLog for FailingLog {
    async fn append(&self, _movement: NewMovement) -> Result<StockMovement, StoreError> {
        Err(StoreError::Unavailable("movement log offline".to_string()))
    }

    async fn query(&self, _filter: MovementFilter) -> Result<Vec<StockMovement>, StoreError> {
        Ok(Vec::new())
    }
}

// ─── The concrete scenario ───────────────────────────────────────────────────

#[tokio::test]
async fn scan_out_deducts_and_logs() {
    let (store, ledger) = seeded_ledger("SKU-01", 50, 1290).await;
    let actor = Actor::new("u1");

    let receipt = ledger
        .apply_movement("SKU-01", MovementKind::Out, 5, &actor)
        .await
        .unwrap();

    assert_eq!(receipt.product.quantity, 45);
    assert_eq!(receipt.product.total_value_cents, 58050);
    assert_eq!(receipt.product.total_value().to_string(), "R$ 580,50");
    assert_eq!(receipt.movement.qty, 5);
    assert_eq!(receipt.movement.kind, MovementKind::Out);
    assert_eq!(receipt.movement.product_sku, "SKU-01");
    assert_eq!(receipt.movement.actor_id, "u1");
    // No display name supplied: the log falls back to the id.
    assert_eq!(receipt.movement.actor_name, "u1");

    // A follow-up that exceeds the stock is rejected and changes nothing.
    let err = ledger
        .apply_movement("SKU-01", MovementKind::Out, 100, &actor)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientStock {
            available: 45,
            requested: 100,
            ..
        }
    ));

    let product = store.get("SKU-01").await.unwrap().unwrap();
    assert_eq!(product.quantity, 45);

    // Exactly one committed movement, nothing for the rejection.
    let log = store.query(MovementFilter::for_sku("SKU-01")).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0], receipt.movement);
}

// ─── Validation (terminal failures before any write) ─────────────────────────

#[tokio::test]
async fn invalid_arguments_are_rejected_verbatim() {
    let (store, ledger) = seeded_ledger("SKU-01", 50, 1290).await;

    let err = ledger
        .apply_movement("SKU-01", MovementKind::Out, 0, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    let err = ledger
        .apply_movement("SKU-01", MovementKind::Out, -3, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    let err = ledger
        .apply_movement("SKU-01", MovementKind::Out, 1, &Actor::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    let err = ledger
        .apply_movement("not a sku", MovementKind::Out, 1, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    // Nothing was read or written.
    assert_eq!(store.get("SKU-01").await.unwrap().unwrap().quantity, 50);
    assert!(store.query(MovementFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_sku_is_product_not_found() {
    let (_store, ledger) = seeded_ledger("SKU-01", 50, 1290).await;

    let err = ledger
        .apply_movement("SKU-99", MovementKind::Out, 1, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ProductNotFound(sku) if sku == "SKU-99"));
}

#[tokio::test]
async fn quantity_overflow_is_invalid_argument() {
    // Zero price keeps the derived total representable at creation time.
    let (_store, ledger) = seeded_ledger("SKU-01", i64::MAX - 1, 0).await;

    let err = ledger
        .apply_movement("SKU-01", MovementKind::In, 2, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}

// ─── Conservation & totals ───────────────────────────────────────────────────

#[tokio::test]
async fn committed_movements_conserve_quantity_and_total_value() {
    let (store, ledger) = seeded_ledger("SKU-01", 50, 1290).await;
    let actor = Actor::named("u1", "Ana");

    let plan = [
        (MovementKind::In, 10),
        (MovementKind::Out, 5),
        (MovementKind::In, 2),
        (MovementKind::Out, 7),
    ];

    let mut expected = 50;
    for (kind, qty) in plan {
        let receipt = ledger.apply_movement("SKU-01", kind, qty, &actor).await.unwrap();
        expected += kind.signed(qty);
        assert_eq!(receipt.product.quantity, expected);
        // total_value never drifts from quantity * unit_price
        assert_eq!(receipt.product.total_value_cents, expected * 1290);
    }
    assert_eq!(expected, 50 + 12 - 12);

    // Log completeness: one entry per committed call, fields matching.
    let log = store.query(MovementFilter::for_sku("SKU-01")).await.unwrap();
    assert_eq!(log.len(), plan.len());
    for (movement, (kind, qty)) in log.iter().zip(plan) {
        assert_eq!(movement.kind, kind);
        assert_eq!(movement.qty, qty);
        assert_eq!(movement.product_sku, "SKU-01");
        assert_eq!(movement.actor_name, "Ana");
    }

    // Kind filter splits the log cleanly.
    let ins = store
        .query(MovementFilter {
            sku: Some("SKU-01".to_string()),
            kind: Some(MovementKind::In),
            ..MovementFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(ins.iter().map(|m| m.qty).sum::<i64>(), 12);
}

#[tokio::test]
async fn commit_timestamps_never_decrease() {
    let (store, ledger) = seeded_ledger("SKU-01", 100, 1290).await;
    let actor = Actor::new("u1");

    let mut receipts = Vec::new();
    for _ in 0..5 {
        receipts.push(
            ledger
                .apply_movement("SKU-01", MovementKind::Out, 1, &actor)
                .await
                .unwrap(),
        );
    }

    let stamps: Vec<i64> = receipts.iter().map(|r| r.movement.timestamp_ms).collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));

    // The queried log observes the same commit order.
    let log = store.query(MovementFilter::for_sku("SKU-01")).await.unwrap();
    let logged_ids: Vec<&str> = log.iter().map(|m| m.id.as_str()).collect();
    let receipt_ids: Vec<&str> = receipts.iter().map(|r| r.movement.id.as_str()).collect();
    assert_eq!(logged_ids, receipt_ids);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_scans_never_oversell() {
    let (store, ledger) = seeded_ledger("SKU-01", 10, 1290).await;

    let barrier = Arc::new(tokio::sync::Barrier::new(2));
    let mut handles = Vec::new();
    for actor_id in ["staff-a", "staff-b"] {
        let ledger = ledger.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            let actor = Actor::new(actor_id);
            barrier.wait().await;
            ledger
                .apply_movement("SKU-01", MovementKind::Out, 7, &actor)
                .await
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => {
                successes += 1;
                assert_eq!(receipt.product.quantity, 3);
            }
            Err(LedgerError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                rejections += 1;
                // The loser observed the winner's committed state.
                assert_eq!(available, 3);
                assert_eq!(requested, 7);
            }
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(rejections, 1);

    // Final quantity is 3 - never negative, never 10 (no lost update).
    let product = store.get("SKU-01").await.unwrap().unwrap();
    assert_eq!(product.quantity, 3);
    assert_eq!(product.total_value_cents, 3 * 1290);

    // Exactly one movement for the one committed deduction.
    let log = store.query(MovementFilter::for_sku("SKU-01")).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].qty, 7);
}

#[tokio::test]
async fn cas_conflicts_are_absorbed_within_the_bound() {
    let store = Arc::new(ConflictingStore::new(2));
    store
        .create(new_product("SKU-01", 50, 1290))
        .await
        .unwrap();
    let ledger = LedgerService::new(Arc::clone(&store), Arc::new(MemoryStore::new()));

    // Two injected conflicts, budget of five: the third attempt lands.
    let receipt = ledger
        .apply_movement("SKU-01", MovementKind::Out, 5, &Actor::new("u1"))
        .await
        .unwrap();
    assert_eq!(receipt.product.quantity, 45);
}

#[tokio::test]
async fn exhausted_retry_budget_surfaces_contention() {
    let store = Arc::new(ConflictingStore::new(u32::MAX));
    store
        .create(new_product("SKU-01", 50, 1290))
        .await
        .unwrap();
    let ledger = LedgerService::with_config(
        Arc::clone(&store),
        Arc::new(MemoryStore::new()),
        LedgerConfig::new().max_cas_attempts(5),
    );

    let err = ledger
        .apply_movement("SKU-01", MovementKind::Out, 5, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Contention { attempts: 5, .. }
    ));

    // Nothing committed, nothing logged.
    assert_eq!(store.get("SKU-01").await.unwrap().unwrap().quantity, 50);
}

// ─── Partial commit ──────────────────────────────────────────────────────────

#[tokio::test]
async fn log_failure_after_commit_is_partial_commit() {
    let products = Arc::new(MemoryStore::new());
    products
        .create(new_product("SKU-01", 50, 1290))
        .await
        .unwrap();
    let ledger = LedgerService::new(Arc::clone(&products), Arc::new(FailingLog));

    let err = ledger
        .apply_movement("SKU-01", MovementKind::Out, 5, &Actor::new("u1"))
        .await
        .unwrap_err();

    match err {
        LedgerError::PartialCommit { product, source } => {
            // The receipt carries the committed product state…
            assert_eq!(product.quantity, 45);
            assert!(matches!(source, StoreError::Unavailable(_)));
        }
        other => panic!("expected PartialCommit, got {other:?}"),
    }

    // …and that state really is committed: no rollback of the CAS.
    let stored = products.get("SKU-01").await.unwrap().unwrap();
    assert_eq!(stored.quantity, 45);
    assert_eq!(stored.total_value_cents, 45 * 1290);
}

// ─── Deadlines ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn slow_storage_surfaces_timeout() {
    let store = Arc::new(SlowStore::new());
    store
        .create(new_product("SKU-01", 50, 1290))
        .await
        .unwrap();
    let ledger = LedgerService::with_config(
        Arc::clone(&store),
        Arc::new(MemoryStore::new()),
        LedgerConfig::new()
            .attempt_timeout(Duration::from_millis(200))
            .operation_timeout(Duration::from_secs(1)),
    );

    let err = ledger
        .apply_movement("SKU-01", MovementKind::Out, 5, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Timeout { .. }));
}

// ─── Scan ingestion ──────────────────────────────────────────────────────────

#[tokio::test]
async fn scans_resolve_trim_and_deduct() {
    let (store, ledger) = seeded_ledger("SKU-0001", 50, 1290).await;
    let ingestor = ScanIngestor::with_identity(ledger);
    let actor = Actor::named("u1", "Ana");

    // Scanner payloads arrive with whitespace; the code is trimmed.
    let receipt = ingestor.handle_scan("  SKU-0001  ", 5, &actor).await.unwrap();
    assert_eq!(receipt.movement.kind, MovementKind::Out);
    assert_eq!(receipt.product.quantity, 45);

    assert_eq!(store.get("SKU-0001").await.unwrap().unwrap().quantity, 45);
}

#[tokio::test]
async fn scans_resolve_through_a_barcode_table() {
    let (_store, ledger) = seeded_ledger("SKU-0001", 50, 1290).await;
    let resolver = TableResolver::new().with_entry("7891234567895", "SKU-0001");
    let ingestor = ScanIngestor::new(ledger, resolver);

    let receipt = ingestor
        .handle_scan("7891234567895", 2, &Actor::new("u1"))
        .await
        .unwrap();
    assert_eq!(receipt.product.quantity, 48);

    // A code outside the table reads as an unknown product.
    let err = ingestor
        .handle_scan("0000000000000", 1, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ProductNotFound(code) if code == "0000000000000"));
}

#[tokio::test]
async fn empty_scan_payload_is_invalid() {
    let (_store, ledger) = seeded_ledger("SKU-0001", 50, 1290).await;
    let ingestor = ScanIngestor::new(ledger, IdentityResolver);

    let err = ingestor
        .handle_scan("   ", 1, &Actor::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}
