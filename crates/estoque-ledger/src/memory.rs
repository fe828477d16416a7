//! # In-Memory Storage Backend
//!
//! `MemoryStore` implements both storage traits over mutex-held maps.
//! Used by the ledger test suites and as a zero-setup demo backend; the
//! durable backend lives in `estoque-db`.
//!
//! The mutex makes each operation atomic, so the compare-and-set
//! semantics match the SQLite backend exactly: the quantity write and the
//! conflict check happen under one lock.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use estoque_core::{
    MovementFilter, MovementLog, NewMovement, NewProduct, Product, ProductPatch, ProductStore,
    StockMovement, StoreError,
};

/// An in-process [`ProductStore`] + [`MovementLog`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: Mutex<BTreeMap<String, Product>>,
    movements: Mutex<Vec<StockMovement>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn products_lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Product>> {
        // A poisoned lock only means another test thread panicked; the
        // data itself is still consistent, every mutation is complete
        // before the guard drops.
        self.products.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn movements_lock(&self) -> std::sync::MutexGuard<'_, Vec<StockMovement>> {
        self.movements.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// ProductStore
// =============================================================================

impl ProductStore for MemoryStore {
    async fn get(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.products_lock().get(sku).cloned())
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let product = product.into_product(Utc::now())?;
        let mut products = self.products_lock();

        if products.contains_key(&product.sku) {
            return Err(StoreError::DuplicateKey(product.sku));
        }

        products.insert(product.sku.clone(), product.clone());
        Ok(product)
    }

    async fn compare_and_set_quantity(
        &self,
        sku: &str,
        expected_quantity: i64,
        new_quantity: i64,
        new_total_value_cents: i64,
    ) -> Result<Product, StoreError> {
        let mut products = self.products_lock();

        let product = products
            .get_mut(sku)
            .ok_or_else(|| StoreError::NotFound(sku.to_string()))?;

        if product.quantity != expected_quantity {
            return Err(StoreError::Conflict(sku.to_string()));
        }

        product.quantity = new_quantity;
        product.total_value_cents = new_total_value_cents;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn update(&self, sku: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        let mut products = self.products_lock();

        let current = products
            .get(sku)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(sku.to_string()))?;

        let updated = patch.apply(current, Utc::now())?;
        products.insert(sku.to_string(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, sku: &str) -> Result<(), StoreError> {
        self.products_lock()
            .remove(sku)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(sku.to_string()))
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self.products_lock().values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }
}

// =============================================================================
// MovementLog
// =============================================================================

impl MovementLog for MemoryStore {
    async fn append(&self, movement: NewMovement) -> Result<StockMovement, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now_ms = Utc::now().timestamp_millis();
        let movement = movement.into_movement(id, now_ms);

        self.movements_lock().push(movement.clone());
        Ok(movement)
    }

    async fn query(&self, filter: MovementFilter) -> Result<Vec<StockMovement>, StoreError> {
        let mut movements: Vec<StockMovement> = self
            .movements_lock()
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        // Stable sort keeps append order for equal timestamps, matching
        // the SQL backend's rowid tie-break.
        movements.sort_by_key(|m| m.timestamp_ms);
        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
