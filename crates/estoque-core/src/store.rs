//! # Storage Abstractions
//!
//! The `ProductStore` and `MovementLog` traits, implemented by storage
//! backends (`estoque-db` for SQLite, `estoque-ledger::memory` for
//! in-process maps). Higher layers depend on these abstractions, not on
//! any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used from
//! multi-threaded async runtimes.

use std::future::Future;

use crate::error::StoreError;
use crate::types::{
    MovementFilter, NewMovement, NewProduct, Product, ProductPatch, StockMovement,
};

// =============================================================================
// Product Store
// =============================================================================

/// Durable keyed storage of products with compare-and-set semantics on the
/// stock level.
///
/// `compare_and_set_quantity` is the **sole** mutation primitive for
/// quantities. It is what prevents lost updates under concurrent access:
/// the write succeeds only if the stored quantity still equals the value
/// the caller read. Descriptive fields go through `update`, which is
/// plain last-write-wins since those fields are not contended the same
/// way.
pub trait ProductStore: Send + Sync {
    /// Retrieve a product by SKU. Returns `None` if not found.
    fn get(
        &self,
        sku: &str,
    ) -> impl Future<Output = Result<Option<Product>, StoreError>> + Send;

    /// Validate and persist a new product, computing its derived total
    /// value. Fails with [`StoreError::DuplicateKey`] if the SKU exists.
    fn create(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, StoreError>> + Send;

    /// Conditionally write a new quantity (and the matching derived total
    /// value, in the same atomic write).
    ///
    /// Succeeds only if the stored quantity still equals
    /// `expected_quantity` at commit time; otherwise fails with
    /// [`StoreError::Conflict`]. Fails with [`StoreError::NotFound`] if
    /// the product vanished. Returns the product as committed.
    fn compare_and_set_quantity(
        &self,
        sku: &str,
        expected_quantity: i64,
        new_quantity: i64,
        new_total_value_cents: i64,
    ) -> impl Future<Output = Result<Product, StoreError>> + Send;

    /// Last-write-wins update of non-quantity fields. Recomputes the
    /// derived total value when the price changes. Returns the updated
    /// product.
    fn update(
        &self,
        sku: &str,
        patch: ProductPatch,
    ) -> impl Future<Output = Result<Product, StoreError>> + Send;

    /// Remove a product. Fails with [`StoreError::NotFound`] if absent.
    /// Existing movements keep their (now dangling) weak reference.
    fn delete(&self, sku: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All products, ordered by name.
    fn list(&self) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;
}

// =============================================================================
// Movement Log
// =============================================================================

/// Durable append-only record of every quantity change.
///
/// Entries are never mutated or deleted by the core; retention and pruning
/// are a collaborator concern. The log has no contention since it is
/// purely additive.
pub trait MovementLog: Send + Sync {
    /// Append a movement, assigning its `id` and - when the caller left it
    /// unset - its `timestamp_ms`. Never fails except on storage fault.
    fn append(
        &self,
        movement: NewMovement,
    ) -> impl Future<Output = Result<StockMovement, StoreError>> + Send;

    /// Movements matching `filter`, ordered by `timestamp_ms` ascending.
    /// Each call re-reads storage; there is no cursor to invalidate.
    fn query(
        &self,
        filter: MovementFilter,
    ) -> impl Future<Output = Result<Vec<StockMovement>, StoreError>> + Send;
}
