//! # Scan Ingestor
//!
//! Thin translation layer between a barcode scanner and the ledger:
//! a decoded code plus a requested quantity becomes an `out` movement.
//!
//! Barcode *detection* is an external capability - whatever hardware or
//! library decodes the image hands a plain string to [`ScanIngestor`].
//! Resolving that string to a SKU is a collaborator too, behind
//! [`SkuResolver`]: the identity resolver for deployments where the
//! barcode payload IS the SKU, or a table resolver loaded from a catalog.

use std::collections::HashMap;

use tracing::debug;

use estoque_core::{
    Actor, LedgerError, LedgerResult, MovementKind, MovementLog, ProductStore, ValidationError,
};

use crate::service::{LedgerService, MovementReceipt};

// =============================================================================
// SKU Resolution
// =============================================================================

/// Resolves a decoded barcode payload to a SKU.
pub trait SkuResolver: Send + Sync {
    /// The SKU for `code`, or `None` when the code maps to nothing.
    fn resolve(&self, code: &str) -> Option<String>;
}

/// Resolver for deployments where the barcode payload IS the SKU.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl SkuResolver for IdentityResolver {
    fn resolve(&self, code: &str) -> Option<String> {
        Some(code.to_string())
    }
}

/// Resolver backed by a pre-loaded barcode → SKU table.
#[derive(Debug, Clone, Default)]
pub struct TableResolver {
    entries: HashMap<String, String>,
}

impl TableResolver {
    /// Creates an empty table.
    pub fn new() -> Self {
        TableResolver::default()
    }

    /// Adds an entry, builder-style.
    pub fn with_entry(mut self, barcode: impl Into<String>, sku: impl Into<String>) -> Self {
        self.entries.insert(barcode.into(), sku.into());
        self
    }

    /// Adds an entry.
    pub fn insert(&mut self, barcode: impl Into<String>, sku: impl Into<String>) {
        self.entries.insert(barcode.into(), sku.into());
    }
}

impl SkuResolver for TableResolver {
    fn resolve(&self, code: &str) -> Option<String> {
        self.entries.get(code).cloned()
    }
}

// =============================================================================
// Scan Ingestor
// =============================================================================

/// Turns decoded scans into `out` movements on the ledger.
#[derive(Debug, Clone)]
pub struct ScanIngestor<P, L, R = IdentityResolver> {
    ledger: LedgerService<P, L>,
    resolver: R,
}

impl<P, L> ScanIngestor<P, L, IdentityResolver>
where
    P: ProductStore,
    L: MovementLog,
{
    /// An ingestor whose barcode payloads are SKUs already.
    pub fn with_identity(ledger: LedgerService<P, L>) -> Self {
        ScanIngestor::new(ledger, IdentityResolver)
    }
}

impl<P, L, R> ScanIngestor<P, L, R>
where
    P: ProductStore,
    L: MovementLog,
    R: SkuResolver,
{
    /// Creates an ingestor over a ledger and a resolver.
    pub fn new(ledger: LedgerService<P, L>, resolver: R) -> Self {
        ScanIngestor { ledger, resolver }
    }

    /// The underlying ledger, for non-scan operations.
    pub fn ledger(&self) -> &LedgerService<P, L> {
        &self.ledger
    }

    /// Handles one decoded scan: trims the payload, resolves the SKU, and
    /// deducts `qty` units as an `out` movement by `actor`.
    ///
    /// Unresolvable codes surface as [`LedgerError::ProductNotFound`] of
    /// the decoded code - to the operator that is exactly what happened.
    pub async fn handle_scan(
        &self,
        decoded_code: &str,
        qty: i64,
        actor: &Actor,
    ) -> LedgerResult<MovementReceipt> {
        let code = decoded_code.trim();
        if code.is_empty() {
            return Err(ValidationError::Required {
                field: "code".to_string(),
            }
            .into());
        }

        let sku = self
            .resolver
            .resolve(code)
            .ok_or_else(|| LedgerError::ProductNotFound(code.to_string()))?;

        debug!(code = %code, sku = %sku, qty = %qty, "scan resolved, deducting");

        self.ledger
            .apply_movement(&sku, MovementKind::Out, qty, actor)
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
