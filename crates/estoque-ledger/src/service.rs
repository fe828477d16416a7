//! # Ledger Service
//!
//! The `apply_movement` state machine.
//!
//! ## Transaction States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Validating ──► Reading ──► Computing ──► Writing ──► Logging       │
//! │      │             │            │          │  ▲           │         │
//! │      ▼             ▼            ▼          │  │ Conflict  ▼         │
//! │  InvalidArgument   ProductNotFound         │  │ (re-read, Committed │
//! │                    InsufficientStock  ◄────┘  │  bounded)           │
//! │                                               │                     │
//! │                              attempts > bound └─► Contention        │
//! │                              deadline elapsed ──► Timeout           │
//! │                              append failed ─────► PartialCommit     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Validating`, `Reading` and `Computing` produce terminal failures; only
//! the `Writing` state retries, driven by compare-and-set conflicts. The
//! retry loop gives per-SKU serializability without a global lock: every
//! committed movement observed a quantity that was current at commit time.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use estoque_core::validation::{validate_actor, validate_movement_qty, validate_sku};
use estoque_core::{
    derive_total_value_cents, Actor, LedgerError, LedgerResult, MovementKind, MovementLog,
    NewMovement, Product, ProductStore, StockMovement, StoreError, ValidationError,
};

// =============================================================================
// Configuration
// =============================================================================

/// Tuning knobs for the ledger's retry loop and deadlines.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use estoque_ledger::LedgerConfig;
///
/// let config = LedgerConfig::new()
///     .max_cas_attempts(3)
///     .attempt_timeout(Duration::from_millis(500));
/// assert_eq!(config.max_cas_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How many compare-and-set attempts before giving up with
    /// `Contention`. Default: 5
    pub max_cas_attempts: u32,

    /// Deadline for each individual storage call.
    /// Default: 2 seconds
    pub attempt_timeout: Duration,

    /// Deadline for the whole `apply_movement` call.
    /// Default: 10 seconds
    pub operation_timeout: Duration,
}

impl LedgerConfig {
    /// Creates a configuration with the default bounds.
    pub fn new() -> Self {
        LedgerConfig {
            max_cas_attempts: 5,
            attempt_timeout: Duration::from_secs(2),
            operation_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the compare-and-set attempt bound.
    pub fn max_cas_attempts(mut self, attempts: u32) -> Self {
        self.max_cas_attempts = attempts;
        self
    }

    /// Sets the per-storage-call deadline.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Sets the whole-operation deadline.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig::new()
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// The result of a committed movement: the updated product paired with its
/// log entry, so callers always observe a consistent pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReceipt {
    pub product: Product,
    pub movement: StockMovement,
}

// =============================================================================
// Ledger Service
// =============================================================================

/// Orchestrates atomic stock movements against a [`ProductStore`] and a
/// [`MovementLog`].
///
/// Cloning is cheap - the stores are reference-counted and the commit
/// clock is shared, so clones keep the monotonic-timestamp guarantee.
#[derive(Debug)]
pub struct LedgerService<P, L> {
    products: Arc<P>,
    log: Arc<L>,
    config: LedgerConfig,
    /// Last commit timestamp handed out, for the non-decreasing guarantee.
    last_timestamp_ms: Arc<AtomicI64>,
}

impl<P, L> Clone for LedgerService<P, L> {
    fn clone(&self) -> Self {
        LedgerService {
            products: Arc::clone(&self.products),
            log: Arc::clone(&self.log),
            config: self.config.clone(),
            last_timestamp_ms: Arc::clone(&self.last_timestamp_ms),
        }
    }
}

impl<P, L> LedgerService<P, L>
where
    P: ProductStore,
    L: MovementLog,
{
    /// Creates a ledger with the default configuration.
    pub fn new(products: Arc<P>, log: Arc<L>) -> Self {
        Self::with_config(products, log, LedgerConfig::default())
    }

    /// Creates a ledger with an explicit configuration.
    pub fn with_config(products: Arc<P>, log: Arc<L>, config: LedgerConfig) -> Self {
        LedgerService {
            products,
            log,
            config,
            last_timestamp_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// The underlying product store, for the product CRUD surface.
    pub fn product_store(&self) -> &Arc<P> {
        &self.products
    }

    /// The underlying movement log, for audit queries.
    pub fn movement_log(&self) -> &Arc<L> {
        &self.log
    }

    /// Applies a stock movement atomically.
    ///
    /// Reads the current quantity, validates sufficiency, conditionally
    /// writes the new quantity (with its derived total value), and appends
    /// an immutable movement record stamped at commit time. Concurrent
    /// writers are detected by the compare-and-set and absorbed by a
    /// bounded re-read-and-retry loop.
    ///
    /// ## Failure Modes
    /// See [`LedgerError`]. Nothing is written before the sufficiency
    /// check passes, and `Timeout` is only surfaced while retrying is
    /// still safe; after the quantity write commits, the one remaining
    /// failure is `PartialCommit`.
    pub async fn apply_movement(
        &self,
        sku: &str,
        kind: MovementKind,
        qty: i64,
        actor: &Actor,
    ) -> LedgerResult<MovementReceipt> {
        // ── Validating ───────────────────────────────────────────────
        validate_sku(sku)?;
        validate_movement_qty(qty)?;
        validate_actor(actor)?;

        let deadline = Instant::now() + self.config.operation_timeout;
        let mut attempts: u32 = 0;

        // ── Reading ──────────────────────────────────────────────────
        let mut product = self.read_product(sku, deadline).await?;

        loop {
            attempts += 1;

            // ── Computing ────────────────────────────────────────────
            let delta = kind.signed(qty);
            let candidate = product.quantity.checked_add(delta).ok_or_else(|| {
                ValidationError::Overflow {
                    field: "quantity".to_string(),
                }
            })?;

            if candidate < 0 {
                debug!(
                    sku = %sku,
                    available = %product.quantity,
                    requested = %qty,
                    "insufficient stock, rejecting before any write"
                );
                return Err(LedgerError::InsufficientStock {
                    sku: sku.to_string(),
                    available: product.quantity,
                    requested: qty,
                });
            }

            let new_total_value_cents =
                derive_total_value_cents(candidate, product.unit_price_cents)?;

            // ── Writing ──────────────────────────────────────────────
            let cas = self
                .bounded(
                    sku,
                    deadline,
                    self.products.compare_and_set_quantity(
                        sku,
                        product.quantity,
                        candidate,
                        new_total_value_cents,
                    ),
                )
                .await?;

            match cas {
                Ok(committed) => {
                    // ── Logging ──────────────────────────────────────
                    return self.append_movement(committed, kind, qty, actor).await;
                }

                Err(StoreError::Conflict(_)) => {
                    if attempts >= self.config.max_cas_attempts {
                        warn!(sku = %sku, attempts = %attempts, "CAS retry budget exhausted");
                        return Err(LedgerError::Contention {
                            sku: sku.to_string(),
                            attempts,
                        });
                    }
                    if Instant::now() >= deadline {
                        return Err(LedgerError::Timeout {
                            sku: sku.to_string(),
                        });
                    }
                    debug!(sku = %sku, attempt = %attempts, "CAS conflict, re-reading");
                    product = self.read_product(sku, deadline).await?;
                }

                Err(StoreError::NotFound(_)) => {
                    // The product vanished between the read and the write.
                    return Err(LedgerError::ProductNotFound(sku.to_string()));
                }

                Err(other) => return Err(LedgerError::Storage(other)),
            }
        }
    }

    /// Appends the movement for a committed product write.
    ///
    /// The quantity write already landed: from here on the only failure is
    /// `PartialCommit`, carrying the updated product. A caller-side
    /// cancellation at this point likewise cannot roll the write back.
    async fn append_movement(
        &self,
        product: Product,
        kind: MovementKind,
        qty: i64,
        actor: &Actor,
    ) -> LedgerResult<MovementReceipt> {
        let mut movement = NewMovement::from_actor(product.sku.as_str(), kind, qty, actor);
        movement.timestamp_ms = Some(self.commit_timestamp_ms());

        let attempt_deadline = Instant::now() + self.config.attempt_timeout;
        let appended = match timeout_at(attempt_deadline, self.log.append(movement)).await {
            Ok(Ok(appended)) => appended,
            Ok(Err(source)) => {
                warn!(sku = %product.sku, error = %source, "movement append failed after commit");
                return Err(LedgerError::PartialCommit { product, source });
            }
            Err(_) => {
                warn!(sku = %product.sku, "movement append timed out after commit");
                return Err(LedgerError::PartialCommit {
                    product,
                    source: StoreError::Unavailable("movement append timed out".to_string()),
                });
            }
        };

        info!(
            sku = %product.sku,
            kind = %appended.kind,
            qty = %appended.qty,
            quantity = %product.quantity,
            actor = %appended.actor_id,
            "movement committed"
        );

        Ok(MovementReceipt {
            product,
            movement: appended,
        })
    }

    /// Reads the current product state, with deadlines applied.
    async fn read_product(&self, sku: &str, deadline: Instant) -> LedgerResult<Product> {
        match self.bounded(sku, deadline, self.products.get(sku)).await? {
            Ok(Some(product)) => Ok(product),
            Ok(None) => Err(LedgerError::ProductNotFound(sku.to_string())),
            Err(err) => Err(LedgerError::Storage(err)),
        }
    }

    /// Races a storage call against the per-attempt deadline, capped by
    /// the whole-operation deadline.
    async fn bounded<T>(
        &self,
        sku: &str,
        deadline: Instant,
        fut: impl Future<Output = T>,
    ) -> LedgerResult<T> {
        let attempt_deadline = Instant::now() + self.config.attempt_timeout;
        let effective = attempt_deadline.min(deadline);

        timeout_at(effective, fut).await.map_err(|_| {
            warn!(sku = %sku, "storage call exceeded its deadline");
            LedgerError::Timeout {
                sku: sku.to_string(),
            }
        })
    }

    /// Next commit timestamp: wall clock, clamped so the sequence handed
    /// out by this ledger never decreases even if the clock steps back.
    fn commit_timestamp_ms(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self.last_timestamp_ms.fetch_max(now, Ordering::AcqRel);
        now.max(prev)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
