//! # Error Types
//!
//! The full error taxonomy for the Estoque core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  estoque-core errors (this file)                                    │
//! │  ├── ValidationError  - Input validation failures                   │
//! │  ├── StoreError       - What the storage traits speak               │
//! │  └── LedgerError      - The public apply_movement taxonomy          │
//! │                                                                     │
//! │  estoque-db errors (separate crate)                                 │
//! │  └── DbError          - SQLite operation failures → StoreError      │
//! │                                                                     │
//! │  Flow: ValidationError → LedgerError::InvalidArgument               │
//! │        DbError → StoreError → LedgerError (mapped by the service)   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, quantities, attempts)
//! 3. Errors are enum variants, never String
//! 4. Transient failures (`Conflict`) are distinct from business
//!    rejections (`InsufficientStock`) and from caller errors

use thiserror::Error;

use crate::types::Product;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements, before any
/// business logic or storage access runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., characters outside the SKU alphabet).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Arithmetic on the value left the representable range.
    #[error("{field} exceeds the representable range")]
    Overflow { field: String },
}

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Store Error
// =============================================================================

/// Errors spoken by the storage traits ([`crate::store::ProductStore`],
/// [`crate::store::MovementLog`]).
///
/// Backends translate their native failures into these variants so the
/// ledger can react uniformly: `Conflict` drives the CAS retry loop,
/// `NotFound`/`DuplicateKey` map onto caller errors, and `Unavailable`
/// covers genuine storage faults.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record under the given key.
    #[error("product not found: {0}")]
    NotFound(String),

    /// A record under the given key already exists.
    #[error("duplicate key: '{0}' already exists")]
    DuplicateKey(String),

    /// A compare-and-set found the stored quantity no longer matches the
    /// expected value - a concurrent writer got there first.
    #[error("quantity conflict on {0}: concurrent update detected")]
    Conflict(String),

    /// The record to be written failed validation.
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationError),

    /// The storage layer itself failed (connection, disk, pool).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for Results with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Ledger Error
// =============================================================================

/// The public failure taxonomy of `apply_movement`.
///
/// ## Classification
/// ```text
/// InvalidArgument    caller error      never retried, surfaced verbatim
/// ProductNotFound    caller error      stale or wrong SKU
/// InsufficientStock  business rule     rejected BEFORE any write
/// Contention         transient         internally retried up to a bound
/// Timeout            transient         safe to retry, nothing committed
/// PartialCommit      recovery needed   product write landed, log did not
/// Storage            storage fault     anything the above doesn't cover
/// ```
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Caller input failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// No product under the given SKU.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// The movement would drive the stock level negative.
    ///
    /// Business-rule rejection, not a storage error: quantity is left
    /// unchanged, never clamped to zero.
    #[error("insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// The compare-and-set retry budget was exhausted by concurrent
    /// writers. The whole call is safe to retry.
    #[error("contention on {sku}: gave up after {attempts} attempts")]
    Contention { sku: String, attempts: u32 },

    /// A deadline elapsed before the quantity write committed. Nothing was
    /// committed at the business level, so the call is idempotent to retry.
    #[error("operation deadline exceeded for {sku}")]
    Timeout { sku: String },

    /// The product mutation committed but the movement log append failed.
    ///
    /// Carries the updated product so the caller can decide whether to
    /// compensate; an external reconciliation pass can synthesize the
    /// missing log entry from product diffs.
    #[error("product update committed for {} but movement log append failed", .product.sku)]
    PartialCommit {
        product: Product,
        #[source]
        source: StoreError,
    },

    /// A storage fault with no business meaning.
    #[error("storage error: {0}")]
    Storage(#[source] StoreError),
}

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
