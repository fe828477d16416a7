//! # estoque-core: Pure Business Logic for the Estoque Inventory Ledger
//!
//! This crate is the **heart** of Estoque. It contains the domain model and
//! business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Estoque Architecture                             │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │           Callers (scan devices, admin tooling)               │  │
//! │  └─────────────────────────────┬─────────────────────────────────┘  │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐  │
//! │  │         estoque-ledger (LedgerService, ScanIngestor)          │  │
//! │  └─────────────────────────────┬─────────────────────────────────┘  │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐  │
//! │  │              ★ estoque-core (THIS CRATE) ★                    │  │
//! │  │                                                               │  │
//! │  │   ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌────────────────┐  │  │
//! │  │   │  types  │ │  money  │ │ validation │ │ store (traits) │  │  │
//! │  │   └─────────┘ └─────────┘ └────────────┘ └────────────────┘  │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │  │
//! │  └─────────────────────────────┬─────────────────────────────────┘  │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐  │
//! │  │              estoque-db (SQLite backend)                      │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, Actor, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - The error taxonomy (validation, store, ledger)
//! - [`validation`] - Business rule validation
//! - [`store`] - Storage abstractions implemented by backends
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input = same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use estoque_core::Product` instead of
// `use estoque_core::types::Product`

pub use error::{LedgerError, LedgerResult, StoreError, ValidationError};
pub use money::Money;
pub use store::{MovementLog, ProductStore};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a SKU, in bytes.
///
/// Matches the widest code the scan hardware emits plus headroom; anything
/// longer is a mis-scan, not a SKU.
pub const MAX_SKU_LEN: usize = 50;

/// Maximum length of a product name, in bytes.
pub const MAX_NAME_LEN: usize = 200;
