//! # estoque-db: SQLite Storage Backend
//!
//! SQLite implementations of the `estoque-core` storage traits.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  estoque-ledger (LedgerService)                                     │
//! │       │  via ProductStore / MovementLog traits                      │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                  estoque-db (THIS CRATE)                      │  │
//! │  │                                                               │  │
//! │  │  ┌────────────┐   ┌──────────────────┐   ┌────────────────┐  │  │
//! │  │  │  Database  │   │   Repositories   │   │   Migrations   │  │  │
//! │  │  │ (pool.rs)  │◄──│ ProductRepository│   │   (embedded)   │  │  │
//! │  │  │ SqlitePool │   │ MovementRepository│  │ 001_initial…   │  │  │
//! │  │  └────────────┘   └──────────────────┘   └────────────────┘  │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (WAL mode)                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, movement)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use estoque_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/estoque.db")).await?;
//! let product = db.products().get_by_sku("SKU-0001").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::movement::MovementRepository;
pub use repository::product::ProductRepository;
