//! # Repository Module
//!
//! Repository implementations of the `estoque-core` storage traits.
//!
//! Each repository is a thin struct over the shared [`sqlx::SqlitePool`];
//! SQL is isolated here and nowhere else. The inherent methods speak
//! [`crate::error::DbError`]; the trait impls translate into
//! `estoque_core::StoreError` so the ledger never sees sqlx details.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - keyed product storage with
//!   compare-and-set on the stock level
//! - [`movement::MovementRepository`] - the append-only movement log

pub mod movement;
pub mod product;
