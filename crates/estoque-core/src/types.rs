//! # Domain Types
//!
//! Core domain types for the Estoque inventory ledger.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────┐    ┌──────────────────┐    ┌───────────────┐   │
//! │  │    Product      │    │  StockMovement   │    │     Actor     │   │
//! │  │  ─────────────  │    │  ──────────────  │    │  ───────────  │   │
//! │  │  sku (key)      │◄───│  product_sku     │    │  id           │   │
//! │  │  name           │    │  qty, kind       │    │  name?        │   │
//! │  │  unit_price     │    │  actor_id/name   │    └───────────────┘   │
//! │  │  quantity       │    │  timestamp_ms    │                        │
//! │  │  total_value    │    │  (immutable)     │                        │
//! │  └─────────────────┘    └──────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The movement's `product_sku` is a weak reference: the product may be
//! mutated or deleted later, the movement record never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;
use crate::validation::{
    validate_product_name, validate_sku, validate_unit_price,
};

// =============================================================================
// Movement Kind
// =============================================================================

/// The direction of a stock movement.
///
/// Direction is carried here, never by the sign of `qty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock entering (restock, return).
    In,
    /// Stock leaving (sale, scan-and-deduct).
    Out,
}

impl MovementKind {
    /// Applies the direction to a positive quantity.
    ///
    /// ## Example
    /// ```rust
    /// use estoque_core::types::MovementKind;
    ///
    /// assert_eq!(MovementKind::In.signed(5), 5);
    /// assert_eq!(MovementKind::Out.signed(5), -5);
    /// ```
    #[inline]
    pub const fn signed(&self, qty: i64) -> i64 {
        match self {
            MovementKind::In => qty,
            MovementKind::Out => -qty,
        }
    }

    /// The lowercase wire/database name of the kind.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The already-authenticated identity performing an operation.
///
/// Authentication itself happens elsewhere; the ledger only records who
/// asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identity token of the caller. Required, non-empty.
    pub id: String,
    /// Human-readable name, when the identity layer supplies one.
    pub name: Option<String>,
}

impl Actor {
    /// Creates an actor with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            name: None,
        }
    }

    /// Creates an actor with an id and display name.
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// The name to record on movements: the supplied name, or the id when
    /// no usable name exists. Stored movement rows always carry a
    /// non-empty actor name.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product under inventory control, keyed by SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Stock Keeping Unit - the unique key, immutable once created.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Optional category label.
    pub category: Option<String>,

    /// Optional supplier label.
    pub supplier: Option<String>,

    /// Unit price in centavos. Never negative.
    pub unit_price_cents: i64,

    /// Current stock level. Never negative; the ledger rejects any
    /// operation that would drive it below zero.
    pub quantity: i64,

    /// Derived: `quantity * unit_price_cents`. Recomputed on every
    /// mutation, never stored independently of its inputs.
    pub total_value_cents: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the derived total value as a Money type.
    #[inline]
    pub fn total_value(&self) -> Money {
        Money::from_cents(self.total_value_cents)
    }

    /// Checks whether `qty` units can leave stock right now.
    #[inline]
    pub fn can_deduct(&self, qty: i64) -> bool {
        self.quantity >= qty
    }
}

/// Computes the derived total value for a quantity at a unit price.
///
/// Overflow is a validation failure, not a panic or a wrap.
pub fn derive_total_value_cents(quantity: i64, unit_price_cents: i64) -> ValidationResult<i64> {
    Money::from_cents(unit_price_cents)
        .checked_multiply_quantity(quantity)
        .map(|m| m.cents())
        .ok_or_else(|| ValidationError::Overflow {
            field: "total_value_cents".to_string(),
        })
}

// =============================================================================
// New Product
// =============================================================================

/// Input for creating a product. The store assigns timestamps and the
/// derived total value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    /// Unit price in centavos, non-negative.
    pub unit_price_cents: i64,
    /// Initial stock level, non-negative.
    pub quantity: i64,
}

impl NewProduct {
    /// Validates the input and builds the stored form.
    ///
    /// Used by every `ProductStore::create` implementation so the
    /// validation and total-value rules live in exactly one place.
    pub fn into_product(self, now: DateTime<Utc>) -> ValidationResult<Product> {
        validate_sku(&self.sku)?;
        validate_product_name(&self.name)?;
        validate_unit_price(self.unit_price_cents)?;
        if self.quantity < 0 {
            return Err(ValidationError::Negative {
                field: "quantity".to_string(),
            });
        }
        let total_value_cents = derive_total_value_cents(self.quantity, self.unit_price_cents)?;

        Ok(Product {
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            category: self.category,
            supplier: self.supplier,
            unit_price_cents: self.unit_price_cents,
            quantity: self.quantity,
            total_value_cents,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Product Patch
// =============================================================================

/// Partial update for the non-quantity fields of a product.
///
/// `None` leaves a field unchanged. Quantity is deliberately absent: stock
/// levels move only through the compare-and-set primitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub unit_price_cents: Option<i64>,
}

impl ProductPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.supplier.is_none()
            && self.unit_price_cents.is_none()
    }

    /// Applies the patch to a stored product, revalidating changed fields
    /// and recomputing the derived total value.
    pub fn apply(self, mut product: Product, now: DateTime<Utc>) -> ValidationResult<Product> {
        if let Some(name) = self.name {
            validate_product_name(&name)?;
            product.name = name.trim().to_string();
        }
        if let Some(category) = self.category {
            product.category = Some(category);
        }
        if let Some(supplier) = self.supplier {
            product.supplier = Some(supplier);
        }
        if let Some(unit_price_cents) = self.unit_price_cents {
            validate_unit_price(unit_price_cents)?;
            product.unit_price_cents = unit_price_cents;
        }
        product.total_value_cents =
            derive_total_value_cents(product.quantity, product.unit_price_cents)?;
        product.updated_at = now;
        Ok(product)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// An immutable record of a quantity change.
///
/// Created exactly once, at the moment a quantity-changing operation
/// commits, and never altered afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    /// Unique id, assigned by the log at append time.
    pub id: String,

    /// Weak reference to the product's SKU.
    pub product_sku: String,

    /// Quantity moved. Always positive; see [`StockMovement::kind`].
    pub qty: i64,

    /// Direction of the movement. Serialized as `type` for compatibility
    /// with the existing movement feed consumers.
    #[serde(rename = "type")]
    pub kind: MovementKind,

    /// Who performed the movement.
    pub actor_id: String,

    /// Display name of the actor at the time of the movement. Non-empty.
    pub actor_name: String,

    /// Milliseconds since epoch, assigned by the ledger at commit time.
    /// Monotonically non-decreasing across the log.
    pub timestamp_ms: i64,
}

impl StockMovement {
    /// The commit instant as a UTC datetime, when representable.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }

    /// The quantity with direction applied: positive for `in`, negative
    /// for `out`.
    #[inline]
    pub fn signed_qty(&self) -> i64 {
        self.kind.signed(self.qty)
    }
}

// =============================================================================
// New Movement
// =============================================================================

/// Input for appending a movement. The log assigns `id`, and
/// `timestamp_ms` when the caller left it unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_sku: String,
    pub qty: i64,
    #[serde(rename = "type")]
    pub kind: MovementKind,
    pub actor_id: String,
    pub actor_name: String,
    /// Commit timestamp. The ledger sets this; ad-hoc appenders may leave
    /// it `None` and let the log assign the current time.
    pub timestamp_ms: Option<i64>,
}

impl NewMovement {
    /// Builds a movement input from an actor, leaving the timestamp to be
    /// assigned at commit time.
    pub fn from_actor(
        product_sku: impl Into<String>,
        kind: MovementKind,
        qty: i64,
        actor: &Actor,
    ) -> Self {
        NewMovement {
            product_sku: product_sku.into(),
            qty,
            kind,
            actor_id: actor.id.clone(),
            actor_name: actor.display_name().to_string(),
            timestamp_ms: None,
        }
    }

    /// Materializes the stored form with a log-assigned id, falling back
    /// to `fallback_timestamp_ms` when no timestamp was set.
    ///
    /// Used by every `MovementLog::append` implementation.
    pub fn into_movement(self, id: String, fallback_timestamp_ms: i64) -> StockMovement {
        let timestamp_ms = self.timestamp_ms.unwrap_or(fallback_timestamp_ms);
        StockMovement {
            id,
            product_sku: self.product_sku,
            qty: self.qty,
            kind: self.kind,
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            timestamp_ms,
        }
    }
}

// =============================================================================
// Movement Filter
// =============================================================================

/// Parameters for [`crate::store::MovementLog::query`].
///
/// All fields are optional; an empty filter matches the whole log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    /// Restrict to one product's movements.
    pub sku: Option<String>,
    /// Restrict to one direction.
    pub kind: Option<MovementKind>,
    /// Inclusive lower bound on `timestamp_ms`.
    pub since_ms: Option<i64>,
    /// Exclusive upper bound on `timestamp_ms`.
    pub until_ms: Option<i64>,
}

impl MovementFilter {
    /// Filter for a single SKU.
    pub fn for_sku(sku: impl Into<String>) -> Self {
        MovementFilter {
            sku: Some(sku.into()),
            ..MovementFilter::default()
        }
    }

    /// Whether a movement satisfies this filter. Shared by in-memory
    /// backends; the SQL backend expresses the same predicate in its
    /// WHERE clause.
    pub fn matches(&self, movement: &StockMovement) -> bool {
        if let Some(sku) = &self.sku {
            if &movement.product_sku != sku {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if movement.kind != kind {
                return false;
            }
        }
        if let Some(since) = self.since_ms {
            if movement.timestamp_ms < since {
                return false;
            }
        }
        if let Some(until) = self.until_ms {
            if movement.timestamp_ms >= until {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
