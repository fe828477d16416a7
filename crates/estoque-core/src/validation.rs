//! # Validation Module
//!
//! Input validation for the Estoque core.
//!
//! Validation runs before business logic and before any storage access, so
//! every `InvalidArgument` surfaces without a write having been attempted.
//! The database layer enforces the same rules again through NOT NULL /
//! CHECK / UNIQUE constraints.
//!
//! ## Usage
//! ```rust
//! use estoque_core::validation::{validate_sku, validate_movement_qty};
//!
//! assert!(validate_sku("SKU-0001").is_ok());
//! assert!(validate_movement_qty(5).is_ok());
//! assert!(validate_movement_qty(0).is_err());
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::types::Actor;
use crate::{MAX_NAME_LEN, MAX_SKU_LEN};

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most [`MAX_SKU_LEN`] bytes
/// - Only alphanumeric characters, hyphens, and underscores
///
/// ## Example
/// ```rust
/// use estoque_core::validation::validate_sku;
///
/// assert!(validate_sku("SKU-0001").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("no spaces").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most [`MAX_NAME_LEN`] bytes
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement quantity: strictly positive. Direction is carried
/// by the movement kind, never by sign.
pub fn validate_movement_qty(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price in centavos: zero is allowed, negative is not.
pub fn validate_unit_price(unit_price_cents: i64) -> ValidationResult<()> {
    if unit_price_cents < 0 {
        return Err(ValidationError::Negative {
            field: "unit_price_cents".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Actor Validator
// =============================================================================

/// Validates the acting identity: the id must be non-empty. The name is
/// optional; movement records fall back to the id when it is missing.
pub fn validate_actor(actor: &Actor) -> ValidationResult<()> {
    if actor.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "actor_id".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
