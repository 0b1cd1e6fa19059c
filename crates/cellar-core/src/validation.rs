//! # Validation Module
//!
//! Input validation for the back office.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (cellar-api)                                    │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── Parsing of floats and free text into typed values                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: business rule validation                        │
//! │  └── Runs before any arithmetic, so bad input never becomes NaN        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (reference_key, entry_kind) on cash flows                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest bottle the calculator accepts (30 L keg).
pub const MAX_VOLUME_ML: u32 = 30_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty, at most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use cellar_core::validation::validate_sku;
///
/// assert!(validate_sku("DASSAI-45-720").is_ok());
/// assert!(validate_sku("").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
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

/// Validates a required free-text name (product or customer).
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a tenant identifier taken from a request header.
pub fn validate_tenant_id(tenant_id: &str) -> ValidationResult<()> {
    let tenant_id = tenant_id.trim();

    if tenant_id.is_empty() {
        return Err(ValidationError::Required {
            field: "tenant_id".to_string(),
        });
    }

    if tenant_id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "tenant_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (9999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates that a monetary field is not negative.
///
/// ## Example
/// ```rust
/// use cellar_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("unit_price", 0).is_ok());
/// assert!(validate_non_negative("unit_price", -100).is_err());
/// ```
pub fn validate_non_negative(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates alcohol by volume in basis points (0% to 100%).
pub fn validate_abv(abv_bps: u32) -> ValidationResult<()> {
    if abv_bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "abv".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a bottle volume in millilitres.
pub fn validate_volume(volume_ml: u32) -> ValidationResult<()> {
    if volume_ml == 0 || volume_ml > MAX_VOLUME_ML {
        return Err(ValidationError::OutOfRange {
            field: "volume_ml".to_string(),
            min: 1,
            max: MAX_VOLUME_ML as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Decimal Input
// =============================================================================

/// Largest decimal amount accepted from a client (one trillion major units).
const MAX_DECIMAL_AMOUNT: f64 = 1_000_000_000_000.0;

/// Converts a non-negative decimal amount from a client into minor units.
///
/// ## Example
/// ```rust
/// use cellar_core::validation::decimal_to_cents;
///
/// assert_eq!(decimal_to_cents("amount", 80_000.0).unwrap(), 8_000_000);
/// assert_eq!(decimal_to_cents("amount", 12.5).unwrap(), 1_250);
/// assert!(decimal_to_cents("amount", f64::NAN).is_err());
/// assert!(decimal_to_cents("amount", -1.0).is_err());
/// ```
pub fn decimal_to_cents(field: &str, value: f64) -> ValidationResult<i64> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if value > MAX_DECIMAL_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_DECIMAL_AMOUNT as i64,
        });
    }

    Ok((value * 100.0).round() as i64)
}

/// Converts an ABV percentage (e.g. `15.5`) into basis points.
pub fn percent_to_bps(field: &str, percent: f64) -> ValidationResult<u32> {
    if !percent.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if !(0.0..=100.0).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok((percent * 100.0).round() as u32)
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of line items on one sale.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 0,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates one sale line as submitted by a client.
pub fn validate_sale_line(
    quantity: i64,
    unit_price_cents: i64,
    actual_unit_price_cents: Option<i64>,
) -> ValidationResult<()> {
    validate_quantity(quantity)?;
    validate_unit_price("unit_price", unit_price_cents)?;
    if let Some(actual) = actual_unit_price_cents {
        validate_unit_price("actual_unit_price", actual)?;
    }
    Ok(())
}

fn validate_unit_price(field: &str, cents: i64) -> ValidationResult<()> {
    validate_non_negative(field, cents)?;
    if cents > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
