//! # Validation Module
//!
//! Input checks applied at the edges (terminal arguments, CSV import) before
//! anything reaches the cart or the database.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Terminal arguments / CSV cells                               │
//! │  └── THIS MODULE: format and range checks                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart / refund rules (cart.rs, refund.rs)                     │
//! │  └── stock bounds, refund caps, checkout preconditions                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── NOT NULL, UNIQUE, CHECK (refunded_qty BETWEEN 0 AND qty_sold)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::BPS_PER_WHOLE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Not empty, at most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use sari_core::validation::validate_sku;
///
/// assert!(validate_sku("CANTON-60G").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
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

/// Validates a product name: not blank, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity typed by an operator (> 0).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a price in centavos. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }
    Ok(())
}

/// Validates a percent discount in basis points (0% to 100%).
///
/// ## Example
/// ```rust
/// use sari_core::validation::validate_discount_bps;
///
/// assert!(validate_discount_bps(1000).is_ok());   // 10%
/// assert!(validate_discount_bps(10001).is_err()); // over 100%
/// ```
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps as i64 > BPS_PER_WHOLE {
        return Err(ValidationError::OutOfRange {
            field: "discount percent".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

/// Parses a percent string like `10`, `12.5` or `12.5%` into basis points.
pub fn parse_percent_bps(raw: &str) -> ValidationResult<u32> {
    let raw = raw.trim().trim_end_matches('%');
    let invalid = || ValidationError::InvalidFormat {
        field: "discount percent".to_string(),
        reason: format!("'{}' is not a percentage", raw),
    };

    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.is_empty() || frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole: u32 = whole.parse().map_err(|_| invalid())?;
    let frac: u32 = match frac.len() {
        0 => 0,
        1 => frac.parse::<u32>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };

    let bps = whole
        .checked_mul(100)
        .and_then(|b| b.checked_add(frac))
        .ok_or_else(invalid)?;
    validate_discount_bps(bps)?;
    Ok(bps)
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string (sale and product ids).
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("CANTON-60G").is_ok());
        assert!(validate_sku("soap_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Lucky Me Pancit Canton").is_ok());
        assert!(validate_product_name(" ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_numeric_validators() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_discount_bps(10000).is_ok());
    }

    #[test]
    fn test_parse_percent_bps() {
        assert_eq!(parse_percent_bps("10").unwrap(), 1000);
        assert_eq!(parse_percent_bps("12.5%").unwrap(), 1250);
        assert_eq!(parse_percent_bps("0.05").unwrap(), 5);
        assert!(parse_percent_bps("101").is_err());
        assert!(parse_percent_bps("ten").is_err());
        assert!(parse_percent_bps("1.234").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
