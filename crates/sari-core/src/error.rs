//! # Error Types
//!
//! Domain-specific error types for sari-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sari-core errors (this file)                                          │
//! │  ├── CoreError        - Caller errors: reject, no state change         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  sari-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - Core(CoreError) | StorageFailure(DbError)      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → AppError           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data-integrity conditions (oversold stock, capped refunds) are NOT errors.
//! They are returned as values alongside a successful result.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is a caller error: the operation is rejected and no state
/// changes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout was attempted on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cash tendered does not cover the discounted total.
    ///
    /// ## When This Occurs
    /// ```text
    /// Total after discount: ₱200.00
    /// Cash tendered:        ₱150.00
    ///      │
    ///      ▼
    /// InsufficientPayment { required: ₱200.00, tendered: ₱150.00 }
    /// ```
    #[error("Insufficient payment: required {required}, tendered {tendered}")]
    InsufficientPayment { required: Money, tendered: Money },

    /// Product has no stock, or adding would exceed the known stock.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// A requested line quantity is outside `[1, available]`.
    ///
    /// Unlike a UI stepper, the request is rejected rather than clamped so
    /// the caller is told.
    #[error("Quantity {requested} for {product_id} is outside 1..={available}")]
    StockExceeded {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// A refund was submitted without any lines.
    #[error("No items selected for refund")]
    NoItemsSelected,

    /// The admin secret did not match.
    #[error("Unauthorized: admin authorization failed")]
    Unauthorized,

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A refund line names a product that is not part of the sale.
    #[error("Product {product_id} is not part of sale {sale_id}")]
    LineNotInSale { sale_id: String, product_id: String },

    /// Cart line operation on a product that is not in the cart.
    #[error("Product {0} not in cart")]
    ProductNotInCart(String),

    /// Waiting cart lookup failed.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Custom report range is inverted.
    #[error("Invalid report range: {start} is after {end}")]
    InvalidReportRange { start: String, end: String },

    /// CSV could not be read or written.
    #[error("CSV error: {0}")]
    Csv(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<csv::Error> for CoreError {
    fn from(err: csv::Error) -> Self {
        CoreError::Csv(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unparsable amount or date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            name: "Lucky Me Pancit Canton".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Lucky Me Pancit Canton: available 3, requested 5"
        );

        let err = CoreError::InsufficientPayment {
            required: Money::from_cents(20000),
            tendered: Money::from_cents(15000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: required ₱200.00, tendered ₱150.00"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
