//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Cart / refund / payment rule violations        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → checkout screen message           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every cart operation either applies fully or returns one of these errors
//! with the cart left exactly as it was.

use thiserror::Error;

use crate::types::{CartMode, Quantity};

// =============================================================================
// Core Error
// =============================================================================

/// Checkout business logic errors.
///
/// These errors represent business rule violations. The checkout screen
/// catches them and shows a message; none of them is fatal.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Operation is not allowed in the cart's current mode.
    ///
    /// ## When This Occurs
    /// - Adding a catalog product while a refund invoice is loaded
    /// - Overriding a price or the document discount on a refund
    #[error("{operation} is not allowed in {mode} mode")]
    InvalidMode {
        operation: &'static str,
        mode: CartMode,
    },

    /// Insufficient stock to complete sale.
    ///
    /// ## When This Occurs
    /// - Product tracks stock, disallows negative stock, and the requested
    ///   line quantity is above the stock level captured from the catalog
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "COLA", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 COLA in stock"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: Quantity,
        requested: Quantity,
    },

    /// No prior invoice matches the identifier, exactly or by numeric suffix.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Invoice exists but every line has already been refunded.
    #[error("Nothing left to refund on invoice {0}")]
    NothingRefundable(String),

    /// Tendered amount fails the rule for the payment method.
    #[error("Payment rejected: {reason}")]
    PaymentValidation { reason: String },

    /// Line index does not exist in the cart.
    #[error("Cart line {0} does not exist")]
    LineNotFound(usize),

    /// Finalize was called with nothing to sell or refund.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: Quantity, max: Quantity },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a PaymentValidation error.
    pub fn payment(reason: impl Into<String>) -> Self {
        CoreError::PaymentValidation {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
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

    /// Invalid format (e.g., invalid SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
