//! # tally-core: Pure Checkout Logic for Tally POS
//!
//! This crate is the checkout calculator of Tally POS: the in-progress cart,
//! its totals, invoice-scoped refunds, payment settlement and the receipt
//! payload. Everything here is synchronous and free of I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Checkout Screen (GUI, external)                 │   │
//! │  │    Search ──► Cart ──► Tender ──► Receipt                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ │   │
//! │  │   │  money  │ │  cart   │ │ refund  │ │ checkout │ │ receipt │ │   │
//! │  │   │  Money  │ │  Cart   │ │proration│ │ payment  │ │  text   │ │   │
//! │  │   │ TaxRate │ │CartLine │ │ lookup  │ │ snapshot │ │ layout  │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │         catalog lookup, invoice lookup, transaction save        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CatalogProduct, InvoiceRecord, Quantity, TaxRate...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - The cart/checkout calculator
//! - [`refund`] - Invoice resolution and discount proration for refunds
//! - [`checkout`] - Payment settlement and the finalized transaction snapshot
//! - [`receipt`] - Receipt payload and plain-text rendering
//! - [`ports`] - Traits for the collaborators the calculator consumes
//! - [`config`] - Explicit checkout configuration
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::cart::Cart;
//! use tally_core::config::CheckoutConfig;
//! use tally_core::types::{PaymentMethod, Quantity};
//! use tally_core::{CatalogProduct, Money};
//!
//! let config = CheckoutConfig::default(); // 10% tax
//! let mut cart = Cart::new(&config);
//!
//! let product = CatalogProduct::new("p-1", "COLA-330", "Cola 330ml", Money::from_cents(10000));
//! cart.add_line(&product, Quantity::from_units(3)).unwrap();
//!
//! let totals = cart.compute_totals();
//! assert_eq!(totals.grand_total.cents(), 33000);
//!
//! let snapshot = cart.finalize(PaymentMethod::Cash, Money::from_cents(40000)).unwrap();
//! assert_eq!(snapshot.payment.change.cents(), 7000);
//! assert!(cart.is_empty());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod money;
pub mod ports;
pub mod receipt;
pub mod refund;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartTotals};
pub use checkout::{PaymentSummary, SnapshotLine, TransactionSnapshot};
pub use config::CheckoutConfig;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps receipts printable.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line, in whole units.
///
/// ## Business Reason
/// Catches typing 1000 instead of 10 at the register.
pub const MAX_LINE_UNITS: i64 = 999;

/// Maximum quantity of a single line as a [`Quantity`].
pub const MAX_LINE_QUANTITY: Quantity = Quantity::from_units(MAX_LINE_UNITS);

/// Maximum unit price in cents ($10,000,000.00).
///
/// ## Business Reason
/// Catches runaway price edits. With [`MAX_CART_LINES`] and
/// [`MAX_LINE_UNITS`] a cart tops out near 10^14 cents with tax, far inside
/// `i64`, so no total can overflow.
pub const MAX_UNIT_PRICE: Money = Money::from_cents(1_000_000_000);
