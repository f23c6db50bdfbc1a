//! # tally-db: Database Layer for Tally POS
//!
//! SQLite persistence for the checkout: the product catalog the cart adds
//! lines from, and the store of finalized sales and refunds that refund
//! carts are loaded from.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-core (Cart, TransactionSnapshot, InvoiceRecord)                  │
//! │       ▲                              │                                  │
//! │       │ CatalogProduct / InvoiceRecord  │ TransactionSnapshot            │
//! │       │                              ▼                                  │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     tally-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐   │    │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │   │    │
//! │  │   │   (pool.rs)   │◄───│ ProductRepo    │    │  (embedded)  │   │    │
//! │  │   │  SqlitePool   │    │ SaleRepo       │    │ 001_init.sql │   │    │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘   │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product and sale repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::{Cart, CheckoutConfig, PaymentMethod, Quantity};
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let mut cart = Cart::new(&CheckoutConfig::from_env());
//!
//! if let Some(product) = db.products().get_by_barcode("5449000000996").await? {
//!     cart.add_line(&product, Quantity::from_units(2))?;
//! }
//! let due = cart.compute_totals().grand_total;
//! let snapshot = cart.finalize(PaymentMethod::Cash, due)?;
//! let invoice_number = db.sales().save_transaction(&snapshot).await?;
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
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
