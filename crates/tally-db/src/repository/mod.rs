//! # Repository Module
//!
//! Database repositories behind the checkout.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout screen                                                        │
//! │       │                                                                 │
//! │       ├── db.products().get_by_barcode(code) ──► cart.add_line          │
//! │       │                                                                 │
//! │       ├── db.sales().find_refundable_invoice(id)                        │
//! │       │                                 ──► cart.load_refund_invoice    │
//! │       │                                                                 │
//! │       └── cart.finalize() ──► db.sales().save_transaction(&snapshot)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog lookup, search, stock
//! - [`SaleRepository`](sale::SaleRepository) - Transaction storage and invoice lookup

pub mod product;
pub mod sale;
