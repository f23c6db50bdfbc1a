//! # Domain Types
//!
//! Core domain types shared by the cart, the refund path and the
//! persistence adapters.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ CatalogProduct  │   │  InvoiceRecord  │   │    Quantity     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, sku, name  │   │  invoice_number │   │  milli-units    │       │
//! │  │  retail_price   │   │  lines          │   │  1250 = 1.25    │       │
//! │  │  wholesale_price│   │  discount       │   └─────────────────┘       │
//! │  │  unit_cost      │   │  tax_rate       │                              │
//! │  │  stock_level    │   └─────────────────┘   ┌─────────────────┐       │
//! │  └─────────────────┘                         │    TaxRate      │       │
//! │                                              │  bps (u32)      │       │
//! │  ┌─────────────────┐   ┌─────────────────┐   │  1000 = 10%     │       │
//! │  │   CartMode      │   │ PaymentMethod   │   └─────────────────┘       │
//! │  │  NormalSale     │   │  Cash           │                              │
//! │  │  Refund         │   │  Card / Bank... │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The catalog and invoice records are fixed-field transfer structures.
//! Defaults (missing wholesale price, missing cost, untracked stock) are
//! applied once when a record is built, never inside cart arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for configuration input).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A quantity in thousandths of a unit.
///
/// Weighed goods sell fractional quantities (`1.25` kg), so a quantity is an
/// `i64` count of milli-units rather than a whole count or a float.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Milli-units per whole unit.
    pub const SCALE: i64 = 1000;

    /// Creates a quantity from milli-units (`1250` = 1.25).
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    /// Returns the quantity in milli-units.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Subtraction floored at zero.
    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        Quantity((self.0 - other.0).max(0))
    }
}

/// Shows whole quantities without decimals and trims trailing zeros
/// from fractional ones: `3`, `1.25`, `0.5`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let digits = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

// =============================================================================
// Cart Mode / Sale Type
// =============================================================================

/// Whether the cart is a forward sale or a refund against one invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartMode {
    /// Operator freely adds catalog products.
    #[default]
    NormalSale,
    /// Lines are copied from a single previously finalized invoice.
    Refund,
}

impl fmt::Display for CartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartMode::NormalSale => f.write_str("normal sale"),
            CartMode::Refund => f.write_str("refund"),
        }
    }
}

/// Retail or wholesale pricing for a sale.
///
/// Wholesale sales use the catalog's wholesale unit price and may be
/// settled partially (credit), unlike retail sales.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleType {
    #[default]
    Retail,
    Wholesale,
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; change may be due.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Direct bank transfer.
    BankTransfer,
    /// Mobile wallet payment.
    MobileMoney,
}

impl PaymentMethod {
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }

    /// Label printed on receipts.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::BankTransfer => "Bank transfer",
            PaymentMethod::MobileMoney => "Mobile money",
        }
    }
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// What a finalized transaction represents.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Refund,
}

// =============================================================================
// Catalog Product
// =============================================================================

/// A product as the catalog hands it to the cart.
///
/// ## Example
/// ```rust
/// use tally_core::{CatalogProduct, Money, Quantity};
///
/// let flour = CatalogProduct::new("p-7", "FLOUR-1KG", "Flour 1kg", Money::from_cents(250))
///     .with_wholesale_price(Money::from_cents(210))
///     .with_unit_cost(Money::from_cents(150))
///     .with_stock(Quantity::from_units(40));
///
/// assert_eq!(flour.stock_limit(), Some(Quantity::from_units(40)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogProduct {
    /// Unique identifier (UUID v4 in the SQLite catalog).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Unit price for retail sales.
    pub retail_price: Money,

    /// Unit price for wholesale sales.
    pub wholesale_price: Money,

    /// Cost basis per unit, for profit display.
    pub unit_cost: Money,

    /// Current stock level, if known.
    pub stock_level: Option<Quantity>,

    /// Whether stock is tracked for this product.
    pub track_stock: bool,

    /// Allow selling past zero stock.
    pub allow_negative_stock: bool,
}

impl CatalogProduct {
    /// Creates an untracked product whose wholesale price equals the retail
    /// price and whose cost is zero.
    pub fn new(
        id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        retail_price: Money,
    ) -> Self {
        CatalogProduct {
            id: id.into(),
            sku: sku.into(),
            barcode: None,
            name: name.into(),
            retail_price,
            wholesale_price: retail_price,
            unit_cost: Money::zero(),
            stock_level: None,
            track_stock: false,
            allow_negative_stock: false,
        }
    }

    pub fn with_wholesale_price(mut self, price: Money) -> Self {
        self.wholesale_price = price;
        self
    }

    pub fn with_unit_cost(mut self, cost: Money) -> Self {
        self.unit_cost = cost;
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Enables stock tracking with the given level.
    pub fn with_stock(mut self, level: Quantity) -> Self {
        self.track_stock = true;
        self.stock_level = Some(level);
        self
    }

    pub fn allowing_negative_stock(mut self) -> Self {
        self.allow_negative_stock = true;
        self
    }

    /// Unit price for the given sale type.
    pub fn price_for(&self, sale_type: SaleType) -> Money {
        match sale_type {
            SaleType::Retail => self.retail_price,
            SaleType::Wholesale => self.wholesale_price,
        }
    }

    /// Ceiling on the quantity a cart line may hold, if stock is enforced.
    ///
    /// `None` when stock is not tracked or negative stock is allowed.
    /// A tracked product with an unknown level is treated as zero stock.
    pub fn stock_limit(&self) -> Option<Quantity> {
        if !self.track_stock || self.allow_negative_stock {
            return None;
        }
        Some(self.stock_level.unwrap_or_default().max(Quantity::zero()))
    }
}

// =============================================================================
// Invoice Record (refund source)
// =============================================================================

/// One line of a previously finalized sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    /// Quantity sold (or still refundable, after prior refunds).
    pub quantity: Quantity,
    pub unit_price: Money,
    pub unit_cost: Money,
    /// Per-line discount given at sale time.
    pub line_discount: Money,
    /// What the line was charged before the document discount.
    pub line_net: Money,
}

/// A previously finalized sale, as the invoice store returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceRecord {
    pub invoice_number: String,
    pub lines: Vec<InvoiceLine>,
    /// Sum of the original line nets. Kept separately so proration stays
    /// anchored to the original sale even when lines were partly refunded.
    pub subtotal: Money,
    /// Document discount of the original sale.
    pub discount: Money,
    pub tax_rate: TaxRate,
    pub payment_method: PaymentMethod,
    pub sale_type: SaleType,
    pub customer_reference: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
