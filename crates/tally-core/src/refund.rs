//! # Refund Support
//!
//! Invoice resolution and discount proration for invoice-scoped refunds.
//!
//! ## Proration
//! ```text
//! Original sale                       Refund (1 of 3 returned)
//! ─────────────                       ────────────────────────
//! 3 × 100.00 = 300.00  (subtotal)     1 × 100.00 = 100.00  (refund gross)
//! discount     30.00                  discount = 30.00 × 100.00 / 300.00
//!                                              = 10.00
//! ```
//!
//! The refund gives back a proportional slice of the original document
//! discount, never all of it and never none of it. The slice is computed
//! against the original subtotal, which the invoice record carries
//! explicitly, so a second partial refund of the same invoice prorates
//! against the same base as the first.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::ports::{numeric_suffix, InvoiceLookup};
use crate::types::{InvoiceRecord, SaleType, TaxRate};
use crate::validation::validate_invoice_identifier;

/// The invoice a refund cart was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundSource {
    pub invoice_number: String,
    /// Sum of the original line nets.
    pub original_subtotal: Money,
    /// Document discount the original sale was given.
    pub original_discount: Money,
    /// Tax rate the original sale was charged at.
    pub tax_rate: TaxRate,
    pub sale_type: SaleType,
}

impl RefundSource {
    pub fn from_record(record: &InvoiceRecord) -> Self {
        RefundSource {
            invoice_number: record.invoice_number.clone(),
            original_subtotal: record.subtotal,
            original_discount: record.discount,
            tax_rate: record.tax_rate,
            sale_type: record.sale_type,
        }
    }

    /// Share of the original discount returned for `refund_amount` worth of
    /// goods, clamped to `[0, refund_amount]`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::refund::RefundSource;
    /// use tally_core::{Money, SaleType, TaxRate};
    ///
    /// let source = RefundSource {
    ///     invoice_number: "INV-000001".to_string(),
    ///     original_subtotal: Money::from_cents(30000),
    ///     original_discount: Money::from_cents(3000),
    ///     tax_rate: TaxRate::from_bps(1000),
    ///     sale_type: SaleType::Retail,
    /// };
    /// assert_eq!(source.discount_share(Money::from_cents(10000)).cents(), 1000);
    /// ```
    pub fn discount_share(&self, refund_amount: Money) -> Money {
        self.original_discount
            .prorate(refund_amount.cents(), self.original_subtotal.cents())
            .clamp_to(Money::zero(), refund_amount)
    }
}

/// Resolves an operator-typed identifier to a prior invoice.
///
/// Tries an exact match first, then falls back to the numeric suffix so
/// that `"1"` and `"0001"` both find `"INV-000001"`.
///
/// ## Errors
/// - `Validation` if the identifier is blank or too long
/// - `InvoiceNotFound` if neither match succeeds
pub fn resolve_invoice<L>(lookup: &L, identifier: &str) -> CoreResult<InvoiceRecord>
where
    L: InvoiceLookup + ?Sized,
{
    let identifier = validate_invoice_identifier(identifier)?;

    if let Some(record) = lookup.find_exact(&identifier) {
        debug!(invoice = %record.invoice_number, "Invoice matched exactly");
        return Ok(record);
    }

    if let Some(suffix) = numeric_suffix(&identifier) {
        if let Some(record) = lookup.find_by_numeric_suffix(suffix) {
            debug!(
                identifier = %identifier,
                invoice = %record.invoice_number,
                "Invoice matched by numeric suffix"
            );
            return Ok(record);
        }
    }

    Err(CoreError::InvoiceNotFound(identifier))
}
