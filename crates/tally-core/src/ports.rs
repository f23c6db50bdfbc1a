//! # Collaborator Ports
//!
//! Traits for the services the checkout calculator consumes but does not own.
//!
//! The calculator is synchronous, so the refund path takes any
//! [`InvoiceLookup`]. The SQLite store in `tally-db` is async; it fetches the
//! [`InvoiceRecord`] itself and hands it to
//! [`Cart::load_refund_invoice`](crate::cart::Cart::load_refund_invoice).

use crate::types::InvoiceRecord;

/// Finds previously finalized invoices for the refund path.
///
/// ## Matching Rules
/// ```text
/// operator types "0001"
///      │
///      ▼
/// find_exact("0001") ──► hit? ──► done
///      │ miss
///      ▼
/// numeric_suffix("0001") = 1
///      │
///      ▼
/// find_by_numeric_suffix(1) ──► "INV-0001"
/// ```
pub trait InvoiceLookup {
    /// Invoice whose number equals `invoice_number` exactly.
    fn find_exact(&self, invoice_number: &str) -> Option<InvoiceRecord>;

    /// Invoice whose number ends in digits equal to `suffix`.
    ///
    /// When several invoices match, the most recent one wins.
    fn find_by_numeric_suffix(&self, suffix: u64) -> Option<InvoiceRecord>;
}

/// Parses the trailing run of ASCII digits in `value`.
///
/// ```rust
/// use tally_core::ports::numeric_suffix;
///
/// assert_eq!(numeric_suffix("INV-0001"), Some(1));
/// assert_eq!(numeric_suffix("42"), Some(42));
/// assert_eq!(numeric_suffix("INV-"), None);
/// ```
pub fn numeric_suffix(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    let digits_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    trimmed[digits_start..].parse().ok()
}

/// An in-memory invoice list, oldest first.
impl InvoiceLookup for [InvoiceRecord] {
    fn find_exact(&self, invoice_number: &str) -> Option<InvoiceRecord> {
        self.iter()
            .find(|record| record.invoice_number == invoice_number)
            .cloned()
    }

    fn find_by_numeric_suffix(&self, suffix: u64) -> Option<InvoiceRecord> {
        self.iter()
            .rev()
            .find(|record| numeric_suffix(&record.invoice_number) == Some(suffix))
            .cloned()
    }
}

impl InvoiceLookup for Vec<InvoiceRecord> {
    fn find_exact(&self, invoice_number: &str) -> Option<InvoiceRecord> {
        self.as_slice().find_exact(invoice_number)
    }

    fn find_by_numeric_suffix(&self, suffix: u64) -> Option<InvoiceRecord> {
        self.as_slice().find_by_numeric_suffix(suffix)
    }
}
