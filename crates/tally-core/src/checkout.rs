//! # Checkout
//!
//! Payment settlement and the finalized transaction snapshot.
//!
//! ## Finalize Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart.finalize(method, tendered)                                        │
//! │       │                                                                 │
//! │       ├── nothing to sell or refund? ──────────► EmptyCart              │
//! │       │                                                                 │
//! │       ├── compute_totals()                                              │
//! │       │                                                                 │
//! │       ├── settle payment                                                │
//! │       │     Refund ............ pay out grand_total, tender ignored     │
//! │       │     Wholesale ......... partial payment allowed (credit)        │
//! │       │     Retail + Cash ..... tendered >= grand_total, change due     │
//! │       │     Retail + other .... tendered == grand_total (± tolerance)   │
//! │       │          │                                                      │
//! │       │          └── rule violated? ───────────► PaymentValidation      │
//! │       │                                                                 │
//! │       ├── build TransactionSnapshot                                     │
//! │       │                                                                 │
//! │       └── cart.clear()  (only on success)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{Cart, CartLine, CartTotals};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    CartMode, InvoiceLine, InvoiceRecord, PaymentMethod, Quantity, SaleType, TaxRate,
    TransactionKind,
};

// =============================================================================
// Payment Summary
// =============================================================================

/// How a transaction was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub method: PaymentMethod,
    /// Amount the customer handed over
    pub tendered: Money,
    /// Amount applied to the transaction (paid out, for refunds)
    pub paid: Money,
    /// Returned to the customer
    pub change: Money,
    /// Left on credit (wholesale only)
    pub balance_due: Money,
}

/// Applies the method-specific tender rule to a forward sale.
fn settle_sale(
    sale_type: SaleType,
    method: PaymentMethod,
    tendered: Money,
    grand_total: Money,
    tolerance: Money,
) -> CoreResult<PaymentSummary> {
    if tendered.is_negative() {
        return Err(CoreError::payment(format!(
            "tendered amount {} cannot be negative",
            tendered
        )));
    }

    if sale_type == SaleType::Wholesale {
        let paid = tendered.min(grand_total);
        return Ok(PaymentSummary {
            method,
            tendered,
            paid,
            change: tendered - paid,
            balance_due: grand_total - paid,
        });
    }

    if method.is_cash() {
        if tendered < grand_total {
            return Err(CoreError::payment(format!(
                "tendered {} is less than total {}",
                tendered, grand_total
            )));
        }
        return Ok(PaymentSummary {
            method,
            tendered,
            paid: grand_total,
            change: tendered - grand_total,
            balance_due: Money::zero(),
        });
    }

    if (tendered - grand_total).abs() > tolerance {
        return Err(CoreError::payment(format!(
            "{} payment of {} must match total {}",
            method.label(),
            tendered,
            grand_total
        )));
    }

    Ok(PaymentSummary {
        method,
        tendered,
        paid: grand_total,
        change: Money::zero(),
        balance_due: Money::zero(),
    })
}

// =============================================================================
// Transaction Snapshot
// =============================================================================

/// One line of a finalized transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub unit_cost: Money,
    pub line_discount: Money,
    /// Line amount after the per-line discount
    pub line_net: Money,
    /// This line's slice of the document discount
    pub document_discount_share: Money,
    /// Quantity the refunded invoice line had left before this refund
    pub refundable_quantity: Option<Quantity>,
}

impl SnapshotLine {
    fn from_line(line: &CartLine, document_discount_share: Money) -> Self {
        SnapshotLine {
            product_id: line.product_id.clone(),
            sku: line.sku.clone(),
            name: line.display_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_sale_price,
            unit_cost: line.unit_cost,
            line_discount: line.applied_line_discount(),
            line_net: line.net(),
            document_discount_share,
            refundable_quantity: line.max_refundable_quantity(),
        }
    }
}

/// Immutable record of a finalized sale or refund.
///
/// Handed to the persistence collaborator and to the receipt renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSnapshot {
    /// UUID v4
    pub id: String,
    pub kind: TransactionKind,
    pub sale_type: SaleType,
    pub lines: Vec<SnapshotLine>,
    pub totals: CartTotals,
    pub tax_rate: TaxRate,
    pub payment: PaymentSummary,
    pub customer_reference: Option<String>,
    /// Invoice number this refund was taken against
    pub refund_of: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionSnapshot {
    pub fn is_refund(&self) -> bool {
        self.kind == TransactionKind::Refund
    }

    /// The sale as a refund source, once saved under `invoice_number`.
    pub fn to_invoice_record(&self, invoice_number: impl Into<String>) -> InvoiceRecord {
        InvoiceRecord {
            invoice_number: invoice_number.into(),
            lines: self
                .lines
                .iter()
                .map(|line| InvoiceLine {
                    product_id: line.product_id.clone(),
                    sku: line.sku.clone(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    unit_cost: line.unit_cost,
                    line_discount: line.line_discount,
                    line_net: line.line_net,
                })
                .collect(),
            subtotal: self.totals.subtotal,
            discount: self.totals.discount,
            tax_rate: self.tax_rate,
            payment_method: self.payment.method,
            sale_type: self.sale_type,
            customer_reference: self.customer_reference.clone(),
        }
    }
}

// =============================================================================
// Finalize
// =============================================================================

impl Cart {
    /// Validates payment and produces the transaction snapshot.
    ///
    /// On success the cart is cleared. On failure it is left exactly as it
    /// was so the operator can correct the tender.
    ///
    /// ## Errors
    /// - `EmptyCart` if no line has a quantity above zero
    /// - `PaymentValidation` if the tender breaks the rule for the method
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::{Cart, CatalogProduct, CheckoutConfig, CoreError, Money, PaymentMethod, Quantity};
    ///
    /// let mut cart = Cart::new(&CheckoutConfig::default());
    /// let soap = CatalogProduct::new("p-2", "SOAP", "Soap", Money::from_cents(10000));
    /// cart.add_line(&soap, Quantity::from_units(3)).unwrap(); // 330.00 with tax
    ///
    /// let short = cart.finalize(PaymentMethod::Cash, Money::from_cents(30000));
    /// assert!(matches!(short, Err(CoreError::PaymentValidation { .. })));
    /// assert!(!cart.is_empty());
    ///
    /// let snapshot = cart.finalize(PaymentMethod::Cash, Money::from_cents(40000)).unwrap();
    /// assert_eq!(snapshot.payment.change.cents(), 7000);
    /// ```
    pub fn finalize(
        &mut self,
        method: PaymentMethod,
        tendered: Money,
    ) -> CoreResult<TransactionSnapshot> {
        let snapshot = self.build_snapshot(method, tendered)?;

        info!(
            id = %snapshot.id,
            kind = ?snapshot.kind,
            lines = snapshot.lines.len(),
            grand_total = %snapshot.totals.grand_total,
            method = method.label(),
            "Transaction finalized"
        );

        self.clear();
        Ok(snapshot)
    }

    fn build_snapshot(
        &self,
        method: PaymentMethod,
        tendered: Money,
    ) -> CoreResult<TransactionSnapshot> {
        let totals = self.compute_totals();
        if totals.items_count == 0 {
            return Err(CoreError::EmptyCart);
        }

        let (kind, payment) = match self.mode() {
            CartMode::Refund => (
                TransactionKind::Refund,
                PaymentSummary {
                    method,
                    tendered: totals.grand_total,
                    paid: totals.grand_total,
                    change: Money::zero(),
                    balance_due: Money::zero(),
                },
            ),
            CartMode::NormalSale => (
                TransactionKind::Sale,
                settle_sale(
                    self.sale_type(),
                    method,
                    tendered,
                    totals.grand_total,
                    self.payment_tolerance(),
                )?,
            ),
        };

        let lines = self
            .lines()
            .iter()
            .zip(self.discount_shares())
            .filter(|(line, _)| line.quantity.is_positive())
            .map(|(line, share)| SnapshotLine::from_line(line, share))
            .collect();

        Ok(TransactionSnapshot {
            id: Uuid::new_v4().to_string(),
            kind,
            sale_type: self.sale_type(),
            lines,
            totals,
            tax_rate: self.tax_rate(),
            payment,
            customer_reference: self.customer_reference().map(str::to_string),
            refund_of: self.refund_source().map(|s| s.invoice_number.clone()),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::types::CatalogProduct;

    fn cart_totaling_330() -> Cart {
        let mut cart = Cart::new(&CheckoutConfig::default());
        let p = CatalogProduct::new("1", "SKU-1", "Widget", Money::from_cents(10000))
            .with_unit_cost(Money::from_cents(6000));
        cart.add_line(&p, Quantity::from_units(3)).unwrap();
        assert_eq!(cart.compute_totals().grand_total.cents(), 33000);
        cart
    }

    #[test]
    fn test_cash_requires_full_tender() {
        let mut cart = cart_totaling_330();
        let err = cart
            .finalize(PaymentMethod::Cash, Money::from_cents(30000))
            .unwrap_err();
        assert!(matches!(err, CoreError::PaymentValidation { .. }));
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_cash_exact_and_change() {
        let mut cart = cart_totaling_330();
        let snapshot = cart
            .finalize(PaymentMethod::Cash, Money::from_cents(33000))
            .unwrap();
        assert!(snapshot.payment.change.is_zero());
        assert_eq!(snapshot.kind, TransactionKind::Sale);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_card_must_match_exactly() {
        let mut cart = cart_totaling_330();
        assert!(cart
            .finalize(PaymentMethod::Card, Money::from_cents(40000))
            .is_err());
        assert!(cart
            .finalize(PaymentMethod::Card, Money::from_cents(32999))
            .is_err());

        let snapshot = cart
            .finalize(PaymentMethod::Card, Money::from_cents(33000))
            .unwrap();
        assert_eq!(snapshot.payment.paid.cents(), 33000);
        assert!(snapshot.payment.change.is_zero());
    }

    #[test]
    fn test_non_cash_tolerance() {
        let config = CheckoutConfig {
            payment_tolerance: Money::from_cents(1),
            ..CheckoutConfig::default()
        };
        let mut cart = Cart::new(&config);
        let p = CatalogProduct::new("1", "SKU-1", "Widget", Money::from_cents(10000));
        cart.add_line(&p, Quantity::from_units(3)).unwrap();

        let snapshot = cart
            .finalize(PaymentMethod::MobileMoney, Money::from_cents(32999))
            .unwrap();
        assert_eq!(snapshot.payment.paid.cents(), 33000);
    }

    #[test]
    fn test_wholesale_allows_credit() {
        let mut cart = cart_totaling_330();
        cart.set_sale_type(SaleType::Wholesale).unwrap();
        let total = cart.compute_totals().grand_total;

        let snapshot = cart
            .finalize(PaymentMethod::Cash, Money::from_cents(10000))
            .unwrap();
        assert_eq!(snapshot.payment.paid.cents(), 10000);
        assert_eq!(snapshot.payment.balance_due, total - Money::from_cents(10000));
        assert!(snapshot.payment.change.is_zero());
        assert_eq!(snapshot.sale_type, SaleType::Wholesale);
    }

    #[test]
    fn test_wholesale_overpayment_gives_change() {
        let mut cart = cart_totaling_330();
        cart.set_sale_type(SaleType::Wholesale).unwrap();

        let snapshot = cart
            .finalize(PaymentMethod::BankTransfer, Money::from_cents(35000))
            .unwrap();
        assert_eq!(snapshot.payment.change.cents(), 2000);
        assert!(snapshot.payment.balance_due.is_zero());
    }

    #[test]
    fn test_negative_tender_rejected() {
        let mut cart = cart_totaling_330();
        cart.set_sale_type(SaleType::Wholesale).unwrap();
        assert!(matches!(
            cart.finalize(PaymentMethod::Cash, Money::from_cents(-1)),
            Err(CoreError::PaymentValidation { .. })
        ));
    }

    #[test]
    fn test_empty_cart_rejected() {
        let mut cart = Cart::new(&CheckoutConfig::default());
        assert!(matches!(
            cart.finalize(PaymentMethod::Cash, Money::from_cents(100)),
            Err(CoreError::EmptyCart)
        ));
    }

    #[test]
    fn test_snapshot_lines_carry_discount_share() {
        let mut cart = cart_totaling_330();
        cart.set_document_discount(Money::from_cents(5000)).unwrap();
        cart.set_customer(Some("CUST-1".to_string()));

        let snapshot = cart
            .finalize(PaymentMethod::Cash, Money::from_cents(30000))
            .unwrap();
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].document_discount_share.cents(), 5000);
        assert_eq!(snapshot.lines[0].line_net.cents(), 30000);
        assert_eq!(snapshot.totals.grand_total.cents(), 27500);
        assert_eq!(snapshot.customer_reference.as_deref(), Some("CUST-1"));
        assert!(snapshot.refund_of.is_none());
        assert!(Uuid::parse_str(&snapshot.id).is_ok());
    }

    #[test]
    fn test_snapshot_discount_shares_sum_to_discount() {
        let mut cart = Cart::new(&CheckoutConfig::default());
        for id in ["1", "2", "3"] {
            let p = CatalogProduct::new(id, format!("SKU-{}", id), "Widget", Money::from_cents(100));
            cart.add_line(&p, Quantity::from_units(1)).unwrap();
        }
        cart.set_document_discount(Money::from_cents(100)).unwrap();

        let snapshot = cart
            .finalize(PaymentMethod::Cash, Money::from_cents(220))
            .unwrap();
        let shares: Money = snapshot
            .lines
            .iter()
            .map(|line| line.document_discount_share)
            .sum();
        assert_eq!(shares, snapshot.totals.discount);
        assert_eq!(snapshot.totals.grand_total.cents(), 220);
    }

    #[test]
    fn test_refund_of_credit_sale_pays_out_full_total() {
        let mut cart = cart_totaling_330();
        cart.set_sale_type(SaleType::Wholesale).unwrap();
        let sale = cart
            .finalize(PaymentMethod::Cash, Money::from_cents(10000))
            .unwrap();
        assert!(sale.payment.balance_due.is_positive());

        cart.load_refund_invoice(sale.to_invoice_record("INV-000001")).unwrap();
        let refund = cart.finalize(PaymentMethod::Cash, Money::zero()).unwrap();
        assert_eq!(refund.totals.grand_total, sale.totals.grand_total);
        assert_eq!(refund.payment.paid, sale.totals.grand_total);
        assert!(refund.payment.balance_due.is_zero());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut cart = cart_totaling_330();
        let snapshot = cart
            .finalize(PaymentMethod::Cash, Money::from_cents(33000))
            .unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("grandTotal").is_none());
        assert_eq!(json["totals"]["grandTotal"], 33000);
        assert_eq!(json["payment"]["method"], "cash");
        assert_eq!(json["kind"], "sale");
    }
}
