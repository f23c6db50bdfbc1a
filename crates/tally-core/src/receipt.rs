//! # Receipt
//!
//! Builds the receipt payload from a finalized transaction and renders it as
//! fixed-width plain text for thermal printers or a text file.
//!
//! ## Layout (42 columns)
//! ```text
//!              Tally Dev Store
//!              1 Market Street
//! ------------------------------------------
//! Invoice: INV-000001
//! Date: 2026-01-31 14:03
//! ------------------------------------------
//! Cola 330ml
//!   3 x $100.00                      $300.00
//! ------------------------------------------
//! Subtotal                           $300.00
//! Tax (10%)                           $30.00
//! TOTAL                              $330.00
//! ------------------------------------------
//! Cash                               $400.00
//! Change                              $70.00
//! ```
//!
//! Amounts are formatted once, in [`Receipt::new`], with
//! [`CheckoutConfig::format_money`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::checkout::TransactionSnapshot;
use crate::config::CheckoutConfig;
use crate::money::Money;
use crate::types::TaxRate;

/// Narrowest width the text layout supports.
const MIN_WIDTH: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: String,
    pub unit_price: String,
    /// Per-line discount, if any
    pub line_discount: Option<String>,
    pub line_total: String,
}

/// A printable receipt with every amount already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store_name: String,
    pub store_address: Vec<String>,
    pub invoice_number: String,
    pub timestamp: String,
    pub is_refund: bool,
    pub refund_of: Option<String>,
    pub customer_reference: Option<String>,
    pub items: Vec<ReceiptItem>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub tax_label: String,
    pub tax: String,
    pub grand_total: String,
    pub payment_method: String,
    pub tendered: String,
    pub change: Option<String>,
    pub balance_due: Option<String>,
}

impl Receipt {
    /// Builds the receipt for a finalized transaction saved as `invoice_number`.
    pub fn new(
        snapshot: &TransactionSnapshot,
        config: &CheckoutConfig,
        invoice_number: impl Into<String>,
    ) -> Self {
        let fmt = |amount: Money| config.format_money(amount);
        let nonzero = |amount: Money| (!amount.is_zero()).then(|| config.format_money(amount));

        let items = snapshot
            .lines
            .iter()
            .map(|line| ReceiptItem {
                name: line.name.clone(),
                quantity: line.quantity.to_string(),
                unit_price: fmt(line.unit_price),
                line_discount: nonzero(line.line_discount),
                line_total: fmt(line.line_net),
            })
            .collect();

        let payment = &snapshot.payment;

        Receipt {
            store_name: config.store_name.clone(),
            store_address: config.store_address.clone(),
            invoice_number: invoice_number.into(),
            timestamp: snapshot.created_at.format("%Y-%m-%d %H:%M").to_string(),
            is_refund: snapshot.is_refund(),
            refund_of: snapshot.refund_of.clone(),
            customer_reference: snapshot.customer_reference.clone(),
            items,
            subtotal: fmt(snapshot.totals.subtotal),
            discount: nonzero(snapshot.totals.discount),
            tax_label: format!("Tax ({})", format_rate(snapshot.tax_rate)),
            tax: fmt(snapshot.totals.tax),
            grand_total: fmt(snapshot.totals.grand_total),
            payment_method: payment.method.label().to_string(),
            tendered: fmt(payment.tendered),
            change: nonzero(payment.change),
            balance_due: nonzero(payment.balance_due),
        }
    }

    /// Renders the receipt as plain text, `width` characters per line.
    pub fn render_text(&self, width: usize) -> String {
        let width = width.max(MIN_WIDTH);
        let rule = "-".repeat(width);
        let mut out: Vec<String> = Vec::new();

        out.push(center(&self.store_name, width));
        for line in &self.store_address {
            out.push(center(line, width));
        }
        out.push(rule.clone());

        if self.is_refund {
            out.push(center("*** REFUND ***", width));
        }
        out.push(truncate(&format!("Invoice: {}", self.invoice_number), width));
        if let Some(original) = &self.refund_of {
            out.push(truncate(&format!("Refund of: {}", original), width));
        }
        out.push(truncate(&format!("Date: {}", self.timestamp), width));
        if let Some(customer) = &self.customer_reference {
            out.push(truncate(&format!("Customer: {}", customer), width));
        }
        out.push(rule.clone());

        for item in &self.items {
            out.push(truncate(&item.name, width));
            out.push(columns(
                &format!("  {} x {}", item.quantity, item.unit_price),
                &item.line_total,
                width,
            ));
            if let Some(discount) = &item.line_discount {
                out.push(columns("  Line discount", &format!("-{}", discount), width));
            }
        }
        out.push(rule.clone());

        out.push(columns("Subtotal", &self.subtotal, width));
        if let Some(discount) = &self.discount {
            out.push(columns("Discount", &format!("-{}", discount), width));
        }
        out.push(columns(&self.tax_label, &self.tax, width));
        let total_label = if self.is_refund { "REFUND TOTAL" } else { "TOTAL" };
        out.push(columns(total_label, &self.grand_total, width));
        out.push(rule);

        if self.is_refund {
            out.push(columns(
                &format!("Refunded via {}", self.payment_method),
                &self.tendered,
                width,
            ));
        } else {
            out.push(columns(&self.payment_method, &self.tendered, width));
            if let Some(change) = &self.change {
                out.push(columns("Change", change, width));
            }
            if let Some(balance) = &self.balance_due {
                out.push(columns("Balance due", balance, width));
            }
        }

        out.push(String::new());
        out.push(center("Thank you!", width));

        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

/// `825` bps → `"8.25%"`, `1000` → `"10%"`.
fn format_rate(rate: TaxRate) -> String {
    let bps = rate.bps();
    let whole = bps / 100;
    let frac = bps % 100;
    if frac == 0 {
        format!("{}%", whole)
    } else {
        let digits = format!("{:02}", frac);
        format!("{}.{}%", whole, digits.trim_end_matches('0'))
    }
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn center(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = (width - text.chars().count()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// Left label, right-aligned value. The label is shortened if both don't fit.
fn columns(left: &str, right: &str, width: usize) -> String {
    let right_len = right.chars().count();
    let room = width.saturating_sub(right_len + 1);
    let left = truncate(left, room);
    let gap = width.saturating_sub(left.chars().count() + right_len);
    format!("{}{}{}", left, " ".repeat(gap.max(1)), right)
}
