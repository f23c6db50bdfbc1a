//! Property-based tests for the cart arithmetic.
//!
//! Run with: `cargo test -p tally-core --test cart_properties`

use proptest::prelude::*;
use tally_core::{
    Cart, CatalogProduct, CheckoutConfig, InvoiceLine, InvoiceRecord, Money, PaymentMethod,
    Quantity, SaleType, TaxRate,
};

const PRICES: [i64; 5] = [1, 99, 333, 1999, 125_000];

fn catalog() -> Vec<CatalogProduct> {
    PRICES
        .iter()
        .enumerate()
        .map(|(i, &cents)| {
            CatalogProduct::new(
                format!("p-{}", i),
                format!("SKU-{}", i),
                format!("Item {}", i),
                Money::from_cents(cents),
            )
            .with_unit_cost(Money::from_cents(cents / 2))
        })
        .collect()
}

/// `price × milli / 1000`, rounded half up, for non-negative inputs.
fn expected_line(price_cents: i64, milli: i64) -> i64 {
    ((price_cents as i128 * milli as i128 + 500) / 1000) as i64
}

#[derive(Debug, Clone)]
enum Op {
    Add { product: usize, milli: i64 },
    SetQuantity { index: usize, milli: i64 },
    Remove { index: usize },
    Discount(i64),
}

// ── Proptest Strategies ─────────────────────────────────────────────────────

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..PRICES.len(), 1..20_000i64).prop_map(|(product, milli)| Op::Add { product, milli }),
        (0..6usize, -2_000..20_000i64)
            .prop_map(|(index, milli)| Op::SetQuantity { index, milli }),
        (0..6usize).prop_map(|index| Op::Remove { index }),
        (-50_000..500_000i64).prop_map(Op::Discount),
    ]
}

fn arb_tax_rate() -> impl Strategy<Value = TaxRate> {
    prop_oneof![
        Just(TaxRate::zero()),
        Just(TaxRate::from_bps(825)),
        Just(TaxRate::from_bps(1000)),
        (0u32..=3000).prop_map(TaxRate::from_bps),
    ]
}

fn build_cart(tax_rate: TaxRate, ops: &[Op]) -> Cart {
    let catalog = catalog();
    let mut cart = Cart::new(&CheckoutConfig {
        tax_rate,
        ..CheckoutConfig::default()
    });
    for op in ops {
        // Rejected operations leave the cart untouched, which is part of
        // what the properties check.
        let _ = match op {
            Op::Add { product, milli } => {
                cart.add_line(&catalog[*product], Quantity::from_milli(*milli))
            }
            Op::SetQuantity { index, milli } => {
                cart.set_line_quantity(*index, Quantity::from_milli(*milli))
            }
            Op::Remove { index } => {
                cart.remove_line(*index);
                Ok(())
            }
            Op::Discount(cents) => cart.set_document_discount(Money::from_cents(*cents)),
        };
    }
    cart
}

/// An invoice whose lines were sold at their undiscounted amounts.
fn arb_invoice() -> impl Strategy<Value = InvoiceRecord> {
    (
        prop::collection::vec((0..PRICES.len(), 1..10_000i64), 1..=4),
        0..=100i64,
        arb_tax_rate(),
    )
        .prop_map(|(picks, discount_pct, tax_rate)| {
            let lines: Vec<InvoiceLine> = picks
                .iter()
                .enumerate()
                .map(|(i, &(p, milli))| {
                    let price = PRICES[p];
                    InvoiceLine {
                        product_id: format!("p-{}", i),
                        sku: format!("SKU-{}", i),
                        name: format!("Item {}", i),
                        quantity: Quantity::from_milli(milli),
                        unit_price: Money::from_cents(price),
                        unit_cost: Money::from_cents(price / 2),
                        line_discount: Money::zero(),
                        line_net: Money::from_cents(expected_line(price, milli)),
                    }
                })
                .collect();
            let subtotal: Money = lines.iter().map(|l| l.line_net).sum();
            InvoiceRecord {
                invoice_number: "INV-000001".to_string(),
                lines,
                subtotal,
                discount: subtotal.prorate(discount_pct, 100),
                tax_rate,
                payment_method: PaymentMethod::Cash,
                sale_type: SaleType::Retail,
                customer_reference: None,
            }
        })
}

// ── Property Tests ──────────────────────────────────────────────────────────

proptest! {
    /// The subtotal always matches an independent recomputation.
    #[test]
    fn subtotal_matches_lines(tax in arb_tax_rate(), ops in prop::collection::vec(arb_op(), 0..30)) {
        let cart = build_cart(tax, &ops);
        let expected: i64 = cart
            .lines()
            .iter()
            .map(|l| expected_line(l.unit_sale_price.cents(), l.quantity.milli()))
            .sum();
        prop_assert_eq!(cart.compute_totals().subtotal.cents(), expected);
    }

    /// Discount stays within [0, subtotal] and the totals identity holds.
    #[test]
    fn totals_are_consistent(tax in arb_tax_rate(), ops in prop::collection::vec(arb_op(), 0..30)) {
        let cart = build_cart(tax, &ops);
        let totals = cart.compute_totals();

        prop_assert!(!totals.discount.is_negative());
        prop_assert!(totals.discount <= totals.subtotal);
        prop_assert_eq!(totals.grand_total, totals.subtotal - totals.discount + totals.tax);
        prop_assert!(!totals.grand_total.is_negative());
        prop_assert_eq!(totals.profit, totals.grand_total - totals.total_cost_basis);
    }

    /// compute_totals has no side effects.
    #[test]
    fn compute_totals_is_idempotent(ops in prop::collection::vec(arb_op(), 0..30)) {
        let cart = build_cart(TaxRate::from_bps(1000), &ops);
        prop_assert_eq!(cart.compute_totals(), cart.compute_totals());
    }

    /// Sale lines never hold a non-positive quantity.
    #[test]
    fn sale_lines_stay_positive(ops in prop::collection::vec(arb_op(), 0..30)) {
        let cart = build_cart(TaxRate::zero(), &ops);
        prop_assert!(cart.lines().iter().all(|l| l.quantity.is_positive()));
    }

    /// Refund quantities never exceed what was bought, whatever is requested.
    #[test]
    fn refund_quantity_bounded(
        invoice in arb_invoice(),
        edits in prop::collection::vec((0..4usize, -5_000..50_000i64), 0..20),
    ) {
        let mut cart = Cart::new(&CheckoutConfig::default());
        cart.load_refund_invoice(invoice.clone()).unwrap();

        for (index, milli) in edits {
            let _ = cart.set_line_quantity(index, Quantity::from_milli(milli));
        }

        for (line, original) in cart.lines().iter().zip(invoice.lines.iter()) {
            prop_assert!(line.quantity >= Quantity::zero());
            prop_assert!(line.quantity <= original.quantity);
        }

        let totals = cart.compute_totals();
        prop_assert!(totals.discount <= totals.subtotal);
        prop_assert!(totals.subtotal <= invoice.subtotal);
    }

    /// Refunding every line in full returns the original charge exactly.
    #[test]
    fn full_refund_matches_original(invoice in arb_invoice()) {
        let mut cart = Cart::new(&CheckoutConfig::default());
        cart.load_refund_invoice(invoice.clone()).unwrap();
        let totals = cart.compute_totals();

        let taxable = invoice.subtotal - invoice.discount;
        let original_total = taxable + taxable.calculate_tax(invoice.tax_rate);

        prop_assert_eq!(totals.subtotal, invoice.subtotal);
        prop_assert_eq!(totals.discount, invoice.discount);
        prop_assert_eq!(totals.grand_total, original_total);
    }
}

