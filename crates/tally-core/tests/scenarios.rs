//! End-to-end checkout scenarios: sale totals, discount clamping,
//! partial and full refunds, and tender rules.

use tally_core::{
    Cart, CartMode, CatalogProduct, CheckoutConfig, CoreError, InvoiceRecord, Money,
    PaymentMethod, Quantity, SaleType, TaxRate, TransactionKind,
};

fn config() -> CheckoutConfig {
    CheckoutConfig {
        tax_rate: TaxRate::from_bps(1000),
        ..CheckoutConfig::default()
    }
}

/// 100.00 each, cost 60.00
fn widget() -> CatalogProduct {
    CatalogProduct::new("w-1", "WIDGET", "Widget", Money::from_cents(10000))
        .with_unit_cost(Money::from_cents(6000))
}

fn three_widgets() -> Cart {
    let mut cart = Cart::new(&config());
    cart.add_line(&widget(), Quantity::from_units(3)).unwrap();
    cart
}

/// A saved sale of three widgets with a 30.00 document discount.
fn discounted_invoice() -> InvoiceRecord {
    let mut cart = three_widgets();
    cart.set_document_discount(Money::from_cents(3000)).unwrap();
    let snapshot = cart
        .finalize(PaymentMethod::Cash, Money::from_cents(30000))
        .unwrap();
    snapshot.to_invoice_record("INV-000001")
}

#[test]
fn scenario_a_single_line_totals() {
    let totals = three_widgets().compute_totals();

    assert_eq!(totals.subtotal.cents(), 30000);
    assert_eq!(totals.discount.cents(), 0);
    assert_eq!(totals.tax.cents(), 3000);
    assert_eq!(totals.grand_total.cents(), 33000);
    assert_eq!(totals.total_cost_basis.cents(), 18000);
    assert_eq!(totals.profit.cents(), 15000);
    assert_eq!(totals.items_count, 1);
}

#[test]
fn scenario_b_document_discount() {
    let mut cart = three_widgets();
    cart.set_document_discount(Money::from_cents(5000)).unwrap();
    let totals = cart.compute_totals();

    assert_eq!(totals.discount.cents(), 5000);
    assert_eq!(totals.tax.cents(), 2500);
    assert_eq!(totals.grand_total.cents(), 27500);
}

#[test]
fn scenario_c_discount_clamped_to_subtotal() {
    let mut cart = three_widgets();
    cart.set_document_discount(Money::from_cents(100000)).unwrap();
    let totals = cart.compute_totals();

    assert_eq!(totals.discount.cents(), 30000);
    assert_eq!(totals.tax.cents(), 0);
    assert_eq!(totals.grand_total.cents(), 0);
}

#[test]
fn scenario_d_partial_refund_prorates_discount() {
    let invoices = vec![discounted_invoice()];
    let mut cart = Cart::new(&config());

    cart.load_refund_source(&invoices, "1").unwrap();
    assert_eq!(cart.mode(), CartMode::Refund);
    assert_eq!(cart.lines()[0].quantity, Quantity::from_units(3));

    cart.set_line_quantity(0, Quantity::from_units(1)).unwrap();
    let totals = cart.compute_totals();

    assert_eq!(totals.subtotal.cents(), 10000);
    assert_eq!(totals.discount.cents(), 1000);
    assert_eq!(totals.tax.cents(), 900);
    assert_eq!(totals.grand_total.cents(), 9900);
}

#[test]
fn scenario_e_cash_tender_rules() {
    let mut cart = three_widgets();

    let err = cart
        .finalize(PaymentMethod::Cash, Money::from_cents(30000))
        .unwrap_err();
    assert!(matches!(err, CoreError::PaymentValidation { .. }));
    assert_eq!(cart.compute_totals().grand_total.cents(), 33000);

    let exact = cart
        .finalize(PaymentMethod::Cash, Money::from_cents(33000))
        .unwrap();
    assert_eq!(exact.payment.change.cents(), 0);
    assert!(cart.is_empty());

    let mut cart = three_widgets();
    let over = cart
        .finalize(PaymentMethod::Cash, Money::from_cents(40000))
        .unwrap();
    assert_eq!(over.payment.change.cents(), 7000);
}

#[test]
fn full_refund_returns_exactly_what_was_charged() {
    let mut cart = Cart::new(&config());
    let cheese = CatalogProduct::new("c-1", "CHEESE", "Cheese per kg", Money::from_cents(1999));
    let bread = CatalogProduct::new("b-1", "BREAD", "Bread", Money::from_cents(333));
    cart.add_line(&cheese, Quantity::from_milli(1375)).unwrap();
    cart.add_line(&bread, Quantity::from_units(7)).unwrap();
    cart.set_line_discount(1, Money::from_cents(101)).unwrap();
    cart.set_document_discount(Money::from_cents(777)).unwrap();

    let due = cart.compute_totals().grand_total;
    let sale = cart.finalize(PaymentMethod::Card, due).unwrap();

    let invoices = vec![sale.to_invoice_record("INV-000042")];
    cart.load_refund_source(&invoices, "INV-000042").unwrap();
    let refund = cart.finalize(PaymentMethod::Cash, Money::zero()).unwrap();

    assert_eq!(refund.kind, TransactionKind::Refund);
    assert_eq!(refund.refund_of.as_deref(), Some("INV-000042"));
    assert_eq!(refund.totals.subtotal, sale.totals.subtotal);
    assert_eq!(refund.totals.discount, sale.totals.discount);
    assert_eq!(refund.totals.tax, sale.totals.tax);
    assert_eq!(refund.totals.grand_total, sale.totals.grand_total);
    assert_eq!(refund.payment.paid, sale.totals.grand_total);
}

#[test]
fn refund_with_every_line_zeroed_is_empty() {
    let invoices = vec![discounted_invoice()];
    let mut cart = Cart::new(&config());
    cart.load_refund_source(&invoices, "INV-000001").unwrap();
    cart.set_line_quantity(0, Quantity::zero()).unwrap();

    assert!(matches!(
        cart.finalize(PaymentMethod::Cash, Money::zero()),
        Err(CoreError::EmptyCart)
    ));
    assert_eq!(cart.mode(), CartMode::Refund);
}

#[test]
fn refund_uses_original_tax_rate_and_sale_type() {
    let mut cart = three_widgets();
    cart.set_sale_type(SaleType::Wholesale).unwrap();
    let sale = cart
        .finalize(PaymentMethod::Cash, Money::from_cents(33000))
        .unwrap();
    let record = sale.to_invoice_record("INV-000007");

    let mut later = Cart::new(&CheckoutConfig {
        tax_rate: TaxRate::from_bps(1500),
        ..CheckoutConfig::default()
    });
    later.load_refund_invoice(record).unwrap();

    assert_eq!(later.tax_rate().bps(), 1000);
    assert_eq!(later.sale_type(), SaleType::Wholesale);
    assert_eq!(later.compute_totals().grand_total.cents(), 33000);
}

#[test]
fn unknown_invoice_is_reported() {
    let invoices = vec![discounted_invoice()];
    let mut cart = Cart::new(&config());

    let err = cart.load_refund_source(&invoices, "RF-12").unwrap_err();
    assert!(matches!(err, CoreError::InvoiceNotFound(ref id) if id == "RF-12"));
}
