//! # Cart
//!
//! The in-progress transaction: line items, document discount, tax rate and
//! the sale/refund mode flag. Totals are derived on demand from this state.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Cart Method               State Change        │
//! │  ───────────────          ───────────               ────────────        │
//! │                                                                         │
//! │  Scan / pick product ───► add_line() ─────────────► lines.push / qty+= │
//! │  Edit quantity ─────────► set_line_quantity() ────► lines[i].quantity  │
//! │  Override price ────────► set_line_price() ───────► lines[i].price     │
//! │  Discount whole sale ───► set_document_discount() ► document_discount  │
//! │  Type invoice number ───► load_refund_source() ───► mode = Refund      │
//! │  Tender ────────────────► finalize() ─────────────► snapshot + clear   │
//! │                                                                         │
//! │  NOTE: Every method applies fully or returns an error with the cart    │
//! │        untouched. compute_totals() never mutates.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modes
//! - **NormalSale**: any catalog product may be added; prices follow the
//!   retail/wholesale toggle unless overridden.
//! - **Refund**: lines come from one prior invoice only. Quantities may be
//!   lowered (partial refund) but never raised above what was bought.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::config::CheckoutConfig;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::ports::InvoiceLookup;
use crate::refund::{resolve_invoice, RefundSource};
use crate::types::{
    CartMode, CatalogProduct, InvoiceLine, InvoiceRecord, Quantity, SaleType, TaxRate,
};
use crate::validation::{validate_price, validate_quantity};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY, MAX_UNIT_PRICE};

// =============================================================================
// Cart Line
// =============================================================================

/// Ceiling a refund line's quantity is held under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RefundAllowance {
    /// Quantity still refundable on the original invoice line.
    pub bought_quantity: Quantity,
    /// What the original line was charged for `bought_quantity`,
    /// before the document discount.
    pub original_net: Money,
}

/// A line in the cart.
///
/// ## Design Notes
/// - Name, SKU and prices are frozen when the line is created. Later catalog
///   edits do not move a line already in the cart.
/// - Both catalog prices are cached so the retail/wholesale toggle can
///   reprice the line without another catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Catalog product id (not owned by the cart)
    pub product_id: String,

    /// SKU at time of adding (display only)
    pub sku: String,

    /// Product name at time of adding
    pub display_name: String,

    pub quantity: Quantity,

    /// Price charged per unit
    pub unit_sale_price: Money,

    /// Cost basis per unit, for profit display only
    pub unit_cost: Money,

    /// Per-line discount, applied before the document discount
    pub line_discount: Money,

    /// Operator edited the price by hand; the sale-type toggle leaves it alone
    pub price_overridden: bool,

    pub retail_price: Money,
    pub wholesale_price: Money,

    /// Stock ceiling captured from the catalog, when enforced
    pub stock_limit: Option<Quantity>,

    /// Present on refund lines only
    pub refund: Option<RefundAllowance>,
}

impl CartLine {
    /// Seeds a sale line, rejecting catalog prices outside `[0, MAX_UNIT_PRICE]`.
    fn from_product(
        product: &CatalogProduct,
        quantity: Quantity,
        sale_type: SaleType,
    ) -> CoreResult<Self> {
        validate_price(product.retail_price)?;
        validate_price(product.wholesale_price)?;
        validate_price(product.unit_cost)?;

        Ok(CartLine {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            display_name: product.name.clone(),
            quantity,
            unit_sale_price: product.price_for(sale_type),
            unit_cost: product.unit_cost,
            line_discount: Money::zero(),
            price_overridden: false,
            retail_price: product.retail_price,
            wholesale_price: product.wholesale_price,
            stock_limit: product.stock_limit(),
            refund: None,
        })
    }

    /// Seeds a refund line for the full refundable quantity.
    fn from_invoice_line(line: &InvoiceLine) -> Self {
        CartLine {
            product_id: line.product_id.clone(),
            sku: line.sku.clone(),
            display_name: line.name.clone(),
            quantity: line.quantity,
            unit_sale_price: line.unit_price,
            unit_cost: line.unit_cost,
            line_discount: Money::zero(),
            price_overridden: false,
            retail_price: line.unit_price,
            wholesale_price: line.unit_price,
            stock_limit: None,
            refund: Some(RefundAllowance {
                bought_quantity: line.quantity,
                original_net: line.line_net,
            }),
        }
    }

    /// Line amount before the per-line discount.
    ///
    /// A refund line is worth its share of what the original line was
    /// charged, so refunding everything returns exactly the original net.
    pub fn gross(&self) -> Money {
        match self.refund {
            Some(allowance) => allowance
                .original_net
                .prorate(self.quantity.milli(), allowance.bought_quantity.milli()),
            None => self.unit_sale_price.multiply_quantity(self.quantity),
        }
    }

    /// Per-line discount actually applied, never more than the gross.
    pub fn applied_line_discount(&self) -> Money {
        self.line_discount.clamp_to(Money::zero(), self.gross())
    }

    /// Line amount after the per-line discount.
    pub fn net(&self) -> Money {
        self.gross() - self.applied_line_discount()
    }

    pub fn cost_basis(&self) -> Money {
        self.unit_cost.multiply_quantity(self.quantity)
    }

    /// Refund ceiling, `None` on sale lines.
    pub fn max_refundable_quantity(&self) -> Option<Quantity> {
        self.refund.map(|allowance| allowance.bought_quantity)
    }

    pub fn is_refund_line(&self) -> bool {
        self.refund.is_some()
    }

    fn check_stock(&self, requested: Quantity) -> CoreResult<()> {
        match self.stock_limit {
            Some(available) if requested > available => Err(CoreError::InsufficientStock {
                sku: self.sku.clone(),
                available,
                requested,
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary.
///
/// `grand_total == subtotal - discount + tax` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Lines with a quantity above zero
    pub items_count: usize,
    pub total_quantity: Quantity,
    /// Sum of line nets
    pub subtotal: Money,
    pub total_cost_basis: Money,
    /// Document discount, within `[0, subtotal]`
    pub discount: Money,
    pub tax: Money,
    pub grand_total: Money,
    /// `grand_total - total_cost_basis` (display only)
    pub profit: Money,
}

// =============================================================================
// Cart
// =============================================================================

/// The cart for one in-progress transaction.
///
/// ## Invariants
/// - NormalSale lines are unique by `product_id` and have a positive quantity
/// - Refund lines all come from `refund_source` and satisfy
///   `0 <= quantity <= bought_quantity`
/// - At most [`MAX_CART_LINES`] lines, each at most [`MAX_LINE_QUANTITY`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
    mode: CartMode,
    sale_type: SaleType,
    document_discount: Money,
    tax_rate: TaxRate,
    payment_tolerance: Money,
    customer_reference: Option<String>,
    refund_source: Option<RefundSource>,
    created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty sale cart from explicit configuration.
    pub fn new(config: &CheckoutConfig) -> Self {
        Cart {
            lines: Vec::new(),
            mode: CartMode::NormalSale,
            sale_type: SaleType::Retail,
            document_discount: Money::zero(),
            tax_rate: config.tax_rate,
            payment_tolerance: config.payment_tolerance,
            customer_reference: None,
            refund_source: None,
            created_at: Utc::now(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&CartLine> {
        self.lines.get(index)
    }

    pub fn mode(&self) -> CartMode {
        self.mode
    }

    /// Pricing in effect: the toggle for sales, the original sale's type
    /// for refunds.
    pub fn sale_type(&self) -> SaleType {
        match &self.refund_source {
            Some(source) => source.sale_type,
            None => self.sale_type,
        }
    }

    /// Tax rate in effect: configuration for sales, the original sale's
    /// rate for refunds.
    pub fn tax_rate(&self) -> TaxRate {
        match &self.refund_source {
            Some(source) => source.tax_rate,
            None => self.tax_rate,
        }
    }

    /// Stored document discount (sale mode); `compute_totals` clamps again.
    pub fn document_discount(&self) -> Money {
        self.document_discount
    }

    pub fn payment_tolerance(&self) -> Money {
        self.payment_tolerance
    }

    pub fn customer_reference(&self) -> Option<&str> {
        self.customer_reference.as_deref()
    }

    pub fn refund_source(&self) -> Option<&RefundSource> {
        self.refund_source.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn require_sale_mode(&self, operation: &'static str) -> CoreResult<()> {
        if self.mode == CartMode::Refund {
            return Err(CoreError::InvalidMode {
                operation,
                mode: self.mode,
            });
        }
        Ok(())
    }

    fn line_mut(&mut self, index: usize) -> CoreResult<&mut CartLine> {
        self.lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound(index))
    }

    fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::net).sum()
    }

    // -------------------------------------------------------------------------
    // Sale Mutations
    // -------------------------------------------------------------------------

    /// Adds a product, or increases its quantity if already in the cart.
    ///
    /// ## Errors
    /// - `InvalidMode` in refund mode
    /// - `Validation` if `quantity` is not positive or above the line maximum,
    ///   or a catalog price is negative or above [`MAX_UNIT_PRICE`]
    /// - `QuantityTooLarge` if the merged line would exceed the line maximum
    /// - `InsufficientStock` if the product enforces stock and the line
    ///   would exceed it
    /// - `CartTooLarge` if a new line would exceed [`MAX_CART_LINES`]
    pub fn add_line(&mut self, product: &CatalogProduct, quantity: Quantity) -> CoreResult<()> {
        self.require_sale_mode("add_line")?;
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_LINE_QUANTITY,
                });
            }

            // Latest catalog stock wins over the level captured earlier
            let limit = product.stock_limit();
            if let Some(available) = limit {
                if new_qty > available {
                    return Err(CoreError::InsufficientStock {
                        sku: product.sku.clone(),
                        available,
                        requested: new_qty,
                    });
                }
            }

            line.quantity = new_qty;
            line.stock_limit = limit;
            debug!(sku = %line.sku, quantity = %new_qty, "Increased line quantity");
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        let line = CartLine::from_product(product, quantity, self.sale_type)?;
        line.check_stock(quantity)?;

        debug!(
            sku = %line.sku,
            quantity = %quantity,
            unit_price = %line.unit_sale_price,
            "Added line"
        );
        self.lines.push(line);
        Ok(())
    }

    /// Sets a line's quantity.
    ///
    /// ## Behavior
    /// - Sale: zero or negative removes the line; above the stock limit fails
    /// - Refund: clamped into `[0, bought_quantity]`
    pub fn set_line_quantity(&mut self, index: usize, quantity: Quantity) -> CoreResult<()> {
        let mode = self.mode;
        let line = self.line_mut(index)?;

        if let Some(allowance) = line.refund {
            let clamped = quantity.clamp(Quantity::zero(), allowance.bought_quantity);
            if clamped != quantity {
                warn!(
                    sku = %line.sku,
                    requested = %quantity,
                    applied = %clamped,
                    "Refund quantity clamped to what was bought"
                );
            }
            line.quantity = clamped;
            debug!(sku = %line.sku, quantity = %clamped, "Set refund quantity");
            return Ok(());
        }

        debug_assert_eq!(mode, CartMode::NormalSale);

        if !quantity.is_positive() {
            let removed = self.lines.remove(index);
            debug!(sku = %removed.sku, "Removed line (quantity set to zero)");
            return Ok(());
        }

        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }

        line.check_stock(quantity)?;
        line.quantity = quantity;
        debug!(sku = %line.sku, quantity = %quantity, "Set line quantity");
        Ok(())
    }

    /// Overrides a line's unit price. Negative input is clamped to zero.
    ///
    /// ## Errors
    /// - `Validation` above [`MAX_UNIT_PRICE`]; the line keeps its price
    pub fn set_line_price(&mut self, index: usize, unit_price: Money) -> CoreResult<()> {
        self.require_sale_mode("set_line_price")?;
        let line = self.line_mut(index)?;

        let price = if unit_price.is_negative() {
            warn!(sku = %line.sku, requested = %unit_price, "Negative price clamped to zero");
            Money::zero()
        } else {
            unit_price
        };
        validate_price(price)?;

        line.unit_sale_price = price;
        line.price_overridden = true;
        debug!(sku = %line.sku, unit_price = %price, "Overrode line price");
        Ok(())
    }

    /// Sets a per-line discount, clamped to `[0, gross line amount]`.
    pub fn set_line_discount(&mut self, index: usize, amount: Money) -> CoreResult<()> {
        self.require_sale_mode("set_line_discount")?;
        let line = self.line_mut(index)?;

        let gross = line.gross();
        let applied = amount.clamp_to(Money::zero(), gross);
        if applied != amount {
            warn!(sku = %line.sku, requested = %amount, applied = %applied, "Line discount clamped");
        }

        line.line_discount = applied;
        debug!(sku = %line.sku, discount = %applied, "Set line discount");
        Ok(())
    }

    /// Removes a line. An out-of-range index is a no-op.
    pub fn remove_line(&mut self, index: usize) -> Option<CartLine> {
        if index >= self.lines.len() {
            return None;
        }
        let removed = self.lines.remove(index);
        debug!(sku = %removed.sku, "Removed line");
        Some(removed)
    }

    /// Sets the document discount, clamped to `[0, subtotal]`.
    pub fn set_document_discount(&mut self, amount: Money) -> CoreResult<()> {
        self.require_sale_mode("set_document_discount")?;

        let subtotal = self.subtotal();
        let applied = amount.clamp_to(Money::zero(), subtotal);
        if applied != amount {
            warn!(requested = %amount, applied = %applied, subtotal = %subtotal, "Document discount clamped");
        }

        self.document_discount = applied;
        debug!(discount = %applied, "Set document discount");
        Ok(())
    }

    /// Switches retail/wholesale pricing and reprices lines that were not
    /// overridden by hand.
    pub fn set_sale_type(&mut self, sale_type: SaleType) -> CoreResult<()> {
        self.require_sale_mode("set_sale_type")?;

        self.sale_type = sale_type;
        for line in self.lines.iter_mut().filter(|l| !l.price_overridden) {
            line.unit_sale_price = match sale_type {
                SaleType::Retail => line.retail_price,
                SaleType::Wholesale => line.wholesale_price,
            };
        }
        debug!(?sale_type, "Set sale type");
        Ok(())
    }

    /// Attaches a customer to the transaction. Blank clears it.
    pub fn set_customer(&mut self, reference: Option<String>) {
        self.customer_reference = reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
    }

    // -------------------------------------------------------------------------
    // Refund Loading
    // -------------------------------------------------------------------------

    /// Looks up a prior invoice and loads it as a refund.
    ///
    /// ## Errors
    /// - `InvoiceNotFound` if neither an exact nor a numeric-suffix match exists
    /// - `NothingRefundable` if every line of the invoice was already refunded
    pub fn load_refund_source<L>(&mut self, lookup: &L, identifier: &str) -> CoreResult<()>
    where
        L: InvoiceLookup + ?Sized,
    {
        let record = resolve_invoice(lookup, identifier)?;
        self.load_refund_invoice(record)
    }

    /// Replaces the cart contents with a refund of `record`.
    ///
    /// Each line starts at its full refundable quantity; lowering quantities
    /// makes the refund partial. Lines with nothing left are skipped.
    pub fn load_refund_invoice(&mut self, record: InvoiceRecord) -> CoreResult<()> {
        let lines: Vec<CartLine> = record
            .lines
            .iter()
            .filter(|line| line.quantity.is_positive())
            .map(CartLine::from_invoice_line)
            .collect();

        if lines.is_empty() {
            return Err(CoreError::NothingRefundable(record.invoice_number));
        }
        if lines.len() > MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        info!(
            invoice = %record.invoice_number,
            lines = lines.len(),
            original_discount = %record.discount,
            "Loaded invoice for refund"
        );

        self.refund_source = Some(RefundSource::from_record(&record));
        self.lines = lines;
        self.mode = CartMode::Refund;
        self.document_discount = Money::zero();
        self.customer_reference = record.customer_reference;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// Derives all totals from the current state. Never mutates.
    ///
    /// ## Formulas
    /// ```text
    /// subtotal    = Σ line.net
    /// discount    = sale:   document_discount clamped to [0, subtotal]
    ///               refund: original_discount × subtotal / original_subtotal
    /// tax         = (subtotal − discount) × tax_rate
    /// grand_total = subtotal − discount + tax
    /// profit      = grand_total − Σ line.cost_basis
    /// ```
    pub fn compute_totals(&self) -> CartTotals {
        let subtotal = self.subtotal();

        let discount = match &self.refund_source {
            Some(source) => source.discount_share(subtotal),
            None => self.document_discount.clamp_to(Money::zero(), subtotal),
        };

        let taxable = subtotal - discount;
        let tax = taxable.calculate_tax(self.tax_rate());
        let grand_total = taxable + tax;
        let total_cost_basis: Money = self.lines.iter().map(CartLine::cost_basis).sum();

        CartTotals {
            items_count: self
                .lines
                .iter()
                .filter(|l| l.quantity.is_positive())
                .count(),
            total_quantity: self
                .lines
                .iter()
                .fold(Quantity::zero(), |acc, l| acc + l.quantity),
            subtotal,
            total_cost_basis,
            discount,
            tax,
            grand_total,
            profit: grand_total - total_cost_basis,
        }
    }

    /// Document discount attributed to each line, in line order.
    ///
    /// Shares are cut at running subtotals (`share(a + b) - share(a)`), so
    /// every share is within `[0, line net]` and together they add up to
    /// `compute_totals().discount` exactly.
    pub fn discount_shares(&self) -> Vec<Money> {
        let totals = self.compute_totals();
        let share_upto = |running: Money| match &self.refund_source {
            Some(source) => source.discount_share(running),
            None => totals
                .discount
                .prorate(running.cents(), totals.subtotal.cents()),
        };

        let mut running = Money::zero();
        let mut allotted = Money::zero();
        self.lines
            .iter()
            .map(|line| {
                running += line.net();
                let upto = share_upto(running);
                let share = upto - allotted;
                allotted = upto;
                share
            })
            .collect()
    }

    /// Document discount attributed to one line of this cart.
    ///
    /// A line that is not in the cart gets its plain proportional share.
    pub fn discount_share(&self, line: &CartLine) -> Money {
        if let Some(index) = self.lines.iter().position(|l| std::ptr::eq(l, line)) {
            if let Some(share) = self.discount_shares().get(index) {
                return *share;
            }
        }

        match &self.refund_source {
            Some(source) => source.discount_share(line.net()),
            None => {
                let totals = self.compute_totals();
                totals
                    .discount
                    .prorate(line.net().cents(), totals.subtotal.cents())
            }
        }
    }

    /// Empties the cart and returns it to sale mode.
    ///
    /// The retail/wholesale toggle is kept; the tax rate reverts to the
    /// configured one.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.mode = CartMode::NormalSale;
        self.document_discount = Money::zero();
        self.customer_reference = None;
        self.refund_source = None;
        self.created_at = Utc::now();
        debug!("Cart cleared");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use crate::MAX_LINE_UNITS;

    fn config() -> CheckoutConfig {
        CheckoutConfig::default()
    }

    fn product(id: &str, price_cents: i64) -> CatalogProduct {
        CatalogProduct::new(id, format!("SKU-{}", id), format!("Product {}", id), Money::from_cents(price_cents))
            .with_unit_cost(Money::from_cents(price_cents * 6 / 10))
    }

    fn invoice() -> InvoiceRecord {
        InvoiceRecord {
            invoice_number: "INV-000001".to_string(),
            lines: vec![
                InvoiceLine {
                    product_id: "a".to_string(),
                    sku: "SKU-a".to_string(),
                    name: "Product a".to_string(),
                    quantity: Quantity::from_units(3),
                    unit_price: Money::from_cents(10000),
                    unit_cost: Money::from_cents(6000),
                    line_discount: Money::zero(),
                    line_net: Money::from_cents(30000),
                },
                InvoiceLine {
                    product_id: "b".to_string(),
                    sku: "SKU-b".to_string(),
                    name: "Product b".to_string(),
                    quantity: Quantity::zero(),
                    unit_price: Money::from_cents(500),
                    unit_cost: Money::from_cents(300),
                    line_discount: Money::zero(),
                    line_net: Money::zero(),
                },
            ],
            subtotal: Money::from_cents(30000),
            discount: Money::from_cents(3000),
            tax_rate: TaxRate::from_bps(500),
            payment_method: PaymentMethod::Cash,
            sale_type: SaleType::Retail,
            customer_reference: Some("CUST-9".to_string()),
        }
    }

    #[test]
    fn test_add_line_merges_same_product() {
        let mut cart = Cart::new(&config());
        let p = product("1", 999);

        cart.add_line(&p, Quantity::from_units(2)).unwrap();
        cart.add_line(&p, Quantity::from_units(3)).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].quantity, Quantity::from_units(5));
        assert_eq!(cart.compute_totals().subtotal.cents(), 4995);
    }

    #[test]
    fn test_add_line_rejects_non_positive_quantity() {
        let mut cart = Cart::new(&config());
        let err = cart.add_line(&product("1", 100), Quantity::zero()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_line_quantity_cap() {
        let mut cart = Cart::new(&config());
        let p = product("1", 100);
        cart.add_line(&p, Quantity::from_units(900)).unwrap();

        let err = cart.add_line(&p, Quantity::from_units(100)).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));
        assert_eq!(cart.lines()[0].quantity, Quantity::from_units(900));
    }

    #[test]
    fn test_add_line_stock_hard_block() {
        let mut cart = Cart::new(&config());
        let p = product("1", 100).with_stock(Quantity::from_units(3));

        cart.add_line(&p, Quantity::from_units(2)).unwrap();
        let err = cart.add_line(&p, Quantity::from_units(2)).unwrap_err();

        match err {
            CoreError::InsufficientStock { available, requested, .. } => {
                assert_eq!(available, Quantity::from_units(3));
                assert_eq!(requested, Quantity::from_units(4));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(cart.lines()[0].quantity, Quantity::from_units(2));
    }

    #[test]
    fn test_negative_stock_allowed_skips_check() {
        let mut cart = Cart::new(&config());
        let p = product("1", 100)
            .with_stock(Quantity::zero())
            .allowing_negative_stock();
        cart.add_line(&p, Quantity::from_units(5)).unwrap();
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_cart_line_cap() {
        let mut cart = Cart::new(&config());
        for i in 0..MAX_CART_LINES {
            cart.add_line(&product(&i.to_string(), 100), Quantity::from_units(1))
                .unwrap();
        }
        let err = cart
            .add_line(&product("overflow", 100), Quantity::from_units(1))
            .unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { max } if max == MAX_CART_LINES));
    }

    #[test]
    fn test_set_line_quantity_zero_removes() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 100), Quantity::from_units(2)).unwrap();
        cart.set_line_quantity(0, Quantity::zero()).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_line_quantity_respects_stock() {
        let mut cart = Cart::new(&config());
        let p = product("1", 100).with_stock(Quantity::from_units(4));
        cart.add_line(&p, Quantity::from_units(1)).unwrap();

        cart.set_line_quantity(0, Quantity::from_units(4)).unwrap();
        let err = cart.set_line_quantity(0, Quantity::from_units(5)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!(cart.lines()[0].quantity, Quantity::from_units(4));
    }

    #[test]
    fn test_set_line_quantity_unknown_index() {
        let mut cart = Cart::new(&config());
        let err = cart.set_line_quantity(3, Quantity::from_units(1)).unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound(3)));
    }

    #[test]
    fn test_fractional_quantity() {
        let mut cart = Cart::new(&config());
        let cheese = product("cheese", 1999);
        cart.add_line(&cheese, Quantity::from_milli(250)).unwrap();
        // 19.99 × 0.25 = 4.9975 → 5.00
        assert_eq!(cart.compute_totals().subtotal.cents(), 500);
    }

    #[test]
    fn test_set_line_price_clamps_negative() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 100), Quantity::from_units(1)).unwrap();

        cart.set_line_price(0, Money::from_cents(-50)).unwrap();
        let line = &cart.lines()[0];
        assert!(line.unit_sale_price.is_zero());
        assert!(line.price_overridden);
    }

    #[test]
    fn test_set_line_price_above_ceiling_rejected() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 100), Quantity::from_units(2)).unwrap();

        let err = cart
            .set_line_price(0, Money::from_cents(i64::MAX))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(cart.lines()[0].unit_sale_price.cents(), 100);
        assert!(!cart.lines()[0].price_overridden);

        cart.set_line_price(0, MAX_UNIT_PRICE).unwrap();
        let totals = cart.compute_totals();
        assert_eq!(totals.subtotal, MAX_UNIT_PRICE * 2);
        assert!(!totals.grand_total.is_negative());
    }

    #[test]
    fn test_add_line_rejects_out_of_range_catalog_price() {
        let mut cart = Cart::new(&config());
        let huge = product("1", 100).with_wholesale_price(Money::from_cents(i64::MAX / 2 + 1));
        let negative_cost = product("2", 100).with_unit_cost(Money::from_cents(-1));

        let err = cart.add_line(&huge, Quantity::from_units(1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        let err = cart.add_line(&negative_cost, Quantity::from_units(1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_largest_cart_totals_stay_positive() {
        let mut cart = Cart::new(&config());
        for i in 0..MAX_CART_LINES {
            let p = product(&i.to_string(), MAX_UNIT_PRICE.cents());
            cart.add_line(&p, MAX_LINE_QUANTITY).unwrap();
        }

        let totals = cart.compute_totals();
        let expected_subtotal = MAX_UNIT_PRICE * (MAX_LINE_UNITS * MAX_CART_LINES as i64);
        assert_eq!(totals.subtotal, expected_subtotal);
        assert_eq!(totals.grand_total, totals.subtotal + totals.tax);
        assert!(totals.grand_total.is_positive());
    }

    #[test]
    fn test_line_discount_clamped_to_gross() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 1000), Quantity::from_units(2)).unwrap();

        cart.set_line_discount(0, Money::from_cents(5000)).unwrap();
        assert_eq!(cart.lines()[0].line_discount.cents(), 2000);
        assert!(cart.lines()[0].net().is_zero());

        cart.set_line_discount(0, Money::from_cents(-10)).unwrap();
        assert!(cart.lines()[0].line_discount.is_zero());
    }

    #[test]
    fn test_line_discount_follows_quantity_shrink() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 1000), Quantity::from_units(3)).unwrap();
        cart.set_line_discount(0, Money::from_cents(2500)).unwrap();
        cart.set_line_quantity(0, Quantity::from_units(2)).unwrap();

        let line = &cart.lines()[0];
        assert_eq!(line.applied_line_discount().cents(), 2000);
        assert!(line.net().is_zero());
    }

    #[test]
    fn test_remove_line_out_of_range_is_noop() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 100), Quantity::from_units(1)).unwrap();
        assert!(cart.remove_line(5).is_none());
        assert_eq!(cart.line_count(), 1);
        assert!(cart.remove_line(0).is_some());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_document_discount_reclamped_after_removal() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 10000), Quantity::from_units(1)).unwrap();
        cart.add_line(&product("2", 5000), Quantity::from_units(1)).unwrap();
        cart.set_document_discount(Money::from_cents(12000)).unwrap();
        assert_eq!(cart.document_discount().cents(), 12000);

        cart.remove_line(0);
        let totals = cart.compute_totals();
        assert_eq!(totals.discount.cents(), 5000);
        assert!(totals.grand_total.is_zero());
    }

    #[test]
    fn test_sale_type_reprices_unless_overridden() {
        let mut cart = Cart::new(&config());
        let rice = product("rice", 500).with_wholesale_price(Money::from_cents(420));
        let oil = product("oil", 900).with_wholesale_price(Money::from_cents(800));
        cart.add_line(&rice, Quantity::from_units(1)).unwrap();
        cart.add_line(&oil, Quantity::from_units(1)).unwrap();
        cart.set_line_price(1, Money::from_cents(850)).unwrap();

        cart.set_sale_type(SaleType::Wholesale).unwrap();
        assert_eq!(cart.lines()[0].unit_sale_price.cents(), 420);
        assert_eq!(cart.lines()[1].unit_sale_price.cents(), 850);

        // New lines pick up the active toggle
        let flour = product("flour", 300).with_wholesale_price(Money::from_cents(250));
        cart.add_line(&flour, Quantity::from_units(1)).unwrap();
        assert_eq!(cart.lines()[2].unit_sale_price.cents(), 250);

        cart.set_sale_type(SaleType::Retail).unwrap();
        assert_eq!(cart.lines()[0].unit_sale_price.cents(), 500);
    }

    #[test]
    fn test_set_customer_trims_blank() {
        let mut cart = Cart::new(&config());
        cart.set_customer(Some("  CUST-1 ".to_string()));
        assert_eq!(cart.customer_reference(), Some("CUST-1"));
        cart.set_customer(Some("   ".to_string()));
        assert_eq!(cart.customer_reference(), None);
    }

    #[test]
    fn test_load_refund_invoice_seeds_lines() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("x", 100), Quantity::from_units(1)).unwrap();

        cart.load_refund_invoice(invoice()).unwrap();

        assert_eq!(cart.mode(), CartMode::Refund);
        assert_eq!(cart.line_count(), 1);
        let line = &cart.lines()[0];
        assert_eq!(line.product_id, "a");
        assert_eq!(line.quantity, Quantity::from_units(3));
        assert_eq!(line.max_refundable_quantity(), Some(Quantity::from_units(3)));
        assert_eq!(cart.tax_rate().bps(), 500);
        assert_eq!(cart.customer_reference(), Some("CUST-9"));
    }

    #[test]
    fn test_refund_mode_blocks_sale_operations() {
        let mut cart = Cart::new(&config());
        cart.load_refund_invoice(invoice()).unwrap();

        let p = product("1", 100);
        assert!(matches!(
            cart.add_line(&p, Quantity::from_units(1)),
            Err(CoreError::InvalidMode { operation: "add_line", .. })
        ));
        assert!(matches!(
            cart.set_line_price(0, Money::from_cents(1)),
            Err(CoreError::InvalidMode { .. })
        ));
        assert!(matches!(
            cart.set_line_discount(0, Money::from_cents(1)),
            Err(CoreError::InvalidMode { .. })
        ));
        assert!(matches!(
            cart.set_document_discount(Money::from_cents(1)),
            Err(CoreError::InvalidMode { .. })
        ));
        assert!(matches!(
            cart.set_sale_type(SaleType::Wholesale),
            Err(CoreError::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_refund_quantity_clamped() {
        let mut cart = Cart::new(&config());
        cart.load_refund_invoice(invoice()).unwrap();

        cart.set_line_quantity(0, Quantity::from_units(10)).unwrap();
        assert_eq!(cart.lines()[0].quantity, Quantity::from_units(3));

        cart.set_line_quantity(0, Quantity::from_units(-2)).unwrap();
        assert_eq!(cart.lines()[0].quantity, Quantity::zero());
        // A zeroed refund line stays in the cart
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_refund_totals_prorate_discount() {
        let mut cart = Cart::new(&config());
        cart.load_refund_invoice(invoice()).unwrap();
        cart.set_line_quantity(0, Quantity::from_units(1)).unwrap();

        let totals = cart.compute_totals();
        assert_eq!(totals.subtotal.cents(), 10000);
        assert_eq!(totals.discount.cents(), 1000);
        // 5% on 90.00
        assert_eq!(totals.tax.cents(), 450);
        assert_eq!(totals.grand_total.cents(), 9450);
    }

    #[test]
    fn test_nothing_refundable() {
        let mut cart = Cart::new(&config());
        let mut record = invoice();
        record.lines[0].quantity = Quantity::zero();

        let err = cart.load_refund_invoice(record).unwrap_err();
        assert!(matches!(err, CoreError::NothingRefundable(ref n) if n == "INV-000001"));
        assert_eq!(cart.mode(), CartMode::NormalSale);
    }

    #[test]
    fn test_load_refund_source_miss_leaves_cart() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 100), Quantity::from_units(1)).unwrap();

        let invoices = vec![invoice()];
        let err = cart.load_refund_source(&invoices, "INV-999999").unwrap_err();
        assert!(matches!(err, CoreError::InvoiceNotFound(_)));
        assert_eq!(cart.mode(), CartMode::NormalSale);
        assert_eq!(cart.line_count(), 1);

        cart.load_refund_source(&invoices, "1").unwrap();
        assert_eq!(cart.mode(), CartMode::Refund);
    }

    #[test]
    fn test_discount_share_per_line() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 10000), Quantity::from_units(2)).unwrap();
        cart.add_line(&product("2", 10000), Quantity::from_units(1)).unwrap();
        cart.set_document_discount(Money::from_cents(3000)).unwrap();

        assert_eq!(cart.discount_share(&cart.lines()[0]).cents(), 2000);
        assert_eq!(cart.discount_share(&cart.lines()[1]).cents(), 1000);
    }

    #[test]
    fn test_discount_shares_add_up_to_discount() {
        let mut cart = Cart::new(&config());
        for id in ["1", "2", "3"] {
            cart.add_line(&product(id, 100), Quantity::from_units(1)).unwrap();
        }
        cart.set_document_discount(Money::from_cents(100)).unwrap();

        let shares = cart.discount_shares();
        let cents: Vec<i64> = shares.iter().map(Money::cents).collect();
        assert_eq!(cents, vec![33, 34, 33]);
        assert_eq!(shares.iter().sum::<Money>(), cart.compute_totals().discount);
        assert_eq!(cart.discount_share(&cart.lines()[1]).cents(), 34);

        // Half-cent shares that would each round up
        cart.add_line(&product("4", 100), Quantity::from_units(1)).unwrap();
        cart.set_document_discount(Money::from_cents(2)).unwrap();
        let shares = cart.discount_shares();
        assert!(shares.iter().all(|s| !s.is_negative()));
        assert_eq!(shares.iter().sum::<Money>().cents(), 2);
    }

    #[test]
    fn test_refund_discount_shares_add_up() {
        let mut record = invoice();
        let template = record.lines[0].clone();
        record.lines = ["a", "b", "c"]
            .iter()
            .map(|id| InvoiceLine {
                product_id: id.to_string(),
                quantity: Quantity::from_units(1),
                line_net: Money::from_cents(100),
                ..template.clone()
            })
            .collect();
        record.subtotal = Money::from_cents(300);
        record.discount = Money::from_cents(100);

        let mut cart = Cart::new(&config());
        cart.load_refund_invoice(record).unwrap();

        let cents: Vec<i64> = cart.discount_shares().iter().map(Money::cents).collect();
        assert_eq!(cents, vec![33, 34, 33]);
        assert_eq!(cart.compute_totals().discount.cents(), 100);
    }

    #[test]
    fn test_clear_resets_mode_and_tax_rate() {
        let mut cart = Cart::new(&config());
        cart.set_sale_type(SaleType::Wholesale).unwrap();
        cart.load_refund_invoice(invoice()).unwrap();
        assert_eq!(cart.sale_type(), SaleType::Retail);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.mode(), CartMode::NormalSale);
        assert_eq!(cart.tax_rate(), config().tax_rate);
        assert_eq!(cart.sale_type(), SaleType::Wholesale);
        assert!(cart.refund_source().is_none());
    }

    #[test]
    fn test_compute_totals_is_pure() {
        let mut cart = Cart::new(&config());
        cart.add_line(&product("1", 333), Quantity::from_milli(1500)).unwrap();
        cart.set_document_discount(Money::from_cents(77)).unwrap();

        assert_eq!(cart.compute_totals(), cart.compute_totals());
    }
}
