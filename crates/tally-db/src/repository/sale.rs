//! # Sale Repository
//!
//! Stores finalized transactions and serves them back as refund sources.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart.finalize() ──► TransactionSnapshot                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  save_transaction(&snapshot)         (one SQL transaction)              │
//! │     ├── next sequence ──► INV-000001 / RF-000002                        │
//! │     ├── INSERT sales                                                    │
//! │     ├── INSERT sale_items (one per line)                                │
//! │     └── stock delta per tracked product (sale: -qty, refund: +qty)      │
//! │                                                                         │
//! │  Later, at the refund screen:                                           │
//! │                                                                         │
//! │  find_refundable_invoice("1")                                           │
//! │     ├── find_invoice ──► exact number, then numeric suffix              │
//! │     └── remaining_refundable ──► minus what earlier refunds returned    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart.load_refund_invoice(record)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::adjust_stock_on;
use tally_core::ports::numeric_suffix;
use tally_core::validation::validate_invoice_identifier;
use tally_core::{
    InvoiceLine, InvoiceRecord, Money, PaymentMethod, Quantity, SaleType, TaxRate,
    TransactionKind, TransactionSnapshot,
};

const SALE_PREFIX: &str = "INV";
const REFUND_PREFIX: &str = "RF";

/// Invoice number for a sequence value, e.g. `INV-000042`.
pub fn format_invoice_number(kind: TransactionKind, sequence: i64) -> String {
    let prefix = match kind {
        TransactionKind::Sale => SALE_PREFIX,
        TransactionKind::Refund => REFUND_PREFIX,
    };
    format!("{}-{:06}", prefix, sequence)
}

/// A `sales` row, as much of it as a refund source needs.
#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    invoice_number: String,
    sale_type: SaleType,
    customer_reference: Option<String>,
    subtotal_cents: i64,
    discount_cents: i64,
    tax_rate_bps: i64,
    payment_method: PaymentMethod,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    product_id: String,
    sku_snapshot: String,
    name_snapshot: String,
    quantity_milli: i64,
    unit_price_cents: i64,
    unit_cost_cents: i64,
    line_discount_cents: i64,
    line_net_cents: i64,
}

impl From<ItemRow> for InvoiceLine {
    fn from(row: ItemRow) -> Self {
        InvoiceLine {
            product_id: row.product_id,
            sku: row.sku_snapshot,
            name: row.name_snapshot,
            quantity: Quantity::from_milli(row.quantity_milli),
            unit_price: Money::from_cents(row.unit_price_cents),
            unit_cost: Money::from_cents(row.unit_cost_cents),
            line_discount: Money::from_cents(row.line_discount_cents),
            line_net: Money::from_cents(row.line_net_cents),
        }
    }
}

/// Repository for finalized sales and refunds.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a finalized transaction and returns its invoice number.
    ///
    /// Sales and refunds share one sequence. Everything happens in a single
    /// SQL transaction: if any insert or stock move fails, nothing is kept.
    ///
    /// ## Errors
    /// - `RefundExceedsSale` if a refund returns more of a product than the
    ///   original sale has left after earlier refunds (including a refund
    ///   against an invoice that is not a stored sale)
    pub async fn save_transaction(&self, snapshot: &TransactionSnapshot) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;

        if let Some(original) = &snapshot.refund_of {
            check_refund_within_sale(&mut *tx, original, snapshot).await?;
        }

        let sequence: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(sequence), 0) + 1 FROM sales")
            .fetch_one(&mut *tx)
            .await?;
        let invoice_number = format_invoice_number(snapshot.kind, sequence);

        debug!(
            id = %snapshot.id,
            invoice = %invoice_number,
            lines = snapshot.lines.len(),
            "Saving transaction"
        );

        let totals = &snapshot.totals;
        let payment = &snapshot.payment;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, sequence, kind, sale_type,
                refund_of, customer_reference,
                subtotal_cents, discount_cents, tax_rate_bps, tax_cents,
                total_cents, cost_basis_cents,
                payment_method, tendered_cents, paid_cents,
                change_cents, balance_due_cents, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13,
                ?14, ?15, ?16,
                ?17, ?18, ?19
            )
            "#,
        )
        .bind(&snapshot.id)
        .bind(&invoice_number)
        .bind(sequence)
        .bind(snapshot.kind)
        .bind(snapshot.sale_type)
        .bind(&snapshot.refund_of)
        .bind(&snapshot.customer_reference)
        .bind(totals.subtotal.cents())
        .bind(totals.discount.cents())
        .bind(snapshot.tax_rate.bps())
        .bind(totals.tax.cents())
        .bind(totals.grand_total.cents())
        .bind(totals.total_cost_basis.cents())
        .bind(payment.method)
        .bind(payment.tendered.cents())
        .bind(payment.paid.cents())
        .bind(payment.change.cents())
        .bind(payment.balance_due.cents())
        .bind(snapshot.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in snapshot.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, position, product_id, sku_snapshot, name_snapshot,
                    quantity_milli, unit_price_cents, unit_cost_cents,
                    line_discount_cents, line_net_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&snapshot.id)
            .bind(position as i64)
            .bind(&line.product_id)
            .bind(&line.sku)
            .bind(&line.name)
            .bind(line.quantity.milli())
            .bind(line.unit_price.cents())
            .bind(line.unit_cost.cents())
            .bind(line.line_discount.cents())
            .bind(line.line_net.cents())
            .execute(&mut *tx)
            .await?;

            let delta = match snapshot.kind {
                TransactionKind::Sale => Quantity::from_milli(-line.quantity.milli()),
                TransactionKind::Refund => line.quantity,
            };
            adjust_stock_on(&mut *tx, &line.product_id, delta).await?;
        }

        tx.commit().await?;

        info!(
            invoice = %invoice_number,
            kind = ?snapshot.kind,
            total = %totals.grand_total,
            "Transaction saved"
        );

        Ok(invoice_number)
    }

    /// Finds a sale to refund.
    ///
    /// Tries the exact invoice number first, then the digits at the end of
    /// the input as a sequence number, so `"42"`, `"000042"` and
    /// `"INV-000042"` all find the same sale. Refunds are never returned.
    pub async fn find_invoice(&self, identifier: &str) -> DbResult<InvoiceRecord> {
        let identifier = validate_invoice_identifier(identifier)?;

        debug!(identifier = %identifier, "Looking up invoice");

        let exact: Option<InvoiceRow> = sqlx::query_as(&invoice_query("invoice_number = ?1"))
            .bind(&identifier)
            .fetch_optional(&self.pool)
            .await?;

        let row = match exact {
            Some(row) => Some(row),
            None => match numeric_suffix(&identifier).and_then(|n| i64::try_from(n).ok()) {
                Some(sequence) => {
                    sqlx::query_as(&invoice_query("sequence = ?1"))
                        .bind(sequence)
                        .fetch_optional(&self.pool)
                        .await?
                }
                None => None,
            },
        };

        match row {
            Some(row) => self.load_record(row).await,
            None => Err(DbError::not_found("Invoice", identifier)),
        }
    }

    /// Finds a sale and reduces it to what can still be refunded.
    pub async fn find_refundable_invoice(&self, identifier: &str) -> DbResult<InvoiceRecord> {
        let record = self.find_invoice(identifier).await?;
        self.remaining_refundable(record).await
    }

    /// Quantity already refunded against `invoice_number`, per product id.
    pub async fn refunded_quantities(
        &self,
        invoice_number: &str,
    ) -> DbResult<HashMap<String, Quantity>> {
        let mut conn = self.pool.acquire().await?;
        refunded_quantities_on(&mut *conn, invoice_number).await
    }

    /// A copy of `record` with quantities reduced by earlier refunds.
    ///
    /// Lines with nothing left are dropped. The original subtotal and
    /// discount are kept so discount shares stay proportional to the sale.
    pub async fn remaining_refundable(&self, record: InvoiceRecord) -> DbResult<InvoiceRecord> {
        let refunded = self.refunded_quantities(&record.invoice_number).await?;
        Ok(subtract_refunded(record, refunded))
    }

    /// Counts stored transactions of either kind.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn load_record(&self, row: InvoiceRow) -> DbResult<InvoiceRecord> {
        let items: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT product_id, sku_snapshot, name_snapshot, quantity_milli,
                   unit_price_cents, unit_cost_cents, line_discount_cents, line_net_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let bps = u32::try_from(row.tax_rate_bps).map_err(|_| {
            DbError::InvalidData(format!(
                "tax rate {} on {}",
                row.tax_rate_bps, row.invoice_number
            ))
        })?;

        Ok(InvoiceRecord {
            invoice_number: row.invoice_number,
            lines: items.into_iter().map(InvoiceLine::from).collect(),
            subtotal: Money::from_cents(row.subtotal_cents),
            discount: Money::from_cents(row.discount_cents),
            tax_rate: TaxRate::from_bps(bps),
            payment_method: row.payment_method,
            sale_type: row.sale_type,
            customer_reference: row.customer_reference,
        })
    }
}

fn invoice_query(condition: &str) -> String {
    format!(
        r#"
        SELECT id, invoice_number, sale_type, customer_reference,
               subtotal_cents, discount_cents, tax_rate_bps, payment_method
        FROM sales
        WHERE {condition} AND kind = 'sale'
        "#
    )
}

async fn refunded_quantities_on(
    conn: &mut SqliteConnection,
    invoice_number: &str,
) -> DbResult<HashMap<String, Quantity>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT i.product_id, SUM(i.quantity_milli)
        FROM sale_items i
        JOIN sales s ON s.id = i.sale_id
        WHERE s.kind = 'refund' AND s.refund_of = ?1
        GROUP BY i.product_id
        "#,
    )
    .bind(invoice_number)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(product_id, milli)| (product_id, Quantity::from_milli(milli)))
        .collect())
}

/// Rejects a refund that returns more of any product than remains.
async fn check_refund_within_sale(
    conn: &mut SqliteConnection,
    original: &str,
    snapshot: &TransactionSnapshot,
) -> DbResult<()> {
    let sold: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT i.product_id, SUM(i.quantity_milli)
        FROM sale_items i
        JOIN sales s ON s.id = i.sale_id
        WHERE s.kind = 'sale' AND s.invoice_number = ?1
        GROUP BY i.product_id
        "#,
    )
    .bind(original)
    .fetch_all(&mut *conn)
    .await?;
    let sold: HashMap<String, i64> = sold.into_iter().collect();

    let refunded = refunded_quantities_on(conn, original).await?;

    let mut requested: HashMap<&str, i64> = HashMap::new();
    for line in &snapshot.lines {
        *requested.entry(line.product_id.as_str()).or_default() += line.quantity.milli();
    }

    for (product_id, milli) in requested {
        let bought = sold.get(product_id).copied().unwrap_or(0);
        let already = refunded.get(product_id).map(|q| q.milli()).unwrap_or(0);
        if milli > bought - already {
            return Err(DbError::RefundExceedsSale {
                invoice_number: original.to_string(),
                product_id: product_id.to_string(),
            });
        }
    }

    Ok(())
}

/// Takes already-refunded quantities off the record's lines, in line order
/// when a product appears on more than one line.
fn subtract_refunded(
    mut record: InvoiceRecord,
    mut refunded: HashMap<String, Quantity>,
) -> InvoiceRecord {
    if refunded.is_empty() {
        return record;
    }

    record.lines = record
        .lines
        .into_iter()
        .filter_map(|mut line| {
            let taken = refunded
                .get_mut(&line.product_id)
                .map(|left| {
                    let taken = (*left).min(line.quantity);
                    *left = left.saturating_sub(taken);
                    taken
                })
                .unwrap_or_default();

            let bought = line.quantity.milli();
            let remaining = line.quantity.saturating_sub(taken);
            if !remaining.is_positive() {
                return None;
            }
            if !taken.is_zero() {
                line.line_net = line.line_net.prorate(remaining.milli(), bought);
                line.line_discount = line.line_discount.prorate(remaining.milli(), bought);
                line.quantity = remaining;
            }
            Some(line)
        })
        .collect();

    record
}
