//! # Product Repository
//!
//! Catalog storage: the products the cart adds lines from.
//!
//! ## Key Operations
//! - Lookup by id, SKU or barcode (scanner input)
//! - Substring search across name, SKU and barcode
//! - Stock level adjustments as deltas
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier types: "cola"                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_search_query ← trim, length check                             │
//! │       │                                                                 │
//! │       ├── empty? ──► list_active(limit)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  name LIKE '%cola%' OR sku LIKE '%cola%' OR barcode LIKE '%cola%'       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Results: [COLA-330, COLA-500] (active only, by name)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::{
    validate_price, validate_product_name, validate_search_query, validate_sku,
};
use tally_core::{CatalogProduct, Money, Quantity};

const PRODUCT_COLUMNS: &str = r#"
    id, sku, barcode, name,
    retail_price_cents, wholesale_price_cents, cost_cents,
    track_stock, allow_negative_stock, stock_milli,
    is_active, created_at, updated_at
"#;

/// A `products` row as stored.
#[derive(Debug, Clone, FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    barcode: Option<String>,
    name: String,
    retail_price_cents: i64,
    wholesale_price_cents: i64,
    cost_cents: i64,
    track_stock: bool,
    allow_negative_stock: bool,
    stock_milli: i64,
    #[allow(dead_code)]
    is_active: bool,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for CatalogProduct {
    fn from(row: ProductRow) -> Self {
        CatalogProduct {
            id: row.id,
            sku: row.sku,
            barcode: row.barcode,
            name: row.name,
            retail_price: Money::from_cents(row.retail_price_cents),
            wholesale_price: Money::from_cents(row.wholesale_price_cents),
            unit_cost: Money::from_cents(row.cost_cents),
            stock_level: row
                .track_stock
                .then(|| Quantity::from_milli(row.stock_milli)),
            track_stock: row.track_stock,
            allow_negative_stock: row.allow_negative_stock,
        }
    }
}

/// Repository for catalog products.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_barcode("5449000000996").await?;
/// let results = repo.search("cola", 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by name, SKU or barcode substring.
    ///
    /// An empty query lists active products.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<CatalogProduct>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let pattern = format!("%{}%", escape_like(&query));
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (name LIKE ?1 ESCAPE '\' OR sku LIKE ?1 ESCAPE '\' OR barcode LIKE ?1 ESCAPE '\')
            ORDER BY name
            LIMIT ?2
            "#
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search complete");

        Ok(rows.into_iter().map(CatalogProduct::from).collect())
    }

    /// Lists active products, alphabetically.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<CatalogProduct>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CatalogProduct::from).collect())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(CatalogProduct))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CatalogProduct>> {
        self.get_where("id", id).await
    }

    /// Gets a product by its SKU (e.g. "COLA-330").
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<CatalogProduct>> {
        self.get_where("sku", sku.trim()).await
    }

    /// Gets an active product by scanned barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<CatalogProduct>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1 AND is_active = 1 LIMIT 1"
        );

        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CatalogProduct::from))
    }

    async fn get_where(&self, column: &str, value: &str) -> DbResult<Option<CatalogProduct>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {column} = ?1");

        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CatalogProduct::from))
    }

    /// Inserts a new product.
    ///
    /// An empty `id` is replaced by a fresh UUID.
    ///
    /// ## Returns
    /// * `Ok(CatalogProduct)` - The stored product
    /// * `Err(DbError::Validation)` - SKU, name or a price rejected
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &CatalogProduct) -> DbResult<CatalogProduct> {
        validate_sku(&product.sku)?;
        validate_product_name(&product.name)?;
        validate_price(product.retail_price)?;
        validate_price(product.wholesale_price)?;
        validate_price(product.unit_cost)?;

        let mut product = product.clone();
        if product.id.is_empty() {
            product.id = generate_product_id();
        }

        debug!(sku = %product.sku, "Inserting product");

        let now = Utc::now();
        let stock_milli = product.stock_level.map(|q| q.milli()).unwrap_or(0);

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, barcode, name,
                retail_price_cents, wholesale_price_cents, cost_cents,
                track_stock, allow_negative_stock, stock_milli,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.retail_price.cents())
        .bind(product.wholesale_price.cents())
        .bind(product.unit_cost.cents())
        .bind(product.track_stock)
        .bind(product.allow_negative_stock)
        .bind(stock_milli)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(product),
            Err(err) => match DbError::from(err) {
                DbError::UniqueViolation { .. } => Err(DbError::duplicate("sku", &product.sku)),
                other => Err(other),
            },
        }
    }

    /// Adds `delta` to a product's stock level.
    ///
    /// Negative for sales, positive for refunds and restocking. Applied as
    /// a delta so concurrent registers never overwrite each other.
    pub async fn adjust_stock(&self, id: &str, delta: Quantity) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        adjust_stock_on(&mut *conn, id, delta).await
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Stock delta on an existing connection, so sale saving can run it inside
/// its transaction. Untracked products are left alone.
pub(crate) async fn adjust_stock_on(
    conn: &mut SqliteConnection,
    id: &str,
    delta: Quantity,
) -> DbResult<()> {
    debug!(id = %id, delta = %delta, "Adjusting stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_milli = stock_milli + ?2,
            updated_at = ?3
        WHERE id = ?1 AND track_stock = 1
        "#,
    )
    .bind(id)
    .bind(delta.milli())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            warn!(id = %id, "Stock adjustment for unknown product skipped");
        }
    }

    Ok(())
}

/// `%` and `_` in user input match literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
