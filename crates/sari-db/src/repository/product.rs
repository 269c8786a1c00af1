//! # Product Repository
//!
//! Reads of the catalog, plus the stock write helpers used by the services.
//!
//! ## Who Writes `qty`
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleRecorder      ──► apply_stock_delta(-n) / decrement_with_floor(n) │
//! │  RefundReconciler  ──► apply_stock_delta(+n)                           │
//! │  CatalogImporter   ──► apply_catalog_change (stock count)              │
//! │                                                                         │
//! │  Everything else only reads. The write helpers take a connection, so  │
//! │  they run inside the caller's transaction.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delta Updates
//! Stock moves are applied as `qty = qty + delta` in SQL, never as a value
//! read into Rust and written back, so two terminals selling the same item
//! cannot lose each other's decrement.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use sari_core::import::CatalogChange;
use sari_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, sku, name, price_cents, qty, threshold, deadstock, created_at, updated_at
"#;

/// `products` row as stored.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    price_cents: i64,
    qty: i64,
    threshold: i64,
    deadstock: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, monthly_sales: BTreeMap<String, i64>) -> Product {
        Product {
            id: self.id,
            sku: self.sku,
            name: self.name,
            price_cents: self.price_cents.max(0),
            qty: self.qty,
            threshold: self.threshold.max(0),
            deadstock: self.deadstock,
            monthly_sales,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MonthlySalesRow {
    product_id: String,
    month_key: String,
    qty: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID, with its monthly sales counters.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by SKU (exact match).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;

        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE sku = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let monthly = fetch_monthly_sales(&mut conn, &row.id).await?;
                Ok(Some(row.into_product(monthly)))
            }
            None => Ok(None),
        }
    }

    /// Lists the whole catalog ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        list_products(&mut conn).await
    }

    /// Products whose stock went negative (oversold).
    pub async fn list_oversold(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE qty < 0 ORDER BY qty ASC, name ASC",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;

        let mut monthly = fetch_all_monthly_sales(&mut conn).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let counters = monthly.remove(&row.id).unwrap_or_default();
                row.into_product(counters)
            })
            .collect())
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// `UniqueViolation` if the id or SKU is taken.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_cents, qty, threshold, deadstock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.qty)
        .bind(product.threshold)
        .bind(product.deadstock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.sku),
            other => other,
        })?;

        Ok(())
    }

    /// Sets the externally computed deadstock flag.
    pub async fn set_deadstock(&self, id: &str, deadstock: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET deadstock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(deadstock)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (shared with the services' transactions)
// =============================================================================

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {} FROM products WHERE id = ?1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let monthly = fetch_monthly_sales(conn, &row.id).await?;
            Ok(Some(row.into_product(monthly)))
        }
        None => Ok(None),
    }
}

pub(crate) async fn list_products(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "SELECT {} FROM products ORDER BY name ASC, id ASC",
        PRODUCT_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut monthly = fetch_all_monthly_sales(conn).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let counters = monthly.remove(&row.id).unwrap_or_default();
            row.into_product(counters)
        })
        .collect())
}

async fn fetch_monthly_sales(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<BTreeMap<String, i64>> {
    let rows: Vec<MonthlySalesRow> = sqlx::query_as(
        "SELECT product_id, month_key, qty FROM product_monthly_sales WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|r| (r.month_key, r.qty)).collect())
}

async fn fetch_all_monthly_sales(
    conn: &mut SqliteConnection,
) -> DbResult<BTreeMap<String, BTreeMap<String, i64>>> {
    let rows: Vec<MonthlySalesRow> =
        sqlx::query_as("SELECT product_id, month_key, qty FROM product_monthly_sales")
            .fetch_all(&mut *conn)
            .await?;

    let mut grouped: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.product_id)
            .or_default()
            .insert(row.month_key, row.qty);
    }
    Ok(grouped)
}

/// Adds `delta` to a product's stock and returns the new quantity.
///
/// `None` means the product does not exist.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<Option<i64>> {
    debug!(id = %id, delta = delta, "Updating stock");

    let qty: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET qty = qty + ?2, updated_at = ?3
        WHERE id = ?1
        RETURNING qty
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(qty)
}

/// Takes `quantity` units off the shelf only if that many are in stock.
///
/// `None` means the product is missing or short; the caller tells them apart.
pub(crate) async fn decrement_with_floor(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<Option<i64>> {
    debug!(id = %id, quantity = quantity, "Decrementing stock with floor");

    let qty: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET qty = qty - ?2, updated_at = ?3
        WHERE id = ?1 AND qty >= ?2
        RETURNING qty
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(qty)
}

/// Adds `quantity` to the product's units-sold counter for `month_key`.
pub(crate) async fn bump_monthly_sales(
    conn: &mut SqliteConnection,
    product_id: &str,
    month_key: &str,
    quantity: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO product_monthly_sales (product_id, month_key, qty)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (product_id, month_key) DO UPDATE SET qty = qty + excluded.qty
        "#,
    )
    .bind(product_id)
    .bind(month_key)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes one imported catalog row: a stock count for known products, a new
/// product otherwise. New products use the row id as both id and SKU.
pub(crate) async fn apply_catalog_change(
    conn: &mut SqliteConnection,
    change: &CatalogChange,
    now: DateTime<Utc>,
) -> DbResult<()> {
    if change.is_new {
        debug!(id = %change.id, qty = change.qty, "Importing new product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_cents, qty, threshold, deadstock, created_at, updated_at
            ) VALUES (?1, ?1, ?2, ?3, ?4, 0, 0, ?5, ?5)
            "#,
        )
        .bind(&change.id)
        .bind(&change.name)
        .bind(change.price.map(|p| p.cents()).unwrap_or(0))
        .bind(change.qty)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        return Ok(());
    }

    debug!(id = %change.id, qty = change.qty, "Importing stock count");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET name = ?2,
            qty = ?3,
            price_cents = COALESCE(?4, price_cents),
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(&change.id)
    .bind(&change.name)
    .bind(change.qty)
    .bind(change.price.map(|p| p.cents()))
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", &change.id));
    }

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
