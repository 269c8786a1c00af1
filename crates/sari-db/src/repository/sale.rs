//! # Sale Repository
//!
//! Database operations for sales and their lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CHECKOUT (SaleRecorder, one transaction)                           │
//! │     └── insert_sale() → Sale { status: completed }                     │
//! │         + sale_lines with refunded_qty = 0                             │
//! │                                                                         │
//! │  2. REFUND (RefundReconciler, one transaction, repeatable)             │
//! │     └── fetch_sale() → apply_refund() → write_refund_state()           │
//! │         status: partially_refunded | refunded, refund_date stamped     │
//! │                                                                         │
//! │  Sales are never deleted. Only refund accounting ever changes.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use sari_core::{Discount, PaymentMode, Sale, SaleLine, SaleStatus};

const SALE_COLUMNS: &str = r#"
    id, created_at, payment_mode, discount_kind, discount_value,
    total_before_discount_cents, total_after_discount_cents,
    cash_tendered_cents, change_due_cents, month_key, status, refund_date
"#;

/// `sales` row as stored.
#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    created_at: DateTime<Utc>,
    payment_mode: PaymentMode,
    discount_kind: Option<String>,
    discount_value: Option<i64>,
    total_before_discount_cents: i64,
    total_after_discount_cents: i64,
    cash_tendered_cents: i64,
    change_due_cents: i64,
    month_key: String,
    status: SaleStatus,
    refund_date: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleLineRow {
    sale_id: String,
    product_id: String,
    name: String,
    unit_price_cents: i64,
    qty_sold: i64,
    subtotal_cents: i64,
    refunded_qty: i64,
}

impl SaleLineRow {
    fn into_line(self) -> SaleLine {
        SaleLine {
            product_id: self.product_id,
            name: self.name,
            unit_price_cents: self.unit_price_cents,
            qty_sold: self.qty_sold,
            subtotal_cents: self.subtotal_cents,
            refunded_qty: self.refunded_qty.clamp(0, self.qty_sold),
        }
    }
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleLine>) -> DbResult<Sale> {
        if items.is_empty() {
            return Err(DbError::CorruptRow {
                table: "sales".to_string(),
                reason: format!("sale {} has no lines", self.id),
            });
        }

        let mut sale = Sale {
            id: self.id,
            created_at: self.created_at,
            items,
            discount: Discount::from_parts(self.discount_kind.as_deref(), self.discount_value),
            payment_mode: self.payment_mode,
            total_before_discount_cents: self.total_before_discount_cents,
            total_after_discount_cents: self.total_after_discount_cents,
            cash_tendered_cents: self.cash_tendered_cents,
            change_due_cents: self.change_due_cents,
            month_key: self.month_key,
            status: self.status,
            refund_date: self.refund_date,
        };

        // The lines are the source of truth for status
        let stored = sale.status;
        if sale.recompute_status() != stored {
            debug!(id = %sale.id, stored = %stored, derived = %sale.status, "Stored status disagreed with lines");
        }

        Ok(sale)
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID, with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// Lists every sale, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        list_sales(&mut conn, None).await
    }

    /// Counts total sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (shared with the services' transactions)
// =============================================================================

/// Inserts a sale and its lines.
///
/// ## Snapshot Pattern
/// Line name and unit price are copied from the cart, so later catalog edits
/// never rewrite history.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, lines = sale.items.len(), "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, created_at, payment_mode, discount_kind, discount_value,
            total_before_discount_cents, total_after_discount_cents,
            cash_tendered_cents, change_due_cents, month_key, status, refund_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.created_at)
    .bind(sale.payment_mode)
    .bind(sale.discount.map(|d| d.kind()))
    .bind(sale.discount.map(|d| d.raw_value()))
    .bind(sale.total_before_discount_cents)
    .bind(sale.total_after_discount_cents)
    .bind(sale.cash_tendered_cents)
    .bind(sale.change_due_cents)
    .bind(&sale.month_key)
    .bind(sale.status)
    .bind(sale.refund_date)
    .execute(&mut *conn)
    .await?;

    for (line_no, line) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                sale_id, line_no, product_id, name,
                unit_price_cents, qty_sold, subtotal_cents, refunded_qty
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale.id)
        .bind(line_no as i64)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(line.unit_price_cents)
        .bind(line.qty_sold)
        .bind(line.subtotal_cents)
        .bind(line.refunded_qty)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let row: Option<SaleRow> = sqlx::query_as(&format!(
        "SELECT {} FROM sales WHERE id = ?1",
        SALE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let lines: Vec<SaleLineRow> = sqlx::query_as(
        r#"
        SELECT sale_id, product_id, name, unit_price_cents, qty_sold, subtotal_cents, refunded_qty
        FROM sale_lines
        WHERE sale_id = ?1
        ORDER BY line_no ASC
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let items = lines.into_iter().map(SaleLineRow::into_line).collect();
    row.into_sale(items).map(Some)
}

/// Loads sales with their lines, newest first.
///
/// With a range, only sales created in `[from, to)` are read, and only their
/// lines.
pub(crate) async fn list_sales(
    conn: &mut SqliteConnection,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> DbResult<Vec<Sale>> {
    let (rows, line_rows): (Vec<SaleRow>, Vec<SaleLineRow>) = match range {
        Some((from, to)) => {
            let rows: Vec<SaleRow> = sqlx::query_as(&format!(
                "SELECT {} FROM sales WHERE created_at >= ?1 AND created_at < ?2 \
                 ORDER BY created_at DESC, id ASC",
                SALE_COLUMNS
            ))
            .bind(from)
            .bind(to)
            .fetch_all(&mut *conn)
            .await?;

            let line_rows: Vec<SaleLineRow> = sqlx::query_as(
                r#"
                SELECT l.sale_id, l.product_id, l.name, l.unit_price_cents,
                       l.qty_sold, l.subtotal_cents, l.refunded_qty
                FROM sale_lines l
                JOIN sales s ON s.id = l.sale_id
                WHERE s.created_at >= ?1 AND s.created_at < ?2
                ORDER BY l.sale_id ASC, l.line_no ASC
                "#,
            )
            .bind(from)
            .bind(to)
            .fetch_all(&mut *conn)
            .await?;

            (rows, line_rows)
        }
        None => {
            let rows: Vec<SaleRow> = sqlx::query_as(&format!(
                "SELECT {} FROM sales ORDER BY created_at DESC, id ASC",
                SALE_COLUMNS
            ))
            .fetch_all(&mut *conn)
            .await?;

            let line_rows: Vec<SaleLineRow> = sqlx::query_as(
                r#"
                SELECT sale_id, product_id, name, unit_price_cents, qty_sold, subtotal_cents, refunded_qty
                FROM sale_lines
                ORDER BY sale_id ASC, line_no ASC
                "#,
            )
            .fetch_all(&mut *conn)
            .await?;

            (rows, line_rows)
        }
    };

    debug!(sales = rows.len(), lines = line_rows.len(), ranged = range.is_some(), "Loaded sales");

    let mut lines_by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
    for line in line_rows {
        lines_by_sale
            .entry(line.sale_id.clone())
            .or_default()
            .push(line.into_line());
    }

    rows.into_iter()
        .map(|row| {
            let items = lines_by_sale.remove(&row.id).unwrap_or_default();
            row.into_sale(items)
        })
        .collect()
}

/// Persists the refund counters, status and refund date of a sale.
pub(crate) async fn write_refund_state(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, status = %sale.status, "Writing refund state");

    for (line_no, line) in sale.items.iter().enumerate() {
        sqlx::query("UPDATE sale_lines SET refunded_qty = ?3 WHERE sale_id = ?1 AND line_no = ?2")
            .bind(&sale.id)
            .bind(line_no as i64)
            .bind(line.refunded_qty)
            .execute(&mut *conn)
            .await?;
    }

    let result = sqlx::query("UPDATE sales SET status = ?2, refund_date = ?3 WHERE id = ?1")
        .bind(&sale.id)
        .bind(sale.status)
        .bind(sale.refund_date)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", &sale.id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;

    fn sale(id: &str, day: u32) -> Sale {
        Sale {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap(),
            items: vec![
                SaleLine {
                    product_id: "p1".to_string(),
                    name: "Pancit Canton".to_string(),
                    unit_price_cents: 1500,
                    qty_sold: 2,
                    subtotal_cents: 2700,
                    refunded_qty: 0,
                },
                SaleLine {
                    product_id: "p2".to_string(),
                    name: "Kopiko".to_string(),
                    unit_price_cents: 1000,
                    qty_sold: 1,
                    subtotal_cents: 900,
                    refunded_qty: 0,
                },
            ],
            discount: Some(Discount::percent_bps(1000)),
            payment_mode: PaymentMode::GCash,
            total_before_discount_cents: 4000,
            total_after_discount_cents: 3600,
            cash_tendered_cents: 0,
            change_due_cents: 0,
            month_key: "2025-03".to_string(),
            status: SaleStatus::Completed,
            refund_date: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let original = sale("s1", 3);

        let mut conn = db.pool().acquire().await.unwrap();
        insert_sale(&mut conn, &original).await.unwrap();
        drop(conn);

        let stored = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(stored, original);
        assert!(db.sales().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        insert_sale(&mut conn, &sale("old", 1)).await.unwrap();
        insert_sale(&mut conn, &sale("new", 20)).await.unwrap();
        drop(conn);

        let all = db.sales().list_all().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(all.iter().all(|s| s.items.len() == 2));

    }

    #[tokio::test]
    async fn test_ranged_list_reads_only_window() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        insert_sale(&mut conn, &sale("old", 1)).await.unwrap();
        insert_sale(&mut conn, &sale("edge", 10)).await.unwrap();
        insert_sale(&mut conn, &sale("new", 20)).await.unwrap();

        // [03-10 09:00, 03-20 09:00): start inclusive, end exclusive
        let from = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap();
        let ranged = list_sales(&mut conn, Some((from, to))).await.unwrap();
        drop(conn);

        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].id, "edge");
        assert_eq!(ranged[0].items.len(), 2);
        assert_eq!(ranged[0], sale("edge", 10));
    }

    #[tokio::test]
    async fn test_write_refund_state() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut s = sale("s1", 3);

        let mut conn = db.pool().acquire().await.unwrap();
        insert_sale(&mut conn, &s).await.unwrap();

        s.items[1].refunded_qty = 1;
        s.recompute_status();
        s.refund_date = Some(Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap());
        write_refund_state(&mut conn, &s).await.unwrap();
        drop(conn);

        let stored = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::PartiallyRefunded);
        assert_eq!(stored.items[1].refunded_qty, 1);
        assert_eq!(stored.refund_date, s.refund_date);
    }
}
