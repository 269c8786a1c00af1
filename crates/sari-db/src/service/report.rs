//! # Sales Reporter
//!
//! Loads recorded sales and runs the period aggregation over them. Reports
//! show revenue, so they sit behind the admin PIN like refunds do. The
//! dashboard summary only shows period totals and stays open.
//!
//! Only the period's window is read from SQLite; the core fold re-checks
//! membership on the store calendar.

use chrono::FixedOffset;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ServiceResult;
use crate::repository::product::list_products;
use crate::repository::sale::list_sales;
use sari_core::{
    report, report_to_csv, summary, Authorizer, Clock, CoreError, DashboardSummary, ReportPeriod,
    ReportResult,
};

#[derive(Clone)]
pub struct SalesReporter {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    authorizer: Arc<dyn Authorizer>,
    offset: FixedOffset,
}

impl SalesReporter {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        authorizer: Arc<dyn Authorizer>,
        offset: FixedOffset,
    ) -> Self {
        SalesReporter {
            pool,
            clock,
            authorizer,
            offset,
        }
    }

    /// Builds the report for `period`, evaluated in the store's calendar.
    pub async fn generate(&self, period: &ReportPeriod, secret: &str) -> ServiceResult<ReportResult> {
        if !self.authorizer.authorize(secret) {
            warn!(period = %period, "Report refused: authorization failed");
            return Err(CoreError::Unauthorized.into());
        }

        let now = self.clock.now().with_timezone(&self.offset);

        let mut conn = self.pool.acquire().await?;
        let sales = list_sales(&mut conn, period.bounds(now)).await?;
        drop(conn);

        let result = report(period, &sales, now);

        info!(
            period = %result.period_label,
            rows = result.rows.len(),
            sales = result.totals.sale_count,
            net = %result.totals.net_sales,
            "Report generated"
        );

        Ok(result)
    }

    /// Today / month / year totals plus catalog stock counts. No PIN.
    pub async fn summary(&self) -> ServiceResult<DashboardSummary> {
        let now = self.clock.now().with_timezone(&self.offset);

        let mut conn = self.pool.acquire().await?;
        let sales = list_sales(&mut conn, ReportPeriod::Yearly.bounds(now)).await?;
        let products = list_products(&mut conn).await?;
        drop(conn);

        let dashboard = summary(&sales, &products, now);
        info!(
            today = %dashboard.today.net_sales,
            month = %dashboard.month.net_sales,
            year = %dashboard.year.net_sales,
            low_stock = dashboard.inventory.low_stock_count,
            "Dashboard summarized"
        );

        Ok(dashboard)
    }

    /// Same as [`generate`](Self::generate), rendered as CSV.
    pub async fn export_csv(&self, period: &ReportPeriod, secret: &str) -> ServiceResult<String> {
        let result = self.generate(period, secret).await?;
        Ok(report_to_csv(&result)?)
    }
}
