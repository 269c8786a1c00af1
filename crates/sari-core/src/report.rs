//! # Sales Report Aggregation
//!
//! A pure fold over a finite list of sales. Re-running it on the same input
//! gives an identical result.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales ──► filter by period ──► group lines by product ──► derive net   │
//! │            (store's local       (BTreeMap, name & price    netQty =     │
//! │             calendar)            of the latest sale)       max(0, …)    │
//! │                                                               │         │
//! │                     sort: net_qty desc, name asc (no case), id asc      │
//! │                                                               │         │
//! │                                                               ▼         │
//! │                                           ReportResult { rows, totals } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts use the undiscounted unit price, matching the shelf price the
//! store reports against. Each line is valued at its own snapshot price, so a
//! product whose price changed inside the period still sums correctly; the
//! row's `unit_price` is only the most recent of those prices.
//!
//! [`summary`] is the un-gated dashboard view: net sales and refunds for
//! today, this month and this year, plus catalog stock counts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Product, Sale};
use crate::LOW_STOCK_WARNING_LEVEL;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// =============================================================================
// Period
// =============================================================================

/// Which sales a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPeriod {
    /// Same calendar day as "now".
    Daily,
    /// Same calendar month and year as "now".
    Monthly,
    /// Same calendar year as "now".
    Yearly,
    /// Inclusive date range; the end day counts through 23:59:59.
    Custom { start: NaiveDate, end: NaiveDate },
}

impl ReportPeriod {
    /// Custom range, rejecting `start > end`.
    pub fn custom(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::InvalidReportRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(ReportPeriod::Custom { start, end })
    }

    /// Whether `at` falls in the period, judged on the calendar of `now`'s offset.
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<FixedOffset>) -> bool {
        let local = at.with_timezone(now.offset()).date_naive();
        let today = now.date_naive();
        match self {
            ReportPeriod::Daily => local == today,
            ReportPeriod::Monthly => local.year() == today.year() && local.month() == today.month(),
            ReportPeriod::Yearly => local.year() == today.year(),
            ReportPeriod::Custom { start, end } => local >= *start && local <= *end,
        }
    }

    /// Half-open UTC window `[from, to)` covering the period's local days.
    ///
    /// Used to narrow the SQL scan; [`contains`](Self::contains) stays the
    /// authority on membership. `None` only when the calendar overflows.
    pub fn bounds(&self, now: DateTime<FixedOffset>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let (first, after_last) = match self {
            ReportPeriod::Daily => (today, today.succ_opt()?),
            ReportPeriod::Monthly => {
                let first = today.with_day(1)?;
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
                };
                (first, next)
            }
            ReportPeriod::Yearly => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?,
            ),
            ReportPeriod::Custom { start, end } => (*start, end.succ_opt()?),
        };

        let offset = Duration::seconds(i64::from(now.offset().local_minus_utc()));
        let midnight = |day: NaiveDate| Utc.from_utc_datetime(&(day.and_time(NaiveTime::MIN) - offset));
        Some((midnight(first), midnight(after_last)))
    }

    /// Human-readable label used as the first CSV row.
    pub fn label(&self, now: DateTime<FixedOffset>) -> String {
        let today = now.date_naive();
        match self {
            ReportPeriod::Daily => format!("Daily Report ({})", today.format("%Y-%m-%d")),
            ReportPeriod::Monthly => format!(
                "Monthly Report ({} {})",
                MONTH_NAMES[today.month0() as usize],
                today.year()
            ),
            ReportPeriod::Yearly => format!("Yearly Report ({})", today.year()),
            ReportPeriod::Custom { start, end } => format!(
                "Custom Report ({} → {})",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
        }
    }

    /// Short name used in file names (`daily`, `custom`, ...).
    pub fn slug(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Monthly => "monthly",
            ReportPeriod::Yearly => "yearly",
            ReportPeriod::Custom { .. } => "custom",
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Parses the fixed periods. Custom ranges go through [`ReportPeriod::custom`].
impl FromStr for ReportPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "today" => Ok(ReportPeriod::Daily),
            "monthly" | "month" => Ok(ReportPeriod::Monthly),
            "yearly" | "year" => Ok(ReportPeriod::Yearly),
            other => Err(ValidationError::InvalidFormat {
                field: "period".to_string(),
                reason: format!("unknown period '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Result
// =============================================================================

/// Per-product totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub product_id: String,
    /// Name on the most recent sale in the period.
    pub name: String,
    /// Price on the most recent sale in the period (latest `created_at`,
    /// ties broken by sale id). Display only: `subtotal` and the other
    /// amounts are summed from each line's own price.
    pub unit_price: Money,
    pub total_qty: i64,
    pub refunded_qty: i64,
    pub net_qty: i64,
    pub subtotal: Money,
    pub refunded_amount: Money,
    pub net_subtotal: Money,
}

/// Grand totals over all rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub total_sales: Money,
    pub total_refunds: Money,
    pub net_sales: Money,
    pub sale_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    pub period: ReportPeriod,
    pub period_label: String,
    pub rows: Vec<ReportRow>,
    pub totals: ReportTotals,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Aggregates the sales that fall in `period`.
pub fn report(period: &ReportPeriod, sales: &[Sale], now: DateTime<FixedOffset>) -> ReportResult {
    let mut grouped: BTreeMap<&str, ReportRow> = BTreeMap::new();
    // (created_at, sale id) of the sale that set each row's name and price
    let mut price_source: BTreeMap<&str, (DateTime<Utc>, &str)> = BTreeMap::new();
    let mut sale_count = 0;

    for sale in sales.iter().filter(|s| period.contains(s.created_at, now)) {
        sale_count += 1;
        let stamp = (sale.created_at, sale.id.as_str());
        for line in &sale.items {
            let row = grouped
                .entry(line.product_id.as_str())
                .or_insert_with(|| ReportRow {
                    product_id: line.product_id.clone(),
                    name: line.name.clone(),
                    unit_price: line.unit_price(),
                    total_qty: 0,
                    refunded_qty: 0,
                    net_qty: 0,
                    subtotal: Money::zero(),
                    refunded_amount: Money::zero(),
                    net_subtotal: Money::zero(),
                });
            let source = price_source.entry(line.product_id.as_str()).or_insert(stamp);
            if stamp > *source {
                *source = stamp;
                row.name = line.name.clone();
                row.unit_price = line.unit_price();
            }
            row.total_qty += line.qty_sold;
            row.refunded_qty += line.refunded_qty;
            row.subtotal += line.unit_price().multiply_quantity(line.qty_sold);
            row.refunded_amount += line.unit_price().multiply_quantity(line.refunded_qty);
        }
    }

    let mut totals = ReportTotals {
        sale_count,
        ..ReportTotals::default()
    };
    let mut rows: Vec<ReportRow> = grouped
        .into_values()
        .map(|mut row| {
            row.net_qty = (row.total_qty - row.refunded_qty).max(0);
            row.net_subtotal = (row.subtotal - row.refunded_amount).clamp_non_negative();
            totals.total_sales += row.subtotal;
            totals.total_refunds += row.refunded_amount;
            totals.net_sales += row.net_subtotal;
            row
        })
        .collect();

    rows.sort_by(|a, b| {
        b.net_qty
            .cmp(&a.net_qty)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    ReportResult {
        period: *period,
        period_label: period.label(now),
        rows,
        totals,
    }
}

// =============================================================================
// Dashboard Summary
// =============================================================================

/// Net sales and refunds over one calendar window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    pub net_sales: Money,
    pub refunds: Money,
    pub sale_count: usize,
}

/// Catalog-wide stock counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub product_count: usize,
    pub total_qty: i64,
    /// Products with `0 < qty < LOW_STOCK_WARNING_LEVEL`.
    pub low_stock_count: usize,
    pub deadstock_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub today: PeriodTotals,
    pub month: PeriodTotals,
    pub year: PeriodTotals,
    pub inventory: InventoryStats,
}

/// Today / this month / this year at a glance, on the calendar of `now`.
///
/// Net and refunded values use the same per-line arithmetic as [`report`],
/// so `summary(..).month.net_sales` equals the monthly report's net sales.
pub fn summary(sales: &[Sale], products: &[Product], now: DateTime<FixedOffset>) -> DashboardSummary {
    let mut today = PeriodTotals::default();
    let mut month = PeriodTotals::default();
    let mut year = PeriodTotals::default();

    for sale in sales {
        let mut net = Money::zero();
        let mut refunded = Money::zero();
        for line in &sale.items {
            net += line.unit_price().multiply_quantity((line.qty_sold - line.refunded_qty).max(0));
            refunded += line.unit_price().multiply_quantity(line.refunded_qty);
        }

        for (period, totals) in [
            (ReportPeriod::Daily, &mut today),
            (ReportPeriod::Monthly, &mut month),
            (ReportPeriod::Yearly, &mut year),
        ] {
            if period.contains(sale.created_at, now) {
                totals.net_sales += net;
                totals.refunds += refunded;
                totals.sale_count += 1;
            }
        }
    }

    let inventory = InventoryStats {
        product_count: products.len(),
        total_qty: products.iter().map(|p| p.qty).sum(),
        low_stock_count: products
            .iter()
            .filter(|p| p.qty > 0 && p.qty < LOW_STOCK_WARNING_LEVEL)
            .count(),
        deadstock_count: products.iter().filter(|p| p.deadstock).count(),
    };

    DashboardSummary {
        today,
        month,
        year,
        inventory,
    }
}

// =============================================================================
// CSV Export
// =============================================================================

/// CSV column headers, in order.
pub const CSV_HEADERS: [&str; 9] = [
    "Product ID",
    "Name",
    "Unit Price",
    "Total Qty",
    "Refunded Qty",
    "Net Qty",
    "Subtotal",
    "Refunded Amount",
    "Net Subtotal",
];

/// Serializes a report: label row, header row, one row per product, totals row.
pub fn report_to_csv(result: &ReportResult) -> CoreResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record([result.period_label.as_str()])?;
    writer.write_record(CSV_HEADERS)?;

    for row in &result.rows {
        writer.write_record([
            row.product_id.clone(),
            row.name.clone(),
            row.unit_price.to_decimal_string(),
            row.total_qty.to_string(),
            row.refunded_qty.to_string(),
            row.net_qty.to_string(),
            row.subtotal.to_decimal_string(),
            row.refunded_amount.to_decimal_string(),
            row.net_subtotal.to_decimal_string(),
        ])?;
    }

    writer.write_record([
        "Totals".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        result.totals.total_sales.to_decimal_string(),
        result.totals.total_refunds.to_decimal_string(),
        result.totals.net_sales.to_decimal_string(),
    ])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| CoreError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CoreError::Csv(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================
