//! # Sales History
//!
//! Status filter and pagination for the sales history view, newest first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Sale, SaleStatus};

/// Sales per page when the caller does not say otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleFilter {
    #[default]
    All,
    Completed,
    PartiallyRefunded,
    Refunded,
}

impl SaleFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        match self {
            SaleFilter::All => true,
            SaleFilter::Completed => sale.status == SaleStatus::Completed,
            SaleFilter::PartiallyRefunded => sale.status == SaleStatus::PartiallyRefunded,
            SaleFilter::Refunded => sale.status == SaleStatus::Refunded,
        }
    }
}

impl fmt::Display for SaleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaleFilter::All => "all",
            SaleFilter::Completed => "completed",
            SaleFilter::PartiallyRefunded => "partially_refunded",
            SaleFilter::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl FromStr for SaleFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "all" => Ok(SaleFilter::All),
            "completed" => Ok(SaleFilter::Completed),
            "partially_refunded" | "partial" => Ok(SaleFilter::PartiallyRefunded),
            "refunded" => Ok(SaleFilter::Refunded),
            other => Err(ValidationError::InvalidFormat {
                field: "filter".to_string(),
                reason: format!("unknown status filter '{}'", other),
            }),
        }
    }
}

/// One page of matching sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub sales: Vec<Sale>,
    /// 1-based, clamped into `1..=total_pages`.
    pub page: usize,
    /// At least 1, even when nothing matches.
    pub total_pages: usize,
    pub total_matching: usize,
}

/// Filters, sorts newest first (ties by id) and slices out one page.
pub fn page(sales: &[Sale], filter: SaleFilter, page: usize, page_size: usize) -> HistoryPage {
    let page_size = page_size.max(1);

    let mut matching: Vec<&Sale> = sales.iter().filter(|s| filter.matches(s)).collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    let total_matching = matching.len();
    let total_pages = total_matching.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let sales = matching
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    HistoryPage {
        sales,
        page,
        total_pages,
        total_matching,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMode, SaleLine};
    use chrono::{Duration, TimeZone, Utc};

    fn sale(i: i64, status: SaleStatus) -> Sale {
        Sale {
            id: format!("s{:02}", i),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i),
            items: vec![SaleLine {
                product_id: "p".into(),
                name: "P".into(),
                unit_price_cents: 100,
                qty_sold: 1,
                subtotal_cents: 100,
                refunded_qty: 0,
            }],
            discount: None,
            payment_mode: PaymentMode::Cash,
            total_before_discount_cents: 100,
            total_after_discount_cents: 100,
            cash_tendered_cents: 100,
            change_due_cents: 0,
            month_key: "2024-01".into(),
            status,
            refund_date: None,
        }
    }

    #[test]
    fn test_newest_first_pagination() {
        let sales: Vec<Sale> = (0..12).map(|i| sale(i, SaleStatus::Completed)).collect();
        let first = page(&sales, SaleFilter::All, 1, DEFAULT_PAGE_SIZE);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_matching, 12);
        assert_eq!(first.sales[0].id, "s11");
        assert_eq!(first.sales.len(), 5);

        let last = page(&sales, SaleFilter::All, 3, DEFAULT_PAGE_SIZE);
        assert_eq!(last.sales.len(), 2);
        assert_eq!(last.sales[1].id, "s00");
    }

    #[test]
    fn test_filter_and_clamp() {
        let sales = vec![
            sale(1, SaleStatus::Completed),
            sale(2, SaleStatus::Refunded),
            sale(3, SaleStatus::PartiallyRefunded),
        ];
        let refunded = page(&sales, SaleFilter::Refunded, 9, 5);
        assert_eq!(refunded.page, 1);
        assert_eq!(refunded.sales.len(), 1);
        assert_eq!(refunded.sales[0].id, "s02");

        let none = page(&[], SaleFilter::All, 0, 5);
        assert_eq!(none.page, 1);
        assert_eq!(none.total_pages, 1);
        assert!(none.sales.is_empty());

        assert_eq!("partially-refunded".parse::<SaleFilter>().unwrap(), SaleFilter::PartiallyRefunded);
    }
}
