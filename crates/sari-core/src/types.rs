//! # Domain Types
//!
//! Core domain types used throughout Sari POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  product_id     │       │
//! │  │  sku            │   │  created_at     │   │  qty_sold  🔒   │       │
//! │  │  qty (may be <0)│   │  status         │   │  subtotal  🔒   │       │
//! │  │  monthly_sales  │   │  items ─────────┼──►│  refunded_qty ✎ │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Discount     │   │   SaleStatus    │   │  PaymentMode    │       │
//! │  │  Percent { bps }│   │  Completed      │   │  Cash  GCash    │       │
//! │  │  Cash { amount }│   │  PartiallyRef.. │   │  CreditCard     │       │
//! │  └─────────────────┘   │  Refunded       │   │  DebitCard      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  🔒 fixed at checkout     ✎ mutated only by the refund reconciler       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product as the core sees it.
///
/// Catalog management owns creation and editing. The core only reads
/// `price_cents`/`qty` and, through sari-db services, moves `qty` and
/// `monthly_sales`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier typed at the counter.
    pub sku: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Price in centavos.
    pub price_cents: i64,

    /// Units on hand. Negative means oversold and needs attention.
    pub qty: i64,

    /// Reorder point. Zero means "not set".
    pub threshold: i64,

    /// Flag maintained by external slow-mover analytics.
    pub deadstock: bool,

    /// Units sold per `"YYYY-MM"` month key.
    pub monthly_sales: BTreeMap<String, i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Units sold in the given month, zero when never counted.
    pub fn monthly_sold(&self, month_key: &str) -> i64 {
        self.monthly_sales.get(month_key).copied().unwrap_or(0)
    }

    #[inline]
    pub fn is_oversold(&self) -> bool {
        self.qty < 0
    }
}

// =============================================================================
// Payment Mode
// =============================================================================

/// How the customer paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Physical cash; the only mode that requires tender and gives change.
    #[default]
    Cash,
    /// GCash e-wallet transfer.
    #[serde(rename = "gcash")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "gcash"))]
    GCash,
    CreditCard,
    DebitCard,
}

impl PaymentMode {
    /// Whether `cash_tendered >= total` is a checkout precondition.
    pub fn requires_tender(&self) -> bool {
        matches!(self, PaymentMode::Cash)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::GCash => "gcash",
            PaymentMode::CreditCard => "credit_card",
            PaymentMode::DebitCard => "debit_card",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::GCash => "GCash",
            PaymentMode::CreditCard => "Credit Card",
            PaymentMode::DebitCard => "Debit Card",
        };
        f.write_str(label)
    }
}

impl FromStr for PaymentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "cash" => Ok(PaymentMode::Cash),
            "gcash" => Ok(PaymentMode::GCash),
            "credit_card" | "credit" => Ok(PaymentMode::CreditCard),
            "debit_card" | "debit" => Ok(PaymentMode::DebitCard),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_mode".to_string(),
                reason: format!(
                    "unknown mode '{}', expected cash, gcash, credit-card or debit-card",
                    other
                ),
            }),
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// A single discount applied to a whole cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Percent of the total, in basis points (1000 = 10%).
    Percent { bps: u32 },
    /// Flat amount off the total.
    Cash { amount: Money },
}

impl Discount {
    /// Percent discount from basis points.
    pub fn percent_bps(bps: u32) -> Self {
        Discount::Percent { bps }
    }

    /// Flat cash discount. Negative amounts are rejected.
    pub fn cash(amount: Money) -> CoreResult<Self> {
        if amount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "discount".to_string(),
            }
            .into());
        }
        Ok(Discount::Cash { amount })
    }

    /// Applies the discount to a pre-discount total. Never negative.
    pub fn apply(&self, total: Money) -> Money {
        match self {
            Discount::Percent { bps } => total.apply_percentage_discount(*bps),
            Discount::Cash { amount } => (total - *amount).clamp_non_negative(),
        }
    }

    /// Storage discriminator (`"percent"` / `"cash"`).
    pub fn kind(&self) -> &'static str {
        match self {
            Discount::Percent { .. } => "percent",
            Discount::Cash { .. } => "cash",
        }
    }

    /// Storage value: basis points for percent, centavos for cash.
    pub fn raw_value(&self) -> i64 {
        match self {
            Discount::Percent { bps } => *bps as i64,
            Discount::Cash { amount } => amount.cents(),
        }
    }

    /// Rebuilds a discount from its storage columns.
    ///
    /// Unknown kinds and negative values read back as "no discount".
    pub fn from_parts(kind: Option<&str>, value: Option<i64>) -> Option<Self> {
        match (kind, value) {
            (Some("percent"), Some(v)) if v >= 0 => u32::try_from(v).ok().map(Discount::percent_bps),
            (Some("cash"), Some(v)) if v >= 0 => Some(Discount::Cash {
                amount: Money::from_cents(v),
            }),
            _ => None,
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Aggregate refund state of a sale.
///
/// Always derived from the lines, never set independently:
/// ```text
/// every line refunded_qty == 0        → Completed
/// every line refunded_qty == qty_sold → Refunded
/// anything in between                 → PartiallyRefunded
/// ```
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Completed,
    PartiallyRefunded,
    Refunded,
}

impl SaleStatus {
    /// Derives the status from line refund counters.
    pub fn from_lines(lines: &[SaleLine]) -> Self {
        if lines.iter().all(|l| l.refunded_qty == 0) {
            SaleStatus::Completed
        } else if lines.iter().all(|l| l.refunded_qty >= l.qty_sold) {
            SaleStatus::Refunded
        } else {
            SaleStatus::PartiallyRefunded
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::PartiallyRefunded => "partially_refunded",
            SaleStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One product's sold quantity, price and refund state within a sale.
///
/// Uses the snapshot pattern: name and unit price are frozen at checkout so
/// later catalog edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    /// Unit price in centavos at time of sale (frozen, undiscounted).
    pub unit_price_cents: i64,
    /// Quantity sold (frozen).
    pub qty_sold: i64,
    /// This line's share of the discounted total (frozen).
    pub subtotal_cents: i64,
    /// Units refunded so far. `0 <= refunded_qty <= qty_sold`.
    pub refunded_qty: i64,
}

impl SaleLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Undiscounted line value (`unit_price × qty_sold`).
    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price().multiply_quantity(self.qty_sold)
    }

    /// Units still refundable.
    #[inline]
    pub fn remaining(&self) -> i64 {
        (self.qty_sold - self.refunded_qty).max(0)
    }

    #[inline]
    pub fn is_fully_refunded(&self) -> bool {
        self.refunded_qty >= self.qty_sold
    }

    /// Discounted value of the first `units` units of this line.
    ///
    /// Refund amounts are differences of this function, so successive partial
    /// refunds add up to exactly `subtotal` once everything is returned.
    pub fn value_of_units(&self, units: i64) -> Money {
        self.subtotal().pro_rata(units, self.qty_sold)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// The durable record of a completed checkout.
///
/// Immutable once created except for `items[*].refunded_qty`, `status` and
/// `refund_date`, which only the refund reconciler touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SaleLine>,
    pub discount: Option<Discount>,
    pub payment_mode: PaymentMode,
    pub total_before_discount_cents: i64,
    pub total_after_discount_cents: i64,
    pub cash_tendered_cents: i64,
    pub change_due_cents: i64,
    /// `"YYYY-MM"` month the units were counted against.
    pub month_key: String,
    pub status: SaleStatus,
    pub refund_date: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total_before_discount(&self) -> Money {
        Money::from_cents(self.total_before_discount_cents)
    }

    #[inline]
    pub fn total_after_discount(&self) -> Money {
        Money::from_cents(self.total_after_discount_cents)
    }

    #[inline]
    pub fn change_due(&self) -> Money {
        Money::from_cents(self.change_due_cents)
    }

    /// Effective discount as basis points of the pre-discount total.
    ///
    /// Zero when there is no discount or the total is zero.
    pub fn discount_percent_bps(&self) -> u32 {
        let before = self.total_before_discount_cents;
        if before <= 0 {
            return 0;
        }
        let off = (before - self.total_after_discount_cents).max(0);
        ((off as i128 * 10_000) / before as i128) as u32
    }

    /// Finds the line for a product.
    pub fn line(&self, product_id: &str) -> Option<&SaleLine> {
        self.items.iter().find(|l| l.product_id == product_id)
    }

    /// Recomputes `status` from the lines.
    pub fn recompute_status(&mut self) -> SaleStatus {
        self.status = SaleStatus::from_lines(&self.items);
        self.status
    }

    /// Total units sold across all lines.
    pub fn units_sold(&self) -> i64 {
        self.items.iter().map(|l| l.qty_sold).sum()
    }

    /// Total units refunded across all lines.
    pub fn units_refunded(&self) -> i64 {
        self.items.iter().map(|l| l.refunded_qty).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
