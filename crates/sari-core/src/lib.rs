//! # sari-core: Pure Business Logic for Sari POS
//!
//! Everything that decides money, stock and refund state lives here, as pure
//! functions over plain data. Storage and the clock are somebody else's job.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sari POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 sari-terminal (apps/terminal)                   │   │
//! │  │        sell · refund · report · history · attention · import   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  sari-db (services + SQLite)                    │   │
//! │  │   SaleRecorder · RefundReconciler · SalesReporter · Importer    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ sari-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   cart ──► pricing ──► checkout ──► refund ──► report           │   │
//! │  │                                                                 │   │
//! │  │   money · types · history · inventory · import · ports          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK READS • PURE FUNCTIONS       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer centavo `Money`
//! - [`types`] - Product, Sale, SaleLine, Discount, statuses
//! - [`cart`] - Cart lines, stock bounds, waiting carts
//! - [`pricing`] - Discounted totals, per-line allocation, change due
//! - [`checkout`] - Cart → immutable sale + stock moves
//! - [`refund`] - Refund capping, status recomputation
//! - [`report`] - Period aggregation, CSV export, dashboard summary
//! - [`history`] - Status filter and pagination
//! - [`inventory`] - Oversold / low stock classification
//! - [`import`] - Catalog CSV parsing and diffing
//! - [`ports`] - `Clock`, `Authorizer`, month keys
//! - [`validation`] - Edge input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use sari_core::{Cart, Discount, Money};
//! # use std::collections::BTreeMap;
//! # use chrono::Utc;
//! # let product = sari_core::Product {
//! #     id: "p1".into(), sku: "CANTON".into(), name: "Pancit Canton".into(),
//! #     price_cents: 25000, qty: 10, threshold: 0, deadstock: false,
//! #     monthly_sales: BTreeMap::new(), created_at: Utc::now(), updated_at: Utc::now(),
//! # };
//!
//! let mut cart = Cart::new("Walk-in");
//! cart.add_line(&product, 2).unwrap();               // ₱500.00
//! cart.apply_discount(Discount::percent_bps(1000));  // 10% off
//!
//! assert_eq!(cart.total_after_discount(), Money::from_cents(45000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod history;
pub mod import;
pub mod inventory;
pub mod money;
pub mod ports;
pub mod pricing;
pub mod refund;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{AddLineNotice, Cart, CartBook, CartLine};
pub use checkout::{plan_checkout, CheckoutPlan, StockAlert, StockMove};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use ports::{month_key, Authorizer, Clock, FixedClock, SystemClock};
pub use pricing::{price_cart, PricingResult};
pub use refund::{apply_refund, RefundOutcome, RefundRequest};
pub use report::{report, report_to_csv, summary, DashboardSummary, ReportPeriod, ReportResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Reorder point used when a product has none set.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 3;

/// Stock level at or below which the cashier is told to restock soon.
pub const LOW_STOCK_WARNING_LEVEL: i64 = 5;
