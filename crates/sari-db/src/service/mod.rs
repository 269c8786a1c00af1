//! # Services
//!
//! The only code paths that write stock. Each public operation is one SQLite
//! transaction: it commits whole or not at all.
//!
//! ```text
//! ┌──────────────────┬───────────────────────────────┬─────────────────────┐
//! │ Service          │ Writes                        │ Gate                │
//! ├──────────────────┼───────────────────────────────┼─────────────────────┤
//! │ SaleRecorder     │ qty −, monthly sales +, sale  │ cart preconditions  │
//! │ RefundReconciler │ qty +, refunded_qty, status   │ admin PIN           │
//! │ SalesReporter    │ (read only)                   │ admin PIN           │
//! │ CatalogImporter  │ qty = count, name, price      │ (operator)          │
//! └──────────────────┴───────────────────────────────┴─────────────────────┘
//! ```

pub mod catalog;
pub mod checkout;
pub mod refund;
pub mod report;

pub use catalog::{CatalogImporter, ImportSummary};
pub use checkout::{CheckoutPolicy, CheckoutReceipt, SaleRecorder};
pub use refund::RefundReconciler;
pub use report::SalesReporter;
