//! # sari-db: Database Layer for Sari POS
//!
//! SQLite storage for the catalog and sales, plus the transactional services
//! that turn `sari-core` decisions into committed rows.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sari POS Data Flow                               │
//! │                                                                         │
//! │  sari-terminal command (sell / refund / report / import)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     sari-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Services    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │ SaleRecorder  │───►│ ProductRepo   │    │  (embedded)  │   │   │
//! │  │   │ RefundRecon.  │    │ SaleRepo      │    │ 001_initial  │   │   │
//! │  │   │ SalesReporter │    │ AccessRepo    │    │ 002_cart_book│   │   │
//! │  │   │ CatalogImport │    │ CartBookRepo  │    └──────────────┘   │   │
//! │  │   └───────────────┘    └───────┬───────┘                       │   │
//! │  │                                │                                │   │
//! │  │        Database (pool.rs) ◄────┘                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and the services' `ServiceError`
//! - [`repository`] - Product, sale, admin access and cart book storage
//! - [`service`] - Checkout, refund, report and catalog import
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sari_db::{Database, DbConfig, SaleRecorder};
//!
//! let db = Database::new(DbConfig::new("path/to/sari.db")).await?;
//! let recorder = SaleRecorder::new(db.pool().clone(), clock, offset);
//! let receipt = recorder.checkout(&cart).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::access::{AccessRepository, PinAuthorizer};
pub use repository::cart::CartBookRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;

pub use service::{
    CatalogImporter, CheckoutPolicy, CheckoutReceipt, ImportSummary, RefundReconciler,
    SaleRecorder, SalesReporter,
};
