//! # Application State
//!
//! Everything a command needs, built once at startup.
//!
//! ```text
//! ┌───────────────────┐ ┌──────────────────┐ ┌──────────────┐ ┌────────────┐
//! │ Database          │ │ AppConfig        │ │ Clock        │ │ CartState  │
//! │ • pool            │ │ • store offset   │ │ • SystemClock│ │ • CartBook │
//! │ • repositories    │ │ • oversell policy│ │              │ │   (Mutex)  │
//! └───────────────────┘ └──────────────────┘ └──────────────┘ └────────────┘
//! ```
//!
//! Services are built on demand from these parts. The cart book lives in
//! memory during a command and in the database between commands.

pub mod cart;

pub use cart::CartState;

use chrono::FixedOffset;
use std::sync::Arc;

use crate::config::AppConfig;
use sari_core::ports::store_offset;
use sari_core::{Authorizer, Clock, SystemClock};
use sari_db::{
    CatalogImporter, CheckoutPolicy, Database, DbResult, RefundReconciler, SaleRecorder,
    SalesReporter,
};

pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
    pub carts: CartState,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let carts = CartState::new(config.checkout.low_stock_warning);
        AppState {
            db,
            config,
            clock,
            carts,
        }
    }

    /// The store's fixed UTC offset.
    pub fn offset(&self) -> FixedOffset {
        store_offset(self.config.store.utc_offset_minutes)
    }

    pub fn recorder(&self) -> SaleRecorder {
        SaleRecorder::new(self.db.pool().clone(), self.clock.clone(), self.offset()).with_policy(
            CheckoutPolicy {
                allow_oversell: self.config.checkout.allow_oversell,
            },
        )
    }

    pub async fn reconciler(&self) -> DbResult<RefundReconciler> {
        Ok(RefundReconciler::new(
            self.db.pool().clone(),
            self.clock.clone(),
            self.authorizer().await?,
        ))
    }

    pub async fn reporter(&self) -> DbResult<SalesReporter> {
        Ok(SalesReporter::new(
            self.db.pool().clone(),
            self.clock.clone(),
            self.authorizer().await?,
            self.offset(),
        ))
    }

    pub fn importer(&self) -> CatalogImporter {
        CatalogImporter::new(self.db.pool().clone(), self.clock.clone())
    }

    /// Loads the saved cart book, if there is one, into [`carts`](Self::carts).
    pub async fn restore_carts(&self) -> DbResult<()> {
        if let Some(book) = self.db.carts().load().await? {
            self.carts.replace(book);
        }
        Ok(())
    }

    /// Saves the in-memory cart book.
    pub async fn persist_carts(&self) -> DbResult<()> {
        self.db.carts().save(&self.carts.snapshot()).await
    }

    async fn authorizer(&self) -> DbResult<Arc<dyn Authorizer>> {
        Ok(Arc::new(self.db.access().authorizer().await?))
    }
}
