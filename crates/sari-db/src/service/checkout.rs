//! # Sale Recorder
//!
//! Commits a cart as a sale: stock decrements, monthly counters and the sale
//! record, all in one SQLite transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  plan_checkout(cart)            (pure, sari-core)                      │
//! │       │  EmptyCart / InsufficientPayment → rejected, nothing written   │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │   ├── per line: qty = qty - n          (delta update, RETURNING qty)   │
//! │   │             monthly_sales[month] += n                              │
//! │   ├── INSERT sale + sale_lines                                         │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: SQLite rolls back.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::FixedOffset;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::repository::product::{apply_stock_delta, bump_monthly_sales, decrement_with_floor, fetch_product};
use crate::repository::sale::insert_sale;
use sari_core::checkout::StockMove;
use sari_core::{month_key, plan_checkout, Cart, Clock, CoreError, Money, Sale, StockAlert};

/// What to do when a line takes more units than are on the shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutPolicy {
    /// Let stock go negative and report it, instead of failing the sale.
    pub allow_oversell: bool,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        CheckoutPolicy {
            allow_oversell: true,
        }
    }
}

/// Result of a committed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub sale: Sale,
    pub change_due: Money,
    /// Products left with negative stock by this sale.
    pub oversold: Vec<StockAlert>,
}

/// Records sales.
#[derive(Clone)]
pub struct SaleRecorder {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    policy: CheckoutPolicy,
}

impl SaleRecorder {
    /// Creates a recorder with the default (permissive) oversell policy.
    ///
    /// `offset` is the store's UTC offset, used for the month key.
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        SaleRecorder {
            pool,
            clock,
            offset,
            policy: CheckoutPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CheckoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CheckoutPolicy {
        self.policy
    }

    /// Checks out a cart.
    ///
    /// The cart itself is left alone; callers clear it after success.
    ///
    /// ## Errors
    /// - `Core(EmptyCart | InsufficientPayment)` before anything is written
    /// - `Core(ProductNotFound)` if a line's product vanished; rolled back
    /// - `Core(InsufficientStock)` when oversell is disabled; rolled back
    /// - `StorageFailure` on any database error; rolled back
    pub async fn checkout(&self, cart: &Cart) -> ServiceResult<CheckoutReceipt> {
        let now = self.clock.now();
        let month = month_key(now, self.offset);
        let plan = plan_checkout(cart, Uuid::new_v4().to_string(), now, month)?;

        debug!(
            sale_id = %plan.sale.id,
            lines = plan.sale.items.len(),
            total = %plan.sale.total_after_discount(),
            "Committing checkout"
        );

        let mut tx = self.pool.begin().await?;
        let mut oversold = Vec::new();

        for stock_move in &plan.stock_moves {
            let qty_after = self.take_stock(&mut tx, stock_move, now).await?;

            if qty_after < 0 {
                warn!(
                    sale_id = %plan.sale.id,
                    product_id = %stock_move.product_id,
                    qty_after = qty_after,
                    "Checkout left product oversold"
                );
                oversold.push(StockAlert {
                    product_id: stock_move.product_id.clone(),
                    name: stock_move.name.clone(),
                    qty_after,
                });
            }

            bump_monthly_sales(
                &mut tx,
                &stock_move.product_id,
                &plan.sale.month_key,
                stock_move.quantity,
            )
            .await?;
        }

        insert_sale(&mut tx, &plan.sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %plan.sale.id,
            total = %plan.sale.total_after_discount(),
            payment_mode = %plan.sale.payment_mode,
            oversold = oversold.len(),
            "Sale recorded"
        );

        Ok(CheckoutReceipt {
            change_due: plan.sale.change_due(),
            sale: plan.sale,
            oversold,
        })
    }

    async fn take_stock(
        &self,
        conn: &mut sqlx::SqliteConnection,
        stock_move: &StockMove,
        now: chrono::DateTime<chrono::Utc>,
    ) -> ServiceResult<i64> {
        if self.policy.allow_oversell {
            let qty = apply_stock_delta(conn, &stock_move.product_id, -stock_move.quantity, now)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(stock_move.product_id.clone()))?;
            return Ok(qty);
        }

        if let Some(qty) = decrement_with_floor(conn, &stock_move.product_id, stock_move.quantity, now).await? {
            return Ok(qty);
        }

        match fetch_product(conn, &stock_move.product_id).await? {
            Some(product) => Err(CoreError::InsufficientStock {
                product_id: product.id,
                name: product.name,
                available: product.qty,
                requested: stock_move.quantity,
            }
            .into()),
            None => Err(CoreError::ProductNotFound(stock_move.product_id.clone()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::pool::{Database, DbConfig};
    use chrono::{TimeZone, Utc};
    use sari_core::ports::store_offset;
    use sari_core::{Discount, FixedClock, PaymentMode, Product};
    use std::collections::BTreeMap;

    async fn setup(qty: i64) -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let product = Product {
            id: "p-canton".to_string(),
            sku: "CANTON".to_string(),
            name: "Pancit Canton".to_string(),
            price_cents: 10000,
            qty,
            threshold: 0,
            deadstock: false,
            monthly_sales: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        (db, product)
    }

    fn recorder(db: &Database) -> SaleRecorder {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 31, 18, 0, 0).unwrap());
        SaleRecorder::new(db.pool().clone(), Arc::new(clock), store_offset(480))
    }

    #[tokio::test]
    async fn test_checkout_commits_sale_and_stock() {
        let (db, product) = setup(10).await;
        let mut cart = Cart::new("Walk-in");
        cart.add_line(&product, 2).unwrap();
        cart.set_cash_tendered(Money::from_cents(30000)).unwrap();

        let receipt = recorder(&db).checkout(&cart).await.unwrap();
        assert_eq!(receipt.change_due, Money::from_cents(10000));
        assert!(receipt.oversold.is_empty());
        // 18:00 UTC on Mar 31 is already April in UTC+8
        assert_eq!(receipt.sale.month_key, "2025-04");

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.qty, 8);
        assert_eq!(stored.monthly_sold("2025-04"), 2);

        let sale = db.sales().get_by_id(&receipt.sale.id).await.unwrap().unwrap();
        assert_eq!(sale, receipt.sale);
    }

    #[tokio::test]
    async fn test_rejected_cart_writes_nothing() {
        let (db, product) = setup(10).await;
        let mut cart = Cart::new("Walk-in");
        cart.add_line(&product, 2).unwrap();
        cart.set_cash_tendered(Money::from_cents(100)).unwrap();

        let err = recorder(&db).checkout(&cart).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::InsufficientPayment { .. })
        ));
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().qty, 10);
    }

    #[tokio::test]
    async fn test_oversell_allowed_by_default() {
        let (db, product) = setup(1).await;
        let mut cart = Cart::new("Walk-in");
        cart.add_line(&product, 1).unwrap();
        cart.set_payment_mode(PaymentMode::GCash);

        let recorder = recorder(&db);
        recorder.checkout(&cart).await.unwrap();
        let second = recorder.checkout(&cart).await.unwrap();

        assert_eq!(second.oversold.len(), 1);
        assert_eq!(second.oversold[0].qty_after, -1);
        assert_eq!(db.products().list_oversold().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_strict_policy_rolls_back() {
        let (db, product) = setup(1).await;
        let mut cart = Cart::new("Walk-in");
        cart.add_line(&product, 1).unwrap();
        cart.set_payment_mode(PaymentMode::CreditCard);

        let recorder = recorder(&db).with_policy(CheckoutPolicy {
            allow_oversell: false,
        });
        recorder.checkout(&cart).await.unwrap();

        let err = recorder.checkout(&cart).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::InsufficientStock { available: 0, .. })
        ));
        assert_eq!(db.sales().count().await.unwrap(), 1);

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.qty, 0);
        assert_eq!(stored.monthly_sold("2025-04"), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back() {
        let (db, product) = setup(5).await;
        let mut ghost = product.clone();
        ghost.id = "p-ghost".to_string();

        let mut cart = Cart::new("Walk-in");
        cart.add_line(&product, 1).unwrap();
        cart.add_line(&ghost, 1).unwrap();
        cart.apply_discount(Discount::percent_bps(1000));
        cart.set_cash_tendered(Money::from_cents(50000)).unwrap();

        let err = recorder(&db).checkout(&cart).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::ProductNotFound(ref id)) if id == "p-ghost"));

        // The first line's decrement was rolled back with the rest
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().qty, 5);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }
}
