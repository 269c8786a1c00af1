//! # Refund Reconciler
//!
//! Returns sold units to stock and updates a sale's refund accounting.
//!
//! ```text
//! refund(sale_id, requests, secret)
//!   │
//!   ├── authorize(secret)       ✗ → Unauthorized      (nothing read)
//!   ├── requests empty          ✗ → NoItemsSelected
//!   ▼
//! BEGIN
//!   ├── fetch sale              ✗ → SaleNotFound
//!   ├── apply_refund()          (pure: caps, status, refund_date)
//!   ├── qty = qty + applied     per restocked product
//!   ├── UPDATE sale_lines / sales
//! COMMIT
//! ```
//!
//! Requests beyond what is left on a line are capped, logged at `warn!`, and
//! reported back in [`RefundOutcome::capped`].

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ServiceResult;
use crate::repository::product::apply_stock_delta;
use crate::repository::sale::{fetch_sale, write_refund_state};
use sari_core::{apply_refund, Authorizer, Clock, CoreError, RefundOutcome, RefundRequest};

/// Processes refunds against recorded sales.
#[derive(Clone)]
pub struct RefundReconciler {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    authorizer: Arc<dyn Authorizer>,
}

impl RefundReconciler {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, authorizer: Arc<dyn Authorizer>) -> Self {
        RefundReconciler {
            pool,
            clock,
            authorizer,
        }
    }

    /// Refunds units from a sale.
    ///
    /// A request that refunds nothing (the lines are already fully refunded)
    /// succeeds without writing anything.
    ///
    /// ## Errors
    /// - `Core(Unauthorized)` if the secret is refused
    /// - `Core(NoItemsSelected)` for an empty request
    /// - `Core(SaleNotFound | LineNotInSale | Validation)`; nothing written
    /// - `StorageFailure` on any database error; rolled back
    pub async fn refund(
        &self,
        sale_id: &str,
        requests: &[RefundRequest],
        secret: &str,
    ) -> ServiceResult<RefundOutcome> {
        if !self.authorizer.authorize(secret) {
            warn!(sale_id = %sale_id, "Refund refused: authorization failed");
            return Err(CoreError::Unauthorized.into());
        }
        if requests.is_empty() {
            return Err(CoreError::NoItemsSelected.into());
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let mut sale = fetch_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let outcome = apply_refund(&mut sale, requests, now)?;

        for capped in &outcome.capped {
            warn!(
                sale_id = %sale_id,
                product_id = %capped.product_id,
                requested = capped.requested,
                applied = capped.applied,
                "Refund quantity capped to remaining"
            );
        }

        if outcome.is_noop() {
            debug!(sale_id = %sale_id, "Nothing left to refund");
            tx.rollback().await?;
            return Ok(outcome);
        }

        for restock in &outcome.restocks {
            let qty_after = apply_stock_delta(&mut tx, &restock.product_id, restock.quantity, now)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(restock.product_id.clone()))?;
            debug!(
                product_id = %restock.product_id,
                restocked = restock.quantity,
                qty_after = qty_after,
                "Restocked"
            );
        }

        write_refund_state(&mut tx, &sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            units = outcome.units_restocked(),
            amount = %outcome.refund_amount,
            status = %outcome.status,
            "Refund recorded"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::pool::{Database, DbConfig};
    use crate::service::checkout::SaleRecorder;
    use chrono::{TimeZone, Utc};
    use sari_core::ports::store_offset;
    use sari_core::{Cart, FixedClock, Money, Product, SaleStatus};
    use std::collections::BTreeMap;

    struct Fixture {
        db: Database,
        product: Product,
        sale_id: String,
        reconciler: RefundReconciler,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc.with_ymd_and_hms(2025, 5, 2, 3, 0, 0).unwrap();
        let product = Product {
            id: "p-kopiko".to_string(),
            sku: "KOPIKO".to_string(),
            name: "Kopiko Brown".to_string(),
            price_cents: 1000,
            qty: 10,
            threshold: 0,
            deadstock: false,
            monthly_sales: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();

        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let mut cart = Cart::new("Walk-in");
        cart.add_line(&product, 3).unwrap();
        cart.set_cash_tendered(Money::from_cents(3000)).unwrap();
        let receipt = SaleRecorder::new(db.pool().clone(), clock.clone(), store_offset(480))
            .checkout(&cart)
            .await
            .unwrap();

        let authorizer = Arc::new(|secret: &str| secret == "1234");
        let reconciler = RefundReconciler::new(db.pool().clone(), clock, authorizer);

        Fixture {
            db,
            product,
            sale_id: receipt.sale.id,
            reconciler,
        }
    }

    async fn stock(f: &Fixture) -> i64 {
        f.db.products().get_by_id(&f.product.id).await.unwrap().unwrap().qty
    }

    #[tokio::test]
    async fn test_unauthorized_checked_first() {
        let f = setup().await;
        let err = f.reconciler.refund("no-such-sale", &[], "0000").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Unauthorized)));

        let err = f.reconciler.refund(&f.sale_id, &[], "1234").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::NoItemsSelected)));
    }

    #[tokio::test]
    async fn test_unknown_sale() {
        let f = setup().await;
        let err = f
            .reconciler
            .refund("no-such-sale", &[RefundRequest::new("p-kopiko", 1)], "1234")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::SaleNotFound(_))));
    }

    #[tokio::test]
    async fn test_partial_then_capped_refund() {
        let f = setup().await;
        assert_eq!(stock(&f).await, 7);

        let first = f
            .reconciler
            .refund(&f.sale_id, &[RefundRequest::new("p-kopiko", 1)], "1234")
            .await
            .unwrap();
        assert_eq!(first.status, SaleStatus::PartiallyRefunded);
        assert_eq!(first.refund_amount, Money::from_cents(1000));
        assert_eq!(stock(&f).await, 8);

        let second = f
            .reconciler
            .refund(&f.sale_id, &[RefundRequest::new("p-kopiko", 10)], "1234")
            .await
            .unwrap();
        assert_eq!(second.status, SaleStatus::Refunded);
        assert_eq!(second.capped.len(), 1);
        assert_eq!(second.capped[0].applied, 2);
        assert_eq!(stock(&f).await, 10);

        let stored = f.db.sales().get_by_id(&f.sale_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Refunded);
        assert_eq!(stored.items[0].refunded_qty, 3);
        assert!(stored.refund_date.is_some());
    }

    #[tokio::test]
    async fn test_refunding_a_refunded_sale_is_noop() {
        let f = setup().await;
        f.reconciler
            .refund(&f.sale_id, &[RefundRequest::new("p-kopiko", 3)], "1234")
            .await
            .unwrap();

        let again = f
            .reconciler
            .refund(&f.sale_id, &[RefundRequest::new("p-kopiko", 1)], "1234")
            .await
            .unwrap();
        assert!(again.is_noop());
        assert_eq!(again.refund_amount, Money::zero());
        assert_eq!(stock(&f).await, 10);
    }

    #[tokio::test]
    async fn test_line_not_in_sale_writes_nothing() {
        let f = setup().await;
        let err = f
            .reconciler
            .refund(
                &f.sale_id,
                &[RefundRequest::new("p-kopiko", 1), RefundRequest::new("p-other", 1)],
                "1234",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::LineNotInSale { .. })));
        assert_eq!(stock(&f).await, 7);
    }
}
