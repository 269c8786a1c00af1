//! End-to-end checkout / refund / report scenarios against an in-memory store.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use sari_core::inventory::{attention_list, StockCondition};
use sari_core::ports::store_offset;
use sari_core::{
    Cart, Clock, CoreError, Discount, FixedClock, Money, Product, RefundRequest, ReportPeriod,
    SaleStatus,
};
use sari_db::{Database, DbConfig, RefundReconciler, SaleRecorder, SalesReporter, ServiceError};

const PIN: &str = "2468";

struct Store {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl Store {
    async fn open(now: DateTime<Utc>) -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.access().set_pin(PIN).await.unwrap();
        Store {
            db,
            clock: Arc::new(FixedClock(now)),
        }
    }

    async fn add_product(&self, id: &str, price_cents: i64, qty: i64) -> Product {
        let now = self.clock.now();
        let product = Product {
            id: id.to_string(),
            sku: id.to_uppercase(),
            name: format!("Product {}", id),
            price_cents,
            qty,
            threshold: 0,
            deadstock: false,
            monthly_sales: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        self.db.products().insert(&product).await.unwrap();
        product
    }

    async fn product(&self, id: &str) -> Product {
        self.db.products().get_by_id(id).await.unwrap().unwrap()
    }

    fn recorder(&self) -> SaleRecorder {
        SaleRecorder::new(self.db.pool().clone(), self.clock.clone(), store_offset(0))
    }

    async fn reconciler(&self) -> RefundReconciler {
        let authorizer = self.db.access().authorizer().await.unwrap();
        RefundReconciler::new(self.db.pool().clone(), self.clock.clone(), Arc::new(authorizer))
    }

    async fn reporter(&self) -> SalesReporter {
        let authorizer = self.db.access().authorizer().await.unwrap();
        SalesReporter::new(
            self.db.pool().clone(),
            self.clock.clone(),
            Arc::new(authorizer),
            store_offset(0),
        )
    }
}

fn march(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap()
}

/// Scenario A: cash sale with change.
#[tokio::test]
async fn scenario_a_cash_checkout() {
    let store = Store::open(march(14)).await;
    let product = store.add_product("p1", 100, 10).await;

    let mut cart = Cart::new("Walk-in");
    cart.add_line(&product, 2).unwrap();
    cart.set_cash_tendered(Money::from_cents(300)).unwrap();
    assert_eq!(cart.total_after_discount(), Money::from_cents(200));

    let receipt = store.recorder().checkout(&cart).await.unwrap();
    assert_eq!(receipt.change_due, Money::from_cents(100));

    let sale = &receipt.sale;
    assert_eq!(sale.status, SaleStatus::Completed);
    assert_eq!(sale.items.len(), 1);
    assert_eq!(sale.items[0].qty_sold, 2);
    assert_eq!(sale.items[0].subtotal_cents, 200);
    assert_eq!(sale.items[0].refunded_qty, 0);

    let stored = store.product("p1").await;
    assert_eq!(stored.qty, 8);
    assert_eq!(stored.monthly_sold("2025-03"), 2);
}

/// Scenarios B and C: partial refund, then an over-request capped to what is left.
#[tokio::test]
async fn scenario_b_c_partial_then_capped_refund() {
    let store = Store::open(march(14)).await;
    let product = store.add_product("p1", 100, 10).await;

    let mut cart = Cart::new("Walk-in");
    cart.add_line(&product, 2).unwrap();
    cart.set_cash_tendered(Money::from_cents(300)).unwrap();
    let sale_id = store.recorder().checkout(&cart).await.unwrap().sale.id;

    let reconciler = store.reconciler().await;

    // B
    let outcome = reconciler
        .refund(&sale_id, &[RefundRequest::new("p1", 1)], PIN)
        .await
        .unwrap();
    assert_eq!(outcome.status, SaleStatus::PartiallyRefunded);
    let sale = store.db.sales().get_by_id(&sale_id).await.unwrap().unwrap();
    assert_eq!(sale.items[0].refunded_qty, 1);
    assert_eq!(sale.status, SaleStatus::PartiallyRefunded);
    assert_eq!(store.product("p1").await.qty, 9);

    // C
    let outcome = reconciler
        .refund(&sale_id, &[RefundRequest::new("p1", 10)], PIN)
        .await
        .unwrap();
    assert_eq!(outcome.capped.len(), 1);
    assert_eq!(outcome.capped[0].applied, 1);
    let sale = store.db.sales().get_by_id(&sale_id).await.unwrap().unwrap();
    assert_eq!(sale.items[0].refunded_qty, 2);
    assert_eq!(sale.status, SaleStatus::Refunded);
    assert_eq!(store.product("p1").await.qty, 10);

    // Wrong PIN never reaches the sale
    let err = reconciler
        .refund(&sale_id, &[RefundRequest::new("p1", 1)], "0000")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Core(CoreError::Unauthorized)));
}

/// Scenario D: percent discount, and a cash discount larger than the total.
#[tokio::test]
async fn scenario_d_discounts() {
    let store = Store::open(march(14)).await;
    let product = store.add_product("p1", 250, 10).await;

    let mut cart = Cart::new("Walk-in");
    cart.add_line(&product, 2).unwrap();
    cart.apply_discount(Discount::percent_bps(1000));
    assert_eq!(cart.total(), Money::from_cents(500));
    assert_eq!(cart.total_after_discount(), Money::from_cents(450));

    cart.apply_discount(Discount::cash(Money::from_cents(600)).unwrap());
    assert_eq!(cart.total_after_discount(), Money::zero());

    let receipt = store.recorder().checkout(&cart).await.unwrap();
    assert_eq!(receipt.sale.total_after_discount_cents, 0);
    assert_eq!(receipt.sale.items[0].subtotal_cents, 0);
    assert_eq!(receipt.change_due, Money::zero());
}

/// Scenario E: a custom range that misses a sale leaves it out entirely.
#[tokio::test]
async fn scenario_e_custom_range_excludes_sale() {
    let store = Store::open(march(14)).await;
    let product = store.add_product("p1", 100, 10).await;

    let mut cart = Cart::new("Walk-in");
    cart.add_line(&product, 3).unwrap();
    cart.set_cash_tendered(Money::from_cents(300)).unwrap();
    store.recorder().checkout(&cart).await.unwrap();

    let reporter = store.reporter().await;

    let outside = ReportPeriod::custom(
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 13).unwrap(),
    )
    .unwrap();
    let result = reporter.generate(&outside, PIN).await.unwrap();
    assert!(result.rows.is_empty());
    assert_eq!(result.totals.sale_count, 0);
    assert_eq!(result.totals.net_sales, Money::zero());

    let inside = ReportPeriod::custom(
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
    )
    .unwrap();
    let result = reporter.generate(&inside, PIN).await.unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].net_subtotal, Money::from_cents(300));
}

/// Scenario F: two sales of the last unit leave stock at -1, which is
/// surfaced as oversold rather than failing.
#[tokio::test]
async fn scenario_f_oversold_is_surfaced() {
    let store = Store::open(march(14)).await;
    let product = store.add_product("p1", 100, 1).await;

    let mut first = Cart::new("Terminal A");
    first.add_line(&product, 1).unwrap();
    first.set_cash_tendered(Money::from_cents(100)).unwrap();
    let mut second = Cart::new("Terminal B");
    second.add_line(&product, 1).unwrap();
    second.set_cash_tendered(Money::from_cents(100)).unwrap();

    let recorder = store.recorder();
    assert!(recorder.checkout(&first).await.unwrap().oversold.is_empty());
    let receipt = recorder.checkout(&second).await.unwrap();
    assert_eq!(receipt.oversold.len(), 1);
    assert_eq!(receipt.oversold[0].qty_after, -1);

    let products = store.db.products().list_all().await.unwrap();
    let attention = attention_list(&products);
    assert_eq!(attention.len(), 1);
    assert_eq!(attention[0].condition, StockCondition::Oversold);
    assert_eq!(attention[0].qty, -1);

    // Reporting over the oversold sales still works
    let result = store.reporter().await.generate(&ReportPeriod::Daily, PIN).await.unwrap();
    assert_eq!(result.rows[0].net_qty, 2);
}

/// Report rows are valued at the undiscounted unit price; the refund outcome
/// carries the discounted amount actually handed back.
#[tokio::test]
async fn report_conserves_net_after_refund() {
    let store = Store::open(march(14)).await;
    let canton = store.add_product("canton", 1500, 20).await;
    let kopiko = store.add_product("kopiko", 1000, 20).await;

    let mut cart = Cart::new("Walk-in");
    cart.add_line(&canton, 3).unwrap();
    cart.add_line(&kopiko, 2).unwrap();
    cart.apply_discount(Discount::percent_bps(1000));
    cart.set_cash_tendered(Money::from_cents(10000)).unwrap();
    let sale = store.recorder().checkout(&cart).await.unwrap().sale;
    assert_eq!(sale.total_after_discount_cents, 5850);

    let outcome = store
        .reconciler()
        .await
        .refund(&sale.id, &[RefundRequest::new("kopiko", 1)], PIN)
        .await
        .unwrap();
    assert_eq!(outcome.refund_amount, Money::from_cents(900));

    let result = store
        .reporter()
        .await
        .generate(&ReportPeriod::Monthly, PIN)
        .await
        .unwrap();
    assert_eq!(result.totals.total_sales, Money::from_cents(6500));
    assert_eq!(result.totals.total_refunds, Money::from_cents(1000));
    assert_eq!(result.totals.net_sales, Money::from_cents(5500));

    let units_left: i64 = sale.items.iter().map(|l| l.unit_price_cents * l.qty_sold).sum::<i64>() - 1000;
    assert_eq!(result.totals.net_sales, Money::from_cents(units_left));
}
