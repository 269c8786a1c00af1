//! # Refund Reconciliation
//!
//! Applies partial or full refunds to a sale's lines.
//!
//! ## Per-line algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request { product_id, quantity }                                       │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  remaining = qty_sold - refunded_qty                                    │
//! │  applied   = min(quantity, remaining)      ◄── capped, never an error   │
//! │        │                                                                │
//! │        ├── applied > 0 ──► refunded_qty += applied, restock += applied  │
//! │        └── applied = 0 ──► line untouched                               │
//! │                                                                         │
//! │  afterwards: status = SaleStatus::from_lines(items)                     │
//! │              refund_date = now   (only if something was applied)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `0 <= refunded_qty <= qty_sold` on every line, always
//! - `status` always matches the lines
//! - Requests are validated before anything changes; on error the sale is
//!   untouched
//! - Asking for more than remains gives the same state as asking for exactly
//!   what remains

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Sale, SaleStatus};

/// One line of a refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub product_id: String,
    pub quantity: i64,
}

impl RefundRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        RefundRequest {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Units going back on the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restock {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

/// A request that asked for more than remained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CappedRefund {
    pub product_id: String,
    pub requested: i64,
    pub applied: i64,
}

/// Result of reconciling one refund request against a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOutcome {
    pub sale_id: String,
    /// Aggregated per product, in first-requested order.
    pub restocks: Vec<Restock>,
    pub capped: Vec<CappedRefund>,
    /// Amount owed back to the customer, at the discounted line price.
    pub refund_amount: Money,
    pub previous_status: SaleStatus,
    pub status: SaleStatus,
}

impl RefundOutcome {
    /// True when nothing was refunded (e.g. the sale was already fully refunded).
    pub fn is_noop(&self) -> bool {
        self.restocks.is_empty()
    }

    /// Total units restored to stock.
    pub fn units_restocked(&self) -> i64 {
        self.restocks.iter().map(|r| r.quantity).sum()
    }
}

/// Checks a refund request against a sale without changing it.
pub fn validate_refund(sale: &Sale, requests: &[RefundRequest]) -> CoreResult<()> {
    if requests.is_empty() {
        return Err(CoreError::NoItemsSelected);
    }

    for request in requests {
        if request.quantity < 1 {
            return Err(ValidationError::MustBePositive {
                field: "refund_qty".to_string(),
            }
            .into());
        }
        if sale.line(&request.product_id).is_none() {
            return Err(CoreError::LineNotInSale {
                sale_id: sale.id.clone(),
                product_id: request.product_id.clone(),
            });
        }
    }

    Ok(())
}

/// Applies a refund request to a sale in place.
///
/// Duplicate product ids are applied one after another, so the second one sees
/// what the first consumed.
pub fn apply_refund(
    sale: &mut Sale,
    requests: &[RefundRequest],
    now: DateTime<Utc>,
) -> CoreResult<RefundOutcome> {
    validate_refund(sale, requests)?;

    let previous_status = sale.status;
    let mut restocks: Vec<Restock> = Vec::new();
    let mut capped = Vec::new();
    let mut refund_amount = Money::zero();

    for request in requests {
        let Some(line) = sale
            .items
            .iter_mut()
            .find(|l| l.product_id == request.product_id)
        else {
            continue;
        };

        let applied = request.quantity.min(line.remaining());
        if applied < request.quantity {
            capped.push(CappedRefund {
                product_id: request.product_id.clone(),
                requested: request.quantity,
                applied,
            });
        }
        if applied == 0 {
            continue;
        }

        let value_before = line.value_of_units(line.refunded_qty);
        line.refunded_qty += applied;
        refund_amount += line.value_of_units(line.refunded_qty) - value_before;

        match restocks.iter_mut().find(|r| r.product_id == line.product_id) {
            Some(existing) => existing.quantity += applied,
            None => restocks.push(Restock {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                quantity: applied,
            }),
        }
    }

    if !restocks.is_empty() {
        sale.recompute_status();
        sale.refund_date = Some(now);
    }

    Ok(RefundOutcome {
        sale_id: sale.id.clone(),
        restocks,
        capped,
        refund_amount,
        previous_status,
        status: sale.status,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMode, SaleLine};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn line(product_id: &str, unit_price_cents: i64, qty_sold: i64, subtotal_cents: i64) -> SaleLine {
        SaleLine {
            product_id: product_id.to_string(),
            name: format!("Item {}", product_id),
            unit_price_cents,
            qty_sold,
            subtotal_cents,
            refunded_qty: 0,
        }
    }

    fn sale(items: Vec<SaleLine>) -> Sale {
        let before: i64 = items.iter().map(|l| l.unit_price_cents * l.qty_sold).sum();
        let after: i64 = items.iter().map(|l| l.subtotal_cents).sum();
        Sale {
            id: "sale-1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            items,
            discount: None,
            payment_mode: PaymentMode::Cash,
            total_before_discount_cents: before,
            total_after_discount_cents: after,
            cash_tendered_cents: after,
            change_due_cents: 0,
            month_key: "2024-05".to_string(),
            status: SaleStatus::Completed,
            refund_date: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_partial_then_capped_full_refund() {
        let mut s = sale(vec![line("p1", 10000, 2, 20000)]);

        let first = apply_refund(&mut s, &[RefundRequest::new("p1", 1)], now()).unwrap();
        assert_eq!(s.items[0].refunded_qty, 1);
        assert_eq!(s.status, SaleStatus::PartiallyRefunded);
        assert_eq!(first.units_restocked(), 1);
        assert_eq!(first.refund_amount.cents(), 10000);
        assert!(first.capped.is_empty());

        let second = apply_refund(&mut s, &[RefundRequest::new("p1", 10)], now()).unwrap();
        assert_eq!(s.items[0].refunded_qty, 2);
        assert_eq!(s.status, SaleStatus::Refunded);
        assert_eq!(second.units_restocked(), 1);
        assert_eq!(
            second.capped,
            vec![CappedRefund { product_id: "p1".into(), requested: 10, applied: 1 }]
        );
        assert_eq!(second.previous_status, SaleStatus::PartiallyRefunded);
        assert_eq!(s.refund_date, Some(now()));
    }

    #[test]
    fn test_fully_refunded_sale_is_noop() {
        let mut s = sale(vec![line("p1", 10000, 1, 10000)]);
        apply_refund(&mut s, &[RefundRequest::new("p1", 1)], now()).unwrap();
        let snapshot = s.clone();

        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let outcome = apply_refund(&mut s, &[RefundRequest::new("p1", 1)], later).unwrap();
        assert!(outcome.is_noop());
        assert_eq!(s, snapshot);
    }

    #[test]
    fn test_validation_leaves_sale_untouched() {
        let mut s = sale(vec![line("p1", 10000, 2, 20000), line("p2", 500, 1, 500)]);
        let snapshot = s.clone();

        assert!(matches!(
            apply_refund(&mut s, &[], now()),
            Err(CoreError::NoItemsSelected)
        ));
        assert!(matches!(
            apply_refund(
                &mut s,
                &[RefundRequest::new("p1", 1), RefundRequest::new("ghost", 1)],
                now()
            ),
            Err(CoreError::LineNotInSale { .. })
        ));
        assert!(matches!(
            apply_refund(&mut s, &[RefundRequest::new("p1", 0)], now()),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(s, snapshot);
    }

    #[test]
    fn test_duplicate_requests_apply_sequentially() {
        let mut s = sale(vec![line("p1", 10000, 3, 30000)]);
        let outcome = apply_refund(
            &mut s,
            &[RefundRequest::new("p1", 2), RefundRequest::new("p1", 2)],
            now(),
        )
        .unwrap();
        assert_eq!(s.items[0].refunded_qty, 3);
        assert_eq!(outcome.restocks.len(), 1);
        assert_eq!(outcome.restocks[0].quantity, 3);
        assert_eq!(outcome.capped[0].applied, 1);
    }

    #[test]
    fn test_one_line_fully_refunded_is_partial() {
        let mut s = sale(vec![line("p1", 10000, 1, 10000), line("p2", 500, 2, 1000)]);
        apply_refund(&mut s, &[RefundRequest::new("p1", 1)], now()).unwrap();
        assert_eq!(s.status, SaleStatus::PartiallyRefunded);
    }

    #[test]
    fn test_refund_amount_uses_discounted_subtotal() {
        // 3 units at ₱100.00, discounted to ₱200.00 total
        let mut s = sale(vec![line("p1", 10000, 3, 20000)]);
        let mut total = Money::zero();
        for _ in 0..3 {
            total += apply_refund(&mut s, &[RefundRequest::new("p1", 1)], now())
                .unwrap()
                .refund_amount;
        }
        assert_eq!(total.cents(), 20000);
    }

    // -------------------------------------------------------------------------
    // Property tests
    // -------------------------------------------------------------------------

    fn arb_lines() -> impl Strategy<Value = Vec<(i64, i64)>> {
        // (qty_sold, unit_price_cents)
        prop::collection::vec((1i64..10, 1i64..50_000), 1..5)
    }

    fn arb_requests(lines: usize) -> impl Strategy<Value = Vec<Vec<(usize, i64)>>> {
        prop::collection::vec(prop::collection::vec((0..lines, 1i64..15), 1..4), 1..8)
    }

    fn build_sale(shape: &[(i64, i64)]) -> Sale {
        sale(
            shape.iter()
                .enumerate()
                .map(|(i, (qty, price))| line(&format!("p{}", i), *price, *qty, price * qty))
                .collect(),
        )
    }

    proptest! {
        #[test]
        fn prop_refund_sequences_keep_invariants(
            (shape, batches) in arb_lines().prop_flat_map(|shape| {
                let n = shape.len();
                (Just(shape), arb_requests(n))
            })
        ) {
            let mut s = build_sale(&shape);
            let mut refunded_total = Money::zero();

            for batch in batches {
                let requests: Vec<RefundRequest> = batch
                    .iter()
                    .map(|(idx, qty)| RefundRequest::new(format!("p{}", idx), *qty))
                    .collect();
                let outcome = apply_refund(&mut s, &requests, now()).unwrap();
                refunded_total += outcome.refund_amount;

                for l in &s.items {
                    prop_assert!(l.refunded_qty >= 0 && l.refunded_qty <= l.qty_sold);
                }
                prop_assert_eq!(s.status, SaleStatus::from_lines(&s.items));
            }

            let refunded_value: Money = s
                .items
                .iter()
                .map(|l| l.value_of_units(l.refunded_qty))
                .sum();
            prop_assert_eq!(refunded_total, refunded_value);
            prop_assert!(refunded_total.cents() <= s.total_after_discount_cents);
        }

        #[test]
        fn prop_over_refund_capping_is_idempotent(
            shape in arb_lines(),
            pre in 0i64..10,
            extra in 1i64..20,
        ) {
            let mut base = build_sale(&shape);
            let pre = pre.min(base.items[0].qty_sold);
            if pre > 0 {
                apply_refund(&mut base, &[RefundRequest::new("p0", pre)], now()).unwrap();
            }
            let remaining = base.items[0].remaining();
            prop_assume!(remaining > 0);

            let mut exact = base.clone();
            let mut over = base.clone();
            let a = apply_refund(&mut exact, &[RefundRequest::new("p0", remaining)], now()).unwrap();
            let b = apply_refund(&mut over, &[RefundRequest::new("p0", remaining + extra)], now()).unwrap();

            prop_assert_eq!(&exact, &over);
            prop_assert_eq!(a.restocks, b.restocks);
            prop_assert_eq!(a.refund_amount, b.refund_amount);
        }
    }
}
