//! # Checkout Planning
//!
//! Turns a finished cart into the immutable [`Sale`] and the stock moves that
//! must be written with it. Nothing here touches storage; `sari-db` runs the
//! plan inside one transaction.
//!
//! ```text
//!   Cart ──ensure_checkout_ready()──► price_cart() ──► CheckoutPlan
//!                                                      ├── sale        (status = completed,
//!                                                      │                refunded_qty = 0)
//!                                                      └── stock_moves (qty -= n,
//!                                                                       monthly[month] += n)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::error::CoreResult;
use crate::money::Money;
use crate::pricing::price_cart;
use crate::types::{Sale, SaleLine, SaleStatus};

/// Units leaving the shelf for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMove {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

/// A product whose stock went negative at checkout.
///
/// A data-integrity warning, not an error: the sale still committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub product_id: String,
    pub name: String,
    pub qty_after: i64,
}

/// Everything a storage layer needs to record a checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPlan {
    pub sale: Sale,
    pub stock_moves: Vec<StockMove>,
}

/// Validates a cart and builds its sale record.
///
/// ## Errors
/// - `EmptyCart` when the cart has no lines
/// - `InsufficientPayment` for cash sales tendered below the discounted total
pub fn plan_checkout(
    cart: &Cart,
    sale_id: String,
    now: DateTime<Utc>,
    month_key: String,
) -> CoreResult<CheckoutPlan> {
    cart.ensure_checkout_ready()?;

    let priced = price_cart(cart);

    let items: Vec<SaleLine> = cart
        .items
        .iter()
        .zip(priced.lines.iter())
        .map(|(line, amount)| SaleLine {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price_cents: line.unit_price_cents,
            qty_sold: line.quantity,
            subtotal_cents: amount.net.cents(),
            refunded_qty: 0,
        })
        .collect();

    let stock_moves = cart
        .items
        .iter()
        .map(|line| StockMove {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
        })
        .collect();

    let change_due = if cart.payment_mode.requires_tender() {
        priced.change_due
    } else {
        Money::zero()
    };

    let sale = Sale {
        id: sale_id,
        created_at: now,
        items,
        discount: cart.discount,
        payment_mode: cart.payment_mode,
        total_before_discount_cents: priced.total_before_discount.cents(),
        total_after_discount_cents: priced.total_after_discount.cents(),
        cash_tendered_cents: priced.cash_tendered.cents(),
        change_due_cents: change_due.cents(),
        month_key,
        status: SaleStatus::Completed,
        refund_date: None,
    };

    Ok(CheckoutPlan { sale, stock_moves })
}
