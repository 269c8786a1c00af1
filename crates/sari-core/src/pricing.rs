//! # Pricing Engine
//!
//! Pure functions that turn a cart snapshot into line and total amounts.
//!
//! ## Discount Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart: ₱100.00 + ₱100.00 + ₱100.00 = ₱300.00, cash discount ₱100.00    │
//! │                                                                         │
//! │  exact shares:   33.333…   33.333…   33.333…                            │
//! │  floor:          ₱33.33    ₱33.33    ₱33.33     (₱99.99)                │
//! │  leftover ₱0.01 → largest remainder, first line wins ties               │
//! │  discount:       ₱33.34    ₱33.33    ₱33.33     (₱100.00) ✓             │
//! │  net:            ₱66.66    ₱66.67    ₱66.67     (₱200.00) ✓             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Net line amounts always sum exactly to `total_after_discount`. A zero
//! pre-discount total gives every line a zero share.

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::money::Money;
use crate::types::Discount;

/// One cart line's amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAmount {
    pub product_id: String,
    /// `unit_price × quantity`
    pub gross: Money,
    /// This line's share of the cart discount.
    pub discount: Money,
    /// `gross - discount`
    pub net: Money,
}

/// Everything the tender screen and receipt need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub lines: Vec<LineAmount>,
    pub total_before_discount: Money,
    pub discount_total: Money,
    pub total_after_discount: Money,
    pub cash_tendered: Money,
    pub change_due: Money,
}

/// Applies an optional discount to a total. Never negative.
pub fn discounted_total(total: Money, discount: Option<&Discount>) -> Money {
    match discount {
        Some(d) => d.apply(total),
        None => total.clamp_non_negative(),
    }
}

/// `max(0, tendered - total)`.
#[inline]
pub fn change_due(total: Money, tendered: Money) -> Money {
    (tendered - total).clamp_non_negative()
}

/// Splits `discount_total` across lines in proportion to their gross amounts.
///
/// Uses largest-remainder rounding so the shares sum exactly to the (clamped)
/// discount. Each share stays within `[0, gross]`.
///
/// ## Example
/// ```rust
/// use sari_core::money::Money;
/// use sari_core::pricing::allocate_discount;
///
/// let lines = [Money::from_cents(10000), Money::from_cents(10000), Money::from_cents(10000)];
/// let shares = allocate_discount(&lines, Money::from_cents(10000));
/// let cents: Vec<i64> = shares.iter().map(|m| m.cents()).collect();
/// assert_eq!(cents, vec![3334, 3333, 3333]);
/// ```
pub fn allocate_discount(grosses: &[Money], discount_total: Money) -> Vec<Money> {
    let total: i64 = grosses.iter().map(|g| g.cents().max(0)).sum();
    if total <= 0 || discount_total.cents() <= 0 {
        return vec![Money::zero(); grosses.len()];
    }

    let discount = discount_total.cents().min(total) as i128;
    let total = total as i128;

    let mut shares: Vec<i64> = Vec::with_capacity(grosses.len());
    let mut remainders: Vec<(i128, usize)> = Vec::with_capacity(grosses.len());
    for (idx, gross) in grosses.iter().enumerate() {
        let exact = discount * gross.cents().max(0) as i128;
        shares.push((exact / total) as i64);
        remainders.push((exact % total, idx));
    }

    let mut leftover = discount as i64 - shares.iter().sum::<i64>();
    // Largest remainder first; stable sort keeps the earlier line on ties
    remainders.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, idx) in remainders {
        if leftover == 0 {
            break;
        }
        if shares[idx] < grosses[idx].cents() {
            shares[idx] += 1;
            leftover -= 1;
        }
    }

    shares.into_iter().map(Money::from_cents).collect()
}

/// Prices a cart snapshot.
pub fn price_cart(cart: &Cart) -> PricingResult {
    let grosses: Vec<Money> = cart.items.iter().map(|l| l.line_total()).collect();
    let total_before_discount: Money = grosses.iter().sum();
    let total_after_discount = discounted_total(total_before_discount, cart.discount.as_ref());
    let discount_total = (total_before_discount - total_after_discount).clamp_non_negative();

    let shares = allocate_discount(&grosses, discount_total);
    let lines = cart
        .items
        .iter()
        .zip(grosses.iter().zip(shares))
        .map(|(line, (gross, share))| LineAmount {
            product_id: line.product_id.clone(),
            gross: *gross,
            discount: share,
            net: *gross - share,
        })
        .collect();

    let cash_tendered = cart.cash_tendered();
    PricingResult {
        lines,
        total_before_discount,
        discount_total,
        total_after_discount,
        cash_tendered,
        change_due: change_due(total_after_discount, cash_tendered),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Product;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn product(id: &str, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            sku: id.to_string(),
            name: id.to_string(),
            price_cents,
            qty: 100,
            threshold: 0,
            deadstock: false,
            monthly_sales: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart_with(lines: &[(&str, i64, i64)]) -> Cart {
        let mut cart = Cart::new("Test");
        for (id, price, qty) in lines {
            cart.add_line(&product(id, *price), *qty).unwrap();
        }
        cart
    }

    #[test]
    fn test_percent_discount_totals() {
        // Cart total 500, 10% off → 450
        let mut cart = cart_with(&[("a", 25000, 2)]);
        cart.apply_discount(Discount::percent_bps(1000));
        let priced = price_cart(&cart);
        assert_eq!(priced.total_before_discount.cents(), 50000);
        assert_eq!(priced.total_after_discount.cents(), 45000);
        assert_eq!(priced.discount_total.cents(), 5000);
    }

    #[test]
    fn test_cash_discount_over_total_clamps_to_zero() {
        let mut cart = cart_with(&[("a", 25000, 2)]);
        cart.apply_discount(Discount::cash(Money::from_cents(60000)).unwrap());
        let priced = price_cart(&cart);
        assert_eq!(priced.total_after_discount, Money::zero());
        assert_eq!(priced.lines[0].net, Money::zero());
        assert_eq!(priced.lines[0].discount.cents(), 50000);
    }

    #[test]
    fn test_line_nets_sum_to_total() {
        let mut cart = cart_with(&[("a", 1999, 3), ("b", 4550, 1), ("c", 125, 7)]);
        cart.apply_discount(Discount::percent_bps(1337));
        let priced = price_cart(&cart);
        let net_sum: Money = priced.lines.iter().map(|l| l.net).sum();
        assert_eq!(net_sum, priced.total_after_discount);
        assert!(priced.lines.iter().all(|l| !l.net.is_negative()));
    }

    #[test]
    fn test_allocate_zero_total_guard() {
        let shares = allocate_discount(&[Money::zero(), Money::zero()], Money::from_cents(500));
        assert_eq!(shares, vec![Money::zero(), Money::zero()]);
    }

    #[test]
    fn test_allocate_never_exceeds_gross() {
        let grosses = [Money::from_cents(1), Money::from_cents(2), Money::from_cents(3)];
        let shares = allocate_discount(&grosses, Money::from_cents(100));
        assert_eq!(shares, grosses.to_vec());
    }

    #[test]
    fn test_change_due_never_negative() {
        assert_eq!(change_due(Money::from_cents(200), Money::from_cents(300)).cents(), 100);
        assert_eq!(change_due(Money::from_cents(300), Money::from_cents(200)), Money::zero());
    }

    #[test]
    fn test_no_discount_passthrough() {
        let cart = cart_with(&[("a", 10000, 2)]);
        let priced = price_cart(&cart);
        assert_eq!(priced.discount_total, Money::zero());
        assert_eq!(priced.lines[0].net.cents(), 20000);
    }
}
