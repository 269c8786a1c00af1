//! # Cart
//!
//! The in-progress selection of products an operator is ringing up, plus the
//! "waiting carts" an operator can park and resume.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Operations                                  │
//! │                                                                         │
//! │  add_line(product, n) ───────► new line, or existing line += n          │
//! │                                (InsufficientStock past known stock)     │
//! │                                                                         │
//! │  set_line_quantity(id, n) ───► 1 <= n <= available, else StockExceeded  │
//! │                                (line unchanged)                         │
//! │                                                                         │
//! │  remove_line(id) ────────────► gone (absent is fine)                    │
//! │                                                                         │
//! │  apply_discount / clear_discount / set_cash_tendered                    │
//! │                                                                         │
//! │  ensure_checkout_ready() ────► EmptyCart / InsufficientPayment          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Waiting Carts
//! ```text
//!   CartBook
//!   ┌────────────┐   park("Table 3")    ┌──────────────────────────────┐
//!   │  active    │ ───────────────────► │ waiting: [Table 3, Aling B]  │
//!   │  (fresh)   │ ◄─────────────────── │                              │
//!   └────────────┘   resume(id)         └──────────────────────────────┘
//! ```
//!
//! Stock bounds are best effort: a line remembers the stock known when it was
//! added or last refreshed. Concurrent sales can still make that stale.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing;
use crate::types::{Discount, PaymentMode, Product};
use crate::{LOW_STOCK_WARNING_LEVEL, MAX_CART_ITEMS};

/// Display label for a freshly opened cart.
pub const DEFAULT_CART_NAME: &str = "Walk-in";

// =============================================================================
// Cart Line
// =============================================================================

/// A product line in a cart.
///
/// Name and price are frozen when the line is first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Product stock as known at add/refresh time.
    pub available: i64,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            available: product.qty,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// `unit_price × quantity`, before any discount.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// Hint returned by [`Cart::add_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddLineNotice {
    Ok,
    /// Stock is at or below the warning level; `remaining` is what is left
    /// after this cart's quantity.
    LowStock { remaining: i64 },
}

// =============================================================================
// Cart
// =============================================================================

/// A mutable, in-progress sale owned by one operator session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub name: String,
    pub items: Vec<CartLine>,
    pub discount: Option<Discount>,
    pub payment_mode: PaymentMode,
    pub cash_tendered_cents: i64,
    /// Stock level at or below which `add_line` returns `LowStock`.
    pub low_stock_warning: i64,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new(DEFAULT_CART_NAME)
    }
}

impl Cart {
    /// Opens an empty cart.
    pub fn new(name: impl Into<String>) -> Self {
        Cart {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            items: Vec::new(),
            discount: None,
            payment_mode: PaymentMode::Cash,
            cash_tendered_cents: 0,
            low_stock_warning: LOW_STOCK_WARNING_LEVEL,
        }
    }

    pub fn with_low_stock_warning(mut self, level: i64) -> Self {
        self.low_stock_warning = level;
        self
    }

    // -------------------------------------------------------------------------
    // Lines
    // -------------------------------------------------------------------------

    /// Adds `quantity` units of a product.
    ///
    /// ## Errors
    /// - `InsufficientStock` when the product has no stock, or the resulting
    ///   line quantity would exceed `product.qty`
    /// - `CartTooLarge` when a new line would exceed [`MAX_CART_ITEMS`]
    /// - `Validation` when `quantity < 1`
    pub fn add_line(&mut self, product: &Product, quantity: i64) -> CoreResult<AddLineNotice> {
        if quantity < 1 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let insufficient = |requested: i64| CoreError::InsufficientStock {
            product_id: product.id.clone(),
            name: product.name.clone(),
            available: product.qty,
            requested,
        };

        if product.qty <= 0 {
            return Err(insufficient(quantity));
        }

        let new_quantity = match self.line_mut(&product.id) {
            Some(line) => {
                let new_quantity = line.quantity + quantity;
                if new_quantity > product.qty {
                    return Err(insufficient(new_quantity));
                }
                line.quantity = new_quantity;
                line.available = product.qty;
                new_quantity
            }
            None => {
                if self.items.len() >= MAX_CART_ITEMS {
                    return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS });
                }
                if quantity > product.qty {
                    return Err(insufficient(quantity));
                }
                self.items.push(CartLine::from_product(product, quantity));
                quantity
            }
        };

        if product.qty <= self.low_stock_warning {
            Ok(AddLineNotice::LowStock {
                remaining: product.qty - new_quantity,
            })
        } else {
            Ok(AddLineNotice::Ok)
        }
    }

    /// Sets a line's quantity.
    ///
    /// Requests outside `[1, available]` are rejected and the line is left
    /// unchanged.
    pub fn set_line_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        let line = self
            .line_mut(product_id)
            .ok_or_else(|| CoreError::ProductNotInCart(product_id.to_string()))?;

        if quantity < 1 || quantity > line.available {
            return Err(CoreError::StockExceeded {
                product_id: product_id.to_string(),
                available: line.available,
                requested: quantity,
            });
        }

        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line. Returns whether anything was removed.
    pub fn remove_line(&mut self, product_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|l| l.product_id != product_id);
        self.items.len() != before
    }

    /// Updates the known stock of a line after a catalog reload.
    ///
    /// Returns `true` when the line now asks for more than is on hand. The
    /// line is not changed beyond its `available` bound; the operator decides.
    pub fn refresh_stock(&mut self, product: &Product) -> bool {
        match self.line_mut(&product.id) {
            Some(line) => {
                line.available = product.qty;
                line.quantity > line.available
            }
            None => false,
        }
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.items.iter().find(|l| l.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &str) -> Option<&mut CartLine> {
        self.items.iter_mut().find(|l| l.product_id == product_id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    // -------------------------------------------------------------------------
    // Discount & Payment
    // -------------------------------------------------------------------------

    pub fn apply_discount(&mut self, discount: Discount) {
        self.discount = Some(discount);
    }

    pub fn clear_discount(&mut self) {
        self.discount = None;
    }

    pub fn set_payment_mode(&mut self, mode: PaymentMode) {
        self.payment_mode = mode;
    }

    pub fn set_cash_tendered(&mut self, amount: Money) -> CoreResult<()> {
        if amount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "cash_tendered".to_string(),
            }
            .into());
        }
        self.cash_tendered_cents = amount.cents();
        Ok(())
    }

    #[inline]
    pub fn cash_tendered(&self) -> Money {
        Money::from_cents(self.cash_tendered_cents)
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// Sum of `unit_price × quantity` over all lines.
    pub fn total(&self) -> Money {
        self.items.iter().map(CartLine::line_total).sum()
    }

    /// Total with the discount applied, never negative.
    pub fn total_after_discount(&self) -> Money {
        pricing::discounted_total(self.total(), self.discount.as_ref())
    }

    /// `max(0, cash_tendered - total_after_discount)`.
    pub fn change_due(&self) -> Money {
        pricing::change_due(self.total_after_discount(), self.cash_tendered())
    }

    /// Checks the checkout preconditions without changing anything.
    pub fn ensure_checkout_ready(&self) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        if self.payment_mode.requires_tender() {
            let required = self.total_after_discount();
            let tendered = self.cash_tendered();
            if tendered < required {
                return Err(CoreError::InsufficientPayment { required, tendered });
            }
        }

        Ok(())
    }
}

// =============================================================================
// Waiting Carts
// =============================================================================

/// One active cart plus any number of parked ("waiting") carts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartBook {
    active: Cart,
    waiting: Vec<Cart>,
    low_stock_warning: i64,
}

impl Default for CartBook {
    fn default() -> Self {
        CartBook::new()
    }
}

impl CartBook {
    pub fn new() -> Self {
        CartBook::with_low_stock_warning(LOW_STOCK_WARNING_LEVEL)
    }

    pub fn with_low_stock_warning(level: i64) -> Self {
        CartBook {
            active: Cart::new(DEFAULT_CART_NAME).with_low_stock_warning(level),
            waiting: Vec::new(),
            low_stock_warning: level,
        }
    }

    fn fresh_cart(&self) -> Cart {
        Cart::new(DEFAULT_CART_NAME).with_low_stock_warning(self.low_stock_warning)
    }

    pub fn active(&self) -> &Cart {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut Cart {
        &mut self.active
    }

    /// Parked carts, oldest first.
    pub fn waiting(&self) -> &[Cart] {
        &self.waiting
    }

    /// Parks the active cart under `name` and opens a fresh one.
    ///
    /// Returns the parked cart's id. An empty cart cannot be parked.
    pub fn park(&mut self, name: impl Into<String>) -> CoreResult<String> {
        if self.active.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let fresh = self.fresh_cart();
        let mut parked = std::mem::replace(&mut self.active, fresh);
        parked.name = name.into();
        let id = parked.id.clone();
        self.waiting.push(parked);
        Ok(id)
    }

    /// Makes a parked cart active.
    ///
    /// A non-empty active cart is parked first under its current name; an
    /// empty one is dropped.
    pub fn resume(&mut self, cart_id: &str) -> CoreResult<()> {
        let idx = self
            .waiting
            .iter()
            .position(|c| c.id == cart_id)
            .ok_or_else(|| CoreError::CartNotFound(cart_id.to_string()))?;

        let resumed = self.waiting.remove(idx);
        let previous = std::mem::replace(&mut self.active, resumed);
        if !previous.is_empty() {
            self.waiting.push(previous);
        }
        Ok(())
    }

    /// Deletes a parked cart and returns it.
    pub fn discard(&mut self, cart_id: &str) -> CoreResult<Cart> {
        let idx = self
            .waiting
            .iter()
            .position(|c| c.id == cart_id)
            .ok_or_else(|| CoreError::CartNotFound(cart_id.to_string()))?;
        Ok(self.waiting.remove(idx))
    }

    /// Hands the active cart to checkout and replaces it with an empty one.
    pub fn take_active(&mut self) -> Cart {
        let fresh = self.fresh_cart();
        std::mem::replace(&mut self.active, fresh)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
