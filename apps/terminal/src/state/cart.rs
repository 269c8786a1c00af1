//! # Cart State
//!
//! The operator's active cart plus parked ("waiting") carts.
//!
//! ## Thread Safety
//! The [`CartBook`] is wrapped in `Arc<Mutex<T>>` so that only one command
//! modifies carts at a time.
//!
//! ## Persistence
//! Each `cart` command [`replace`](CartState::replace)s the book with the
//! saved one first and saves a [`snapshot`](CartState::snapshot) after.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator action          CartBook call            Change               │
//! │  ───────────────          ─────────────            ──────               │
//! │  Scan product ──────────► active_mut().add_line ─► line added / merged │
//! │  Customer steps aside ──► park(name) ────────────► moved to waiting    │
//! │  Customer returns ──────► resume(id) ────────────► back to active      │
//! │  Checkout succeeds ─────► take_active() ─────────► fresh empty cart    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use sari_core::CartBook;

/// Thread-safe cart book.
#[derive(Debug, Clone)]
pub struct CartState {
    book: Arc<Mutex<CartBook>>,
}

impl CartState {
    pub fn new(low_stock_warning: i64) -> Self {
        CartState {
            book: Arc::new(Mutex::new(CartBook::with_low_stock_warning(low_stock_warning))),
        }
    }

    /// Executes a function with read access to the carts.
    pub fn with_carts<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CartBook) -> R,
    {
        // A panic mid-update cannot leave a CartBook half-written
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        f(&book)
    }

    /// Executes a function with write access to the carts.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// cart_state.with_carts_mut(|book| book.active_mut().add_line(&product, 1))?;
    /// ```
    pub fn with_carts_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CartBook) -> R,
    {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut book)
    }

    /// Swaps in a whole book, e.g. one loaded from the database.
    pub fn replace(&self, book: CartBook) {
        self.with_carts_mut(|current| *current = book);
    }

    /// A copy of the current book, for saving.
    pub fn snapshot(&self) -> CartBook {
        self.with_carts(CartBook::clone)
    }
}
