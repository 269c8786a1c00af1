//! `cart <ACTION>`: the operator's active cart and parked ("waiting") carts.
//!
//! ```text
//! cart add CANTON:2 ──► cart park "Aling Nena" ──► (next customer) ...
//!                                 │
//!        cart checkout ◄── cart resume <ID>
//! ```
//!
//! The book is loaded from the database before the action and saved after
//! it, so carts survive between runs. A failed action saves nothing.

use clap::{Args, Subcommand};
use serde::Serialize;
use std::fmt::Write;
use tracing::info;

use super::sell::{self, lookup, low_stock_notice, LowStockNotice};
use super::CommandOutput;
use crate::cli::{parse_line_item, DiscountArgs, LineItem, TenderArgs};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use sari_core::{Cart, CartBook, CoreError, Money};

#[derive(Debug, Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub action: CartAction,
}

#[derive(Debug, Subcommand)]
pub enum CartAction {
    /// Show the active cart (with fresh stock levels) and the waiting carts
    Show,

    /// Add SKU[:QTY] lines to the active cart
    Add {
        #[arg(required = true, value_name = "SKU[:QTY]", value_parser = parse_line_item)]
        lines: Vec<LineItem>,
    },

    /// Change the quantity of a line already in the cart
    Set { sku: String, qty: i64 },

    /// Take a line out of the cart
    Remove { sku: String },

    /// Apply a discount to the active cart, or --clear it
    Discount {
        #[command(flatten)]
        discount: DiscountArgs,

        /// Remove the current discount
        #[arg(long, conflicts_with_all = ["percent", "amount"])]
        clear: bool,
    },

    /// Set the active cart aside under NAME and start a fresh one
    Park { name: String },

    /// Make a waiting cart active again
    Resume { id: String },

    /// Throw away a waiting cart
    Discard { id: String },

    /// Check out the active cart
    Checkout(TenderArgs),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartView {
    active: Cart,
    total: Money,
    total_after_discount: Money,
    waiting: Vec<WaitingCart>,
    low_stock: Vec<LowStockNotice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parked: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WaitingCart {
    id: String,
    name: String,
    units: i64,
    total: Money,
}

impl CartView {
    fn of(book: &CartBook) -> Self {
        let active = book.active().clone();
        CartView {
            total: active.total(),
            total_after_discount: active.total_after_discount(),
            active,
            waiting: book
                .waiting()
                .iter()
                .map(|cart| WaitingCart {
                    id: cart.id.clone(),
                    name: cart.name.clone(),
                    units: cart.unit_count(),
                    total: cart.total_after_discount(),
                })
                .collect(),
            low_stock: Vec::new(),
            parked: None,
        }
    }
}

pub async fn run(state: &AppState, args: CartArgs) -> AppResult<CommandOutput> {
    state.restore_carts().await?;

    let mut low_stock = Vec::new();
    let mut parked = None;

    match args.action {
        CartAction::Checkout(tender) => return checkout(state, &tender).await,
        CartAction::Show => refresh_active(state).await?,
        CartAction::Add { lines } => {
            for item in &lines {
                let product = lookup(state, &item.sku).await?;
                let notice = state
                    .carts
                    .with_carts_mut(|book| book.active_mut().add_line(&product, item.qty))?;
                low_stock.extend(low_stock_notice(&product, notice));
            }
        }
        CartAction::Set { sku, qty } => {
            let product_id = line_id(state, &sku)?;
            if let Some(product) = state.db.products().get_by_id(&product_id).await? {
                state
                    .carts
                    .with_carts_mut(|book| book.active_mut().refresh_stock(&product));
            }
            state
                .carts
                .with_carts_mut(|book| book.active_mut().set_line_quantity(&product_id, qty))?;
        }
        CartAction::Remove { sku } => {
            let product_id = line_id(state, &sku)?;
            state
                .carts
                .with_carts_mut(|book| book.active_mut().remove_line(&product_id));
        }
        CartAction::Discount { discount, clear } => {
            let discount = discount.discount()?;
            state.carts.with_carts_mut(|book| -> AppResult<()> {
                match (discount, clear) {
                    (Some(discount), _) => book.active_mut().apply_discount(discount),
                    (None, true) => book.active_mut().clear_discount(),
                    (None, false) => {
                        return Err(AppError::usage("cart discount needs --percent, --discount or --clear"))
                    }
                }
                Ok(())
            })?;
        }
        CartAction::Park { name } => {
            let id = state.carts.with_carts_mut(|book| book.park(name.as_str()))?;
            info!(cart = %id, name = %name, "Cart parked");
            parked = Some(id);
        }
        CartAction::Resume { id } => {
            state.carts.with_carts_mut(|book| book.resume(&id))?;
            info!(cart = %id, "Cart resumed");
            refresh_active(state).await?;
        }
        CartAction::Discard { id } => {
            let discarded = state.carts.with_carts_mut(|book| book.discard(&id))?;
            info!(cart = %id, units = discarded.unit_count(), "Cart discarded");
        }
    }

    state.persist_carts().await?;

    let mut view = state.carts.with_carts(CartView::of);
    view.low_stock = low_stock;
    view.parked = parked;
    CommandOutput::new(render(&view), &view)
}

/// Checks out the active cart. On success the book gets a fresh active cart;
/// on failure it is left as saved.
async fn checkout(state: &AppState, tender: &TenderArgs) -> AppResult<CommandOutput> {
    refresh_active(state).await?;

    let cart = state.carts.with_carts_mut(|book| -> AppResult<Cart> {
        let cart = book.active_mut();
        sell::tender(cart, tender)?;
        Ok(cart.clone())
    })?;

    let output = sell::checkout(state, &cart, Vec::new()).await?;

    state.carts.with_carts_mut(|book| book.take_active());
    state.persist_carts().await?;
    Ok(output)
}

/// Re-reads stock for every line of the active cart.
async fn refresh_active(state: &AppState) -> AppResult<()> {
    let ids: Vec<String> = state
        .carts
        .with_carts(|book| book.active().items.iter().map(|line| line.product_id.clone()).collect());

    for id in ids {
        if let Some(product) = state.db.products().get_by_id(&id).await? {
            state
                .carts
                .with_carts_mut(|book| book.active_mut().refresh_stock(&product));
        }
    }
    Ok(())
}

/// Product id of the active cart line matching `token` (SKU or product id).
fn line_id(state: &AppState, token: &str) -> AppResult<String> {
    state.carts.with_carts(|book| {
        book.active()
            .items
            .iter()
            .find(|line| line.sku.eq_ignore_ascii_case(token) || line.product_id == token)
            .map(|line| line.product_id.clone())
            .ok_or_else(|| CoreError::ProductNotInCart(token.to_string()).into())
    })
}

fn render(view: &CartView) -> String {
    let mut out = String::new();
    if let Some(id) = &view.parked {
        let _ = writeln!(out, "✓ Parked as {}", id);
    }

    let active = &view.active;
    let _ = writeln!(out, "{} ({})", active.name, active.id);
    if active.is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for line in &active.items {
        let _ = writeln!(
            out,
            "  {:<12} {:<24} {:>3} x {:>10}  ({} in stock)",
            line.sku,
            line.name,
            line.quantity,
            line.unit_price().to_string(),
            line.available
        );
    }
    if !active.is_empty() {
        let _ = writeln!(out, "  {:<40}{:>12}", "Total", view.total.to_string());
        if let Some(discount) = &active.discount {
            let _ = writeln!(
                out,
                "  {:<40}{:>12}",
                format!("After discount ({})", discount.kind()),
                view.total_after_discount.to_string()
            );
        }
    }

    for notice in &view.low_stock {
        let _ = writeln!(out, "⚠ Restock soon: {} ({} left)", notice.name, notice.remaining);
    }

    if !view.waiting.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Waiting:");
        for cart in &view.waiting {
            let _ = writeln!(
                out,
                "  {}  {:<20} {:>3} unit(s) {:>12}",
                cart.id,
                cart.name,
                cart.units,
                cart.total.to_string()
            );
        }
    }
    out.trim_end().to_string()
}
