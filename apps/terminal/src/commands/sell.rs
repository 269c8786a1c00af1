//! `sell SKU[:QTY]... [--cash AMOUNT] [--mode MODE] [--percent P | --discount AMOUNT]`
//!
//! Rings up a one-off cart and checks it out in the same command. The
//! persisted active cart (see [`cart`](super::cart)) is left alone. Without
//! `--cash` a cash sale is tendered at exactly the total.

use clap::Args;
use serde::Serialize;
use std::fmt::Write;
use tracing::warn;

use super::CommandOutput;
use crate::cli::{parse_line_item, DiscountArgs, LineItem, TenderArgs};
use crate::error::AppResult;
use crate::state::AppState;
use sari_core::cart::DEFAULT_CART_NAME;
use sari_core::{AddLineNotice, Cart, CoreError, Money, Product, Sale, StockAlert};

#[derive(Debug, Args)]
pub struct SellArgs {
    /// Products to sell, as SKU or SKU:QTY
    #[arg(required = true, value_name = "SKU[:QTY]", value_parser = parse_line_item)]
    pub lines: Vec<LineItem>,

    #[command(flatten)]
    pub tender: TenderArgs,

    #[command(flatten)]
    pub discount: DiscountArgs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SellReport {
    sale: Sale,
    change_due: Money,
    low_stock: Vec<LowStockNotice>,
    oversold: Vec<StockAlert>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LowStockNotice {
    pub(crate) sku: String,
    pub(crate) name: String,
    pub(crate) remaining: i64,
}

pub async fn run(state: &AppState, args: SellArgs) -> AppResult<CommandOutput> {
    let mut cart = Cart::new(DEFAULT_CART_NAME).with_low_stock_warning(state.config.checkout.low_stock_warning);

    let mut low_stock = Vec::new();
    for item in &args.lines {
        let product = lookup(state, &item.sku).await?;
        let notice = cart.add_line(&product, item.qty)?;
        low_stock.extend(low_stock_notice(&product, notice));
    }

    if let Some(discount) = args.discount.discount()? {
        cart.apply_discount(discount);
    }
    tender(&mut cart, &args.tender)?;

    checkout(state, &cart, low_stock).await
}

/// Sets the payment mode and, for cash, the amount handed over.
pub(crate) fn tender(cart: &mut Cart, tender: &TenderArgs) -> AppResult<()> {
    cart.set_payment_mode(tender.mode);
    if tender.mode.requires_tender() {
        let amount = tender.cash.unwrap_or_else(|| cart.total_after_discount());
        cart.set_cash_tendered(amount)?;
    }
    Ok(())
}

pub(crate) fn low_stock_notice(product: &Product, notice: AddLineNotice) -> Option<LowStockNotice> {
    match notice {
        AddLineNotice::LowStock { remaining } => {
            warn!(sku = %product.sku, remaining, "Restock soon");
            Some(LowStockNotice {
                sku: product.sku.clone(),
                name: product.name.clone(),
                remaining,
            })
        }
        _ => None,
    }
}

/// Records `cart` as a sale and renders the receipt.
pub(crate) async fn checkout(
    state: &AppState,
    cart: &Cart,
    low_stock: Vec<LowStockNotice>,
) -> AppResult<CommandOutput> {
    let receipt = state.recorder().checkout(cart).await?;

    let text = render_receipt(
        &state.config.store.name,
        &receipt.sale,
        receipt.change_due,
        &low_stock,
        &receipt.oversold,
    );
    let report = SellReport {
        sale: receipt.sale,
        change_due: receipt.change_due,
        low_stock,
        oversold: receipt.oversold,
    };
    CommandOutput::new(text, &report)
}

/// Finds a product by SKU, falling back to its id.
pub(crate) async fn lookup(state: &AppState, token: &str) -> AppResult<Product> {
    let products = state.db.products();
    if let Some(product) = products.get_by_sku(token).await? {
        return Ok(product);
    }
    products
        .get_by_id(token)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(token.to_string()).into())
}

fn render_receipt(
    store: &str,
    sale: &Sale,
    change_due: Money,
    low_stock: &[LowStockNotice],
    oversold: &[StockAlert],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", store);
    let _ = writeln!(out, "Sale {}", sale.id);
    let _ = writeln!(out, "{}", "-".repeat(40));
    for line in &sale.items {
        let _ = writeln!(
            out,
            "{:<24} {:>3} x {:>10}",
            line.name,
            line.qty_sold,
            line.unit_price().to_string()
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(out, "{:<28}{:>12}", "Total", sale.total_before_discount().to_string());
    if let Some(discount) = &sale.discount {
        let _ = writeln!(
            out,
            "{:<28}{:>12}",
            format!("Discount ({})", discount.kind()),
            (sale.total_before_discount() - sale.total_after_discount()).to_string()
        );
        let _ = writeln!(out, "{:<28}{:>12}", "Amount due", sale.total_after_discount().to_string());
    }
    let _ = writeln!(out, "{:<28}{:>12}", "Paid by", sale.payment_mode.to_string());
    if sale.payment_mode.requires_tender() {
        let _ = writeln!(out, "{:<28}{:>12}", "Cash", Money::from_cents(sale.cash_tendered_cents).to_string());
        let _ = writeln!(out, "{:<28}{:>12}", "Change", change_due.to_string());
    }

    for notice in low_stock {
        let _ = writeln!(out, "⚠ Restock soon: {} ({} left)", notice.name, notice.remaining);
    }
    for alert in oversold {
        let _ = writeln!(out, "⚠ Oversold: {} is now at {}", alert.name, alert.qty_after);
    }
    out.trim_end().to_string()
}
