//! `history [all|completed|partially_refunded|refunded] [--page N]`

use clap::Args;
use std::fmt::Write;

use super::CommandOutput;
use crate::error::AppResult;
use crate::state::AppState;
use sari_core::history::{self, HistoryPage, SaleFilter};

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// all, completed, partially_refunded (or partial) or refunded
    #[arg(default_value = "all")]
    pub filter: SaleFilter,

    /// 1-based page; out of range pages are clamped
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,
}

pub async fn run(state: &AppState, args: HistoryArgs) -> AppResult<CommandOutput> {
    let sales = state.db.sales().list_all().await?;
    let result = history::page(&sales, args.filter, args.page, state.config.history.page_size);

    CommandOutput::new(render(args.filter, &result), &result)
}

fn render(filter: SaleFilter, page: &HistoryPage) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Sales ({}) page {} of {}, {} matching",
        filter, page.page, page.total_pages, page.total_matching
    );
    if page.sales.is_empty() {
        let _ = writeln!(out, "No sales.");
        return out.trim_end().to_string();
    }

    for sale in &page.sales {
        let _ = writeln!(
            out,
            "{}  {}  {:>12}  {:<11}  {}",
            sale.created_at.format("%Y-%m-%d %H:%M"),
            sale.id,
            sale.total_after_discount().to_string(),
            sale.payment_mode.to_string(),
            sale.status
        );
        for line in &sale.items {
            let refunded = if line.refunded_qty > 0 {
                format!(" ({} refunded)", line.refunded_qty)
            } else {
                String::new()
            };
            let _ = writeln!(out, "    {} x{}{}", line.name, line.qty_sold, refunded);
        }
    }
    out.trim_end().to_string()
}
