//! `dashboard`: net sales and refunds for today, this month and this year,
//! plus catalog stock counts. Unlike `report`, no PIN.

use std::fmt::Write;

use super::CommandOutput;
use crate::error::AppResult;
use crate::state::AppState;
use sari_core::report::PeriodTotals;
use sari_core::DashboardSummary;

pub async fn run(state: &AppState) -> AppResult<CommandOutput> {
    let summary = state.reporter().await?.summary().await?;
    CommandOutput::new(render(&state.config.store.name, &summary), &summary)
}

fn render(store: &str, summary: &DashboardSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", store);
    let _ = writeln!(out, "{:<12} {:>14} {:>14} {:>6}", "", "Net Sales", "Refunds", "Sales");

    let rows: [(&str, &PeriodTotals); 3] = [
        ("Today", &summary.today),
        ("This month", &summary.month),
        ("This year", &summary.year),
    ];
    for (label, totals) in rows {
        let _ = writeln!(
            out,
            "{:<12} {:>14} {:>14} {:>6}",
            label,
            totals.net_sales.to_string(),
            totals.refunds.to_string(),
            totals.sale_count
        );
    }

    let stock = &summary.inventory;
    let _ = writeln!(out);
    let _ = writeln!(out, "Products:   {} ({} units)", stock.product_count, stock.total_qty);
    let _ = writeln!(out, "Low stock:  {}", stock.low_stock_count);
    let _ = writeln!(out, "Deadstock:  {}", stock.deadstock_count);
    out.trim_end().to_string()
}
