//! `attention`: products that are oversold, out, dead or running low,
//! plus the reorder list.

use serde::Serialize;
use std::fmt::Write;

use super::CommandOutput;
use crate::error::AppResult;
use crate::state::AppState;
use sari_core::inventory::{attention_list, reorder_list, AttentionItem};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReorderItem {
    sku: String,
    name: String,
    qty: i64,
    threshold: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttentionReport {
    attention: Vec<AttentionItem>,
    reorder: Vec<ReorderItem>,
}

pub async fn run(state: &AppState) -> AppResult<CommandOutput> {
    let products = state.db.products().list_all().await?;

    let report = AttentionReport {
        attention: attention_list(&products),
        reorder: reorder_list(&products)
            .into_iter()
            .map(|p| ReorderItem {
                sku: p.sku.clone(),
                name: p.name.clone(),
                qty: p.qty,
                threshold: p.threshold,
            })
            .collect(),
    };

    CommandOutput::new(render(&report), &report)
}

fn render(report: &AttentionReport) -> String {
    let mut out = String::new();
    if report.attention.is_empty() {
        let _ = writeln!(out, "✓ All products healthy");
    } else {
        let _ = writeln!(out, "Needs attention:");
        for item in &report.attention {
            let _ = writeln!(
                out,
                "  {:<12} {:<28} {:>5}  {}",
                item.sku, item.name, item.qty, item.condition
            );
        }
    }

    if !report.reorder.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Reorder:");
        for item in &report.reorder {
            let _ = writeln!(
                out,
                "  {:<12} {:<28} {:>5} / {}",
                item.sku, item.name, item.qty, item.threshold
            );
        }
    }
    out.trim_end().to_string()
}
