//! `refund SALE_ID SKU[:QTY]... --pin PIN`

use clap::Args;
use std::fmt::Write;

use super::sell::lookup;
use super::CommandOutput;
use crate::cli::{parse_line_item, LineItem};
use crate::error::AppResult;
use crate::state::AppState;
use sari_core::{RefundOutcome, RefundRequest};

#[derive(Debug, Args)]
pub struct RefundArgs {
    /// Sale to refund against
    pub sale_id: String,

    /// Units to return, as SKU or SKU:QTY (a product id also works)
    #[arg(value_name = "SKU[:QTY]", value_parser = parse_line_item)]
    pub lines: Vec<LineItem>,

    /// Admin PIN
    #[arg(short, long)]
    pub pin: String,
}

pub async fn run(state: &AppState, args: RefundArgs) -> AppResult<CommandOutput> {
    // Sale lines are keyed by product id; the cashier types SKUs
    let mut requests = Vec::with_capacity(args.lines.len());
    for item in &args.lines {
        let product_id = match lookup(state, &item.sku).await {
            Ok(product) => product.id,
            Err(_) => item.sku.clone(),
        };
        requests.push(RefundRequest::new(product_id, item.qty));
    }

    let outcome = state
        .reconciler()
        .await?
        .refund(&args.sale_id, &requests, &args.pin)
        .await?;

    CommandOutput::new(render(&outcome), &outcome)
}

fn render(outcome: &RefundOutcome) -> String {
    let mut out = String::new();
    if outcome.is_noop() {
        let _ = writeln!(out, "Nothing to refund on sale {} ({})", outcome.sale_id, outcome.status);
        return out.trim_end().to_string();
    }

    let _ = writeln!(out, "Refunded sale {}", outcome.sale_id);
    for restock in &outcome.restocks {
        let _ = writeln!(out, "  {:<24} +{} back on shelf", restock.name, restock.quantity);
    }
    for capped in &outcome.capped {
        let _ = writeln!(
            out,
            "  ⚠ {}: asked for {}, only {} left to refund",
            capped.product_id, capped.requested, capped.applied
        );
    }
    let _ = writeln!(out, "Refund amount: {}", outcome.refund_amount);
    let _ = writeln!(out, "Status: {} → {}", outcome.previous_status, outcome.status);
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse;
    use crate::commands::Command;

    fn refund_args(argv: &[&str]) -> Result<RefundArgs, clap::Error> {
        match parse(argv)? {
            Command::Refund(args) => Ok(args),
            other => panic!("expected refund, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_refund_args() {
        let parsed = refund_args(&["refund", "s-1", "CANTON:2", "KOPIKO", "--pin", "1234"]).unwrap();
        assert_eq!(parsed.sale_id, "s-1");
        assert_eq!(
            parsed.lines,
            vec![
                LineItem { sku: "CANTON".to_string(), qty: 2 },
                LineItem { sku: "KOPIKO".to_string(), qty: 1 },
            ]
        );
        assert_eq!(parsed.pin, "1234");
    }

    #[test]
    fn test_parse_refund_requires_pin_and_sale() {
        assert!(refund_args(&["refund", "s-1", "CANTON"]).is_err());
        assert!(refund_args(&["refund", "--pin", "1234"]).is_err());
    }

    #[test]
    fn test_parse_refund_allows_no_lines() {
        // Left for the reconciler to reject as "no items selected"
        let parsed = refund_args(&["refund", "s-1", "-p", "1234"]).unwrap();
        assert!(parsed.lines.is_empty());
    }
}
