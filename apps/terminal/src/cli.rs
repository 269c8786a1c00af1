//! # Command Line
//!
//! `clap` derive definitions: the global flags plus one subcommand per module
//! under [`commands`](crate::commands). Argument types shared by several
//! subcommands (line items, tender, discount) live here.
//!
//! ```text
//! sari [--json] [--config PATH] <COMMAND>
//!        │                          │
//!        └── global, accepted       └── sell · cart · refund · report
//!            before or after            dashboard · history · attention
//!            the command                import
//! ```

use clap::{Args, Parser};
use std::path::PathBuf;

use crate::commands::Command;
use crate::error::AppResult;
use sari_core::validation::parse_percent_bps;
use sari_core::{Discount, Money, PaymentMode};

#[derive(Debug, Parser)]
#[command(name = "sari")]
#[command(about = "Sari-sari store point of sale", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (defaults to sari.toml in the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

// =============================================================================
// Shared argument types
// =============================================================================

/// One `SKU[:QTY]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub sku: String,
    pub qty: i64,
}

/// Splits `SKU[:QTY]` on the last colon; the quantity defaults to 1.
pub fn parse_line_item(raw: &str) -> Result<LineItem, String> {
    let (sku, qty) = match raw.rsplit_once(':') {
        Some((sku, qty)) => {
            let qty = qty
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("bad quantity in '{}'", raw))?;
            (sku.trim(), qty)
        }
        None => (raw.trim(), 1),
    };

    if sku.is_empty() {
        return Err(format!("missing SKU in '{}'", raw));
    }
    Ok(LineItem {
        sku: sku.to_string(),
        qty,
    })
}

/// How the customer pays.
#[derive(Debug, Clone, Args)]
pub struct TenderArgs {
    /// Cash handed over; a cash sale without it is tendered at the exact total
    #[arg(short, long, value_name = "AMOUNT")]
    pub cash: Option<Money>,

    /// cash, gcash, credit-card or debit-card
    #[arg(short, long, value_name = "MODE", default_value = "cash")]
    pub mode: PaymentMode,
}

/// Cart-wide discount, either a percentage or a fixed amount.
#[derive(Debug, Clone, Default, Args)]
pub struct DiscountArgs {
    /// Percentage off, e.g. 10 or 12.5
    #[arg(long, value_name = "P", value_parser = parse_percent_bps, conflicts_with = "amount")]
    pub percent: Option<u32>,

    /// Fixed amount off, e.g. 5 or 2.50
    #[arg(long = "discount", visible_alias = "amount", value_name = "AMOUNT")]
    pub amount: Option<Money>,
}

impl DiscountArgs {
    pub fn discount(&self) -> AppResult<Option<Discount>> {
        match (self.percent, self.amount) {
            (Some(bps), _) => Ok(Some(Discount::percent_bps(bps))),
            (None, Some(amount)) => Ok(Some(Discount::cash(amount)?)),
            (None, None) => Ok(None),
        }
    }
}

/// Parses a full command line, program name first. Used by tests.
#[cfg(test)]
pub(crate) fn parse(argv: &[&str]) -> Result<Command, clap::Error> {
    Cli::try_parse_from(std::iter::once("sari").chain(argv.iter().copied())).map(|cli| cli.command)
}
