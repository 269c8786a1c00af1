//! # Commands
//!
//! One module per terminal command. Each takes the [`AppState`] plus its own
//! parsed arguments and returns a [`CommandOutput`] that `run` prints as text
//! or, with `--json`, as JSON.
//!
//! | Command     | Module        | Needs PIN |
//! |-------------|---------------|-----------|
//! | `sell`      | [`sell`]      |           |
//! | `cart`      | [`cart`]      |           |
//! | `refund`    | [`refund`]    | yes       |
//! | `report`    | [`report`]    | yes       |
//! | `dashboard` | [`dashboard`] |           |
//! | `history`   | [`history`]   |           |
//! | `attention` | [`attention`] |           |
//! | `import`    | [`import`]    |           |

pub mod attention;
pub mod cart;
pub mod dashboard;
pub mod history;
pub mod import;
pub mod refund;
pub mod report;
pub mod sell;

use clap::Subcommand;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ring up SKU[:QTY] lines and check them out in one go
    Sell(sell::SellArgs),

    /// Work on the active cart and the parked (waiting) carts
    Cart(cart::CartArgs),

    /// Refund units of a recorded sale (admin PIN)
    Refund(refund::RefundArgs),

    /// Sales report for a day, month, year or date range (admin PIN)
    Report(report::ReportArgs),

    /// Net sales today, this month and this year, plus stock counts
    Dashboard,

    /// Past sales, newest first
    History(history::HistoryArgs),

    /// Products that are oversold, out, dead or running low
    Attention,

    /// Load a catalog CSV into the product table
    Import(import::ImportArgs),
}

/// What a command produced.
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    pub json: serde_json::Value,
}

impl CommandOutput {
    pub fn new(text: impl Into<String>, value: &impl Serialize) -> AppResult<Self> {
        Ok(CommandOutput {
            text: text.into(),
            json: serde_json::to_value(value)?,
        })
    }
}

/// Runs a parsed command.
pub async fn dispatch(state: &AppState, command: Command) -> AppResult<CommandOutput> {
    match command {
        Command::Sell(args) => sell::run(state, args).await,
        Command::Cart(args) => cart::run(state, args).await,
        Command::Refund(args) => refund::run(state, args).await,
        Command::Report(args) => report::run(state, args).await,
        Command::Dashboard => dashboard::run(state).await,
        Command::History(args) => history::run(state, args).await,
        Command::Attention => attention::run(state).await,
        Command::Import(args) => import::run(state, args).await,
    }
}
