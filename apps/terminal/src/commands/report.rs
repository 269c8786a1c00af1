//! `report daily|monthly|yearly|custom [START END] --pin PIN [--csv FILE]`

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use std::fmt::Write;
use std::path::PathBuf;
use tracing::info;

use super::CommandOutput;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use sari_core::{report_to_csv, ReportPeriod, ReportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodKind {
    #[value(alias = "today")]
    Daily,
    #[value(alias = "month")]
    Monthly,
    #[value(alias = "year")]
    Yearly,
    Custom,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Which sales to cover, on the store's calendar
    #[arg(value_enum)]
    pub kind: PeriodKind,

    /// First day of a custom range (YYYY-MM-DD)
    #[arg(required_if_eq("kind", "custom"))]
    pub start: Option<NaiveDate>,

    /// Last day of a custom range, inclusive (YYYY-MM-DD)
    #[arg(required_if_eq("kind", "custom"))]
    pub end: Option<NaiveDate>,

    /// Admin PIN
    #[arg(short, long)]
    pub pin: String,

    /// Also write the report to FILE as CSV
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,
}

impl ReportArgs {
    pub fn period(&self) -> AppResult<ReportPeriod> {
        match (self.kind, self.start, self.end) {
            (PeriodKind::Custom, Some(start), Some(end)) => Ok(ReportPeriod::custom(start, end)?),
            (PeriodKind::Custom, _, _) => Err(AppError::usage("custom needs START and END")),
            (_, Some(_), _) | (_, _, Some(_)) => {
                Err(AppError::usage("START and END only apply to custom"))
            }
            (PeriodKind::Daily, None, None) => Ok(ReportPeriod::Daily),
            (PeriodKind::Monthly, None, None) => Ok(ReportPeriod::Monthly),
            (PeriodKind::Yearly, None, None) => Ok(ReportPeriod::Yearly),
        }
    }
}

pub async fn run(state: &AppState, args: ReportArgs) -> AppResult<CommandOutput> {
    let period = args.period()?;

    let result = state.reporter().await?.generate(&period, &args.pin).await?;

    let mut text = render(&result);
    if let Some(path) = &args.csv {
        std::fs::write(path, report_to_csv(&result)?)?;
        info!(path = %path.display(), rows = result.rows.len(), "Report exported");
        let _ = write!(text, "\n\n✓ Saved to {}", path.display());
    }

    CommandOutput::new(text, &result)
}

fn render(result: &ReportResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", result.period_label);
    if result.rows.is_empty() {
        let _ = writeln!(out, "No sales in this period.");
        return out.trim_end().to_string();
    }

    let _ = writeln!(
        out,
        "{:<24} {:>5} {:>5} {:>5} {:>12}",
        "Product", "Sold", "Ref", "Net", "Net Sales"
    );
    for row in &result.rows {
        let _ = writeln!(
            out,
            "{:<24} {:>5} {:>5} {:>5} {:>12}",
            row.name,
            row.total_qty,
            row.refunded_qty,
            row.net_qty,
            row.net_subtotal.to_string()
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Sales:   {:>12}", result.totals.total_sales.to_string());
    let _ = writeln!(out, "Refunds: {:>12}", result.totals.total_refunds.to_string());
    let _ = writeln!(out, "Net:     {:>12}", result.totals.net_sales.to_string());
    let _ = writeln!(out, "{} sale(s)", result.totals.sale_count);
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse;
    use crate::commands::Command;

    fn report_args(argv: &[&str]) -> Result<ReportArgs, clap::Error> {
        match parse(argv)? {
            Command::Report(args) => Ok(args),
            other => panic!("expected report, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_fixed_period() {
        let parsed = report_args(&["report", "monthly", "--pin", "1234"]).unwrap();
        assert_eq!(parsed.period().unwrap(), ReportPeriod::Monthly);
        assert_eq!(parsed.pin, "1234");
        assert!(parsed.csv.is_none());

        let today = report_args(&["report", "today", "-p", "1234"]).unwrap();
        assert_eq!(today.period().unwrap(), ReportPeriod::Daily);
    }

    #[test]
    fn test_parse_custom_range_with_csv() {
        let parsed = report_args(&[
            "report",
            "custom",
            "2025-03-01",
            "2025-03-31",
            "--pin",
            "1234",
            "--csv",
            "march.csv",
        ])
        .unwrap();
        assert_eq!(
            parsed.period().unwrap(),
            ReportPeriod::Custom {
                start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            }
        );
        assert_eq!(parsed.csv, Some(PathBuf::from("march.csv")));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(report_args(&["report", "daily"]).is_err());
        assert!(report_args(&["report", "weekly", "--pin", "1"]).is_err());
        assert!(report_args(&["report", "custom", "2025-03-01", "--pin", "1"]).is_err());
        assert!(report_args(&["report", "custom", "03/01/2025", "2025-03-31", "--pin", "1"]).is_err());

        // Parses, but the range is inverted
        let inverted = report_args(&["report", "custom", "2025-03-31", "2025-03-01", "--pin", "1"]).unwrap();
        assert!(inverted.period().is_err());

        let stray = report_args(&["report", "daily", "2025-03-01", "--pin", "1"]).unwrap();
        assert!(matches!(stray.period(), Err(AppError::Usage(_))));
    }
}
