//! `import FILE [--dry-run]`: catalog spreadsheet (CSV) into the product table.

use clap::Args;
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;
use tracing::info;

use super::CommandOutput;
use crate::error::AppResult;
use crate::state::AppState;
use sari_core::import::CatalogChange;
use sari_db::ImportSummary;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportReport {
    dry_run: bool,
    changes: Vec<CatalogChange>,
    summary: Option<ImportSummary>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Catalog CSV (ID, Name, Qty, Price)
    pub file: PathBuf,

    /// Show the changes without writing them
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

pub async fn run(state: &AppState, args: ImportArgs) -> AppResult<CommandOutput> {
    let ImportArgs { file: path, dry_run } = args;
    let raw = std::fs::read_to_string(&path)?;

    let importer = state.importer();
    let changes = importer.plan(&raw).await?;

    let summary = if dry_run || changes.is_empty() {
        None
    } else {
        let summary = importer.apply(&changes).await?;
        info!(
            file = %path.display(),
            created = summary.created,
            updated = summary.updated,
            "Catalog imported"
        );
        Some(summary)
    };

    let report = ImportReport {
        dry_run,
        changes,
        summary,
    };
    CommandOutput::new(render(&report), &report)
}

fn render(report: &ImportReport) -> String {
    let mut out = String::new();
    if report.changes.is_empty() {
        let _ = writeln!(out, "✓ Catalog already up to date");
        return out.trim_end().to_string();
    }

    for change in &report.changes {
        let price = change
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {} {:<12} {:<28} qty {:>5}  price {}",
            if change.is_new { "+" } else { "~" },
            change.id,
            change.name,
            change.qty,
            price
        );
    }

    match &report.summary {
        Some(summary) => {
            let _ = writeln!(
                out,
                "✓ Imported: {} new, {} updated",
                summary.created, summary.updated
            );
        }
        None => {
            let _ = writeln!(out, "Dry run: {} change(s), nothing written", report.changes.len());
        }
    }
    out.trim_end().to_string()
}
