//! # Catalog Importer
//!
//! Bulk stock counts from a spreadsheet export. The CSV is parsed and diffed
//! against the stored catalog first, so the operator can review the change
//! list before [`CatalogImporter::apply`] writes it.

use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::error::ServiceResult;
use crate::repository::product::{apply_catalog_change, list_products};
use sari_core::import::{diff_catalog, parse_catalog_csv, CatalogChange};
use sari_core::Clock;

/// Counts of what an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
}

#[derive(Clone)]
pub struct CatalogImporter {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl CatalogImporter {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        CatalogImporter { pool, clock }
    }

    /// Parses `csv` and returns only the rows that would change something.
    pub async fn plan(&self, csv: &str) -> ServiceResult<Vec<CatalogChange>> {
        let rows = parse_catalog_csv(csv)?;

        let mut conn = self.pool.acquire().await?;
        let current = list_products(&mut conn).await?;

        Ok(diff_catalog(rows, &current))
    }

    /// Writes a change list in one transaction.
    pub async fn apply(&self, changes: &[CatalogChange]) -> ServiceResult<ImportSummary> {
        let now = self.clock.now();
        let mut summary = ImportSummary::default();

        let mut tx = self.pool.begin().await?;
        for change in changes {
            apply_catalog_change(&mut tx, change, now).await?;
            if change.is_new {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
        }
        tx.commit().await?;

        info!(
            created = summary.created,
            updated = summary.updated,
            "Catalog import applied"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use sari_core::{FixedClock, Money, Product};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_plan_and_apply() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        for (id, qty) in [("SKY-01", 4), ("MILO-01", 12)] {
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    sku: id.to_string(),
                    name: format!("Item {}", id),
                    price_cents: 2000,
                    qty,
                    threshold: 0,
                    deadstock: false,
                    monthly_sales: BTreeMap::new(),
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }

        let importer = CatalogImporter::new(db.pool().clone(), Arc::new(FixedClock(now)));
        let csv = "ID,Product,Qty.,Price\n\
                   SKY-01,Item SKY-01,4,20.00\n\
                   MILO-01,,15,\n\
                   NEW-01,Nova Chips,24,18.50\n";

        let changes = importer.plan(csv).await.unwrap();
        let ids: Vec<&str> = changes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["MILO-01", "NEW-01"]);

        let summary = importer.apply(&changes).await.unwrap();
        assert_eq!(summary, ImportSummary { created: 1, updated: 1 });

        let milo = db.products().get_by_id("MILO-01").await.unwrap().unwrap();
        assert_eq!(milo.qty, 15);
        assert_eq!(milo.name, "Item MILO-01");
        assert_eq!(milo.price(), Money::from_cents(2000));

        let nova = db.products().get_by_sku("NEW-01").await.unwrap().unwrap();
        assert_eq!(nova.name, "Nova Chips");
        assert_eq!(nova.price(), Money::from_cents(1850));

        assert!(importer.plan(csv).await.unwrap().is_empty());
    }
}
