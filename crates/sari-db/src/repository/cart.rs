//! # Cart Book Repository
//!
//! Keeps the operator's [`CartBook`] (active cart plus parked carts) between
//! terminal runs, as a JSON payload in the single-row `cart_book` table.
//!
//! Carts never touch stock, so there is nothing to reconcile here: the book is
//! read whole and written whole.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use sari_core::CartBook;

/// Repository for the persisted cart book.
#[derive(Debug, Clone)]
pub struct CartBookRepository {
    pool: SqlitePool,
}

impl CartBookRepository {
    /// Creates a new CartBookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartBookRepository { pool }
    }

    /// The saved book, or `None` before the first save.
    pub async fn load(&self) -> DbResult<Option<CartBook>> {
        let payload: Option<String> = sqlx::query_scalar("SELECT payload FROM cart_book WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let book: CartBook = serde_json::from_str(&payload).map_err(|e| DbError::CorruptRow {
            table: "cart_book".to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            active_lines = book.active().items.len(),
            waiting = book.waiting().len(),
            "Loaded cart book"
        );
        Ok(Some(book))
    }

    /// Replaces the saved book.
    pub async fn save(&self, book: &CartBook) -> DbResult<()> {
        let payload = serde_json::to_string(book).map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO cart_book (id, payload, updated_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT (id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
        )
        .bind(&payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(bytes = payload.len(), waiting = book.waiting().len(), "Saved cart book");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use sari_core::Product;
    use std::collections::BTreeMap;

    fn product() -> Product {
        Product {
            id: "p-canton".to_string(),
            sku: "CANTON".to_string(),
            name: "Pancit Canton".to_string(),
            price_cents: 1500,
            qty: 12,
            threshold: 0,
            deadstock: false,
            monthly_sales: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_parked_carts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.carts().load().await.unwrap().is_none());

        let mut book = CartBook::new();
        book.active_mut().add_line(&product(), 2).unwrap();
        let parked = book.park("Aling Nena").unwrap();
        book.active_mut().add_line(&product(), 1).unwrap();
        db.carts().save(&book).await.unwrap();

        // Second save overwrites the single row
        db.carts().save(&book).await.unwrap();

        let loaded = db.carts().load().await.unwrap().unwrap();
        assert_eq!(loaded.waiting().len(), 1);
        assert_eq!(loaded.waiting()[0].id, parked);
        assert_eq!(loaded.waiting()[0].name, "Aling Nena");
        assert_eq!(loaded.waiting()[0].unit_count(), 2);
        assert_eq!(loaded.active().unit_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_reported() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("INSERT INTO cart_book (id, payload, updated_at) VALUES (1, 'not json', ?1)")
            .bind(Utc::now())
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.carts().load().await.unwrap_err();
        assert!(matches!(err, DbError::CorruptRow { .. }));
    }
}
