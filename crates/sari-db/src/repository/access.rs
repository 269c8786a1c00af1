//! # Admin Access Repository
//!
//! The master PIN that gates refunds and sales reports. Only an Argon2 hash
//! is stored, in the single-row `admin_access` table.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use sari_core::Authorizer;

/// Repository for the admin PIN.
#[derive(Debug, Clone)]
pub struct AccessRepository {
    pool: SqlitePool,
}

impl AccessRepository {
    /// Creates a new AccessRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccessRepository { pool }
    }

    /// Sets (or replaces) the admin PIN.
    pub async fn set_pin(&self, pin: &str) -> DbResult<()> {
        let hash = hash_pin(pin)?;

        sqlx::query(
            r#"
            INSERT INTO admin_access (id, pin_hash, updated_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT (id) DO UPDATE SET pin_hash = excluded.pin_hash, updated_at = excluded.updated_at
            "#,
        )
        .bind(&hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!("Admin PIN updated");
        Ok(())
    }

    /// The stored PIN hash, if one was ever set.
    pub async fn pin_hash(&self) -> DbResult<Option<String>> {
        let hash: Option<String> = sqlx::query_scalar("SELECT pin_hash FROM admin_access WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(hash)
    }

    /// Whether a PIN has been configured.
    pub async fn is_configured(&self) -> DbResult<bool> {
        Ok(self.pin_hash().await?.is_some())
    }

    /// Snapshot of the current PIN as an [`Authorizer`].
    pub async fn authorizer(&self) -> DbResult<PinAuthorizer> {
        let hash = self.pin_hash().await?;
        debug!(configured = hash.is_some(), "Loaded admin PIN");
        Ok(PinAuthorizer { hash })
    }
}

/// Checks secrets against the stored Argon2 PIN hash.
///
/// With no PIN configured every secret is refused.
#[derive(Debug, Clone)]
pub struct PinAuthorizer {
    hash: Option<String>,
}

impl PinAuthorizer {
    /// Builds an authorizer from an already stored hash.
    pub fn from_hash(hash: Option<String>) -> Self {
        PinAuthorizer { hash }
    }
}

impl Authorizer for PinAuthorizer {
    fn authorize(&self, secret: &str) -> bool {
        match &self.hash {
            Some(hash) => verify_pin(secret, hash),
            None => false,
        }
    }
}

/// Verify a PIN against its hash.
fn verify_pin(pin: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Hash a PIN for storage.
pub fn hash_pin(pin: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| DbError::Hashing(e.to_string()))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_unset_pin_denies() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(!db.access().is_configured().await.unwrap());

        let auth = db.access().authorizer().await.unwrap();
        assert!(!auth.authorize(""));
        assert!(!auth.authorize("1234"));
    }

    #[tokio::test]
    async fn test_set_and_replace_pin() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.access().set_pin("1234").await.unwrap();

        let auth = db.access().authorizer().await.unwrap();
        assert!(auth.authorize("1234"));
        assert!(!auth.authorize("4321"));

        db.access().set_pin("9999").await.unwrap();
        let auth = db.access().authorizer().await.unwrap();
        assert!(auth.authorize("9999"));
        assert!(!auth.authorize("1234"));
    }

    #[test]
    fn test_garbage_hash_denies() {
        let auth = PinAuthorizer::from_hash(Some("not-a-phc-string".to_string()));
        assert!(!auth.authorize("1234"));
    }
}
