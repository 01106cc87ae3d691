//! String key-value storage on top of SQLite.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

/// Durable key-value store scoped to this installation.
#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a value. Missing keys are `None`.
    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    /// Insert or overwrite a value.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a value. Removing a missing key is not an error.
    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("kv.sqlite"))
            .await
            .unwrap();
        let kv = KvStore::new(pool);

        assert_eq!(kv.get("missing").await.unwrap(), None);

        kv.set("flag", "true").await.unwrap();
        assert_eq!(kv.get("flag").await.unwrap().as_deref(), Some("true"));

        kv.set("flag", "false").await.unwrap();
        assert_eq!(kv.get("flag").await.unwrap().as_deref(), Some("false"));

        kv.remove("flag").await.unwrap();
        kv.remove("flag").await.unwrap();
        assert_eq!(kv.get("flag").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kv.sqlite");

        {
            let kv = KvStore::new(init_database(&path).await.unwrap());
            kv.set("carz34_inventory", "[]").await.unwrap();
        }

        let kv = KvStore::new(init_database(&path).await.unwrap());
        assert_eq!(
            kv.get("carz34_inventory").await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
