//! Keyed blob queries

use crate::DbPool;
use momentum_core::{AppError, Timestamp};

/// Reads the blob stored under `key`
pub async fn get_blob(pool: &DbPool, key: &str) -> Result<Option<Vec<u8>>, AppError> {
    sqlx::query_scalar("SELECT value FROM blobs WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to read blob '{}'", key), e))
}

/// Inserts or replaces the blob stored under `key`
pub async fn put_blob(pool: &DbPool, key: &str, value: &[u8]) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO blobs (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Timestamp::now().as_millis())
    .execute(pool)
    .await
    .map_err(|e| AppError::database(format!("Failed to write blob '{}'", key), e))?;

    Ok(())
}

/// Removes the blob under `key`, returning whether one existed
pub async fn delete_blob(pool: &DbPool, key: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM blobs WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete blob '{}'", key), e))?;

    Ok(result.rows_affected() > 0)
}

/// Lists all stored keys in ascending order
pub async fn list_keys(pool: &DbPool) -> Result<Vec<String>, AppError> {
    sqlx::query_scalar("SELECT key FROM blobs ORDER BY key")
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::database("Failed to list blob keys", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{open, DatabaseConfig};

    async fn setup() -> DbPool {
        open(DatabaseConfig::memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_blob() {
        let pool = setup().await;
        assert_eq!(get_blob(&pool, "nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let pool = setup().await;
        put_blob(&pool, "k", b"first").await.unwrap();
        put_blob(&pool, "k", b"second").await.unwrap();

        assert_eq!(get_blob(&pool, "k").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(list_keys(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_blob() {
        let pool = setup().await;
        assert!(!delete_blob(&pool, "k").await.unwrap());
    }
}
