//! Momentum Database Layer
//!
//! SQLite blob storage for the Momentum local store. Each collection is kept
//! as one encoded blob under a fixed key, so the schema is a single
//! key/value table managed with sqlx.

pub mod connection;
pub mod migrations;
pub mod queries;

pub use connection::{connect, open, DatabaseConfig, DatabaseLocation, DbPool};
pub use migrations::{current_version, run_migrations, verify_integrity};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{delete_blob, get_blob, list_keys, put_blob};
    use momentum_core::AppError;

    #[tokio::test]
    async fn test_database_migrations() -> Result<(), AppError> {
        let pool = connect(&DatabaseConfig::memory()).await?;
        run_migrations(&pool).await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(&pool)
            .await
            .map_err(|e| AppError::database("Failed to count migrations", e))?;

        assert_eq!(count, current_version());
        Ok(())
    }

    #[tokio::test]
    async fn test_full_blob_workflow() -> Result<(), AppError> {
        let pool = connect(&DatabaseConfig::memory()).await?;
        run_migrations(&pool).await?;

        put_blob(&pool, "momentum.tasks", b"[]").await?;
        put_blob(&pool, "momentum.goals", b"[{}]").await?;
        assert_eq!(list_keys(&pool).await?, vec!["momentum.goals", "momentum.tasks"]);

        put_blob(&pool, "momentum.tasks", b"[1]").await?;
        assert_eq!(get_blob(&pool, "momentum.tasks").await?, Some(b"[1]".to_vec()));

        assert!(delete_blob(&pool, "momentum.goals").await?);
        assert_eq!(get_blob(&pool, "momentum.goals").await?, None);

        verify_integrity(&pool).await?;
        Ok(())
    }
}
