//! Connection pool for the blob database

use momentum_core::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::time::Duration;

/// Database connection pool
pub type DbPool = Pool<Sqlite>;

/// Where the blob database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A file, created on first open
    File(PathBuf),
    /// Private to one connection; gone when the pool closes
    Memory,
}

/// How the blob database is opened
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub location: DatabaseLocation,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long a write waits for a lock held by another process
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// A WAL-mode database file at `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DatabaseLocation::File(path.into()),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// An in-memory database on a single connection
    pub fn memory() -> Self {
        Self {
            location: DatabaseLocation::Memory,
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Establishes a connection pool to the database
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, AppError> {
    let (options, max_connections) = match &config.location {
        DatabaseLocation::File(path) => (
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            config.max_connections,
        ),
        // Every connection to :memory: opens a separate database
        DatabaseLocation::Memory => (
            SqliteConnectOptions::new()
                .in_memory(true)
                .journal_mode(SqliteJournalMode::Memory),
            1,
        ),
    };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options.busy_timeout(config.busy_timeout))
        .await
        .map_err(|e| AppError::database("Failed to connect to database", e))
}

/// Connects, brings the schema up to date and checks integrity
pub async fn open(config: DatabaseConfig) -> Result<DbPool, AppError> {
    log::debug!("Opening blob database at {:?}", config.location);
    let pool = connect(&config).await?;
    crate::migrations::run_migrations(&pool).await?;
    crate::migrations::verify_integrity(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_database_is_created_in_wal_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("momentum.db");

        let pool = connect(&DatabaseConfig::file(&path)).await.unwrap();
        assert!(path.exists());

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_open_runs_migrations() {
        let dir = TempDir::new().unwrap();
        let pool = open(DatabaseConfig::file(dir.path().join("blobs.db")))
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blobs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_blobs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blobs.db");

        let pool = open(DatabaseConfig::file(&path)).await.unwrap();
        crate::queries::put_blob(&pool, "momentum.tasks", b"[]").await.unwrap();
        pool.close().await;

        let pool = open(DatabaseConfig::file(&path)).await.unwrap();
        assert_eq!(
            crate::queries::get_blob(&pool, "momentum.tasks").await.unwrap(),
            Some(b"[]".to_vec())
        );
        pool.close().await;
    }

    #[tokio::test]
    async fn test_memory_database_uses_one_connection() {
        let mut config = DatabaseConfig::memory();
        config.max_connections = 8;

        let pool = open(config).await.unwrap();
        assert_eq!(pool.options().get_max_connections(), 1);

        crate::queries::put_blob(&pool, "momentum.goals", b"[]").await.unwrap();
        assert_eq!(crate::queries::list_keys(&pool).await.unwrap(), vec!["momentum.goals"]);
    }

    #[tokio::test]
    async fn test_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("blobs.db");

        let result = connect(&DatabaseConfig::file(path)).await;
        assert!(matches!(result, Err(AppError::DatabaseError { .. })));
    }
}
