//! Database handle
//!
//! One explicitly constructed handle per process, opened at startup and
//! passed to whatever needs the cache. It owns a single SQLite connection;
//! writes are serialized by the engine.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::StoreResult;
use crate::lang::Language;
use crate::migration;
use crate::models::{
    Category, Favorite, Keyword, Ministry, ProcedureStep, RequiredDocument, Sector, SubCategory,
    SyncRecord, TaxConcept,
};
use crate::store::EntityStore;

/// Open a single-connection pool without touching the schema
pub async fn connect(url: &str, busy_timeout: Duration) -> StoreResult<SqlitePool> {
    // one connection that never expires, so in-memory databases persist
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(url)
        .await?;

    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    sqlx::query(&format!("PRAGMA busy_timeout={}", busy_timeout.as_millis()))
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;

    Ok(pool)
}

/// The migrated cache database
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    default_language: Language,
}

impl Database {
    /// Open the configured database, creating the data directory and bringing
    /// the schema up to date
    pub async fn open(config: &AppConfig) -> StoreResult<Self> {
        let data_dir = config.data_dir();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)?;
            tracing::info!("Created data directory: {:?}", data_dir);
        }

        let url = config.database_url();
        let busy_timeout = Duration::from_millis(config.database.busy_timeout_ms);
        let mut db = Self::open_url(&url, busy_timeout).await?;
        db.default_language = config.default_language;
        Ok(db)
    }

    pub async fn open_url(url: &str, busy_timeout: Duration) -> StoreResult<Self> {
        let pool = connect(url, busy_timeout).await?;
        migration::migrate_to_latest(&pool).await?;
        tracing::info!("Database ready: {}", url);
        Ok(Self {
            pool,
            default_language: Language::DEFAULT,
        })
    }

    /// Private in-memory database at the latest schema
    pub async fn open_in_memory() -> StoreResult<Self> {
        Self::open_url("sqlite::memory:", Duration::from_secs(5)).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Language used when no preference has been stored
    pub fn default_language(&self) -> Language {
        self.default_language
    }

    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database closed");
    }

    pub fn ministries_store(&self) -> EntityStore<Ministry> {
        EntityStore::new(self.pool.clone())
    }

    pub fn sectors_store(&self) -> EntityStore<Sector> {
        EntityStore::new(self.pool.clone())
    }

    pub fn categories_store(&self) -> EntityStore<Category> {
        EntityStore::new(self.pool.clone())
    }

    pub fn sub_categories_store(&self) -> EntityStore<SubCategory> {
        EntityStore::new(self.pool.clone())
    }

    pub fn concepts_store(&self) -> EntityStore<TaxConcept> {
        EntityStore::new(self.pool.clone())
    }

    pub fn procedure_steps_store(&self) -> EntityStore<ProcedureStep> {
        EntityStore::new(self.pool.clone())
    }

    pub fn documents_store(&self) -> EntityStore<RequiredDocument> {
        EntityStore::new(self.pool.clone())
    }

    pub fn keywords_store(&self) -> EntityStore<Keyword> {
        EntityStore::new(self.pool.clone())
    }

    pub fn favorites_store(&self) -> EntityStore<Favorite> {
        EntityStore::new(self.pool.clone())
    }

    pub fn sync_records_store(&self) -> EntityStore<SyncRecord> {
        EntityStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    #[tokio::test]
    async fn test_open_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database: DatabaseConfig {
                data_dir: dir.path().join("nested").to_string_lossy().into_owned(),
                db_file: "cache.db".to_string(),
                busy_timeout_ms: 1000,
            },
            default_language: Language::Fr,
            ..AppConfig::default()
        };
        let db = Database::open(&config).await.unwrap();
        assert!(config.data_dir().is_dir());
        assert_eq!(db.default_language(), Language::Fr);
        db.ministries_store()
            .insert(&Ministry {
                id: "M-001".into(),
                name: "Hacienda".into(),
            })
            .await
            .unwrap();
        db.close().await;

        let db = Database::open(&config).await.unwrap();
        assert_eq!(db.ministries_store().count().await.unwrap(), 1);
        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            migration::current_version(&mut conn).await.unwrap(),
            migration::LATEST_VERSION
        );
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::open_in_memory().await.unwrap();
        let b = Database::open_in_memory().await.unwrap();
        a.ministries_store()
            .insert(&Ministry {
                id: "M-001".into(),
                name: "Hacienda".into(),
            })
            .await
            .unwrap();
        assert_eq!(a.ministries_store().count().await.unwrap(), 1);
        assert_eq!(b.ministries_store().count().await.unwrap(), 0);
        assert_eq!(a.default_language(), Language::Es);
    }
}
