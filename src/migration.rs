//! Schema migrations
//!
//! The schema version lives in `PRAGMA user_version`. Each numbered step runs
//! in its own transaction together with the version bump, and checks whether
//! its target is already present before touching anything.

use async_trait::async_trait;
use sqlx::{Connection, Row, SqliteConnection, SqlitePool};

use crate::error::{StoreError, StoreResult};
use crate::lang::Language;
use crate::models::ProcedureStep;
use crate::schema::{self, PROCEDURE_TABLE, TABLES};
use crate::store::{read_text, EntityStore};

/// Version produced by a fresh `create_all`
pub const LATEST_VERSION: u32 = 3;

/// One numbered schema transformation
#[async_trait]
pub trait MigrationStep: Send + Sync {
    /// Version the database is at once this step has run
    fn version(&self) -> u32;

    fn description(&self) -> &'static str;

    /// True when the step's target tables/columns already exist
    async fn is_applied(&self, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error>;

    async fn apply(&self, conn: &mut SqliteConnection) -> StoreResult<()>;
}

/// v1: single-language hierarchy, documents, keywords, favorites, sync records
struct BaseSchema;

const V1_TABLES: [&str; 9] = [
    r#"CREATE TABLE IF NOT EXISTS ministerios (
        id TEXT PRIMARY KEY,
        nombre TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS sectores (
        id TEXT PRIMARY KEY,
        ministerio_id TEXT NOT NULL REFERENCES ministerios(id) ON DELETE CASCADE,
        nombre TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS categorias (
        id TEXT PRIMARY KEY,
        sector_id TEXT NOT NULL REFERENCES sectores(id) ON DELETE CASCADE,
        nombre TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS sub_categorias (
        id TEXT PRIMARY KEY,
        categoria_id TEXT NOT NULL REFERENCES categorias(id) ON DELETE CASCADE,
        nombre TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS conceptos (
        id TEXT PRIMARY KEY,
        sub_categoria_id TEXT NOT NULL REFERENCES sub_categorias(id) ON DELETE CASCADE,
        nombre TEXT NOT NULL,
        documentos_requeridos TEXT,
        procedimiento TEXT,
        tasa_expedicion TEXT,
        tasa_renovacion TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS documentos_requeridos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        concepto_id TEXT NOT NULL REFERENCES conceptos(id) ON DELETE CASCADE,
        nombre TEXT NOT NULL,
        descripcion TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS palabras_clave (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        concepto_id TEXT NOT NULL REFERENCES conceptos(id) ON DELETE CASCADE,
        palabra_clave TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS favoritos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        concepto_id TEXT NOT NULL REFERENCES conceptos(id) ON DELETE CASCADE,
        fecha_agregado TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS sync_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_type TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        last_modified INTEGER NOT NULL,
        sync_status TEXT NOT NULL DEFAULT 'pending' CHECK (sync_status IN ('pending', 'synced', 'conflict'))
    )"#,
];

const V1_INDEXES: [&str; 8] = [
    "CREATE INDEX IF NOT EXISTS idx_sectores_ministerio_id ON sectores(ministerio_id)",
    "CREATE INDEX IF NOT EXISTS idx_categorias_sector_id ON categorias(sector_id)",
    "CREATE INDEX IF NOT EXISTS idx_sub_categorias_categoria_id ON sub_categorias(categoria_id)",
    "CREATE INDEX IF NOT EXISTS idx_conceptos_sub_categoria_id ON conceptos(sub_categoria_id)",
    "CREATE INDEX IF NOT EXISTS idx_documentos_requeridos_concepto_id ON documentos_requeridos(concepto_id)",
    "CREATE INDEX IF NOT EXISTS idx_palabras_clave_concepto_id ON palabras_clave(concepto_id)",
    "CREATE INDEX IF NOT EXISTS idx_palabras_clave_palabra ON palabras_clave(palabra_clave)",
    "CREATE INDEX IF NOT EXISTS idx_favoritos_concepto_id ON favoritos(concepto_id)",
];

#[async_trait]
impl MigrationStep for BaseSchema {
    fn version(&self) -> u32 {
        1
    }

    fn description(&self) -> &'static str {
        "base catalog hierarchy"
    }

    async fn is_applied(&self, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
        schema::table_exists(conn, schema::SYNC_RECORDS).await
    }

    async fn apply(&self, conn: &mut SqliteConnection) -> StoreResult<()> {
        for stmt in V1_TABLES.iter().chain(V1_INDEXES.iter()) {
            sqlx::query(stmt).execute(&mut *conn).await?;
        }
        Ok(())
    }
}

/// v2: per-language columns, keyword language tags, language preferences
struct LanguageColumns;

#[async_trait]
impl MigrationStep for LanguageColumns {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "per-language columns"
    }

    async fn is_applied(&self, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
        if !schema::table_exists(conn, schema::LANGUAGE_PREFERENCES).await?
            || !schema::column_exists(conn, schema::KEYWORDS, "idioma").await?
        {
            return Ok(false);
        }
        for table in TABLES.iter().filter(|t| t.name != schema::PROCEDURES) {
            for t in table.translatable {
                for lang in Language::ALL {
                    if !schema::column_exists(conn, table.name, &lang.column(t.base)).await? {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    async fn apply(&self, conn: &mut SqliteConnection) -> StoreResult<()> {
        for table in TABLES.iter().filter(|t| t.name != schema::PROCEDURES) {
            for t in table.translatable {
                for lang in Language::ALL {
                    let column = lang.column(t.base);
                    if schema::column_exists(conn, table.name, &column).await? {
                        continue;
                    }
                    tracing::info!("Migration: Adding {} column to {} table", column, table.name);
                    sqlx::query(&format!("ALTER TABLE {} ADD COLUMN {} TEXT", table.name, column))
                        .execute(&mut *conn)
                        .await?;
                    if lang == Language::DEFAULT {
                        sqlx::query(&format!(
                            "UPDATE {} SET {} = {} WHERE {} IS NULL",
                            table.name, column, t.base, column
                        ))
                        .execute(&mut *conn)
                        .await?;
                    }
                }
            }
        }

        if !schema::column_exists(conn, schema::KEYWORDS, "idioma").await? {
            tracing::info!("Migration: Adding idioma column to palabras_clave table");
            sqlx::query("ALTER TABLE palabras_clave ADD COLUMN idioma TEXT NOT NULL DEFAULT 'es'")
                .execute(&mut *conn)
                .await?;
        }
        sqlx::query("UPDATE palabras_clave SET idioma = 'es' WHERE idioma IS NULL OR idioma = ''")
            .execute(&mut *conn)
            .await?;
        let removed = sqlx::query(
            r#"
            DELETE FROM palabras_clave WHERE id NOT IN (
                SELECT MIN(id) FROM palabras_clave
                GROUP BY concepto_id, palabra_clave, idioma
            )
            "#,
        )
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if removed > 0 {
            tracing::info!("Migration: Removed {} duplicate keywords", removed);
        }

        sqlx::query(schema::CREATE_LANGUAGE_PREFERENCES)
            .execute(&mut *conn)
            .await?;
        for table in TABLES.iter().filter(|t| t.name != schema::PROCEDURES) {
            for stmt in table.index_sql() {
                sqlx::query(&stmt).execute(&mut *conn).await?;
            }
        }
        Ok(())
    }
}

/// v3: ordered procedure steps moved out of the legacy concept text
struct ProcedureSteps;

#[async_trait]
impl MigrationStep for ProcedureSteps {
    fn version(&self) -> u32 {
        3
    }

    fn description(&self) -> &'static str {
        "procedure steps table"
    }

    async fn is_applied(&self, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
        schema::table_exists(conn, schema::PROCEDURES).await
    }

    async fn apply(&self, conn: &mut SqliteConnection) -> StoreResult<()> {
        sqlx::query(&PROCEDURE_TABLE.create_sql())
            .execute(&mut *conn)
            .await?;
        for stmt in PROCEDURE_TABLE.index_sql() {
            sqlx::query(&stmt).execute(&mut *conn).await?;
        }

        let rows = sqlx::query(
            r#"
            SELECT id, procedimiento, procedimiento_es, procedimiento_fr, procedimiento_en
            FROM conceptos
            WHERE COALESCE(procedimiento, procedimiento_es, procedimiento_fr, procedimiento_en) IS NOT NULL
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut legacy = Vec::with_capacity(rows.len());
        for row in &rows {
            let concept_id: String = row.try_get("id")?;
            if let Some(text) = read_text(row, "procedimiento")? {
                legacy.push((concept_id, text));
            }
        }

        let mut moved = 0usize;
        for (concept_id, text) in &legacy {
            for (i, line) in text.lines().into_iter().enumerate() {
                let step = ProcedureStep {
                    id: None,
                    concept_id: concept_id.clone(),
                    description: line,
                    position: Some(i as i64 + 1),
                };
                EntityStore::<ProcedureStep>::insert_in(conn, &step).await?;
                moved += 1;
            }
        }
        tracing::info!(
            "Migration: Moved {} procedure steps out of {} concepts",
            moved,
            legacy.len()
        );
        Ok(())
    }
}

fn steps() -> Vec<Box<dyn MigrationStep>> {
    vec![
        Box::new(BaseSchema),
        Box::new(LanguageColumns),
        Box::new(ProcedureSteps),
    ]
}

fn failed(version: u32) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |source| StoreError::Migration { version, source }
}

fn step_failed(version: u32) -> impl FnOnce(StoreError) -> StoreError {
    move |e| match e {
        StoreError::Database(source) => StoreError::Migration { version, source },
        other => other,
    }
}

/// Stored schema version; 0 for a fresh database
pub async fn current_version(conn: &mut SqliteConnection) -> Result<u32, sqlx::Error> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(&mut *conn)
        .await?;
    Ok(u32::try_from(version).unwrap_or_default())
}

async fn set_version(conn: &mut SqliteConnection, version: u32) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("PRAGMA user_version = {}", version))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Move the schema from `old` to `new`.
///
/// A fresh database goes straight to the latest schema; otherwise each step
/// in `old+1..=new` runs in order. Moving backwards rebuilds an empty schema
/// at `new` and loses every row.
pub async fn migrate(pool: &SqlitePool, old: u32, new: u32) -> StoreResult<()> {
    if new > LATEST_VERSION {
        return Err(StoreError::Migration {
            version: new,
            source: sqlx::Error::Protocol(format!(
                "schema version {} is newer than {}",
                new, LATEST_VERSION
            )),
        });
    }
    if old == new {
        tracing::debug!("Schema already at version {}", new);
        return Ok(());
    }

    let mut conn = pool.acquire().await?;
    let mut old = old;

    if old > new {
        tracing::warn!("Migration: Downgrading schema {} -> {}, dropping all tables", old, new);
        let mut tx = conn.begin().await.map_err(failed(new))?;
        schema::drop_all(&mut *tx).await.map_err(failed(new))?;
        set_version(&mut *tx, 0).await.map_err(failed(new))?;
        tx.commit().await.map_err(failed(new))?;
        old = 0;
        if new == 0 {
            return Ok(());
        }
    }

    if old == 0
        && new == LATEST_VERSION
        && !schema::table_exists(&mut *conn, schema::MINISTRIES)
            .await
            .map_err(failed(new))?
    {
        tracing::info!("Migration: Creating schema version {}", new);
        let mut tx = conn.begin().await.map_err(failed(new))?;
        schema::create_all(&mut *tx).await.map_err(failed(new))?;
        set_version(&mut *tx, new).await.map_err(failed(new))?;
        tx.commit().await.map_err(failed(new))?;
        return Ok(());
    }

    for step in steps().iter().filter(|s| s.version() > old && s.version() <= new) {
        let version = step.version();
        let mut tx = conn.begin().await.map_err(failed(version))?;
        if step.is_applied(&mut *tx).await.map_err(failed(version))? {
            tracing::info!(
                "Migration: Version {} ({}) already present, skipping",
                version,
                step.description()
            );
        } else {
            tracing::info!("Migration: Applying version {} ({})", version, step.description());
            step.apply(&mut *tx).await.map_err(step_failed(version))?;
        }
        set_version(&mut *tx, version).await.map_err(failed(version))?;
        tx.commit().await.map_err(failed(version))?;
    }
    Ok(())
}

/// Bring the database up to `LATEST_VERSION`
pub async fn migrate_to_latest(pool: &SqlitePool) -> StoreResult<()> {
    let version = {
        let mut conn = pool.acquire().await?;
        current_version(&mut conn).await?
    };
    tracing::info!("Database schema version {}, latest {}", version, LATEST_VERSION);
    migrate(pool, version, LATEST_VERSION).await
}
