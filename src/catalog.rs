//! Catalog browsing, favorites, sync bookkeeping and language preference

use chrono::Utc;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db::Database;
use crate::error::StoreResult;
use crate::lang::Language;
use crate::models::{
    Category, ConceptDetail, Favorite, Ministry, Sector, SubCategory, SyncRecord, SyncStatus,
    TaxConcept,
};
use crate::store::EntityStore;

/// Entity type recorded for favorite changes
pub const FAVORITE_ENTITY: &str = "favorito";

/// Mark `(entity_type, entity_id)` as changed locally. An existing record for
/// the same entity is reset to pending instead of duplicated.
async fn record_change_in(
    conn: &mut SqliteConnection,
    entity_type: &str,
    entity_id: &str,
) -> StoreResult<i64> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM sync_records WHERE entity_type = ? AND entity_id = ? ORDER BY id LIMIT 1",
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_optional(&mut *conn)
    .await?;

    let mut record = SyncRecord::pending(entity_type, entity_id);
    record.id = existing;
    let id = EntityStore::<SyncRecord>::insert_in(conn, &record).await?;
    tracing::debug!("Recorded change {} {} (sync record {})", entity_type, entity_id, id);
    Ok(id)
}

impl Database {
    pub async fn ministries(&self, lang: Option<Language>) -> StoreResult<Vec<Ministry>> {
        self.ministries_store().get_all(lang).await
    }

    pub async fn sectors_of(
        &self,
        ministry_id: &str,
        lang: Option<Language>,
    ) -> StoreResult<Vec<Sector>> {
        self.sectors_store().get_by_parent_id(ministry_id, None, lang).await
    }

    pub async fn categories_of(
        &self,
        sector_id: &str,
        lang: Option<Language>,
    ) -> StoreResult<Vec<Category>> {
        self.categories_store().get_by_parent_id(sector_id, None, lang).await
    }

    pub async fn sub_categories_of(
        &self,
        category_id: &str,
        lang: Option<Language>,
    ) -> StoreResult<Vec<SubCategory>> {
        self.sub_categories_store()
            .get_by_parent_id(category_id, None, lang)
            .await
    }

    pub async fn concepts_of(
        &self,
        sub_category_id: &str,
        lang: Option<Language>,
    ) -> StoreResult<Vec<TaxConcept>> {
        self.concepts_store()
            .get_by_parent_id(sub_category_id, None, lang)
            .await
    }

    /// A concept with its ordered procedure steps, documents, keywords and
    /// favorite flag
    pub async fn concept_detail(
        &self,
        concept_id: &str,
        lang: Option<Language>,
    ) -> StoreResult<Option<ConceptDetail>> {
        let Some(concept) = self.concepts_store().get_by_id(&concept_id.to_string()).await? else {
            return Ok(None);
        };
        let procedure_steps = self
            .procedure_steps_store()
            .get_by_parent_id(concept_id, None, lang)
            .await?;
        let documents = self
            .documents_store()
            .get_by_parent_id(concept_id, None, lang)
            .await?;
        let keywords = self
            .keywords_store()
            .get_by_parent_id(concept_id, None, lang)
            .await?;
        let is_favorite = self.is_favorite(concept_id).await?;

        Ok(Some(ConceptDetail {
            concept,
            procedure_steps,
            documents,
            keywords,
            is_favorite,
        }))
    }

    pub async fn is_favorite(&self, concept_id: &str) -> StoreResult<bool> {
        Ok(self.favorites_store().count_by_parent_id(concept_id).await? > 0)
    }

    /// Add a favorite. Returns false when the concept already was one.
    pub async fn add_favorite(&self, concept_id: &str) -> StoreResult<bool> {
        let mut tx = self.pool().begin().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favoritos WHERE concepto_id = ?")
            .bind(concept_id)
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            return Ok(false);
        }
        EntityStore::<Favorite>::insert_in(&mut *tx, &Favorite::now(concept_id)).await?;
        record_change_in(&mut *tx, FAVORITE_ENTITY, concept_id).await?;
        tx.commit().await?;
        tracing::info!("Added favorite: {}", concept_id);
        Ok(true)
    }

    /// Remove a favorite. Returns false when the concept was not one.
    pub async fn remove_favorite(&self, concept_id: &str) -> StoreResult<bool> {
        let mut tx = self.pool().begin().await?;
        let removed = sqlx::query("DELETE FROM favoritos WHERE concepto_id = ?")
            .bind(concept_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Ok(false);
        }
        record_change_in(&mut *tx, FAVORITE_ENTITY, concept_id).await?;
        tx.commit().await?;
        tracing::info!("Removed favorite: {}", concept_id);
        Ok(true)
    }

    /// Favorite concepts, most recently added first
    pub async fn favorite_concepts(&self) -> StoreResult<Vec<TaxConcept>> {
        let builder = QueryBuilder::new(
            "SELECT c.* FROM conceptos c JOIN favoritos f ON f.concepto_id = c.id \
             ORDER BY f.fecha_agregado DESC, f.id DESC",
        );
        self.concepts_store().query_rows(builder).await
    }

    pub async fn record_change(&self, entity_type: &str, entity_id: &str) -> StoreResult<i64> {
        let mut conn = self.pool().acquire().await?;
        record_change_in(&mut conn, entity_type, entity_id).await
    }

    /// Pending records, oldest change first
    pub async fn pending_sync_records(&self) -> StoreResult<Vec<SyncRecord>> {
        let mut builder = QueryBuilder::new("SELECT * FROM sync_records WHERE sync_status = ");
        builder.push_bind(SyncStatus::Pending.as_str());
        builder.push(" ORDER BY last_modified, id");
        self.sync_records_store().query_rows(builder).await
    }

    pub async fn mark_synced(&self, record_id: i64) -> StoreResult<u64> {
        self.set_sync_status(record_id, SyncStatus::Synced).await
    }

    pub async fn mark_conflict(&self, record_id: i64) -> StoreResult<u64> {
        self.set_sync_status(record_id, SyncStatus::Conflict).await
    }

    async fn set_sync_status(&self, record_id: i64, status: SyncStatus) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE sync_records SET sync_status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(record_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Stored language preference, or the configured default
    pub async fn preferred_language(&self) -> StoreResult<Language> {
        let code: Option<String> =
            sqlx::query_scalar("SELECT language_code FROM language_preferences WHERE id = 1")
                .fetch_optional(self.pool())
                .await?;
        Ok(match code {
            Some(code) => Language::parse(&code).unwrap_or_else(|_| {
                tracing::warn!("Ignoring stored language preference {:?}", code);
                self.default_language()
            }),
            None => self.default_language(),
        })
    }

    pub async fn set_preferred_language(&self, code: &str) -> StoreResult<Language> {
        let lang = Language::parse(code)?;
        sqlx::query(
            r#"
            INSERT INTO language_preferences (id, language_code, updated_at) VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                language_code = excluded.language_code,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(lang.code())
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;
        tracing::info!("Preferred language set to {}", lang);
        Ok(lang)
    }
}
