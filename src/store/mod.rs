//! Generic entity store
//!
//! One parameterized CRUD/query engine shared by every table. Each record type
//! implements [`Entity`]; the store builds SQL from the table descriptor and
//! maps rows back through `Entity::from_row`.
//!
//! - Inserts are upserts: a conflicting key replaces the existing row's values
//! - Batch inserts run in one transaction
//! - Cascading deletes are left to the declared foreign keys

mod entities;
mod entity;

pub use entity::{Entity, EntityKey, SqlValue};
pub(crate) use entity::{push_value, read_text};

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::error::{StoreError, StoreResult};
use crate::lang::Language;
use crate::schema::TableDescriptor;

/// Escape LIKE wildcards and wrap the lowercased term as a substring pattern
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub struct EntityStore<E> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// Raw access for queries the store does not model
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn table(&self) -> &'static TableDescriptor {
        E::descriptor()
    }

    fn parent_column() -> StoreResult<&'static str> {
        let table = E::descriptor();
        table
            .parent
            .map(|p| p.column)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: table.name,
                column: "<parent>".to_string(),
            })
    }

    /// Run a caller-built `SELECT` over this table and map the rows
    pub async fn query_rows(&self, mut builder: QueryBuilder<'_, Sqlite>) -> StoreResult<Vec<E>> {
        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(E::from_row).collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn get_by_id(&self, id: &E::Key) -> StoreResult<Option<E>> {
        let table = E::descriptor();
        let mut builder = QueryBuilder::new(format!(
            "SELECT * FROM {} WHERE {} = ",
            table.name, table.key
        ));
        push_value(&mut builder, id.to_value());
        let row = builder.build().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(E::from_row).transpose()?)
    }

    /// Every row, ordered by the (language-specific) name column
    pub async fn get_all(&self, lang: Option<Language>) -> StoreResult<Vec<E>> {
        let table = E::descriptor();
        let builder = QueryBuilder::new(format!(
            "SELECT * FROM {} ORDER BY {}",
            table.name,
            table.order_clause(lang)
        ));
        self.query_rows(builder).await
    }

    /// Children of `parent_id`. Ordered by `order_by` when given, else by the
    /// language-specific name column when `lang` is given, else by the legacy
    /// name column.
    pub async fn get_by_parent_id(
        &self,
        parent_id: &str,
        order_by: Option<&str>,
        lang: Option<Language>,
    ) -> StoreResult<Vec<E>> {
        let table = E::descriptor();
        let parent = Self::parent_column()?;
        let order = match order_by {
            Some(column) if table.has_column(column) => format!("{} NULLS LAST", column),
            Some(column) => {
                return Err(StoreError::UnknownColumn {
                    table: table.name,
                    column: column.to_string(),
                })
            }
            None => table.order_clause(lang),
        };

        let mut builder =
            QueryBuilder::new(format!("SELECT * FROM {} WHERE {} = ", table.name, parent));
        builder.push_bind(parent_id.to_string());
        builder.push(format!(" ORDER BY {}", order));
        self.query_rows(builder).await
    }

    /// Case-insensitive substring search. Scoped to one language column when
    /// `lang` is given, otherwise across the legacy column and every language.
    /// Single-language rows are filtered on their language column instead.
    pub async fn search_by_text(&self, term: &str, lang: Option<Language>) -> StoreResult<Vec<E>> {
        let table = E::descriptor();
        let columns = table
            .search_columns(lang)
            .ok_or(StoreError::NotSearchable(table.name))?;
        let pattern = like_pattern(term);

        let mut builder = QueryBuilder::new(format!("SELECT * FROM {} WHERE (", table.name));
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder.push(format!("LOWER({}) LIKE ", column));
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\'");
        }
        builder.push(")");
        if let (Some(column), Some(lang)) = (table.language, lang) {
            builder.push(format!(" AND {} = ", column));
            builder.push_bind(lang.code());
        }
        builder.push(format!(" ORDER BY {}", table.order_clause(lang)));
        self.query_rows(builder).await
    }

    /// Upsert one record, returning its key
    pub async fn insert(&self, record: &E) -> StoreResult<E::Key> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut *conn, record).await
    }

    /// Upsert inside a caller-owned connection or transaction
    pub async fn insert_in(conn: &mut SqliteConnection, record: &E) -> StoreResult<E::Key> {
        let table = E::descriptor();
        let mut columns: Vec<(String, SqlValue)> = Vec::new();
        if let Some(key) = record.key() {
            columns.push((table.key.to_string(), key.to_value()));
        }
        let values = record.values();
        let updates = values
            .iter()
            .map(|(c, _)| format!("{c} = excluded.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        columns.extend(values);

        let names = columns
            .iter()
            .map(|(c, _)| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut builder =
            QueryBuilder::new(format!("INSERT INTO {} ({}) VALUES (", table.name, names));
        for (i, (_, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(format!(
            ") ON CONFLICT DO UPDATE SET {} RETURNING {}",
            updates, table.key
        ));

        let row = builder.build().fetch_one(&mut *conn).await?;
        Ok(E::Key::read(&row, table.key)?)
    }

    /// Upsert every record in one transaction; nothing is written on failure
    pub async fn insert_batch(&self, records: &[E]) -> StoreResult<Vec<E::Key>> {
        let mut tx = self.pool.begin().await?;
        let mut keys = Vec::with_capacity(records.len());
        for record in records {
            keys.push(Self::insert_in(&mut *tx, record).await?);
        }
        tx.commit().await?;
        tracing::debug!("Batch inserted {} rows into {}", keys.len(), E::descriptor().name);
        Ok(keys)
    }

    /// Full-row replace by key. Returns affected rows; an absent key is 0.
    pub async fn update(&self, record: &E) -> StoreResult<u64> {
        let table = E::descriptor();
        let Some(key) = record.key() else {
            return Ok(0);
        };

        let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", table.name));
        for (i, (column, value)) in record.values().into_iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(format!("{} = ", column));
            push_value(&mut builder, value);
        }
        builder.push(format!(" WHERE {} = ", table.key));
        push_value(&mut builder, key.to_value());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Update only the `<base>_<lang>` columns named in `fields`. The language
    /// code and field names are validated before the database is touched.
    pub async fn update_translation(
        &self,
        id: &E::Key,
        lang_code: &str,
        fields: &BTreeMap<String, String>,
    ) -> StoreResult<u64> {
        let table = E::descriptor();
        let lang = Language::parse(lang_code)?;
        if let Some(bad) = fields.keys().find(|base| !table.is_translatable(base)) {
            return Err(StoreError::UnknownColumn {
                table: table.name,
                column: bad.clone(),
            });
        }
        if fields.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", table.name));
        for (i, (base, value)) in fields.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(format!("{} = ", lang.column(base)));
            builder.push_bind(value.clone());
        }
        builder.push(format!(" WHERE {} = ", table.key));
        push_value(&mut builder, id.to_value());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: &E::Key) -> StoreResult<u64> {
        let table = E::descriptor();
        let mut builder =
            QueryBuilder::new(format!("DELETE FROM {} WHERE {} = ", table.name, table.key));
        push_value(&mut builder, id.to_value());
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_parent_id(&self, parent_id: &str) -> StoreResult<u64> {
        let table = E::descriptor();
        let parent = Self::parent_column()?;
        let sql = format!("DELETE FROM {} WHERE {} = ?", table.name, parent);
        let result = sqlx::query(&sql).bind(parent_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all(&self) -> StoreResult<u64> {
        let sql = format!("DELETE FROM {}", E::descriptor().name);
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", E::descriptor().name);
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }

    pub async fn count_by_parent_id(&self, parent_id: &str) -> StoreResult<i64> {
        let table = E::descriptor();
        let parent = Self::parent_column()?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table.name, parent);
        Ok(sqlx::query_scalar(&sql)
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Bounded existence probe
    pub async fn exists_by_id(&self, id: &E::Key) -> StoreResult<bool> {
        let table = E::descriptor();
        let mut builder =
            QueryBuilder::new(format!("SELECT 1 FROM {} WHERE {} = ", table.name, table.key));
        push_value(&mut builder, id.to_value());
        builder.push(" LIMIT 1");
        let row = builder.build().fetch_optional(&self.pool).await?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{
        Category, Favorite, Keyword, Ministry, ProcedureStep, RequiredDocument, Sector, SubCategory,
        SyncRecord, SyncStatus, TaxConcept,
    };
    use crate::test_support::sample_catalog;
    use crate::text::MultilingualText;

    fn ministry(id: &str, es: &str) -> Ministry {
        Ministry {
            id: id.to_string(),
            name: MultilingualText::legacy(es),
        }
    }

    fn sector(id: &str, ministry_id: &str, name: MultilingualText) -> Sector {
        Sector {
            id: id.to_string(),
            ministry_id: ministry_id.to_string(),
            name,
        }
    }

    async fn seeded() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        db.ministries_store()
            .insert_batch(&[ministry("M-001", "Hacienda"), ministry("M-002", "Interior")])
            .await
            .unwrap();
        db.sectors_store()
            .insert_batch(&[
                sector(
                    "S-001",
                    "M-001",
                    MultilingualText::from_pairs([(Language::Es, "Zona"), (Language::Fr, "Aire")]),
                ),
                sector(
                    "S-002",
                    "M-001",
                    MultilingualText::from_pairs([(Language::Es, "Aduanas"), (Language::Fr, "Zoll")]),
                ),
                sector("S-003", "M-002", MultilingualText::legacy("Policía")),
            ])
            .await
            .unwrap();
        db
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Visa"), "%visa%");
        assert_eq!(like_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
    }

    #[tokio::test]
    async fn test_insert_then_get_round_trip() {
        let db = Database::open_in_memory().await.unwrap();
        db.ministries_store().insert(&ministry("M-001", "Hacienda")).await.unwrap();
        db.sectors_store()
            .insert(&sector("S-001", "M-001", MultilingualText::legacy("Tributos")))
            .await
            .unwrap();
        db.categories_store()
            .insert(&Category {
                id: "C-001".into(),
                sector_id: "S-001".into(),
                name: MultilingualText::legacy("Impuestos"),
            })
            .await
            .unwrap();
        let unnamed = SubCategory {
            id: "SC-001".into(),
            category_id: "C-001".into(),
            name: None,
        };
        db.sub_categories_store().insert(&unnamed).await.unwrap();

        let concept = TaxConcept {
            id: "T-001".into(),
            sub_category_id: "SC-001".into(),
            name: MultilingualText::from_pairs([
                (Language::Es, "Pasaporte"),
                (Language::Fr, "Passeport"),
                (Language::En, ""),
            ]),
            issuance_fee: Some("1000".into()),
            renewal_fee: None,
            required_documents: Some(MultilingualText::legacy("Foto\nDNI")),
            procedure: None,
        };
        let key = db.concepts_store().insert(&concept).await.unwrap();
        assert_eq!(key, "T-001");

        assert_eq!(
            db.concepts_store().get_by_id(&key).await.unwrap(),
            Some(concept)
        );
        assert_eq!(
            db.sub_categories_store().get_by_id(&"SC-001".to_string()).await.unwrap(),
            Some(unnamed)
        );
        assert_eq!(
            db.ministries_store().get_by_id(&"M-404".to_string()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_insert_assigns_auto_increment_key() {
        let db = seeded().await;
        db.concepts_store()
            .insert(&TaxConcept::new("T-001", "SC-001", MultilingualText::legacy("x")))
            .await
            .unwrap_err();

        let sync = db.sync_records_store();
        let first = sync.insert(&SyncRecord::pending("ministerio", "M-001")).await.unwrap();
        let second = sync.insert(&SyncRecord::pending("ministerio", "M-002")).await.unwrap();
        assert!(second > first);

        let stored = sync.get_by_id(&first).await.unwrap().unwrap();
        assert_eq!(stored.id, Some(first));
        assert_eq!(stored.entity_id, "M-001");
        assert_eq!(stored.entity_type, "ministerio");
    }

    #[tokio::test]
    async fn test_insert_is_upsert_and_keeps_children() {
        let db = seeded().await;
        let store = db.ministries_store();
        store.insert(&ministry("M-001", "Hacienda y Presupuestos")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let updated = store.get_by_id(&"M-001".to_string()).await.unwrap().unwrap();
        assert_eq!(updated.name.resolve(Language::Es), "Hacienda y Presupuestos");
        assert_eq!(db.sectors_store().count_by_parent_id("M-001").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_batch_is_atomic() {
        let db = seeded().await;
        let result = db
            .sectors_store()
            .insert_batch(&[
                sector("S-010", "M-001", MultilingualText::legacy("Nuevo")),
                sector("S-011", "M-999", MultilingualText::legacy("Huérfano")),
            ])
            .await;
        assert!(result.is_err());
        assert!(!db.sectors_store().exists_by_id(&"S-010".to_string()).await.unwrap());
        assert_eq!(db.sectors_store().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_by_parent_id_ordering() {
        let db = seeded().await;
        let store = db.sectors_store();

        let by_legacy = store.get_by_parent_id("M-001", None, None).await.unwrap();
        let ids: Vec<_> = by_legacy.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S-002", "S-001"]);

        let by_fr = store
            .get_by_parent_id("M-001", None, Some(Language::Fr))
            .await
            .unwrap();
        let ids: Vec<_> = by_fr.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S-001", "S-002"]);

        let by_id = store.get_by_parent_id("M-001", Some("id"), None).await.unwrap();
        assert_eq!(by_id[0].id, "S-001");

        let err = store
            .get_by_parent_id("M-001", Some("nombre; DROP TABLE sectores"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));

        assert!(store.get_by_parent_id("M-404", None, None).await.unwrap().is_empty());
        assert!(db.ministries_store().get_by_parent_id("x", None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_search_by_text_language_scope() {
        let db = seeded().await;
        let store = db.sectors_store();

        let any = store.search_by_text("AIRE", None).await.unwrap();
        assert_eq!(any.len(), 1);
        assert_eq!(any[0].id, "S-001");

        assert_eq!(store.search_by_text("aire", Some(Language::Fr)).await.unwrap().len(), 1);
        assert!(store.search_by_text("aire", Some(Language::Es)).await.unwrap().is_empty());

        // unscoped search is at least as broad as every scoped one
        let unscoped = store.search_by_text("a", None).await.unwrap().len();
        for lang in Language::ALL {
            let scoped = store.search_by_text("a", Some(lang)).await.unwrap().len();
            assert!(unscoped >= scoped);
        }

        assert!(store.search_by_text("%", None).await.unwrap().is_empty());
        assert!(matches!(
            db.favorites_store().search_by_text("x", None).await,
            Err(StoreError::NotSearchable(_))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_full_row() {
        let db = seeded().await;
        let store = db.sectors_store();
        let changed = sector("S-003", "M-001", MultilingualText::legacy("Seguridad"));
        assert_eq!(store.update(&changed).await.unwrap(), 1);
        assert_eq!(store.get_by_id(&"S-003".to_string()).await.unwrap(), Some(changed));

        let missing = sector("S-404", "M-001", MultilingualText::legacy("Nada"));
        assert_eq!(store.update(&missing).await.unwrap(), 0);

        let unsaved = ProcedureStep {
            id: None,
            concept_id: "T-001".into(),
            description: MultilingualText::legacy("x"),
            position: None,
        };
        assert_eq!(db.procedure_steps_store().update(&unsaved).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_translation_touches_only_that_language() {
        let db = seeded().await;
        let store = db.sectors_store();
        let id = "S-001".to_string();
        let fields = BTreeMap::from([("nombre".to_string(), "Zone".to_string())]);

        assert_eq!(store.update_translation(&id, "fr", &fields).await.unwrap(), 1);
        let sector = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(sector.name.get(Language::Fr), Some("Zone"));
        assert_eq!(sector.name.get(Language::Es), Some("Zona"));
        assert_eq!(sector.ministry_id, "M-001");

        assert!(matches!(
            store.update_translation(&id, "de", &fields).await,
            Err(StoreError::UnsupportedLanguage(_))
        ));
        let bad = BTreeMap::from([("ministerio_id".to_string(), "M-002".to_string())]);
        assert!(matches!(
            store.update_translation(&id, "fr", &bad).await,
            Err(StoreError::UnknownColumn { .. })
        ));
        assert_eq!(
            store
                .update_translation(&"S-404".to_string(), "en", &fields)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_operations_and_counts() {
        let db = seeded().await;
        let store = db.sectors_store();

        let before = store.count().await.unwrap();
        let deleted = store.delete_by_parent_id("M-001").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get_by_parent_id("M-001", None, None).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), before - deleted as i64);

        assert_eq!(store.delete(&"S-003".to_string()).await.unwrap(), 1);
        assert_eq!(store.delete(&"S-003".to_string()).await.unwrap(), 0);
        assert_eq!(db.ministries_store().delete_all().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_cascades_through_foreign_keys() {
        let db = seeded().await;
        db.ministries_store().delete(&"M-001".to_string()).await.unwrap();
        assert_eq!(db.sectors_store().count().await.unwrap(), 1);
        assert!(db.sectors_store().exists_by_id(&"S-003".to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn test_keyword_upsert_on_unique_triple() {
        let db = seeded().await;
        db.categories_store()
            .insert(&Category {
                id: "C-001".into(),
                sector_id: "S-001".into(),
                name: MultilingualText::legacy("c"),
            })
            .await
            .unwrap();
        db.sub_categories_store()
            .insert(&SubCategory {
                id: "SC-001".into(),
                category_id: "C-001".into(),
                name: None,
            })
            .await
            .unwrap();
        db.concepts_store()
            .insert(&TaxConcept::new("T-001", "SC-001", MultilingualText::legacy("t")))
            .await
            .unwrap();

        let store = db.keywords_store();
        let a = store.insert(&Keyword::new("T-001", "Visa", Language::Es)).await.unwrap();
        let b = store.insert(&Keyword::new("T-001", "visa", Language::Es)).await.unwrap();
        let c = store.insert(&Keyword::new("T-001", "visa", Language::Fr)).await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.count_by_parent_id("T-001").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_round_trip_every_entity() {
        let db = sample_catalog().await;

        let unnamed = SubCategory {
            id: "SC-003".into(),
            category_id: "C-001".into(),
            name: Some(MultilingualText::new()),
        };
        db.sub_categories_store().insert(&unnamed).await.unwrap();
        assert_eq!(
            db.sub_categories_store().get_by_id(&"SC-003".to_string()).await.unwrap(),
            Some(unnamed)
        );

        let mut step = ProcedureStep {
            id: None,
            concept_id: "T-003".into(),
            description: MultilingualText::from_pairs([(Language::Fr, "Paiement")]),
            position: Some(2),
        };
        step.id = Some(db.procedure_steps_store().insert(&step).await.unwrap());
        assert_eq!(
            db.procedure_steps_store().get_by_id(&step.id.unwrap()).await.unwrap(),
            Some(step)
        );

        let mut document = RequiredDocument {
            id: None,
            concept_id: "T-003".into(),
            name: MultilingualText::from_pairs([(Language::Es, "Pasaporte"), (Language::En, "Passport")]),
            description: Some(MultilingualText::from_pairs([(Language::Fr, "Original")])),
        };
        document.id = Some(db.documents_store().insert(&document).await.unwrap());
        assert_eq!(
            db.documents_store().get_by_id(&document.id.unwrap()).await.unwrap(),
            Some(document)
        );

        let mut keyword = Keyword::new("T-003", "visado", Language::En);
        keyword.id = Some(db.keywords_store().insert(&keyword).await.unwrap());
        assert_eq!(
            db.keywords_store().get_by_id(&keyword.id.unwrap()).await.unwrap(),
            Some(keyword)
        );

        let mut favorite = Favorite::now("T-003");
        favorite.id = Some(db.favorites_store().insert(&favorite).await.unwrap());
        assert_eq!(
            db.favorites_store().get_by_id(&favorite.id.unwrap()).await.unwrap(),
            Some(favorite)
        );

        let mut record = SyncRecord::pending("concepto", "T-003");
        record.status = SyncStatus::Conflict;
        record.id = Some(db.sync_records_store().insert(&record).await.unwrap());
        assert_eq!(
            db.sync_records_store().get_by_id(&record.id.unwrap()).await.unwrap(),
            Some(record)
        );
    }

    #[tokio::test]
    async fn test_keyword_search_scoped_to_row_language() {
        let db = sample_catalog().await;
        let store = db.keywords_store();

        assert!(store.search_by_text("essai", Some(Language::Es)).await.unwrap().is_empty());

        let french = store.search_by_text("essai", Some(Language::Fr)).await.unwrap();
        assert_eq!(french.len(), 1);
        assert_eq!(french[0].language, Language::Fr);

        let unscoped = store.search_by_text("e", None).await.unwrap();
        assert_eq!(unscoped.len(), 2);
    }
}
