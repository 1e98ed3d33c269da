//! Bundled seed import
//!
//! Reads the catalog fixture (`{"ministerios": [...]}` or a bare array) and
//! writes the whole hierarchy in one transaction. Translatable fields may be a
//! plain string (Spanish), an object keyed by language code, or sibling
//! `<field>_<lang>` keys.
//!
//! The spreadsheet converter's French layout (`ministeres` → `secteurs` →
//! `services` → `taxes`, with `nom`, `montant_expedition`, ...) is accepted
//! too. Its services are categories; taxes listed directly under a category
//! land in an unnamed sub-category sharing the category's id.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::lang::Language;
use crate::models::{
    Category, Keyword, Ministry, ProcedureStep, RequiredDocument, Sector, SubCategory, TaxConcept,
};
use crate::schema::{self, TABLES};
use crate::store::EntityStore;
use crate::text::MultilingualText;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static CONTROL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x1F\x7F]").expect("valid regex"));
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Wrapped {
        #[serde(alias = "ministeres")]
        ministerios: Vec<SeedMinistry>,
    },
    Bare(Vec<SeedMinistry>),
}

#[derive(Deserialize)]
struct SeedMinistry {
    id: String,
    #[serde(default, alias = "secteurs")]
    sectores: Vec<SeedSector>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct SeedSector {
    id: String,
    #[serde(default, alias = "services")]
    categorias: Vec<SeedCategory>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct SeedCategory {
    id: String,
    #[serde(default)]
    sub_categorias: Vec<SeedSubCategory>,
    #[serde(default, alias = "taxes")]
    conceptos: Vec<SeedConcept>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct SeedSubCategory {
    id: String,
    #[serde(default)]
    conceptos: Vec<SeedConcept>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct SeedConcept {
    id: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

/// Rows written by one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub ministries: usize,
    pub sectors: usize,
    pub categories: usize,
    pub sub_categories: usize,
    pub concepts: usize,
    pub procedure_steps: usize,
    pub documents: usize,
    pub keywords: usize,
}

/// Collapse whitespace runs and strip control characters
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    CONTROL.replace_all(&collapsed, "").into_owned()
}

/// Normalize a fee written with thousands grouping and/or a decimal comma
/// (`1.000`, `25 000`, `1.500,50`) into a plain decimal. `None` when the
/// text is empty or not a number.
pub fn normalize_amount(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if compact.is_empty() {
        return None;
    }

    let last_dot = compact.rfind('.');
    let last_comma = compact.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (None, Some(_)) => grouped_or_decimal(&compact, ','),
        (Some(_), None) => grouped_or_decimal(&compact, '.'),
        (None, None) => compact,
    };

    DECIMAL.is_match(&normalized).then_some(normalized)
}

/// A single separator followed by exactly three digits, or repeated
/// separators, group thousands; anything else is the decimal point.
fn grouped_or_decimal(value: &str, separator: char) -> String {
    let parts: Vec<&str> = value.split(separator).collect();
    let grouped = parts.len() > 2 || parts.last().map_or(false, |tail| tail.len() == 3);
    if grouped {
        parts.concat()
    } else {
        value.replace(separator, ".")
    }
}

/// Converter field names and the fields they stand for
const FIELD_ALIASES: [(&str, &str); 6] = [
    ("nom", "nombre"),
    ("montant_expedition", "tasa_expedicion"),
    ("montant_renouvellement", "tasa_renovacion"),
    ("documents_requis", "documentos_requeridos"),
    ("procedure", "procedimiento"),
    ("mots_cles", "palabras_clave"),
];

/// Rename aliased keys (and their `_<lang>` siblings). A key already present
/// under its canonical name wins.
fn canonical_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    for (alias, name) in FIELD_ALIASES {
        let suffixes = std::iter::once(String::new())
            .chain(Language::ALL.iter().map(|l| format!("_{}", l.code())));
        for suffix in suffixes {
            if let Some(value) = fields.remove(&format!("{}{}", alias, suffix)) {
                fields.entry(format!("{}{}", name, suffix)).or_insert(value);
            }
        }
    }
    fields
}

fn invalid(message: String) -> StoreError {
    StoreError::Seed(<serde_json::Error as serde::de::Error>::custom(message))
}

fn scalar_text(value: &Value) -> StoreResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(clean_text(s)).filter(|s| !s.is_empty())),
        other => Err(invalid(format!("expected text, found {}", other))),
    }
}

/// Newline-delimited list, or an array of items, cleaned line by line
fn list_text(value: &Value) -> StoreResult<Option<String>> {
    let items: Vec<String> = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s.lines().map(clean_text).collect(),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(text) = scalar_text(item)? {
                    out.push(text);
                }
            }
            out
        }
        other => return Err(invalid(format!("expected a list, found {}", other))),
    };
    let joined = items
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Some(joined).filter(|s| !s.is_empty()))
}

/// Read a translatable field: the base key (string or language object) plus
/// any `<base>_<lang>` siblings, which only fill languages still missing
fn localized(
    fields: &Map<String, Value>,
    base: &str,
    convert: fn(&Value) -> StoreResult<Option<String>>,
) -> StoreResult<Option<MultilingualText>> {
    let mut text = MultilingualText::new();
    match fields.get(base) {
        Some(Value::Object(map)) => {
            for (code, value) in map {
                let lang = Language::parse(code)?;
                if let Some(value) = convert(value)? {
                    text = text.with_translation(lang, value);
                }
            }
        }
        Some(value) => {
            if let Some(value) = convert(value)? {
                text = text.with_translation(Language::DEFAULT, value);
            }
        }
        None => {}
    }
    for lang in Language::ALL {
        if text.get(lang).is_some() {
            continue;
        }
        if let Some(value) = fields.get(&lang.column(base)) {
            if let Some(value) = convert(value)? {
                text = text.with_translation(lang, value);
            }
        }
    }
    Ok((!text.is_empty()).then_some(text))
}

fn required_name(fields: &Map<String, Value>, id: &str) -> StoreResult<MultilingualText> {
    localized(fields, "nombre", scalar_text)?
        .ok_or_else(|| invalid(format!("`{}` has no nombre", id)))
}

fn fee(fields: &Map<String, Value>, key: &str, id: &str) -> StoreResult<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::String(s)) => {
            let amount = normalize_amount(s);
            if amount.is_none() && !s.trim().is_empty() {
                tracing::warn!("Seed: {} of {} is not a number: {:?}", key, id, s);
            }
            Ok(amount)
        }
        Some(other) => Err(invalid(format!("`{}` of {} must be a number, found {}", key, id, other))),
    }
}

/// Comma-delimited keywords, or an array of them
fn keyword_list(value: &Value) -> StoreResult<Option<String>> {
    let words: Vec<String> = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(word) = scalar_text(item)? {
                    out.push(word);
                }
            }
            out
        }
        other => return Err(invalid(format!("expected keywords, found {}", other))),
    };
    let joined = words
        .iter()
        .map(|w| clean_text(w))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    Ok(Some(joined).filter(|s| !s.is_empty()))
}

fn keywords(fields: &Map<String, Value>, concept_id: &str) -> StoreResult<Vec<Keyword>> {
    let Some(text) = localized(fields, "palabras_clave", keyword_list)? else {
        return Ok(Vec::new());
    };
    let mut out: Vec<Keyword> = Vec::new();
    for (lang, words) in text.iter() {
        for word in words.split(',') {
            let keyword = Keyword::new(concept_id, word, lang);
            if keyword.keyword.is_empty()
                || out
                    .iter()
                    .any(|k| k.language == lang && k.keyword == keyword.keyword)
            {
                continue;
            }
            out.push(keyword);
        }
    }
    Ok(out)
}

/// Everything one import writes, validated before the transaction opens
#[derive(Default)]
struct SeedRows {
    ministries: Vec<Ministry>,
    sectors: Vec<Sector>,
    categories: Vec<Category>,
    sub_categories: Vec<SubCategory>,
    concepts: Vec<TaxConcept>,
    procedure_steps: Vec<ProcedureStep>,
    documents: Vec<RequiredDocument>,
    keywords: Vec<Keyword>,
}

impl SeedRows {
    fn collect(ministries: Vec<SeedMinistry>) -> StoreResult<Self> {
        let mut rows = SeedRows::default();
        for m in ministries {
            rows.ministries.push(Ministry {
                name: required_name(&canonical_fields(m.fields), &m.id)?,
                id: m.id.clone(),
            });
            for s in m.sectores {
                rows.sectors.push(Sector {
                    name: required_name(&canonical_fields(s.fields), &s.id)?,
                    id: s.id.clone(),
                    ministry_id: m.id.clone(),
                });
                for c in s.categorias {
                    rows.categories.push(Category {
                        name: required_name(&canonical_fields(c.fields), &c.id)?,
                        id: c.id.clone(),
                        sector_id: s.id.clone(),
                    });
                    if !c.conceptos.is_empty() {
                        rows.sub_categories.push(SubCategory {
                            id: c.id.clone(),
                            category_id: c.id.clone(),
                            name: None,
                        });
                        for concept in c.conceptos {
                            rows.push_concept(concept, &c.id)?;
                        }
                    }
                    for sc in c.sub_categorias {
                        rows.sub_categories.push(SubCategory {
                            name: localized(&canonical_fields(sc.fields), "nombre", scalar_text)?,
                            id: sc.id.clone(),
                            category_id: c.id.clone(),
                        });
                        for concept in sc.conceptos {
                            rows.push_concept(concept, &sc.id)?;
                        }
                    }
                }
            }
        }
        Ok(rows)
    }

    fn push_concept(&mut self, seed: SeedConcept, sub_category_id: &str) -> StoreResult<()> {
        let id = seed.id;
        let fields = &canonical_fields(seed.fields);
        let documents = localized(fields, "documentos_requeridos", list_text)?;
        let procedure = localized(fields, "procedimiento", list_text)?;

        if let Some(documents) = &documents {
            self.documents
                .extend(documents.lines().into_iter().map(|name| RequiredDocument {
                    id: None,
                    concept_id: id.clone(),
                    name,
                    description: None,
                }));
        }
        if let Some(procedure) = &procedure {
            self.procedure_steps.extend(
                procedure
                    .lines()
                    .into_iter()
                    .enumerate()
                    .map(|(i, description)| ProcedureStep {
                        id: None,
                        concept_id: id.clone(),
                        description,
                        position: Some(i as i64 + 1),
                    }),
            );
        }
        self.keywords.extend(keywords(fields, &id)?);

        self.concepts.push(TaxConcept {
            name: required_name(fields, &id)?,
            sub_category_id: sub_category_id.to_string(),
            issuance_fee: fee(fields, "tasa_expedicion", &id)?,
            renewal_fee: fee(fields, "tasa_renovacion", &id)?,
            required_documents: documents,
            procedure,
            id,
        });
        Ok(())
    }
}

/// Import the seed JSON in one transaction. With `force_reset` the catalog is
/// cleared first; otherwise rows are upserted and each imported concept's
/// steps, documents and keywords are replaced.
pub async fn import_seed(db: &Database, json: &str, force_reset: bool) -> StoreResult<ImportSummary> {
    let ministries = match serde_json::from_str::<SeedFile>(json)? {
        SeedFile::Wrapped { ministerios } => ministerios,
        SeedFile::Bare(ministerios) => ministerios,
    };
    let rows = SeedRows::collect(ministries)?;

    let mut tx = db.pool().begin().await?;
    if force_reset {
        tracing::info!("Seed: Clearing catalog before import");
        for table in TABLES
            .iter()
            .rev()
            .filter(|t| t.name != schema::SYNC_RECORDS)
        {
            sqlx::query(&format!("DELETE FROM {}", table.name))
                .execute(&mut *tx)
                .await?;
        }
    }

    for m in &rows.ministries {
        EntityStore::insert_in(&mut *tx, m).await?;
    }
    for s in &rows.sectors {
        EntityStore::insert_in(&mut *tx, s).await?;
    }
    for c in &rows.categories {
        EntityStore::insert_in(&mut *tx, c).await?;
    }
    for sc in &rows.sub_categories {
        EntityStore::insert_in(&mut *tx, sc).await?;
    }
    for concept in &rows.concepts {
        EntityStore::insert_in(&mut *tx, concept).await?;
        for table in [schema::PROCEDURES, schema::DOCUMENTS, schema::KEYWORDS] {
            sqlx::query(&format!("DELETE FROM {} WHERE concepto_id = ?", table))
                .bind(&concept.id)
                .execute(&mut *tx)
                .await?;
        }
    }
    for step in &rows.procedure_steps {
        EntityStore::insert_in(&mut *tx, step).await?;
    }
    for document in &rows.documents {
        EntityStore::insert_in(&mut *tx, document).await?;
    }
    for keyword in &rows.keywords {
        EntityStore::insert_in(&mut *tx, keyword).await?;
    }
    tx.commit().await?;

    let summary = ImportSummary {
        ministries: rows.ministries.len(),
        sectors: rows.sectors.len(),
        categories: rows.categories.len(),
        sub_categories: rows.sub_categories.len(),
        concepts: rows.concepts.len(),
        procedure_steps: rows.procedure_steps.len(),
        documents: rows.documents.len(),
        keywords: rows.keywords.len(),
    };
    tracing::info!(
        "Seed: Imported {} ministries, {} concepts, {} keywords",
        summary.ministries,
        summary.concepts,
        summary.keywords
    );
    Ok(summary)
}

/// First-launch import: only runs when no ministry exists yet
pub async fn seed_if_empty(db: &Database, path: &Path) -> StoreResult<Option<ImportSummary>> {
    if db.ministries_store().count().await? > 0 {
        tracing::debug!("Seed: Catalog already populated, skipping {:?}", path);
        return Ok(None);
    }
    if !path.exists() {
        tracing::warn!("Seed: File {:?} not found, starting with an empty catalog", path);
        return Ok(None);
    }
    let json = tokio::fs::read_to_string(path).await?;
    Ok(Some(import_seed(db, &json, false).await?))
}
