//! Entity trait and column value plumbing shared by every table

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::fmt::Debug;

use crate::lang::Language;
use crate::schema::TableDescriptor;
use crate::text::MultilingualText;

/// A dynamically typed column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Real(Option<f64>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(Some(v))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(Some(v))
    }
}

/// Bind a value onto a query builder
pub(crate) fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: SqlValue) {
    match value {
        SqlValue::Text(v) => {
            builder.push_bind(v);
        }
        SqlValue::Integer(v) => {
            builder.push_bind(v);
        }
        SqlValue::Real(v) => {
            builder.push_bind(v);
        }
    }
}

/// Primary key type of an entity
pub trait EntityKey: Clone + Debug + Send + Sync + 'static {
    fn to_value(&self) -> SqlValue;

    fn read(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error>;
}

impl EntityKey for String {
    fn to_value(&self) -> SqlValue {
        SqlValue::Text(Some(self.clone()))
    }

    fn read(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error> {
        row.try_get(column)
    }
}

impl EntityKey for i64 {
    fn to_value(&self) -> SqlValue {
        SqlValue::Integer(Some(*self))
    }

    fn read(row: &SqliteRow, column: &str) -> Result<Self, sqlx::Error> {
        row.try_get(column)
    }
}

/// A record stored in one table described by a [`TableDescriptor`]
pub trait Entity: Sized + Send + Sync + Unpin + 'static {
    type Key: EntityKey;

    fn descriptor() -> &'static TableDescriptor;

    /// `None` for records whose key the engine has not assigned yet
    fn key(&self) -> Option<Self::Key>;

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;

    /// Every non-key column with its value
    fn values(&self) -> Vec<(String, SqlValue)>;
}

/// Fan a multilingual value out into its legacy column and language columns.
/// The legacy column carries the default-language resolution.
pub(crate) fn text_columns(
    base: &str,
    text: Option<&MultilingualText>,
) -> Vec<(String, SqlValue)> {
    let mut cols = Vec::with_capacity(1 + Language::ALL.len());
    cols.push((
        base.to_string(),
        SqlValue::Text(text.map(|t| t.resolve(Language::DEFAULT).to_string())),
    ));
    for lang in Language::ALL {
        let value = text.and_then(|t| t.get(lang)).map(str::to_string);
        cols.push((lang.column(base), SqlValue::Text(value)));
    }
    cols
}

/// Read a multilingual value back. Rows written before the language columns
/// existed only carry the legacy column, which is read as Spanish. An empty
/// legacy value with no language columns is a text without translations.
pub(crate) fn read_text(
    row: &SqliteRow,
    base: &str,
) -> Result<Option<MultilingualText>, sqlx::Error> {
    let mut pairs = Vec::new();
    for lang in Language::ALL {
        let value: Option<String> = row.try_get(lang.column(base).as_str())?;
        if let Some(value) = value {
            pairs.push((lang, value));
        }
    }
    if !pairs.is_empty() {
        return Ok(Some(MultilingualText::from_pairs(pairs)));
    }
    let legacy: Option<String> = row.try_get(base)?;
    Ok(legacy.map(|value| {
        if value.is_empty() {
            MultilingualText::new()
        } else {
            MultilingualText::legacy(value)
        }
    }))
}

pub(crate) fn read_required_text(
    row: &SqliteRow,
    base: &str,
) -> Result<MultilingualText, sqlx::Error> {
    Ok(read_text(row, base)?.unwrap_or_default())
}
