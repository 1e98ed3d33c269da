//! Error types for the cache layer
//!
//! Not-found is never an error: lookups return `Option` or an empty `Vec`.

use thiserror::Error;

/// Errors surfaced by the store, the migration runner and the seed importer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Language code outside the supported set (es, fr, en)
    #[error("unsupported language code: {0:?}")]
    UnsupportedLanguage(String),

    /// A search filter value that could not be parsed
    #[error("invalid value for filter `{field}`: {value:?}")]
    InvalidFilter { field: &'static str, value: String },

    /// Column name that does not belong to the table
    #[error("unknown column `{column}` for table `{table}`")]
    UnknownColumn { table: &'static str, column: String },

    /// Text search requested on a table without a searchable column
    #[error("table `{0}` has no searchable column")]
    NotSearchable(&'static str),

    /// A migration step failed; the database must be treated as unusable
    #[error("migration to schema version {version} failed: {source}")]
    Migration {
        version: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("invalid seed data: {0}")]
    Seed(#[from] serde_json::Error),

    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
