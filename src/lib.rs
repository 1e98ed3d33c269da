pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod lang;
pub mod migration;
pub mod models;
pub mod schema;
pub mod search;
pub mod seed;
pub mod store;
pub mod text;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use lang::Language;
pub use search::{AdvancedSearch, Predicate};
pub use text::MultilingualText;
