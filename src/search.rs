//! Advanced search over the concept hierarchy
//!
//! Filters are turned into a small predicate tree, which is rendered onto a
//! `QueryBuilder` with every value bound. The tree can be inspected and tested
//! without a database.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::lang::Language;
use crate::models::TaxConcept;
use crate::store::{like_pattern, push_value, SqlValue};

/// Boolean filter tree over the joined concept query
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Every child holds; empty is true
    All(Vec<Predicate>),
    /// At least one child holds; empty is false
    Any(Vec<Predicate>),
    /// Case-insensitive substring match
    Contains { column: String, term: String },
    Equals { column: String, value: SqlValue },
    /// Column cast to a number is at most `value`
    AtMost { column: String, value: f64 },
    /// The concept has a keyword containing `keyword`, optionally in one language
    KeywordMatch {
        keyword: String,
        language: Option<Language>,
    },
}

impl Predicate {
    /// Append the SQL for this predicate, binding every value
    pub fn render(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Predicate::All(children) => Self::render_group(builder, children, " AND ", "1 = 1"),
            Predicate::Any(children) => Self::render_group(builder, children, " OR ", "1 = 0"),
            Predicate::Contains { column, term } => {
                builder.push(format!("LOWER({}) LIKE ", column));
                builder.push_bind(like_pattern(term));
                builder.push(" ESCAPE '\\'");
            }
            Predicate::Equals { column, value } => {
                builder.push(format!("{} = ", column));
                push_value(builder, value.clone());
            }
            Predicate::AtMost { column, value } => {
                builder.push(format!("CAST({} AS REAL) <= ", column));
                builder.push_bind(*value);
            }
            Predicate::KeywordMatch { keyword, language } => {
                builder.push(
                    "EXISTS (SELECT 1 FROM palabras_clave k WHERE k.concepto_id = c.id \
                     AND LOWER(k.palabra_clave) LIKE ",
                );
                builder.push_bind(like_pattern(keyword));
                builder.push(" ESCAPE '\\'");
                if let Some(lang) = language {
                    builder.push(" AND k.idioma = ");
                    builder.push_bind(lang.code());
                }
                builder.push(")");
            }
        }
    }

    fn render_group(
        builder: &mut QueryBuilder<'_, Sqlite>,
        children: &[Predicate],
        separator: &str,
        empty: &str,
    ) {
        if children.is_empty() {
            builder.push(empty);
            return;
        }
        builder.push("(");
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                builder.push(separator);
            }
            child.render(builder);
        }
        builder.push(")");
    }
}

/// Optional advanced-search filters; present filters are AND-ed together
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdvancedSearch {
    pub term: Option<String>,
    pub ministry_id: Option<String>,
    pub sector_id: Option<String>,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    /// Decimal, `.` or `,` as separator
    pub max_issuance_fee: Option<String>,
    pub max_renewal_fee: Option<String>,
    /// Language code scoping the term
    pub language: Option<String>,
}

/// Blank filter values count as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a fee filter as a decimal
pub fn parse_fee(field: &'static str, value: &str) -> StoreResult<f64> {
    let invalid = || StoreError::InvalidFilter {
        field,
        value: value.to_string(),
    };
    let normalized = value.trim().replace(',', ".");
    let fee: f64 = normalized.parse().map_err(|_| invalid())?;
    if !fee.is_finite() {
        return Err(invalid());
    }
    Ok(fee)
}

impl AdvancedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(&self) -> StoreResult<Option<Language>> {
        Language::parse_opt(present(&self.language))
    }

    /// Validate every filter and build the predicate tree
    pub fn predicate(&self) -> StoreResult<Predicate> {
        let lang = self.language()?;
        let mut all = Vec::new();

        if let Some(term) = present(&self.term) {
            all.push(term_predicate(term, lang));
        }

        let hierarchy = [
            ("m.id", &self.ministry_id),
            ("s.id", &self.sector_id),
            ("cat.id", &self.category_id),
            ("c.sub_categoria_id", &self.sub_category_id),
        ];
        for (column, value) in hierarchy {
            if let Some(value) = present(value) {
                all.push(Predicate::Equals {
                    column: column.to_string(),
                    value: value.into(),
                });
            }
        }

        let fees = [
            ("max_issuance_fee", "c.tasa_expedicion", &self.max_issuance_fee),
            ("max_renewal_fee", "c.tasa_renovacion", &self.max_renewal_fee),
        ];
        for (field, column, value) in fees {
            if let Some(value) = present(value) {
                all.push(Predicate::AtMost {
                    column: column.to_string(),
                    value: parse_fee(field, value)?,
                });
            }
        }

        Ok(Predicate::All(all))
    }
}

/// The free-text term: legacy name, the searched languages' name, procedure and
/// document columns, or a keyword
fn term_predicate(term: &str, lang: Option<Language>) -> Predicate {
    let languages: Vec<Language> = match lang {
        Some(lang) => vec![lang],
        None => Language::ALL.to_vec(),
    };

    let mut any = vec![Predicate::Contains {
        column: "c.nombre".to_string(),
        term: term.to_string(),
    }];
    for base in ["nombre", "procedimiento", "documentos_requeridos"] {
        for lang in &languages {
            any.push(Predicate::Contains {
                column: format!("c.{}", lang.column(base)),
                term: term.to_string(),
            });
        }
    }
    any.push(Predicate::KeywordMatch {
        keyword: term.to_string(),
        language: lang,
    });
    Predicate::Any(any)
}

fn concept_order(lang: Option<Language>) -> String {
    match lang {
        Some(lang) => format!("c.{} NULLS LAST, c.nombre", lang.column("nombre")),
        None => "c.nombre NULLS LAST".to_string(),
    }
}

impl Database {
    /// Concepts matching every present filter, ordered by name
    pub async fn advanced_search(&self, filters: &AdvancedSearch) -> StoreResult<Vec<TaxConcept>> {
        let predicate = filters.predicate()?;
        let lang = filters.language()?;

        let mut builder = QueryBuilder::new(
            r#"SELECT DISTINCT c.* FROM conceptos c
            JOIN sub_categorias sc ON sc.id = c.sub_categoria_id
            JOIN categorias cat ON cat.id = sc.categoria_id
            JOIN sectores s ON s.id = cat.sector_id
            JOIN ministerios m ON m.id = s.ministerio_id
            WHERE "#,
        );
        predicate.render(&mut builder);
        builder.push(format!(" ORDER BY {}", concept_order(lang)));

        let concepts = self.concepts_store().query_rows(builder).await?;
        tracing::debug!("Advanced search matched {} concepts", concepts.len());
        Ok(concepts)
    }

    /// Concepts with a keyword containing `keyword`, optionally in one language
    pub async fn search_concepts_by_keyword(
        &self,
        keyword: &str,
        lang_code: Option<&str>,
    ) -> StoreResult<Vec<TaxConcept>> {
        let lang = Language::parse_opt(lang_code)?;
        let predicate = Predicate::KeywordMatch {
            keyword: keyword.to_string(),
            language: lang,
        };

        let mut builder = QueryBuilder::new("SELECT c.* FROM conceptos c WHERE ");
        predicate.render(&mut builder);
        builder.push(format!(" ORDER BY {}", concept_order(lang)));
        self.concepts_store().query_rows(builder).await
    }
}
