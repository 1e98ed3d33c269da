//! Schema registry
//!
//! Static table declarations for the five-level catalog hierarchy and its
//! auxiliary tables. Every translatable column `b` fans out into the legacy
//! column `b` plus one `b_<lang>` column per supported language.

use sqlx::SqliteConnection;
use std::collections::{BTreeMap, BTreeSet};

use crate::lang::Language;

pub const MINISTRIES: &str = "ministerios";
pub const SECTORS: &str = "sectores";
pub const CATEGORIES: &str = "categorias";
pub const SUB_CATEGORIES: &str = "sub_categorias";
pub const CONCEPTS: &str = "conceptos";
pub const PROCEDURES: &str = "procedimientos";
pub const DOCUMENTS: &str = "documentos_requeridos";
pub const KEYWORDS: &str = "palabras_clave";
pub const FAVORITES: &str = "favoritos";
pub const SYNC_RECORDS: &str = "sync_records";
pub const LANGUAGE_PREFERENCES: &str = "language_preferences";

/// How the primary key is assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Stable external string key (`M-001`)
    Text,
    /// Engine-assigned integer
    AutoIncrement,
}

/// Foreign key to the parent table, always cascading on delete
#[derive(Debug, Clone, Copy)]
pub struct ParentRef {
    pub column: &'static str,
    pub table: &'static str,
}

/// Translatable column base name
#[derive(Debug, Clone, Copy)]
pub struct Translatable {
    pub base: &'static str,
    pub required: bool,
}

/// Non-translatable column with its SQL declaration
#[derive(Debug, Clone, Copy)]
pub struct PlainColumn {
    pub name: &'static str,
    pub decl: &'static str,
}

/// Table descriptor consumed by the generic entity store
#[derive(Debug)]
pub struct TableDescriptor {
    pub name: &'static str,
    pub key: &'static str,
    pub key_kind: KeyKind,
    pub parent: Option<ParentRef>,
    pub translatable: &'static [Translatable],
    pub plain: &'static [PlainColumn],
    /// Default ordering; translatable bases switch to the language column
    pub order_by: &'static [&'static str],
    /// Column matched by text search
    pub search: Option<&'static str>,
    /// Plain column holding a row's language code, for tables whose rows are
    /// single-language
    pub language: Option<&'static str>,
}

const fn tr(base: &'static str, required: bool) -> Translatable {
    Translatable { base, required }
}

const fn col(name: &'static str, decl: &'static str) -> PlainColumn {
    PlainColumn { name, decl }
}

pub static MINISTRY_TABLE: TableDescriptor = TableDescriptor {
    name: MINISTRIES,
    key: "id",
    key_kind: KeyKind::Text,
    parent: None,
    translatable: &[tr("nombre", true)],
    plain: &[],
    order_by: &["nombre"],
    search: Some("nombre"),
    language: None,
};

pub static SECTOR_TABLE: TableDescriptor = TableDescriptor {
    name: SECTORS,
    key: "id",
    key_kind: KeyKind::Text,
    parent: Some(ParentRef { column: "ministerio_id", table: MINISTRIES }),
    translatable: &[tr("nombre", true)],
    plain: &[],
    order_by: &["nombre"],
    search: Some("nombre"),
    language: None,
};

pub static CATEGORY_TABLE: TableDescriptor = TableDescriptor {
    name: CATEGORIES,
    key: "id",
    key_kind: KeyKind::Text,
    parent: Some(ParentRef { column: "sector_id", table: SECTORS }),
    translatable: &[tr("nombre", true)],
    plain: &[],
    order_by: &["nombre"],
    search: Some("nombre"),
    language: None,
};

pub static SUB_CATEGORY_TABLE: TableDescriptor = TableDescriptor {
    name: SUB_CATEGORIES,
    key: "id",
    key_kind: KeyKind::Text,
    parent: Some(ParentRef { column: "categoria_id", table: CATEGORIES }),
    translatable: &[tr("nombre", false)],
    plain: &[],
    order_by: &["nombre"],
    search: Some("nombre"),
    language: None,
};

pub static CONCEPT_TABLE: TableDescriptor = TableDescriptor {
    name: CONCEPTS,
    key: "id",
    key_kind: KeyKind::Text,
    parent: Some(ParentRef { column: "sub_categoria_id", table: SUB_CATEGORIES }),
    translatable: &[
        tr("nombre", true),
        tr("documentos_requeridos", false),
        tr("procedimiento", false),
    ],
    plain: &[col("tasa_expedicion", "TEXT"), col("tasa_renovacion", "TEXT")],
    order_by: &["nombre"],
    search: Some("nombre"),
    language: None,
};

pub static PROCEDURE_TABLE: TableDescriptor = TableDescriptor {
    name: PROCEDURES,
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    parent: Some(ParentRef { column: "concepto_id", table: CONCEPTS }),
    translatable: &[tr("descripcion", true)],
    plain: &[col("orden", "INTEGER")],
    order_by: &["orden", "descripcion"],
    search: Some("descripcion"),
    language: None,
};

pub static DOCUMENT_TABLE: TableDescriptor = TableDescriptor {
    name: DOCUMENTS,
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    parent: Some(ParentRef { column: "concepto_id", table: CONCEPTS }),
    translatable: &[tr("nombre", true), tr("descripcion", false)],
    plain: &[],
    order_by: &["id"],
    search: Some("nombre"),
    language: None,
};

pub static KEYWORD_TABLE: TableDescriptor = TableDescriptor {
    name: KEYWORDS,
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    parent: Some(ParentRef { column: "concepto_id", table: CONCEPTS }),
    translatable: &[],
    plain: &[
        col("palabra_clave", "TEXT NOT NULL"),
        col("idioma", "TEXT NOT NULL DEFAULT 'es'"),
    ],
    order_by: &["palabra_clave"],
    search: Some("palabra_clave"),
    language: Some("idioma"),
};

pub static FAVORITE_TABLE: TableDescriptor = TableDescriptor {
    name: FAVORITES,
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    parent: Some(ParentRef { column: "concepto_id", table: CONCEPTS }),
    translatable: &[],
    plain: &[col("fecha_agregado", "TEXT NOT NULL")],
    order_by: &["fecha_agregado"],
    search: None,
    language: None,
};

pub static SYNC_RECORD_TABLE: TableDescriptor = TableDescriptor {
    name: SYNC_RECORDS,
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    parent: None,
    translatable: &[],
    plain: &[
        col("entity_type", "TEXT NOT NULL"),
        col("entity_id", "TEXT NOT NULL"),
        col("last_modified", "INTEGER NOT NULL"),
        col(
            "sync_status",
            "TEXT NOT NULL DEFAULT 'pending' CHECK (sync_status IN ('pending', 'synced', 'conflict'))",
        ),
    ],
    order_by: &["last_modified"],
    search: None,
    language: None,
};

/// Every entity table, parents before children
pub static TABLES: [&TableDescriptor; 10] = [
    &MINISTRY_TABLE,
    &SECTOR_TABLE,
    &CATEGORY_TABLE,
    &SUB_CATEGORY_TABLE,
    &CONCEPT_TABLE,
    &PROCEDURE_TABLE,
    &DOCUMENT_TABLE,
    &KEYWORD_TABLE,
    &FAVORITE_TABLE,
    &SYNC_RECORD_TABLE,
];

/// Single-row language preference table (not managed by the entity store)
pub const CREATE_LANGUAGE_PREFERENCES: &str = r#"
    CREATE TABLE IF NOT EXISTS language_preferences (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        language_code TEXT NOT NULL DEFAULT 'es',
        updated_at TEXT NOT NULL
    )
"#;

impl TableDescriptor {
    pub fn is_translatable(&self, base: &str) -> bool {
        self.translatable.iter().any(|t| t.base == base)
    }

    /// Columns of the translatable base `t`: legacy first, then one per language
    fn fan_out(t: &Translatable) -> impl Iterator<Item = String> + '_ {
        std::iter::once(t.base.to_string())
            .chain(Language::ALL.into_iter().map(move |l| l.column(t.base)))
    }

    /// Every column name in declaration order
    pub fn columns(&self) -> Vec<String> {
        let mut cols = vec![self.key.to_string()];
        if let Some(parent) = &self.parent {
            cols.push(parent.column.to_string());
        }
        for t in self.translatable {
            cols.extend(Self::fan_out(t));
        }
        cols.extend(self.plain.iter().map(|c| c.name.to_string()));
        cols
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns().iter().any(|c| c == name)
    }

    /// Columns matched by text search: the language column when a language is
    /// given, otherwise the legacy column and every language column.
    pub fn search_columns(&self, lang: Option<Language>) -> Option<Vec<String>> {
        let base = self.search?;
        if !self.is_translatable(base) {
            return Some(vec![base.to_string()]);
        }
        Some(match lang {
            Some(lang) => vec![lang.column(base)],
            None => std::iter::once(base.to_string())
                .chain(Language::ALL.into_iter().map(|l| l.column(base)))
                .collect(),
        })
    }

    /// `ORDER BY` body for the default ordering
    pub fn order_clause(&self, lang: Option<Language>) -> String {
        self.order_by
            .iter()
            .map(|c| match lang {
                Some(lang) if self.is_translatable(c) => format!("{} NULLS LAST", lang.column(c)),
                _ => format!("{} NULLS LAST", c),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create_sql(&self) -> String {
        let mut defs = Vec::new();
        defs.push(match self.key_kind {
            KeyKind::Text => format!("{} TEXT PRIMARY KEY", self.key),
            KeyKind::AutoIncrement => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.key),
        });
        if let Some(parent) = &self.parent {
            defs.push(format!(
                "{} TEXT NOT NULL REFERENCES {}(id) ON DELETE CASCADE",
                parent.column, parent.table
            ));
        }
        for t in self.translatable {
            defs.push(if t.required {
                format!("{} TEXT NOT NULL", t.base)
            } else {
                format!("{} TEXT", t.base)
            });
            for lang in Language::ALL {
                defs.push(format!("{} TEXT", lang.column(t.base)));
            }
        }
        for c in self.plain {
            defs.push(format!("{} {}", c.name, c.decl));
        }
        format!("CREATE TABLE IF NOT EXISTS {} (\n    {}\n)", self.name, defs.join(",\n    "))
    }

    /// Index statements: parent column, one per language per translatable base
    pub fn index_sql(&self) -> Vec<String> {
        let mut stmts = Vec::new();
        if let Some(parent) = &self.parent {
            stmts.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{t}_{c} ON {t}({c})",
                t = self.name,
                c = parent.column
            ));
        }
        for t in self.translatable {
            for lang in Language::ALL {
                let column = lang.column(t.base);
                stmts.push(format!(
                    "CREATE INDEX IF NOT EXISTS idx_{t}_{c} ON {t}({c})",
                    t = self.name,
                    c = column
                ));
            }
        }
        if self.name == KEYWORDS {
            stmts.push(
                "CREATE INDEX IF NOT EXISTS idx_palabras_clave_palabra ON palabras_clave(palabra_clave)"
                    .to_string(),
            );
            stmts.push(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_palabras_clave_unique ON palabras_clave(concepto_id, palabra_clave, idioma)"
                    .to_string(),
            );
        }
        stmts
    }
}

/// Look up a descriptor by table name
pub fn descriptor(name: &str) -> Option<&'static TableDescriptor> {
    TABLES.iter().copied().find(|t| t.name == name)
}

/// Create every table and index of the current schema
pub async fn create_all(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for table in TABLES.iter() {
        sqlx::query(&table.create_sql()).execute(&mut *conn).await?;
    }
    sqlx::query(CREATE_LANGUAGE_PREFERENCES).execute(&mut *conn).await?;
    for table in TABLES.iter() {
        for stmt in table.index_sql() {
            sqlx::query(&stmt).execute(&mut *conn).await?;
        }
    }
    Ok(())
}

/// Drop every table, children first
pub async fn drop_all(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DROP TABLE IF EXISTS language_preferences")
        .execute(&mut *conn)
        .await?;
    for table in TABLES.iter().rev() {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table.name))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(table)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

pub async fn column_exists(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
    )
    .bind(table)
    .bind(column)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

/// Snapshot of the live schema: table name -> column names
pub async fn describe(
    conn: &mut SqliteConnection,
) -> Result<BTreeMap<String, BTreeSet<String>>, sqlx::Error> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut schema = BTreeMap::new();
    for table in tables {
        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
            .bind(&table)
            .fetch_all(&mut *conn)
            .await?;
        schema.insert(table, columns.into_iter().collect());
    }
    Ok(schema)
}
