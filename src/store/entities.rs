//! Row mapping for every catalog record

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::entity::{read_required_text, read_text, text_columns, Entity, SqlValue};
use crate::lang::Language;
use crate::models::{
    Category, Favorite, Keyword, Ministry, ProcedureStep, RequiredDocument, Sector, SubCategory,
    SyncRecord, SyncStatus, TaxConcept,
};
use crate::schema::{self, TableDescriptor};

fn decode_err(column: &str, message: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.into(),
    }
}

impl Entity for Ministry {
    type Key = String;

    fn descriptor() -> &'static TableDescriptor {
        &schema::MINISTRY_TABLE
    }

    fn key(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: read_required_text(row, "nombre")?,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        text_columns("nombre", Some(&self.name))
    }
}

impl Entity for Sector {
    type Key = String;

    fn descriptor() -> &'static TableDescriptor {
        &schema::SECTOR_TABLE
    }

    fn key(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            ministry_id: row.try_get("ministerio_id")?,
            name: read_required_text(row, "nombre")?,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        let mut values = vec![("ministerio_id".to_string(), self.ministry_id.as_str().into())];
        values.extend(text_columns("nombre", Some(&self.name)));
        values
    }
}

impl Entity for Category {
    type Key = String;

    fn descriptor() -> &'static TableDescriptor {
        &schema::CATEGORY_TABLE
    }

    fn key(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sector_id: row.try_get("sector_id")?,
            name: read_required_text(row, "nombre")?,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        let mut values = vec![("sector_id".to_string(), self.sector_id.as_str().into())];
        values.extend(text_columns("nombre", Some(&self.name)));
        values
    }
}

impl Entity for SubCategory {
    type Key = String;

    fn descriptor() -> &'static TableDescriptor {
        &schema::SUB_CATEGORY_TABLE
    }

    fn key(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            category_id: row.try_get("categoria_id")?,
            name: read_text(row, "nombre")?,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        let mut values = vec![("categoria_id".to_string(), self.category_id.as_str().into())];
        values.extend(text_columns("nombre", self.name.as_ref()));
        values
    }
}

impl Entity for TaxConcept {
    type Key = String;

    fn descriptor() -> &'static TableDescriptor {
        &schema::CONCEPT_TABLE
    }

    fn key(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sub_category_id: row.try_get("sub_categoria_id")?,
            name: read_required_text(row, "nombre")?,
            issuance_fee: row.try_get("tasa_expedicion")?,
            renewal_fee: row.try_get("tasa_renovacion")?,
            required_documents: read_text(row, "documentos_requeridos")?,
            procedure: read_text(row, "procedimiento")?,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        let mut values = vec![(
            "sub_categoria_id".to_string(),
            self.sub_category_id.as_str().into(),
        )];
        values.extend(text_columns("nombre", Some(&self.name)));
        values.extend(text_columns(
            "documentos_requeridos",
            self.required_documents.as_ref(),
        ));
        values.extend(text_columns("procedimiento", self.procedure.as_ref()));
        values.push(("tasa_expedicion".to_string(), self.issuance_fee.clone().into()));
        values.push(("tasa_renovacion".to_string(), self.renewal_fee.clone().into()));
        values
    }
}

impl Entity for ProcedureStep {
    type Key = i64;

    fn descriptor() -> &'static TableDescriptor {
        &schema::PROCEDURE_TABLE
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            concept_id: row.try_get("concepto_id")?,
            description: read_required_text(row, "descripcion")?,
            position: row.try_get("orden")?,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        let mut values = vec![("concepto_id".to_string(), self.concept_id.as_str().into())];
        values.extend(text_columns("descripcion", Some(&self.description)));
        values.push(("orden".to_string(), self.position.into()));
        values
    }
}

impl Entity for RequiredDocument {
    type Key = i64;

    fn descriptor() -> &'static TableDescriptor {
        &schema::DOCUMENT_TABLE
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            concept_id: row.try_get("concepto_id")?,
            name: read_required_text(row, "nombre")?,
            description: read_text(row, "descripcion")?,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        let mut values = vec![("concepto_id".to_string(), self.concept_id.as_str().into())];
        values.extend(text_columns("nombre", Some(&self.name)));
        values.extend(text_columns("descripcion", self.description.as_ref()));
        values
    }
}

impl Entity for Keyword {
    type Key = i64;

    fn descriptor() -> &'static TableDescriptor {
        &schema::KEYWORD_TABLE
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let code: String = row.try_get("idioma")?;
        let language =
            Language::parse(&code).map_err(|e| decode_err("idioma", e.to_string()))?;
        Ok(Self {
            id: row.try_get("id")?,
            concept_id: row.try_get("concepto_id")?,
            keyword: row.try_get("palabra_clave")?,
            language,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        vec![
            ("concepto_id".to_string(), self.concept_id.as_str().into()),
            ("palabra_clave".to_string(), self.keyword.as_str().into()),
            ("idioma".to_string(), self.language.code().into()),
        ]
    }
}

impl Entity for Favorite {
    type Key = i64;

    fn descriptor() -> &'static TableDescriptor {
        &schema::FAVORITE_TABLE
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            concept_id: row.try_get("concepto_id")?,
            date_added: row.try_get("fecha_agregado")?,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        vec![
            ("concepto_id".to_string(), self.concept_id.as_str().into()),
            ("fecha_agregado".to_string(), self.date_added.as_str().into()),
        ]
    }
}

impl Entity for SyncRecord {
    type Key = i64;

    fn descriptor() -> &'static TableDescriptor {
        &schema::SYNC_RECORD_TABLE
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("sync_status")?;
        let status = status
            .parse::<SyncStatus>()
            .map_err(|e| decode_err("sync_status", e))?;
        Ok(Self {
            id: row.try_get("id")?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            last_modified: row.try_get("last_modified")?,
            status,
        })
    }

    fn values(&self) -> Vec<(String, SqlValue)> {
        vec![
            ("entity_type".to_string(), self.entity_type.as_str().into()),
            ("entity_id".to_string(), self.entity_id.as_str().into()),
            ("last_modified".to_string(), self.last_modified.into()),
            ("sync_status".to_string(), self.status.as_str().into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_values_match_descriptor<E: Entity>(sample: &E) {
        let table = E::descriptor();
        let mut written: Vec<String> = sample.values().into_iter().map(|(c, _)| c).collect();
        written.insert(0, table.key.to_string());
        written.sort();
        let mut declared = table.columns();
        declared.sort();
        assert_eq!(written, declared, "{}", table.name);
    }

    #[test]
    fn test_values_cover_every_column() {
        use crate::text::MultilingualText;

        let name = MultilingualText::legacy("x");
        assert_values_match_descriptor(&Ministry { id: "M-001".into(), name: name.clone() });
        assert_values_match_descriptor(&Sector {
            id: "S-001".into(),
            ministry_id: "M-001".into(),
            name: name.clone(),
        });
        assert_values_match_descriptor(&Category {
            id: "C-001".into(),
            sector_id: "S-001".into(),
            name: name.clone(),
        });
        assert_values_match_descriptor(&SubCategory {
            id: "SC-001".into(),
            category_id: "C-001".into(),
            name: None,
        });
        assert_values_match_descriptor(&TaxConcept::new("T-001", "SC-001", name.clone()));
        assert_values_match_descriptor(&ProcedureStep {
            id: None,
            concept_id: "T-001".into(),
            description: name.clone(),
            position: Some(1),
        });
        assert_values_match_descriptor(&RequiredDocument {
            id: None,
            concept_id: "T-001".into(),
            name,
            description: None,
        });
        assert_values_match_descriptor(&Keyword::new("T-001", "visa", Language::Fr));
        assert_values_match_descriptor(&Favorite::now("T-001"));
        assert_values_match_descriptor(&SyncRecord::pending("favorito", "T-001"));
    }
}
