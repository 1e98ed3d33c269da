//! Catalog records
//!
//! Parent -> child: ministry, sector, category, sub-category, tax concept.
//! Procedure steps, required documents, keywords and favorites hang off a
//! concept. Sync records stand alone.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::lang::Language;
use crate::text::MultilingualText;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ministry {
    pub id: String,
    pub name: MultilingualText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: String,
    pub ministry_id: String,
    pub name: MultilingualText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub sector_id: String,
    pub name: MultilingualText,
}

/// Sub-categories may be unnamed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategory {
    pub id: String,
    pub category_id: String,
    pub name: Option<MultilingualText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxConcept {
    pub id: String,
    pub sub_category_id: String,
    pub name: MultilingualText,
    /// Issuance fee, decimal as text
    pub issuance_fee: Option<String>,
    /// Renewal fee, decimal as text
    pub renewal_fee: Option<String>,
    /// Legacy newline-delimited document list, superseded by `RequiredDocument`
    pub required_documents: Option<MultilingualText>,
    /// Legacy newline-delimited procedure text, superseded by `ProcedureStep`
    pub procedure: Option<MultilingualText>,
}

impl TaxConcept {
    pub fn new(
        id: impl Into<String>,
        sub_category_id: impl Into<String>,
        name: MultilingualText,
    ) -> Self {
        Self {
            id: id.into(),
            sub_category_id: sub_category_id.into(),
            name,
            issuance_fee: None,
            renewal_fee: None,
            required_documents: None,
            procedure: None,
        }
    }

    pub fn with_fees(mut self, issuance: Option<&str>, renewal: Option<&str>) -> Self {
        self.issuance_fee = issuance.map(str::to_string);
        self.renewal_fee = renewal.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureStep {
    pub id: Option<i64>,
    pub concept_id: String,
    pub description: MultilingualText,
    /// Ordinal position; ties are broken by description
    pub position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredDocument {
    pub id: Option<i64>,
    pub concept_id: String,
    pub name: MultilingualText,
    pub description: Option<MultilingualText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: Option<i64>,
    pub concept_id: String,
    pub keyword: String,
    pub language: Language,
}

impl Keyword {
    /// New keyword, normalized to trimmed lowercase
    pub fn new(concept_id: impl Into<String>, keyword: &str, language: Language) -> Self {
        Self {
            id: None,
            concept_id: concept_id.into(),
            keyword: keyword.trim().to_lowercase(),
            language,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Option<i64>,
    pub concept_id: String,
    /// RFC 3339 timestamp
    pub date_added: String,
}

impl Favorite {
    pub fn now(concept_id: impl Into<String>) -> Self {
        Self {
            id: None,
            concept_id: concept_id.into(),
            date_added: Utc::now().to_rfc3339(),
        }
    }
}

/// Reconciliation state against a remote backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Conflict,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "conflict" => Ok(SyncStatus::Conflict),
            other => Err(format!("unknown sync status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub id: Option<i64>,
    pub entity_type: String,
    pub entity_id: String,
    /// Epoch milliseconds
    pub last_modified: i64,
    pub status: SyncStatus,
}

impl SyncRecord {
    pub fn pending(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            id: None,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            last_modified: Utc::now().timestamp_millis(),
            status: SyncStatus::Pending,
        }
    }
}

/// A concept with everything hanging off it
#[derive(Debug, Clone, Serialize)]
pub struct ConceptDetail {
    pub concept: TaxConcept,
    pub procedure_steps: Vec<ProcedureStep>,
    pub documents: Vec<RequiredDocument>,
    pub keywords: Vec<Keyword>,
    pub is_favorite: bool,
}
