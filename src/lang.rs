//! Supported language set
//!
//! The set is closed: Spanish (default), French and English. Any other code
//! handed to a translation-scoped operation is rejected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// A supported content language
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    Es,
    Fr,
    En,
}

impl Language {
    /// Every supported language, in fallback priority order
    pub const ALL: [Language; 3] = [Language::Es, Language::Fr, Language::En];

    /// Default content language
    pub const DEFAULT: Language = Language::Es;

    /// Parse a language code, rejecting anything outside the supported set
    pub fn parse(code: &str) -> Result<Self, StoreError> {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Language::Es),
            "fr" => Ok(Language::Fr),
            "en" => Ok(Language::En),
            _ => Err(StoreError::UnsupportedLanguage(code.to_string())),
        }
    }

    /// Parse an optional code; `None` stays `None`
    pub fn parse_opt(code: Option<&str>) -> Result<Option<Self>, StoreError> {
        code.map(Self::parse).transpose()
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::Fr => "fr",
            Language::En => "en",
        }
    }

    /// Language-suffixed column name, e.g. `nombre` -> `nombre_fr`
    pub fn column(self, base: &str) -> String {
        format!("{}_{}", base, self.code())
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::DEFAULT
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::parse(s)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Language::parse(&code).map_err(serde::de::Error::custom)
    }
}
