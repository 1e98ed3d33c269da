//! Multilingual text value
//!
//! A string that may carry 0..N language variants. Resolution always falls
//! back deterministically: requested language, then the default language,
//! then the first non-empty variant in `Language::ALL` order.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::lang::Language;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MultilingualText {
    entries: BTreeMap<Language, String>,
}

impl MultilingualText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single default-language value (legacy single-column rows)
    pub fn legacy(value: impl Into<String>) -> Self {
        Self::new().with_translation(Language::DEFAULT, value)
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Language, S)>,
        S: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(l, v)| (l, v.into())).collect(),
        }
    }

    pub fn get(&self, lang: Language) -> Option<&str> {
        self.entries.get(&lang).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no variant has non-empty content
    pub fn is_blank(&self) -> bool {
        self.entries.values().all(|v| v.is_empty())
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &str)> {
        self.entries.iter().map(|(l, v)| (*l, v.as_str()))
    }

    /// Resolve for display in `lang`
    pub fn resolve(&self, lang: Language) -> &str {
        let non_empty = |l: Language| self.get(l).filter(|v| !v.is_empty());

        non_empty(lang)
            .or_else(|| non_empty(Language::DEFAULT))
            .or_else(|| Language::ALL.iter().find_map(|l| non_empty(*l)))
            .unwrap_or("")
    }

    /// Resolve by language code; unsupported codes are rejected
    pub fn resolve_code(&self, code: &str) -> Result<&str, StoreError> {
        Ok(self.resolve(Language::parse(code)?))
    }

    pub fn with_translation(&self, lang: Language, value: impl Into<String>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(lang, value.into());
        Self { entries }
    }

    /// Drop one variant. Removing the last one leaves an empty default-language
    /// entry so the value stays resolvable.
    pub fn without_translation(&self, lang: Language) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(&lang);
        if entries.is_empty() {
            entries.insert(Language::DEFAULT, String::new());
        }
        Self { entries }
    }
}

impl MultilingualText {
    /// Split newline-delimited content into one value per line, aligned by
    /// position across languages. Blank lines are dropped; a language with
    /// fewer lines is simply absent from the trailing values.
    pub fn lines(&self) -> Vec<MultilingualText> {
        let mut out: Vec<MultilingualText> = Vec::new();
        for (lang, value) in &self.entries {
            let lines = value.lines().map(str::trim).filter(|l| !l.is_empty());
            for (i, line) in lines.enumerate() {
                if out.len() <= i {
                    out.push(MultilingualText::new());
                }
                out[i].entries.insert(*lang, line.to_string());
            }
        }
        out
    }
}

impl From<&str> for MultilingualText {
    fn from(value: &str) -> Self {
        MultilingualText::legacy(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Legacy(String),
    Localized(BTreeMap<String, Option<String>>),
}

impl<'de> Deserialize<'de> for MultilingualText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawText::deserialize(deserializer)? {
            RawText::Legacy(value) => Ok(MultilingualText::legacy(value)),
            RawText::Localized(map) => {
                let mut entries = BTreeMap::new();
                for (code, value) in map {
                    let lang = Language::parse(&code).map_err(serde::de::Error::custom)?;
                    if let Some(value) = value {
                        entries.insert(lang, value);
                    }
                }
                Ok(MultilingualText { entries })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requested_language() {
        let text = MultilingualText::from_pairs([
            (Language::Es, "Pasaporte"),
            (Language::Fr, "Passeport"),
        ]);
        assert_eq!(text.resolve(Language::Fr), "Passeport");
        assert_eq!(text.resolve(Language::Es), "Pasaporte");
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let text = MultilingualText::legacy("MINISTÈRE TEST");
        assert_eq!(text.resolve(Language::En), "MINISTÈRE TEST");
        assert_eq!(text.resolve_code("en").unwrap(), "MINISTÈRE TEST");
    }

    #[test]
    fn test_resolve_fixed_priority_fallback() {
        // neither requested nor default present: fr wins over en
        let text = MultilingualText::from_pairs([
            (Language::En, "Visa"),
            (Language::Fr, "Visa FR"),
        ]);
        assert_eq!(text.resolve(Language::Es), "Visa FR");

        let text = MultilingualText::from_pairs([
            (Language::Es, ""),
            (Language::Fr, ""),
            (Language::En, "Licence"),
        ]);
        assert_eq!(text.resolve(Language::Fr), "Licence");
    }

    #[test]
    fn test_resolve_non_empty_for_every_language() {
        let samples = [
            MultilingualText::from_pairs([(Language::Es, "a")]),
            MultilingualText::from_pairs([(Language::Fr, "b")]),
            MultilingualText::from_pairs([(Language::En, "c"), (Language::Es, "")]),
        ];
        for text in &samples {
            for lang in Language::ALL {
                assert!(!text.resolve(lang).is_empty());
            }
        }
        assert_eq!(MultilingualText::new().resolve(Language::Es), "");
    }

    #[test]
    fn test_resolve_code_rejects_unknown() {
        let text = MultilingualText::legacy("x");
        assert!(text.resolve_code("it").is_err());
    }

    #[test]
    fn test_with_and_without_translation_are_pure() {
        let base = MultilingualText::legacy("Tasa");
        let added = base.with_translation(Language::En, "Fee");
        assert_eq!(base.get(Language::En), None);
        assert_eq!(added.get(Language::En), Some("Fee"));

        let removed = added.without_translation(Language::Es);
        assert_eq!(added.get(Language::Es), Some("Tasa"));
        assert_eq!(removed.get(Language::Es), None);
        assert_eq!(removed.resolve(Language::Es), "Fee");
    }

    #[test]
    fn test_without_last_translation_reseeds_default() {
        let text = MultilingualText::from_pairs([(Language::Fr, "Taxe")]);
        let emptied = text.without_translation(Language::Fr);
        assert!(!emptied.is_empty());
        assert_eq!(emptied.get(Language::Es), Some(""));
        assert!(emptied.is_blank());
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let a = MultilingualText::new()
            .with_translation(Language::Es, "x")
            .with_translation(Language::Fr, "y");
        let b = MultilingualText::new()
            .with_translation(Language::Fr, "y")
            .with_translation(Language::Es, "x");
        assert_eq!(a, b);
    }

    #[test]
    fn test_deserialize_legacy_and_localized() {
        let legacy: MultilingualText = serde_json::from_str("\"Licencia\"").unwrap();
        assert_eq!(legacy, MultilingualText::legacy("Licencia"));

        let localized: MultilingualText =
            serde_json::from_str(r#"{"es": "Licencia", "en": "License", "fr": null}"#).unwrap();
        assert_eq!(localized.get(Language::En), Some("License"));
        assert_eq!(localized.get(Language::Fr), None);

        assert!(serde_json::from_str::<MultilingualText>(r#"{"de": "Lizenz"}"#).is_err());
    }

    #[test]
    fn test_lines_aligned_by_position() {
        let text = MultilingualText::from_pairs([
            (Language::Es, "Solicitud\n\n  Pago  \nRecogida"),
            (Language::Fr, "Demande\nPaiement"),
        ]);
        let lines = text.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].get(Language::Es), Some("Pago"));
        assert_eq!(lines[1].get(Language::Fr), Some("Paiement"));
        assert_eq!(lines[2].get(Language::Fr), None);
        assert_eq!(lines[2].resolve(Language::Fr), "Recogida");
        assert!(MultilingualText::legacy("  \n").lines().is_empty());
    }

    #[test]
    fn test_serialize_as_object() {
        let text = MultilingualText::from_pairs([(Language::Fr, "b"), (Language::Es, "a")]);
        assert_eq!(serde_json::to_string(&text).unwrap(), r#"{"es":"a","fr":"b"}"#);
    }
}
