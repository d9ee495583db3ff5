//! Controlled vocabularies with multilingual labels.
//!
//! A [`VocabularyStore`] holds, per vocabulary (`eu_themes`, `places`,
//! `languages`, `frequencies`, `filetype`, `regions`), the terms imported
//! from the published concept schemes and their labels in the catalog's
//! supported languages. The profile translator reads it to decorate theme
//! and place references with localized SKOS concepts.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::TagRegistry;
use crate::config::SUPPORTED_LOCALES;
use crate::error::Result;
use crate::localization::{normalize_lang, LocalizedText};

/// Minimum length of a term code.
pub const MIN_CODE_LEN: usize = 2;

/// A term of a controlled vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyTerm {
    /// Vocabulary name.
    pub vocabulary: String,
    /// Term code, unique within the vocabulary.
    pub code: String,
    /// Labels by catalog language.
    pub labels: LocalizedText,
}

/// What an upsert did to the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermChange {
    /// The term did not exist and was created.
    Created,
    /// The term existed and its labels were merged.
    Updated,
    /// The code was rejected and nothing was stored.
    Rejected,
}

/// Outcome of [`VocabularyStore::upsert_term`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Effect on the term.
    pub change: TermChange,
    /// Labels dropped because their language is not supported.
    pub skipped_labels: usize,
}

/// Outcome of [`VocabularyStore::prune`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Codes removed from the store.
    pub deleted: Vec<String>,
    /// Stale codes kept because datasets still reference them.
    pub not_deletable: Vec<String>,
}

/// Multilingual store of controlled vocabulary terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyStore {
    languages: Vec<String>,
    vocabularies: IndexMap<String, IndexMap<String, LocalizedText>>,
}

impl Default for VocabularyStore {
    fn default() -> Self {
        Self::with_languages(SUPPORTED_LOCALES)
    }
}

impl VocabularyStore {
    /// Creates an empty store accepting the default supported languages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store accepting labels only in `languages`.
    #[must_use]
    pub fn with_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            vocabularies: IndexMap::new(),
        }
    }

    /// Reads a store previously written by [`VocabularyStore::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a store dump.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the store as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn accepted_lang(&self, tag: &str) -> Option<&'static str> {
        normalize_lang(tag).filter(|l| self.languages.iter().any(|a| a == l))
    }

    /// Inserts a term or merges new labels into an existing one.
    ///
    /// Label language tags are normalized to catalog locales (`en_GB` is
    /// stored as `en`). Labels in other languages, or without a language, are
    /// dropped and counted. Codes shorter than [`MIN_CODE_LEN`] are rejected.
    pub fn upsert_term<I, L, T>(&mut self, vocabulary: &str, code: &str, labels: I) -> UpsertOutcome
    where
        I: IntoIterator<Item = (L, T)>,
        L: AsRef<str>,
        T: Into<String>,
    {
        if code.chars().count() < MIN_CODE_LEN {
            info!(vocabulary, code, "tag too short, skipping");
            return UpsertOutcome {
                change: TermChange::Rejected,
                skipped_labels: 0,
            };
        }

        let mut accepted = Vec::new();
        let mut skipped_labels = 0;
        for (lang, text) in labels {
            match self.accepted_lang(lang.as_ref()) {
                Some(lang) => accepted.push((lang.to_string(), text.into())),
                None => {
                    debug!(vocabulary, code, lang = lang.as_ref(), "label language not supported");
                    skipped_labels += 1;
                },
            }
        }

        let terms = self.vocabularies.entry(vocabulary.to_string()).or_default();
        let change = if terms.contains_key(code) {
            TermChange::Updated
        } else {
            TermChange::Created
        };
        let stored = terms.entry(code.to_string()).or_default();
        for (lang, text) in accepted {
            stored.insert(lang, text);
        }
        debug!(vocabulary, code, ?change, "stored term");
        UpsertOutcome {
            change,
            skipped_labels,
        }
    }

    /// Returns the labels of a term; empty when the term is unknown.
    #[must_use]
    pub fn lookup_labels(&self, vocabulary: &str, code: &str) -> LocalizedText {
        self.vocabularies
            .get(vocabulary)
            .and_then(|terms| terms.get(code))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the label of a term in `lang`, if present.
    #[must_use]
    pub fn label(&self, vocabulary: &str, code: &str, lang: &str) -> Option<&str> {
        self.vocabularies
            .get(vocabulary)
            .and_then(|terms| terms.get(code))
            .and_then(|labels| labels.get(lang))
            .map(String::as_str)
    }

    /// Returns true if the term exists.
    #[must_use]
    pub fn contains(&self, vocabulary: &str, code: &str) -> bool {
        self.vocabularies
            .get(vocabulary)
            .is_some_and(|terms| terms.contains_key(code))
    }

    /// Codes of a vocabulary in insertion order.
    #[must_use]
    pub fn codes(&self, vocabulary: &str) -> Vec<String> {
        self.vocabularies
            .get(vocabulary)
            .map(|terms| terms.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every term of a vocabulary.
    #[must_use]
    pub fn terms(&self, vocabulary: &str) -> Vec<VocabularyTerm> {
        self.vocabularies
            .get(vocabulary)
            .map(|terms| {
                terms
                    .iter()
                    .map(|(code, labels)| VocabularyTerm {
                        vocabulary: vocabulary.to_string(),
                        code: code.clone(),
                        labels: labels.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deletes every term of `vocabulary` whose code is not in `keep_codes`,
    /// unless datasets still reference it.
    ///
    /// Referenced stale terms are kept and reported as not deletable.
    pub fn prune<R>(&mut self, vocabulary: &str, keep_codes: &[String], references: &R) -> PruneReport
    where
        R: TagRegistry + ?Sized,
    {
        let mut report = PruneReport::default();
        let Some(terms) = self.vocabularies.get_mut(vocabulary) else {
            return report;
        };
        let stale: Vec<String> = terms
            .keys()
            .filter(|code| !keep_codes.contains(code))
            .cloned()
            .collect();
        for code in stale {
            if references.reference_count(vocabulary, &code) == 0 {
                terms.shift_remove(&code);
                info!(vocabulary, code = %code, "deleted stale term");
                report.deleted.push(code);
            } else {
                info!(vocabulary, code = %code, "stale term still in use, not deleted");
                report.not_deletable.push(code);
            }
        }
        report
    }
}
