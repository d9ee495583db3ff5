//! Configuration for DCAT-AP_IT translation and vocabulary import.
//!
//! This module provides the [`DcatapitConfig`] struct. The core only reads it:
//! values are supplied by the embedding catalog, either through the builder
//! methods or from a JSON document.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DcatError, Result};

/// Languages a catalog may offer, in display order.
pub const SUPPORTED_LOCALES: [&str; 5] = ["it", "de", "en", "fr", "es"];

/// Configuration shared by the translator, the loader and the migration jobs.
///
/// # Examples
///
/// ```
/// use dcatapit::DcatapitConfig;
///
/// let config = DcatapitConfig::default()
///     .with_catalog_uri("https://dati.example.it/")
///     .with_offered_languages(["it", "en"])
///     .with_publisher("Regione Esempio", "r_esempio");
///
/// assert_eq!(config.catalog_base(), "https://dati.example.it");
/// assert_eq!(config.default_lang, "it");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DcatapitConfig {
    /// Default catalog language. Unlabeled literals and the primary value of
    /// every multilingual field are in this language.
    pub default_lang: String,

    /// Languages offered by the catalog front end.
    pub offered_languages: Vec<String>,

    /// Name of the catalog publisher agent.
    pub publisher_name: String,

    /// Identifier (IPA code) of the catalog publisher agent.
    pub publisher_code: String,

    /// Release date of the catalog, `YYYY-MM-DD`.
    pub catalog_issued: String,

    /// Base URI of the catalog, used to mint landing page and organization URIs.
    pub catalog_uri: String,

    /// INI file mapping themes to catalog groups.
    pub theme_group_mapping_file: Option<PathBuf>,

    /// Eurovoc RDF dump used as label source for subtheme import.
    pub eurovoc_path: Option<PathBuf>,

    /// Create catalog groups named in the theme mapping that do not exist yet.
    pub add_new_groups: bool,

    /// Languages accepted for controlled-vocabulary labels.
    pub vocabulary_languages: Vec<String>,
}

impl Default for DcatapitConfig {
    fn default() -> Self {
        Self {
            default_lang: "it".into(),
            offered_languages: vec!["it".into()],
            publisher_name: "unknown".into(),
            publisher_code: "unknown".into(),
            catalog_issued: "1900-01-01".into(),
            catalog_uri: "http://localhost".into(),
            theme_group_mapping_file: None,
            eurovoc_path: None,
            add_new_groups: false,
            vocabulary_languages: SUPPORTED_LOCALES.iter().map(|l| (*l).to_string()).collect(),
        }
    }
}

impl DcatapitConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from a JSON document. Missing keys keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for this struct.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Sets the default catalog language.
    #[must_use]
    pub fn with_default_lang(mut self, lang: impl Into<String>) -> Self {
        self.default_lang = lang.into();
        self
    }

    /// Sets the offered languages.
    #[must_use]
    pub fn with_offered_languages<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.offered_languages = langs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the catalog publisher name and identifier.
    #[must_use]
    pub fn with_publisher(mut self, name: impl Into<String>, code: impl Into<String>) -> Self {
        self.publisher_name = name.into();
        self.publisher_code = code.into();
        self
    }

    /// Sets the catalog release date.
    #[must_use]
    pub fn with_catalog_issued(mut self, issued: impl Into<String>) -> Self {
        self.catalog_issued = issued.into();
        self
    }

    /// Sets the catalog base URI.
    #[must_use]
    pub fn with_catalog_uri(mut self, uri: impl Into<String>) -> Self {
        self.catalog_uri = uri.into();
        self
    }

    /// Sets the theme to group mapping file.
    #[must_use]
    pub fn with_theme_group_mapping_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.theme_group_mapping_file = Some(path.into());
        self
    }

    /// Sets the Eurovoc dump used for subtheme import.
    #[must_use]
    pub fn with_eurovoc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.eurovoc_path = Some(path.into());
        self
    }

    /// Enables or disables automatic creation of mapped groups.
    #[must_use]
    pub fn with_add_new_groups(mut self, enabled: bool) -> Self {
        self.add_new_groups = enabled;
        self
    }

    /// Returns the catalog URI without a trailing slash.
    #[must_use]
    pub fn catalog_base(&self) -> &str {
        self.catalog_uri.trim_end_matches('/')
    }

    /// Returns the Eurovoc path or a configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`DcatError::MissingConfiguration`] if no path is configured.
    pub fn require_eurovoc_path(&self) -> Result<&Path> {
        self.eurovoc_path
            .as_deref()
            .ok_or_else(|| DcatError::MissingConfiguration("eurovoc_path".into()))
    }

    /// Returns true if `lang` is accepted for vocabulary labels.
    #[must_use]
    pub fn accepts_vocabulary_language(&self, lang: &str) -> bool {
        self.vocabulary_languages.iter().any(|l| l == lang)
    }
}
