//! DCAT-AP_IT profile translation.
//!
//! This module maps catalog [`Dataset`] records to and from RDF graphs that
//! follow the Italian DCAT-AP_IT ontology. The translator is stateless per
//! call: controlled vocabularies, the license taxonomy and the subtheme
//! taxonomy are read-only lookup tables, and the catalog is only consulted
//! through the [`OrganizationLookup`] and [`LocalizationStore`] contracts.
//!
//! # Parsing
//!
//! ```ignore
//! let graph = RdfGraph::parse(&input, RdfFormat::Turtle)?;
//! let dataset = profile.parse_dataset(&graph, &RdfNode::uri("http://example.org/dataset/1"));
//! println!("{}", dataset.to_json()?);
//! ```
//!
//! # Serializing
//!
//! [`ItalianProfile::serialize`] augments a graph in place, so it can run
//! after a generic DCAT-AP serializer. Serializing the same dataset twice
//! leaves the graph unchanged the second time: every property the profile
//! owns is removed before it is written again, and nested nodes get blank
//! ids derived from the dataset, not from a counter.

mod parse;
mod serialize;

use std::fmt;

use crate::catalog::{LocalizationStore, OrganizationLookup};
use crate::config::DcatapitConfig;
use crate::dataset::Dataset;
use crate::license::LicenseTaxonomy;
use crate::localization::{normalize_lang, xml_lang, LocalizedText};
use crate::rdf::{GraphIndex, RdfGraph, RdfNode};
use crate::subtheme::SubthemeTaxonomy;
use crate::vocabulary::VocabularyStore;

/// Title of the theme taxonomy declared in the catalog graph.
pub const THEME_TAXONOMY_TITLE: &str = "Il Vocabolario Data Theme";

/// Guesses a file-type code from a free-text format label.
///
/// ```
/// use dcatapit::profile::guess_format;
///
/// assert_eq!(guess_format("csv"), Some("CSV"));
/// assert_eq!(guess_format("WMS"), Some("MAP_SRVC"));
/// assert_eq!(guess_format("shapefile"), None);
/// ```
#[must_use]
pub fn guess_format(label: &str) -> Option<&'static str> {
    match label.trim().to_ascii_uppercase().as_str() {
        "WMS" => Some("MAP_SRVC"),
        "HTML" => Some("HTML_SIMPL"),
        "CSV" => Some("CSV"),
        "XLS" => Some("XLS"),
        "ODS" => Some("ODS"),
        "ZIP" => Some("OP_DATPRO"),
        _ => None,
    }
}

/// The DCAT-AP_IT translator.
pub struct ItalianProfile<'a> {
    config: &'a DcatapitConfig,
    vocabulary: &'a VocabularyStore,
    licenses: &'a LicenseTaxonomy,
    subthemes: &'a SubthemeTaxonomy,
    organizations: Option<&'a dyn OrganizationLookup>,
    localization: Option<&'a dyn LocalizationStore>,
    lang: String,
}

impl fmt::Debug for ItalianProfile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItalianProfile")
            .field("lang", &self.lang)
            .field("catalog_uri", &self.config.catalog_uri)
            .field("licenses", &self.licenses.len())
            .field("subthemes", &self.subthemes.len())
            .finish_non_exhaustive()
    }
}

impl<'a> ItalianProfile<'a> {
    /// Creates a translator over the given lookup tables.
    #[must_use]
    pub fn new(
        config: &'a DcatapitConfig,
        vocabulary: &'a VocabularyStore,
        licenses: &'a LicenseTaxonomy,
        subthemes: &'a SubthemeTaxonomy,
    ) -> Self {
        Self {
            config,
            vocabulary,
            licenses,
            subthemes,
            organizations: None,
            localization: None,
            lang: config.default_lang.clone(),
        }
    }

    /// Resolves owning organizations through `organizations`.
    #[must_use]
    pub fn with_organizations(mut self, organizations: &'a dyn OrganizationLookup) -> Self {
        self.organizations = Some(organizations);
        self
    }

    /// Reads stored translations from `localization`.
    #[must_use]
    pub fn with_localization(mut self, localization: &'a dyn LocalizationStore) -> Self {
        self.localization = Some(localization);
        self
    }

    /// Sets the language of the request being served. Legacy values without
    /// a language are attributed to it.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// The default catalog language.
    fn default_lang(&self) -> &str {
        &self.config.default_lang
    }

    /// URI of a dataset's node in the catalog graph.
    #[must_use]
    pub fn dataset_uri(&self, dataset: &Dataset) -> RdfNode {
        let key = dataset
            .name
            .as_deref()
            .or(dataset.id.as_deref())
            .unwrap_or_default();
        RdfNode::uri(format!("{}/dataset/{key}", self.config.catalog_base()))
    }

    /// URI of the catalog node.
    #[must_use]
    pub fn catalog_uri(&self) -> RdfNode {
        RdfNode::uri(format!("{}/", self.config.catalog_base()))
    }
}

/// Splits the literals of `(subject, predicate)` into the primary value and
/// the values in other languages.
///
/// A literal in `default_lang` is the primary value, an untagged one is the
/// fallback, and when neither exists the first literal of any language is
/// used so the primary value is never empty.
pub(crate) fn collect_multilang(
    index: &GraphIndex<'_>,
    subject: &RdfNode,
    predicate: &str,
    default_lang: &str,
) -> (Option<String>, LocalizedText) {
    let mut default = None;
    let mut untagged = None;
    let mut first = None;
    let mut others = LocalizedText::new();
    for literal in index.objects(subject, predicate).filter(|o| o.is_literal()) {
        let value = literal.lexical().to_string();
        if first.is_none() {
            first = Some(value.clone());
        }
        match literal.language() {
            None => {
                untagged.get_or_insert(value);
            },
            Some(tag) => {
                let lang = normalize_lang(tag).map_or_else(|| tag.to_string(), str::to_string);
                if lang == default_lang {
                    default.get_or_insert(value);
                } else {
                    others.insert(lang, value);
                }
            },
        }
    }
    (default.or(untagged).or(first), others)
}

/// Reads every literal of `(subject, predicate)` into a language map.
/// Untagged literals are attributed to `lang` unless that language is
/// already present.
pub(crate) fn localized_map(
    index: &GraphIndex<'_>,
    subject: &RdfNode,
    predicate: &str,
    lang: &str,
) -> LocalizedText {
    let mut out = LocalizedText::new();
    let mut untagged = None;
    for literal in index.objects(subject, predicate).filter(|o| o.is_literal()) {
        match literal.language() {
            Some(tag) => {
                let key = normalize_lang(tag).map_or_else(|| tag.to_string(), str::to_string);
                out.insert(key, literal.lexical().to_string());
            },
            None => {
                untagged.get_or_insert_with(|| literal.lexical().to_string());
            },
        }
    }
    if let Some(value) = untagged {
        out.entry(lang.to_string()).or_insert(value);
    }
    out
}

/// Writes one language-tagged literal per entry of `text`.
pub(crate) fn add_localized(graph: &mut RdfGraph, subject: &RdfNode, predicate: &str, text: &LocalizedText) {
    for (lang, value) in text {
        if value.is_empty() {
            continue;
        }
        graph.add(
            subject.clone(),
            predicate,
            RdfNode::literal_with_lang(value.clone(), xml_lang(lang)),
        );
    }
}

/// Blank node id scoped to a dataset: the same dataset and role always map
/// to the same node.
pub(crate) fn scoped_blank(scope: &str, role: &str) -> RdfNode {
    let scope: String = scope
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    RdfNode::blank(format!("{scope}_{role}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::namespaces::dct;

    #[test]
    fn test_guess_format() {
        assert_eq!(guess_format(" html "), Some("HTML_SIMPL"));
        assert_eq!(guess_format("zip"), Some("OP_DATPRO"));
        assert_eq!(guess_format(""), None);
    }

    #[test]
    fn test_collect_multilang_fallbacks() {
        let subject = RdfNode::uri("http://example.org/d");
        let mut g = RdfGraph::new();
        g.add(subject.clone(), dct::TITLE, RdfNode::literal_with_lang("Title", "en"));
        g.add(subject.clone(), dct::TITLE, RdfNode::literal("Plain"));
        let index = g.index();
        let (primary, others) = collect_multilang(&index, &subject, dct::TITLE, "it");
        assert_eq!(primary.as_deref(), Some("Plain"));
        assert_eq!(others["en"], "Title");

        let mut only_en = RdfGraph::new();
        only_en.add(subject.clone(), dct::TITLE, RdfNode::literal_with_lang("Title", "en"));
        let index = only_en.index();
        let (primary, _) = collect_multilang(&index, &subject, dct::TITLE, "it");
        assert_eq!(primary.as_deref(), Some("Title"));
    }

    #[test]
    fn test_localized_map_attributes_untagged() {
        let subject = RdfNode::uri("http://example.org/a");
        let mut g = RdfGraph::new();
        g.add(subject.clone(), dct::TITLE, RdfNode::literal("Nome"));
        g.add(subject.clone(), dct::TITLE, RdfNode::literal_with_lang("Name", "en-GB"));
        let index = g.index();
        let map = localized_map(&index, &subject, dct::TITLE, "it");
        assert_eq!(map["it"], "Nome");
        assert_eq!(map["en"], "Name");
    }

    #[test]
    fn test_scoped_blank_is_stable() {
        assert_eq!(scoped_blank("my-ds.1", "creator_0"), RdfNode::blank("my_ds_1_creator_0"));
    }
}
