//! Concept-scheme detection and import.
//!
//! A source graph is matched against the well-known DCAT-AP_IT concept
//! schemes and loaded into the matching store. Licenses and subthemes are
//! replaced wholesale. Every other vocabulary is upserted term by term into
//! the [`VocabularyStore`] and the catalog tag registry, then stale terms
//! are pruned.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::catalog::TagRegistry;
use crate::config::DcatapitConfig;
use crate::error::{DcatError, Result};
use crate::license::LicenseTaxonomy;
use crate::localization::{is_allowed_language_code, language_code};
use crate::rdf::namespaces::{clv, dc, l0, skos};
use crate::rdf::{last_segment, RdfGraph, RdfNode};
use crate::subtheme::{ImportContext, SubthemeTaxonomy};
use crate::vocabulary::{TermChange, VocabularyStore, MIN_CODE_LEN};

lazy_static! {
    static ref PLACES_PATTERN: Regex = Regex::new(r"^ITA_.+").expect("valid regex");
}

/// The concept schemes the loader recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConceptScheme {
    /// EU data themes.
    EuThemes,
    /// EU places, restricted to Italian ones.
    Places,
    /// EU languages, restricted to the catalog languages.
    Languages,
    /// EU update frequencies.
    Frequencies,
    /// EU file types.
    FileTypes,
    /// Italian regions.
    Regions,
    /// Italian licences.
    Licenses,
    /// Theme to Eurovoc subtheme mapping.
    Subthemes,
    /// Eurovoc thesaurus.
    Eurovoc,
}

impl ConceptScheme {
    /// Every recognized scheme.
    pub const ALL: [ConceptScheme; 9] = [
        ConceptScheme::EuThemes,
        ConceptScheme::Places,
        ConceptScheme::Languages,
        ConceptScheme::Frequencies,
        ConceptScheme::FileTypes,
        ConceptScheme::Regions,
        ConceptScheme::Licenses,
        ConceptScheme::Subthemes,
        ConceptScheme::Eurovoc,
    ];

    /// Vocabulary name used for tags and stored terms.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ConceptScheme::EuThemes => "eu_themes",
            ConceptScheme::Places => "places",
            ConceptScheme::Languages => "languages",
            ConceptScheme::Frequencies => "frequencies",
            ConceptScheme::FileTypes => "filetype",
            ConceptScheme::Regions => "regions",
            ConceptScheme::Licenses => "licenses",
            ConceptScheme::Subthemes => "subthemes",
            ConceptScheme::Eurovoc => "eurovoc",
        }
    }

    /// Canonical concept scheme URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            ConceptScheme::EuThemes => "http://publications.europa.eu/resource/authority/data-theme",
            ConceptScheme::Places => "http://publications.europa.eu/resource/authority/place",
            ConceptScheme::Languages => "http://publications.europa.eu/resource/authority/language",
            ConceptScheme::Frequencies => "http://publications.europa.eu/resource/authority/frequency",
            ConceptScheme::FileTypes => "http://publications.europa.eu/resource/authority/file-type",
            ConceptScheme::Regions => {
                "https://w3id.org/italia/controlled-vocabulary/territorial-classifications/regions"
            },
            ConceptScheme::Licenses => "https://w3id.org/italia/controlled-vocabulary/licences",
            ConceptScheme::Subthemes => "https://w3id.org/italia/controlled-vocabulary/theme-subtheme-mapping",
            ConceptScheme::Eurovoc => "http://eurovoc.europa.eu/100141",
        }
    }

    /// Finds the scheme with the given URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.uri() == uri)
    }
}

impl fmt::Display for ConceptScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConceptScheme {
    type Err = DcatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| DcatError::UnrecognizedScheme(s.to_string()))
    }
}

/// Finds the concept scheme declared in `graph`.
///
/// # Errors
///
/// Returns [`DcatError::UnrecognizedScheme`] if the graph declares no
/// `skos:ConceptScheme` or none of the declared ones is known.
pub fn detect(graph: &RdfGraph) -> Result<ConceptScheme> {
    let schemes = graph.subjects_of_type(skos::CONCEPT_SCHEME);
    if schemes.is_empty() {
        return Err(DcatError::UnrecognizedScheme("no ConceptScheme found".to_string()));
    }
    schemes
        .iter()
        .filter_map(RdfNode::as_uri)
        .find_map(ConceptScheme::from_uri)
        .ok_or_else(|| {
            let found: Vec<&str> = schemes.iter().map(RdfNode::lexical).collect();
            DcatError::UnrecognizedScheme(format!("ConceptScheme not handled: {}", found.join(", ")))
        })
}

/// Counts reported by a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Vocabulary that was loaded.
    pub vocabulary: String,
    /// Terms (or tree nodes) created.
    pub created: usize,
    /// Existing terms updated.
    pub updated: usize,
    /// Stale terms deleted from the vocabulary store.
    pub deleted: usize,
    /// Concepts skipped.
    pub skipped: usize,
    /// Labels dropped because their language is not supported.
    pub skipped_labels: usize,
    /// Catalog tags created.
    pub tag_created: usize,
    /// Stale catalog tags deleted.
    pub tag_deleted: usize,
    /// Stale catalog tags kept because datasets reference them.
    pub tag_notdeletable: usize,
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: created {}, updated {}, deleted {}, skipped {}, labels skipped {}, tags created {}, tags deleted {}, tags not deletable {}",
            self.vocabulary,
            self.created,
            self.updated,
            self.deleted,
            self.skipped,
            self.skipped_labels,
            self.tag_created,
            self.tag_deleted,
            self.tag_notdeletable,
        )
    }
}

/// Mutable stores a load writes to.
#[allow(missing_debug_implementations)]
pub struct LoadTargets<'a> {
    /// Multilingual term store.
    pub vocabulary: &'a mut VocabularyStore,
    /// License tree.
    pub licenses: &'a mut LicenseTaxonomy,
    /// Subtheme tree.
    pub subthemes: &'a mut SubthemeTaxonomy,
    /// Catalog tag registry.
    pub tags: &'a mut dyn TagRegistry,
}

struct Concept {
    code: String,
    labels: Vec<(String, String)>,
}

fn lang_labels<'a>(labels: impl Iterator<Item = &'a RdfNode>) -> Vec<(String, String)> {
    labels
        .filter_map(|l| l.language().map(|lang| (lang.to_string(), l.lexical().to_string())))
        .collect()
}

/// Imports concept schemes according to the catalog configuration.
#[derive(Debug, Clone)]
pub struct ConceptSchemeLoader<'c> {
    config: &'c DcatapitConfig,
}

impl<'c> ConceptSchemeLoader<'c> {
    /// Creates a loader.
    #[must_use]
    pub fn new(config: &'c DcatapitConfig) -> Self {
        Self { config }
    }

    /// Parses `path`, detects its scheme and loads it.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be parsed, the scheme is unknown, or a
    /// subtheme import is requested without a configured Eurovoc file.
    pub fn load_file(&self, path: impl AsRef<Path>, targets: LoadTargets<'_>) -> Result<LoadReport> {
        let graph = RdfGraph::parse_file(path)?;
        let scheme = detect(&graph)?;
        info!(vocabulary = %scheme, "detected vocabulary");
        self.load(&graph, scheme, targets)
    }

    /// Loads `graph` as `scheme`.
    ///
    /// Subthemes read their labels from the Eurovoc file in the
    /// configuration. Loading the Eurovoc thesaurus itself stores nothing: it
    /// is only a label source for the subtheme import.
    ///
    /// # Errors
    ///
    /// Returns [`DcatError::MissingConfiguration`] for a subtheme import
    /// without a Eurovoc path, and propagates parse and store errors.
    pub fn load(&self, graph: &RdfGraph, scheme: ConceptScheme, targets: LoadTargets<'_>) -> Result<LoadReport> {
        match scheme {
            ConceptScheme::Licenses => self.load_licenses(graph, targets.licenses),
            ConceptScheme::Subthemes => {
                let eurovoc_path = self.config.require_eurovoc_path()?;
                debug!(path = %eurovoc_path.display(), "reading Eurovoc");
                let eurovoc = RdfGraph::parse_file(eurovoc_path)?;
                self.load_subthemes(graph, &eurovoc, targets.subthemes, &*targets.tags)
            },
            ConceptScheme::Eurovoc => {
                info!("Eurovoc is a label source for subthemes, nothing to load");
                Ok(LoadReport {
                    vocabulary: scheme.name().to_string(),
                    ..LoadReport::default()
                })
            },
            _ => Ok(self.load_vocabulary(graph, scheme, targets.vocabulary, targets.tags)),
        }
    }

    /// Replaces the license tree.
    ///
    /// # Errors
    ///
    /// Propagates [`LicenseTaxonomy::clear_and_reload`] errors.
    pub fn load_licenses(&self, graph: &RdfGraph, licenses: &mut LicenseTaxonomy) -> Result<LoadReport> {
        let created = licenses.clear_and_reload(graph, &self.config.default_lang)?;
        Ok(LoadReport {
            vocabulary: ConceptScheme::Licenses.name().to_string(),
            created,
            ..LoadReport::default()
        })
    }

    /// Replaces the subtheme tree from a theme mapping graph and a Eurovoc
    /// graph. Only themes already registered as `eu_themes` tags are
    /// imported, unless no theme tag exists at all.
    ///
    /// # Errors
    ///
    /// Propagates [`SubthemeTaxonomy::load`] errors.
    pub fn load_subthemes<R>(
        &self,
        themes: &RdfGraph,
        eurovoc: &RdfGraph,
        subthemes: &mut SubthemeTaxonomy,
        tags: &R,
    ) -> Result<LoadReport>
    where
        R: TagRegistry + ?Sized,
    {
        let mut ctx = ImportContext::new(self.config.default_lang.clone());
        let known = tags.tags(ConceptScheme::EuThemes.name());
        if known.is_empty() {
            warn!("no eu_themes tags registered, accepting every mapped theme");
        } else {
            ctx = ctx.with_known_themes(known);
        }
        let stats = subthemes.load(themes, eurovoc, &mut ctx)?;
        Ok(LoadReport {
            vocabulary: ConceptScheme::Subthemes.name().to_string(),
            created: stats.added,
            updated: stats.reused,
            skipped: stats.skipped_no_labels + stats.skipped_unknown_theme + stats.conflicts,
            ..LoadReport::default()
        })
    }

    fn collect_concepts(graph: &RdfGraph, scheme: ConceptScheme, skipped: &mut usize) -> Vec<Concept> {
        let index = graph.index();
        if scheme == ConceptScheme::Regions {
            let concepts: Vec<Concept> = graph
                .subjects_of_type(clv::REGION)
                .iter()
                .map(|region| Concept {
                    code: last_segment(region.lexical()).to_string(),
                    labels: lang_labels(index.objects(region, l0::NAME)),
                })
                .collect();
            info!(count = concepts.len(), "loaded regions");
            return concepts;
        }

        let mut concepts = Vec::new();
        for concept in graph.subjects_of_type(skos::CONCEPT) {
            let code = index
                .value(&concept, dc::IDENTIFIER)
                .map_or_else(|| last_segment(concept.lexical()), RdfNode::lexical)
                .to_string();
            if scheme == ConceptScheme::Languages && !is_allowed_language_code(&code) {
                debug!(code = %code, "language not offered by the catalog, skipping");
                *skipped += 1;
                continue;
            }
            if scheme == ConceptScheme::Places && !PLACES_PATTERN.is_match(&code) {
                debug!(code = %code, "place outside Italy, skipping");
                *skipped += 1;
                continue;
            }
            let labels = lang_labels(index.objects(&concept, skos::PREF_LABEL));
            debug!(uri = concept.lexical(), code = %code, languages = labels.len(), "loaded concept");
            concepts.push(Concept { code, labels });
        }
        concepts
    }

    /// Upserts the concepts of `graph` into `store` and `tags`, then prunes
    /// terms and tags that are no longer in the graph.
    pub fn load_vocabulary<R>(
        &self,
        graph: &RdfGraph,
        scheme: ConceptScheme,
        store: &mut VocabularyStore,
        tags: &mut R,
    ) -> LoadReport
    where
        R: TagRegistry + ?Sized,
    {
        let vocabulary = scheme.name();
        let mut report = LoadReport {
            vocabulary: vocabulary.to_string(),
            ..LoadReport::default()
        };

        if scheme == ConceptScheme::Languages {
            for offered in &self.config.offered_languages {
                if language_code(offered).is_none() {
                    info!(locale = %offered, "catalog locale not mapped, skipped during import");
                }
            }
        }

        let concepts = Self::collect_concepts(graph, scheme, &mut report.skipped);
        let mut touched: Vec<String> = Vec::with_capacity(concepts.len());
        for concept in concepts {
            if concept.code.chars().count() < MIN_CODE_LEN {
                warn!(vocabulary, code = %concept.code, "tag too short, skipping");
                report.skipped += 1;
                continue;
            }
            if tags.ensure_tag(vocabulary, &concept.code) {
                report.tag_created += 1;
            }
            let outcome = store.upsert_term(vocabulary, &concept.code, concept.labels);
            match outcome.change {
                TermChange::Created => report.created += 1,
                TermChange::Updated => report.updated += 1,
                TermChange::Rejected => report.skipped += 1,
            }
            report.skipped_labels += outcome.skipped_labels;
            touched.push(concept.code);
        }

        let pruned = store.prune(vocabulary, &touched, &*tags);
        report.deleted = pruned.deleted.len();

        let keep: HashSet<&str> = touched.iter().map(String::as_str).collect();
        for tag in tags.tags(vocabulary) {
            if keep.contains(tag.as_str()) {
                continue;
            }
            if tags.reference_count(vocabulary, &tag) == 0 {
                tags.delete_tag(vocabulary, &tag);
                info!(vocabulary, tag = %tag, "deleted stale tag");
                report.tag_deleted += 1;
            } else {
                info!(vocabulary, tag = %tag, "stale tag still in use");
                report.tag_notdeletable += 1;
            }
        }

        info!(%report, "vocabulary loaded");
        report
    }
}
