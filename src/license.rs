//! License taxonomy.
//!
//! Licenses form a three level tree (category, license, version) imported
//! from the Italian licences vocabulary. Besides exact lookups the taxonomy
//! offers fuzzy resolution of free-text license titles harvested from
//! external catalogs: every license derives a set of tokens from its URIs,
//! type and names, and [`LicenseTaxonomy::find_by_token`] matches normalized
//! input against them.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::error::{DcatError, Result};
use crate::localization::{normalize_lang, LocalizedText};
use crate::rdf::namespaces::{clv, clvapit, dcatapit, owl, skos};
use crate::rdf::{last_segment, RdfGraph};

/// URI of the license used when nothing else matches.
pub const DEFAULT_LICENSE: &str = "https://w3id.org/italia/controlled-vocabulary/licences/C1_Unknown";

/// Dataset-level license id used when resources disagree on their license.
pub const LICENSE_NOT_SPECIFIED: &str = "notspecified";

lazy_static! {
    static ref DIGITS: Regex = Regex::new(r"\d+").expect("valid regex");
    // https://creativecommons.org/publicdomain/zero/1.0/ or
    // http://creativecommons.org/licenses/by-nd/1.0/
    static ref DOCUMENT_PATTERNS: Vec<Regex> = [
        r"https?://creativecommons\.org/(?:licenses|publicdomain)/(?P<license>[\w\-\.]+)/",
        r"https?://opendatacommons\.org/(?:licenses|category)/(?P<license>[\w\-\.]+)/",
        r"https?://www\.dati\.gov\.it/(?P<license>[\w\-\.]+)/",
        r"https?://www\.formez\.it/(?P<license>[\w\-\.]+)/",
        r"https?://www\.gnu\.org/licenses/(?P<license>[\w\-\.]+)\.html",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect();
}

/// A node of the license taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    /// Numeric id, assigned in load order starting from 1.
    pub id: u32,
    /// License-type URI (ADMS licence type), inherited from the parent when
    /// the node has none.
    pub license_type: Option<String>,
    /// Version string, compared lexically.
    pub version: Option<String>,
    /// Canonical URI.
    pub uri: String,
    /// Code prefix of the URI's last segment, used for display ordering.
    pub path: String,
    /// Reference document (legal text) URI.
    pub document_uri: Option<String>,
    /// Display and tie-break order.
    pub rank_order: i64,
    /// Name in the catalog default language.
    pub default_name: String,
    /// Parent license id; `None` for roots.
    pub parent_id: Option<u32>,
    /// Localized names.
    pub names: LocalizedText,
}

impl License {
    /// Returns the name in `lang`, or the default name.
    #[must_use]
    pub fn get_name(&self, lang: &str) -> &str {
        self.names.get(lang).map_or(self.default_name.as_str(), String::as_str)
    }

    /// Strings under which this license can be found by
    /// [`LicenseTaxonomy::find_by_token`].
    ///
    /// For `https://w3id.org/.../licences/A21_CCBY40` typed
    /// `http://purl.org/adms/licencetype/Attribution` this yields, among
    /// others, `attribution`, `a21_ccby40`, `a21`, `ccby40` and `ccby`.
    #[must_use]
    pub fn generate_tokens(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(license_type) = &self.license_type {
            let segment = last_segment(license_type);
            out.extend([
                license_type.clone(),
                license_type.to_lowercase(),
                segment.to_string(),
                segment.to_lowercase(),
            ]);
        }

        let segment = last_segment(&self.uri).to_lowercase();
        let parts: Vec<&str> = segment.split('_').collect();
        out.extend([self.uri.clone(), self.uri.to_lowercase(), segment.clone()]);
        out.extend(parts.iter().map(|p| (*p).to_string()));
        if let Some(last) = parts.last() {
            if let Some(noversion) = DIGITS.split(last).next() {
                if !noversion.is_empty() && noversion != *last {
                    out.push(noversion.to_string());
                }
            }
        }

        if let Some(document_uri) = &self.document_uri {
            let lower = document_uri.to_lowercase();
            for pattern in DOCUMENT_PATTERNS.iter() {
                if let Some(name) = pattern.captures(&lower).and_then(|c| c.name("license")) {
                    out.push(name.as_str().to_string());
                    out.push(name.as_str().replace('-', ""));
                }
            }
            out.push(lower);
        }

        for name in std::iter::once(&self.default_name).chain(self.names.values()) {
            let lower = name.to_lowercase();
            out.push(normalize_token(&lower));
            out.push(lower);
        }

        out.retain(|t| !t.is_empty());
        out
    }
}

/// Input record for [`LicenseTaxonomy::insert`].
#[derive(Debug, Clone, Default)]
pub struct LicenseData {
    /// License-type URI.
    pub license_type: Option<String>,
    /// Version string.
    pub version: Option<String>,
    /// Canonical URI.
    pub uri: String,
    /// Reference document URI.
    pub document_uri: Option<String>,
    /// Display and tie-break order.
    pub rank_order: i64,
    /// Localized names.
    pub names: LocalizedText,
}

fn normalize_token(value: &str) -> String {
    value.replace([' ', '-'], "")
}

/// Derives lookup tokens from free-text license references, in the order
/// they should be tried.
///
/// URLs contribute their last path segment. Titles contribute their last
/// word (with a leading `cc` dropped), the part after the last hyphen, and
/// the text with spaces and hyphens stripped.
#[must_use]
pub fn generate_tokens_from_str<S: AsRef<str>>(strings: &[S]) -> Vec<String> {
    let mut out = Vec::new();
    for s in strings {
        let s = s.as_ref().trim().to_lowercase();
        if s.is_empty() {
            continue;
        }
        if s.starts_with("http") {
            out.push(last_segment(&s).to_string());
        } else {
            let word = s.rsplit(' ').next().unwrap_or(&s);
            out.push(word.to_string());
            if word.len() > 2 {
                if let Some(rest) = word.strip_prefix("cc") {
                    out.push(rest.to_string());
                }
            }
            out.push(s.rsplit('-').next().unwrap_or(&s).to_string());
        }
        if s.contains("odbl") {
            out.push("odbl".to_string());
        }
        out.push(s.replace(' ', ""));
        out.push(s.replace('-', ""));
        out.push(normalize_token(&s));
    }
    out
}

/// Arena-backed license tree with a token index.
#[derive(Debug, Clone, Default)]
pub struct LicenseTaxonomy {
    licenses: Vec<License>,
    by_uri: HashMap<String, usize>,
    tokens: HashMap<String, Vec<usize>>,
}

impl LicenseTaxonomy {
    /// Creates an empty taxonomy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of licenses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.licenses.len()
    }

    /// Returns true if no license is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty()
    }

    /// Iterates licenses in load order.
    pub fn iter(&self) -> impl Iterator<Item = &License> {
        self.licenses.iter()
    }

    /// Removes every license.
    pub fn clear(&mut self) {
        self.licenses.clear();
        self.by_uri.clear();
        self.tokens.clear();
    }

    /// Adds a root license.
    ///
    /// The default name is taken from `default_lang`, falling back to any
    /// name and then to the URI's last segment.
    ///
    /// # Errors
    ///
    /// Returns [`DcatError::UniqueViolation`] if the URI is already loaded.
    pub fn insert(&mut self, data: LicenseData, default_lang: &str) -> Result<&License> {
        if self.by_uri.contains_key(&data.uri) {
            return Err(DcatError::UniqueViolation(data.uri));
        }
        let default_name = data
            .names
            .get(default_lang)
            .or_else(|| data.names.values().next())
            .cloned()
            .unwrap_or_else(|| last_segment(&data.uri).to_string());
        let path = last_segment(&data.uri)
            .split('_')
            .next()
            .unwrap_or_default()
            .to_string();
        let idx = self.licenses.len();
        let id = u32::try_from(idx + 1).map_err(|_| DcatError::UniqueViolation(data.uri.clone()))?;
        let license = License {
            id,
            license_type: data.license_type.filter(|t| !t.is_empty()),
            version: data.version,
            uri: data.uri,
            path,
            document_uri: data.document_uri,
            rank_order: data.rank_order,
            default_name,
            parent_id: None,
            names: data.names,
        };
        for token in license.generate_tokens() {
            let slot = self.tokens.entry(token).or_default();
            if !slot.contains(&idx) {
                slot.push(idx);
            }
        }
        self.by_uri.insert(license.uri.clone(), idx);
        self.licenses.push(license);
        Ok(&self.licenses[idx])
    }

    fn lowest_rank<'a>(candidates: impl Iterator<Item = &'a License>) -> Option<&'a License> {
        candidates.min_by_key(|l| l.rank_order)
    }

    /// Looks a license up by, in order: numeric id, canonical URI, document
    /// URI, default name, license-type URI.
    ///
    /// Ambiguous matches resolve to the lowest rank order.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&License> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        if let Ok(id) = key.parse::<u32>() {
            if let Some(license) = self.get_by_id(id) {
                return Some(license);
            }
        }
        if let Some(&idx) = self.by_uri.get(key) {
            return Some(&self.licenses[idx]);
        }
        Self::lowest_rank(self.licenses.iter().filter(|l| l.document_uri.as_deref() == Some(key)))
            .or_else(|| Self::lowest_rank(self.licenses.iter().filter(|l| l.default_name == key)))
            .or_else(|| Self::lowest_rank(self.licenses.iter().filter(|l| l.license_type.as_deref() == Some(key))))
    }

    /// Looks a license up by numeric id.
    #[must_use]
    pub fn get_by_id(&self, id: u32) -> Option<&License> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.licenses.get(idx)
    }

    /// Looks a license up by its name in `lang`.
    #[must_use]
    pub fn get_by_name(&self, lang: &str, label: &str) -> Option<&License> {
        self.licenses
            .iter()
            .find(|l| l.names.get(lang).is_some_and(|n| n == label))
    }

    /// Returns the parent of a license.
    #[must_use]
    pub fn parent(&self, license: &License) -> Option<&License> {
        license.parent_id.and_then(|id| self.get_by_id(id))
    }

    /// Returns the direct children of a license in load order.
    #[must_use]
    pub fn children(&self, license: &License) -> Vec<&License> {
        self.licenses
            .iter()
            .filter(|l| l.parent_id == Some(license.id))
            .collect()
    }

    /// The fallback license, if loaded.
    #[must_use]
    pub fn default_license(&self) -> Option<&License> {
        self.get(DEFAULT_LICENSE)
    }

    /// Links the license at `uri` under the license found by `parent_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`DcatError::NotFound`] if either license is missing.
    pub fn set_parent(&mut self, uri: &str, parent_uri: &str) -> Result<()> {
        let parent_id = self
            .get(parent_uri)
            .map(|p| p.id)
            .ok_or_else(|| DcatError::NotFound(format!("parent license {parent_uri}")))?;
        let idx = *self
            .by_uri
            .get(uri)
            .ok_or_else(|| DcatError::NotFound(format!("license {uri}")))?;
        self.licenses[idx].parent_id = Some(parent_id);
        Ok(())
    }

    /// Resolves free-text license references.
    ///
    /// Tokens derived from `search_for` are tried in order; the first one
    /// known to the index wins, and among licenses sharing it the one with the
    /// highest version (lexical order) is returned with `false`. When nothing
    /// matches the default license is returned with `true`. Returns `None`
    /// only when the default license itself is not loaded.
    #[must_use]
    pub fn find_by_token<S: AsRef<str>>(&self, search_for: &[S]) -> Option<(&License, bool)> {
        for token in generate_tokens_from_str(search_for) {
            if let Some(matches) = self.tokens.get(&token) {
                let best = matches
                    .iter()
                    .map(|&idx| &self.licenses[idx])
                    .max_by(|a, b| a.version.cmp(&b.version));
                if let Some(license) = best {
                    debug!(token = %token, license = %license.uri, "license matched by token");
                    return Some((license, false));
                }
            }
        }
        self.default_license().map(|l| (l, true))
    }

    /// Resolves a license from any mix of exact keys (URIs, ids, names) and
    /// free text: exact lookups are tried first, then token matching.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, candidates: &[S]) -> Option<(&License, bool)> {
        candidates
            .iter()
            .find_map(|c| self.get(c.as_ref()))
            .map(|l| (l, false))
            .or_else(|| self.find_by_token(candidates))
    }

    /// Sets the license of every resource of a harvested dataset.
    ///
    /// The license is guessed from the dataset `license_id` and the
    /// `license`, `license_url` and `access_constraints` extras (British
    /// spellings included). Without any of them the default license is used.
    /// Returns the chosen license, or `None` when the taxonomy is empty.
    pub fn populate_resource_license(&self, dataset: &mut Dataset) -> Option<&License> {
        let extra = |keys: &[&str]| {
            dataset
                .extras
                .iter()
                .rev()
                .find(|e| keys.contains(&e.key.as_str()))
                .map(|e| e.value.clone())
                .filter(|v| !v.trim().is_empty())
        };
        let candidates: Vec<String> = [
            extra(&["access_constraints"]),
            extra(&["license", "licence"]),
            dataset.license_id.clone().filter(|v| !v.trim().is_empty()),
            extra(&["license_url", "licence_url"]),
        ]
        .into_iter()
        .flatten()
        .collect();

        let license = if candidates.is_empty() {
            self.default_license()
        } else {
            self.find_by_token(&candidates).map(|(license, _)| license)
        }?;
        debug!(dataset = %dataset.display_name(), license = %license.uri, "resource license populated");
        for resource in &mut dataset.resources {
            resource.license_type = Some(license.uri.clone());
        }
        Some(license)
    }

    /// Licenses offered for selection: rank order above 1, named in `lang`,
    /// ordered by path.
    #[must_use]
    pub fn for_select(&self, lang: &str) -> Vec<(&License, &str)> {
        let mut out: Vec<(&License, &str)> = self
            .licenses
            .iter()
            .filter(|l| l.rank_order > 1)
            .filter_map(|l| l.names.get(lang).map(|n| (l, n.as_str())))
            .collect();
        out.sort_by(|a, b| a.0.path.cmp(&b.0.path));
        out
    }

    /// Replaces the whole taxonomy with the licenses in `graph`.
    ///
    /// Every `skos:Concept` becomes a license in a first pass; a second pass
    /// links each one to its `skos:broader` parent, since parents may appear
    /// after their children. A node without `skos:exactMatch` takes the type
    /// of its immediate parent; deeper ancestors are not consulted.
    ///
    /// Returns the number of licenses loaded.
    ///
    /// # Errors
    ///
    /// Returns [`DcatError::UniqueViolation`] if the graph declares the same
    /// concept twice with conflicting data.
    pub fn clear_and_reload(&mut self, graph: &RdfGraph, default_lang: &str) -> Result<usize> {
        self.clear();
        let index = graph.index();
        let concepts = graph.subjects_of_type(skos::CONCEPT);

        for concept in &concepts {
            let Some(uri) = concept.as_uri() else {
                debug!("skipping blank license concept");
                continue;
            };
            let license_type = index
                .value(concept, skos::EXACT_MATCH)
                .or_else(|| {
                    index
                        .value(concept, skos::BROADER)
                        .and_then(|parent| index.value(parent, skos::EXACT_MATCH))
                })
                .map(|t| t.lexical().to_string());
            let rank_order = index
                .value(concept, clv::HAS_RANK_ORDER)
                .or_else(|| index.value(concept, clvapit::HAS_RANK_ORDER))
                .and_then(|r| r.lexical().trim().parse::<i64>().ok())
                .unwrap_or_else(|| {
                    debug!(license = uri, "no rank order, using 0");
                    0
                });
            let mut names = LocalizedText::new();
            for label in index.objects(concept, skos::PREF_LABEL) {
                if let Some(lang) = label.language() {
                    let lang = normalize_lang(lang).map_or_else(|| lang.to_string(), str::to_string);
                    names.insert(lang, label.lexical().to_string());
                }
            }
            let data = LicenseData {
                license_type,
                version: index.value(concept, owl::VERSION_INFO).map(|v| v.lexical().to_string()),
                uri: uri.to_string(),
                document_uri: index
                    .value(concept, dcatapit::REFERENCE_DOC)
                    .map(|d| d.lexical().to_string()),
                rank_order,
                names,
            };
            self.insert(data, default_lang)?;
        }

        for concept in &concepts {
            let (Some(uri), Some(parent)) = (concept.as_uri(), index.value(concept, skos::BROADER)) else {
                continue;
            };
            if let Err(err) = self.set_parent(uri, parent.lexical()) {
                warn!(license = uri, error = %err, "cannot link license to its parent");
            }
        }

        info!(count = self.len(), "licenses loaded");
        Ok(self.len())
    }

    /// Effective type of `license`: its own, else its parent's.
    #[must_use]
    pub fn effective_type<'a>(&'a self, license: &'a License) -> Option<&'a str> {
        license
            .license_type
            .as_deref()
            .or_else(|| self.parent(license).and_then(|p| p.license_type.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pairs: &[(&str, &str)]) -> LocalizedText {
        pairs.iter().map(|(l, n)| ((*l).to_string(), (*n).to_string())).collect()
    }

    fn sample() -> LicenseTaxonomy {
        let mut taxonomy = LicenseTaxonomy::new();
        taxonomy
            .insert(
                LicenseData {
                    license_type: Some("http://purl.org/adms/licencetype/Attribution".into()),
                    uri: "https://w3id.org/italia/controlled-vocabulary/licences/A2_Attribution".into(),
                    rank_order: 1,
                    names: names(&[("it", "Attribuzione"), ("en", "Attribution")]),
                    ..LicenseData::default()
                },
                "it",
            )
            .expect("inserted");
        taxonomy
            .insert(
                LicenseData {
                    license_type: Some("http://purl.org/adms/licencetype/Attribution".into()),
                    version: Some("4.0".into()),
                    uri: "https://w3id.org/italia/controlled-vocabulary/licences/A21_CCBY40".into(),
                    document_uri: Some("https://creativecommons.org/licenses/by/4.0/".into()),
                    rank_order: 2,
                    names: names(&[("it", "Creative Commons Attribuzione 4.0 Internazionale (CC BY 4.0)")]),
                },
                "it",
            )
            .expect("inserted");
        taxonomy
            .insert(
                LicenseData {
                    uri: DEFAULT_LICENSE.into(),
                    rank_order: 3,
                    names: names(&[("it", "Licenza sconosciuta")]),
                    ..LicenseData::default()
                },
                "it",
            )
            .expect("inserted");
        taxonomy
    }

    #[test]
    fn test_generate_tokens() {
        let taxonomy = sample();
        let tokens = taxonomy.get("2").expect("license").generate_tokens();
        for expected in ["attribution", "a21_ccby40", "a21", "ccby40", "ccby", "by"] {
            assert!(tokens.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_generate_tokens_from_str() {
        let tokens = generate_tokens_from_str(&["CC-BY 4.0", "http://example.org/odbl"]);
        assert!(tokens.contains(&"4.0".to_string()));
        assert!(tokens.contains(&"ccby4.0".to_string()));
        assert!(tokens.contains(&"odbl".to_string()));

        let cc = generate_tokens_from_str(&["cc-zero"]);
        assert_eq!(cc[0], "cc-zero");
        assert_eq!(cc[1], "-zero");
        assert!(cc.contains(&"zero".to_string()));
    }

    #[test]
    fn test_get_lookup_order() {
        let taxonomy = sample();
        assert_eq!(taxonomy.get("1").map(|l| l.path.as_str()), Some("A2"));
        assert_eq!(
            taxonomy.get("https://creativecommons.org/licenses/by/4.0/").map(|l| l.id),
            Some(2)
        );
        assert_eq!(taxonomy.get("Attribuzione").map(|l| l.id), Some(1));
        // Both licenses share the type: the lowest rank order wins.
        assert_eq!(
            taxonomy.get("http://purl.org/adms/licencetype/Attribution").map(|l| l.id),
            Some(1)
        );
        assert!(taxonomy.get("").is_none());
        assert!(taxonomy.get("99").is_none());
    }

    #[test]
    fn test_find_by_token_and_fallback() {
        let taxonomy = sample();
        let (license, fallback) = taxonomy.find_by_token(&["Creative Commons Attribuzione"]).expect("license");
        assert!(!fallback);
        assert!(license.license_type.as_deref().is_some_and(|t| t.contains("Attribution")));

        let (license, fallback) = taxonomy.find_by_token(&["no such thing"]).expect("license");
        assert!(fallback);
        assert_eq!(license.uri, DEFAULT_LICENSE);
    }

    #[test]
    fn test_find_by_token_prefers_highest_version() {
        let mut taxonomy = LicenseTaxonomy::new();
        for (uri, version) in [("http://x/L1_CCBY30", "3.0"), ("http://x/L2_CCBY40", "4.0")] {
            taxonomy
                .insert(
                    LicenseData {
                        uri: uri.into(),
                        version: Some(version.into()),
                        rank_order: 2,
                        ..LicenseData::default()
                    },
                    "it",
                )
                .expect("inserted");
        }
        let (license, fallback) = taxonomy.find_by_token(&["ccby"]).expect("license");
        assert!(!fallback);
        assert_eq!(license.version.as_deref(), Some("4.0"));
    }

    #[test]
    fn test_populate_resource_license() {
        use crate::dataset::{Extra, Resource};

        let taxonomy = sample();
        let mut ds = Dataset::named("harvested");
        ds.resources = vec![Resource::default(), Resource::default()];
        ds.extras.push(Extra::new("licence", "CC BY40"));
        let license = taxonomy.populate_resource_license(&mut ds).expect("license");
        assert_eq!(license.id, 2);
        assert!(ds
            .resources
            .iter()
            .all(|r| r.license_type.as_deref() == Some(license.uri.as_str())));

        let mut bare = Dataset::named("bare");
        bare.resources.push(Resource::default());
        taxonomy.populate_resource_license(&mut bare);
        assert_eq!(bare.resources[0].license_type.as_deref(), Some(DEFAULT_LICENSE));
    }

    #[test]
    fn test_duplicate_uri_rejected() {
        let mut taxonomy = sample();
        let err = taxonomy
            .insert(
                LicenseData {
                    uri: DEFAULT_LICENSE.into(),
                    ..LicenseData::default()
                },
                "it",
            )
            .unwrap_err();
        assert!(matches!(err, DcatError::UniqueViolation(_)));
    }

    #[test]
    fn test_set_parent_and_for_select() {
        let mut taxonomy = sample();
        assert!(taxonomy.set_parent("http://nope", DEFAULT_LICENSE).is_err());
        taxonomy
            .set_parent(
                "https://w3id.org/italia/controlled-vocabulary/licences/A21_CCBY40",
                "https://w3id.org/italia/controlled-vocabulary/licences/A2_Attribution",
            )
            .expect("linked");
        let child = taxonomy.get("2").expect("license");
        assert_eq!(taxonomy.parent(child).map(|p| p.id), Some(1));
        assert_eq!(taxonomy.children(taxonomy.get("1").expect("root")).len(), 1);

        let select = taxonomy.for_select("it");
        assert_eq!(select.len(), 2);
        assert_eq!(select[0].0.path, "A21");
        assert_eq!(child.get_name("en"), child.default_name);
    }
}
