//! Theme to subtheme taxonomy.
//!
//! Subthemes are Eurovoc concepts attached to the top-level EU data themes.
//! The taxonomy is built in one import pass that walks the theme mapping
//! graph (`skos:narrowMatch` from each theme) and pulls labels and nested
//! concepts (`skos:hasTopConcept`) from a Eurovoc graph.
//!
//! Tree depth mirrors how the Eurovoc source nests its concepts. It carries
//! no meaning beyond making every node's `path` unique.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, info, warn};

use crate::error::{DcatError, Result};
use crate::localization::{normalize_lang, LocalizedText};
use crate::rdf::namespaces::{dct, owl, skos};
use crate::rdf::{last_segment, GraphIndex, RdfGraph, RdfNode};

/// A node of the subtheme tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtheme {
    /// Numeric id, assigned in import order starting from 1.
    pub id: u32,
    /// Eurovoc version info.
    pub version: String,
    /// Eurovoc identifier.
    pub identifier: String,
    /// Concept URI, unique across the taxonomy.
    pub uri: String,
    /// Label in the default language.
    pub default_label: String,
    /// Theme codes this subtheme is attached to.
    pub themes: Vec<String>,
    /// Parent id; roots point to themselves.
    pub parent_id: u32,
    /// Distance from the root.
    pub depth: u32,
    /// Ids from the root down to this node, `/`-separated.
    pub path: String,
    /// Localized labels.
    pub labels: LocalizedText,
}

impl Subtheme {
    /// Returns true if this node is a root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }

    /// Returns the label in `lang`, if present.
    #[must_use]
    pub fn get_name(&self, lang: &str) -> Option<&str> {
        self.labels.get(lang).map(String::as_str)
    }
}

/// Counters collected while importing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Nodes created.
    pub added: usize,
    /// Existing nodes attached to one more theme.
    pub reused: usize,
    /// Concepts skipped because Eurovoc has no label for them.
    pub skipped_no_labels: usize,
    /// Mappings skipped because their theme is not a known theme term.
    pub skipped_unknown_theme: usize,
    /// Inserts refused by the uniqueness check.
    pub conflicts: usize,
}

/// Per-import state threaded through [`SubthemeTaxonomy::add_subtheme`].
#[derive(Debug, Clone)]
pub struct ImportContext {
    default_lang: String,
    known_themes: Option<HashSet<String>>,
    /// Counters for this import.
    pub stats: ImportStats,
}

impl ImportContext {
    /// Creates a context that accepts any theme code.
    #[must_use]
    pub fn new(default_lang: impl Into<String>) -> Self {
        Self {
            default_lang: default_lang.into(),
            known_themes: None,
            stats: ImportStats::default(),
        }
    }

    /// Restricts the import to the given theme codes.
    #[must_use]
    pub fn with_known_themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_themes = Some(themes.into_iter().map(Into::into).collect());
        self
    }

    fn accepts(&self, theme: &str) -> bool {
        self.known_themes.as_ref().map_or(true, |t| t.contains(theme))
    }
}

/// Theme code of a theme URI.
#[must_use]
pub fn normalize_theme(theme_uri: &str) -> &str {
    last_segment(theme_uri)
}

/// Arena-backed subtheme tree.
#[derive(Debug, Clone, Default)]
pub struct SubthemeTaxonomy {
    nodes: Vec<Subtheme>,
    by_uri: HashMap<String, usize>,
}

impl SubthemeTaxonomy {
    /// Creates an empty taxonomy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subthemes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the taxonomy is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates subthemes in import order.
    pub fn iter(&self) -> impl Iterator<Item = &Subtheme> {
        self.nodes.iter()
    }

    /// Removes every subtheme.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.by_uri.clear();
    }

    /// Looks a subtheme up by URI.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&Subtheme> {
        self.by_uri.get(uri).map(|&idx| &self.nodes[idx])
    }

    /// Looks a subtheme up by id.
    #[must_use]
    pub fn get_by_id(&self, id: u32) -> Option<&Subtheme> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.nodes.get(idx)
    }

    /// Looks a subtheme up by URI, identifier or default label.
    #[must_use]
    pub fn get_any(&self, value: &str) -> Option<&Subtheme> {
        self.get(value).or_else(|| {
            self.nodes
                .iter()
                .find(|s| s.identifier == value || s.default_label == value)
        })
    }

    /// Returns the parent of a subtheme; roots have none.
    #[must_use]
    pub fn parent(&self, subtheme: &Subtheme) -> Option<&Subtheme> {
        if subtheme.is_root() {
            None
        } else {
            self.get_by_id(subtheme.parent_id)
        }
    }

    /// Subthemes attached to `theme`, ordered by parent and path.
    #[must_use]
    pub fn for_theme(&self, theme: &str) -> Vec<&Subtheme> {
        let mut out: Vec<&Subtheme> = self
            .nodes
            .iter()
            .filter(|s| s.themes.iter().any(|t| t == theme))
            .collect();
        out.sort_by(|a, b| (a.parent_id, &a.path).cmp(&(b.parent_id, &b.path)));
        out
    }

    /// URIs of the subthemes attached to `theme`.
    #[must_use]
    pub fn for_theme_values(&self, theme: &str) -> Vec<String> {
        self.for_theme(theme).into_iter().map(|s| s.uri.clone()).collect()
    }

    /// Subthemes attached to `theme` that have a label in `lang`, with it.
    #[must_use]
    pub fn for_theme_labels(&self, theme: &str, lang: &str) -> Vec<(&Subtheme, &str)> {
        self.for_theme(theme)
            .into_iter()
            .filter_map(|s| s.get_name(lang).map(|l| (s, l)))
            .collect()
    }

    /// Theme codes that have at least one subtheme, sorted.
    #[must_use]
    pub fn theme_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .nodes
            .iter()
            .flat_map(|s| s.themes.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }

    /// The node at `uri` and all of its descendants.
    #[must_use]
    pub fn subtree(&self, uri: &str) -> Vec<&Subtheme> {
        let Some(root) = self.get(uri) else {
            return Vec::new();
        };
        let prefix = format!("{}/", root.path);
        self.nodes
            .iter()
            .filter(|s| s.path == root.path || s.path.starts_with(&prefix))
            .collect()
    }

    /// Labels of the subthemes matching `values` by URI or default label.
    #[must_use]
    pub fn get_localized<S: AsRef<str>>(&self, values: &[S]) -> Vec<(String, String)> {
        self.nodes
            .iter()
            .filter(|s| values.iter().any(|v| v.as_ref() == s.uri || v.as_ref() == s.default_label))
            .flat_map(|s| s.labels.iter().map(|(l, t)| (l.clone(), t.clone())))
            .collect()
    }

    /// Keeps the subthemes in `subthemes` that are attached to `theme`, in
    /// input order without duplicates.
    #[must_use]
    pub fn restrict<S: AsRef<str>>(&self, theme: &str, subthemes: &[S]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for uri in subthemes {
            let uri = uri.as_ref();
            let allowed = self
                .get(uri)
                .is_some_and(|s| s.themes.iter().any(|t| t == theme));
            if allowed && !out.iter().any(|u| u == uri) {
                out.push(uri.to_string());
            }
        }
        out
    }

    fn insert(&mut self, mut node: Subtheme) -> Result<u32> {
        if self.by_uri.contains_key(&node.uri) {
            return Err(DcatError::UniqueViolation(node.uri));
        }
        let idx = self.nodes.len();
        node.id = u32::try_from(idx + 1).map_err(|_| DcatError::UniqueViolation(node.uri.clone()))?;
        self.by_uri.insert(node.uri.clone(), idx);
        self.nodes.push(node);
        Ok(self.nodes[idx].id)
    }

    /// Adds `subtheme_uri` under `theme_uri`, then its Eurovoc
    /// `skos:hasTopConcept` children below it.
    ///
    /// An existing node is reused and gets the theme appended. Returns the
    /// node id, or `None` when Eurovoc has no label for the concept, in which
    /// case neither it nor its children are created.
    ///
    /// # Errors
    ///
    /// Returns [`DcatError::UniqueViolation`] if the node could not be
    /// inserted, and [`DcatError::NotFound`] if `parent` is not a known id.
    pub fn add_subtheme(
        &mut self,
        eurovoc: &GraphIndex<'_>,
        theme_uri: &str,
        subtheme_uri: &str,
        parent: Option<u32>,
        ctx: &mut ImportContext,
    ) -> Result<Option<u32>> {
        let theme = normalize_theme(theme_uri).to_string();

        if let Some(&idx) = self.by_uri.get(subtheme_uri) {
            let existing = &mut self.nodes[idx];
            if !existing.themes.contains(&theme) {
                existing.themes.push(theme.clone());
            }
            ctx.stats.reused += 1;
            debug!(theme = %theme, subtheme = subtheme_uri, "subtheme already present, reusing");
            return Ok(Some(existing.id));
        }

        let subject = RdfNode::uri(subtheme_uri);
        let mut labels = LocalizedText::new();
        for label in eurovoc.objects(&subject, skos::PREF_LABEL) {
            if let Some(lang) = label.language() {
                let lang = normalize_lang(lang).map_or_else(|| lang.to_string(), str::to_string);
                labels.insert(lang, label.lexical().to_string());
            }
        }
        let Some(default_label) = labels
            .get(&ctx.default_lang)
            .or_else(|| labels.values().next())
            .cloned()
        else {
            error!(subtheme = subtheme_uri, "no labels found in Eurovoc for subtheme, skipping");
            ctx.stats.skipped_no_labels += 1;
            return Ok(None);
        };

        let (depth, parent_path) = match parent {
            Some(pid) => {
                let p = self
                    .get_by_id(pid)
                    .ok_or_else(|| DcatError::NotFound(format!("parent subtheme {pid}")))?;
                (p.depth + 1, Some(p.path.clone()))
            },
            None => (0, None),
        };

        let node = Subtheme {
            id: 0,
            version: eurovoc
                .value(&subject, owl::VERSION_INFO)
                .map(|v| v.lexical().to_string())
                .unwrap_or_default(),
            identifier: eurovoc
                .value(&subject, dct::IDENTIFIER)
                .map(|v| v.lexical().to_string())
                .unwrap_or_default(),
            uri: subtheme_uri.to_string(),
            default_label,
            themes: vec![theme.clone()],
            parent_id: 0,
            depth,
            path: String::new(),
            labels,
        };
        let id = self.insert(node)?;
        let idx = self.nodes.len() - 1;
        let own = id.to_string();
        let node = &mut self.nodes[idx];
        node.parent_id = parent.unwrap_or(id);
        node.path = parent_path.map_or_else(|| own.clone(), |p| format!("{p}/{own}"));
        ctx.stats.added += 1;
        debug!(
            theme = %theme,
            id,
            depth = node.depth,
            parent = node.parent_id,
            path = %node.path,
            "added subtheme"
        );

        let children: Vec<String> = eurovoc
            .objects(&subject, skos::HAS_TOP_CONCEPT)
            .filter_map(|c| c.as_uri().map(str::to_string))
            .collect();
        for child in children {
            match self.add_subtheme(eurovoc, theme_uri, &child, Some(id), ctx) {
                Ok(_) => {},
                Err(DcatError::UniqueViolation(uri)) => {
                    ctx.stats.conflicts += 1;
                    error!(child = %uri, theme = theme_uri, subtheme = subtheme_uri, "not adding subtheme child");
                },
                Err(err) => return Err(err),
            }
        }
        Ok(Some(id))
    }

    /// Replaces the taxonomy with the subthemes mapped in `themes_graph`,
    /// labelled from `eurovoc_graph`.
    ///
    /// # Errors
    ///
    /// Propagates errors other than uniqueness conflicts, which are counted.
    pub fn load(
        &mut self,
        themes_graph: &RdfGraph,
        eurovoc_graph: &RdfGraph,
        ctx: &mut ImportContext,
    ) -> Result<ImportStats> {
        self.clear();
        let eurovoc = eurovoc_graph.index();
        let themes = themes_graph.index();

        for theme in themes_graph.subjects_of_type(skos::CONCEPT) {
            let Some(theme_uri) = theme.as_uri() else {
                continue;
            };
            if !ctx.accepts(normalize_theme(theme_uri)) {
                warn!(theme = theme_uri, "no theme term for mapped theme, skipping");
                ctx.stats.skipped_unknown_theme += 1;
                continue;
            }
            let subthemes: Vec<String> = themes
                .objects(&theme, skos::NARROW_MATCH)
                .filter_map(|s| s.as_uri().map(str::to_string))
                .collect();
            for subtheme in subthemes {
                match self.add_subtheme(&eurovoc, theme_uri, &subtheme, None, ctx) {
                    Ok(_) => {},
                    Err(DcatError::UniqueViolation(uri)) => {
                        ctx.stats.conflicts += 1;
                        error!(subtheme = %uri, theme = theme_uri, "not adding subtheme");
                    },
                    Err(err) => return Err(err),
                }
            }
        }

        info!(
            added = ctx.stats.added,
            reused = ctx.stats.reused,
            skipped = ctx.stats.skipped_no_labels,
            "subthemes loaded"
        );
        Ok(ctx.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::namespaces::rdf;

    const THEME: &str = "http://publications.europa.eu/resource/authority/data-theme/AGRI";
    const EV: &str = "http://eurovoc.europa.eu/";

    fn eurovoc() -> RdfGraph {
        let mut g = RdfGraph::new();
        for (id, label) in [("100", "Agricoltura"), ("200", "Pesca"), ("300", "Acquacoltura")] {
            let node = RdfNode::uri(format!("{EV}{id}"));
            g.add(node.clone(), skos::PREF_LABEL, RdfNode::literal_with_lang(label, "it"));
            g.add(node, dct::IDENTIFIER, RdfNode::literal(id));
        }
        g.add(
            RdfNode::uri(format!("{EV}100")),
            skos::HAS_TOP_CONCEPT,
            RdfNode::uri(format!("{EV}200")),
        );
        g.add(
            RdfNode::uri(format!("{EV}200")),
            skos::HAS_TOP_CONCEPT,
            RdfNode::uri(format!("{EV}300")),
        );
        g.add(
            RdfNode::uri(format!("{EV}100")),
            skos::HAS_TOP_CONCEPT,
            RdfNode::uri(format!("{EV}999")),
        );
        g
    }

    fn themes() -> RdfGraph {
        let mut g = RdfGraph::new();
        for theme in [THEME, "http://publications.europa.eu/resource/authority/data-theme/ENVI"] {
            let node = RdfNode::uri(theme);
            g.add(node.clone(), rdf::TYPE, RdfNode::uri(skos::CONCEPT));
            g.add(node, skos::NARROW_MATCH, RdfNode::uri(format!("{EV}100")));
        }
        g
    }

    #[test]
    fn test_load_builds_paths_and_depths() {
        let mut taxonomy = SubthemeTaxonomy::new();
        let mut ctx = ImportContext::new("it");
        let stats = taxonomy.load(&themes(), &eurovoc(), &mut ctx).expect("loaded");
        assert_eq!(stats.added, 3);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.skipped_no_labels, 1);

        let root = taxonomy.get(&format!("{EV}100")).expect("root");
        assert!(root.is_root());
        assert_eq!(root.depth, 0);
        assert_eq!(root.themes, vec!["AGRI", "ENVI"]);

        let leaf = taxonomy.get(&format!("{EV}300")).expect("leaf");
        assert_eq!(leaf.depth, 2);
        let parent = taxonomy.parent(leaf).expect("parent");
        assert_eq!(leaf.path, format!("{}/{}", parent.path, leaf.id));
        assert_eq!(taxonomy.subtree(&format!("{EV}200")).len(), 2);
    }

    #[test]
    fn test_unknown_theme_skipped() {
        let mut taxonomy = SubthemeTaxonomy::new();
        let mut ctx = ImportContext::new("it").with_known_themes(["AGRI"]);
        let stats = taxonomy.load(&themes(), &eurovoc(), &mut ctx).expect("loaded");
        assert_eq!(stats.skipped_unknown_theme, 1);
        assert!(taxonomy.for_theme("ENVI").is_empty());
        assert_eq!(taxonomy.theme_names(), vec!["AGRI"]);
    }

    #[test]
    fn test_for_theme_and_restrict() {
        let mut taxonomy = SubthemeTaxonomy::new();
        let mut ctx = ImportContext::new("it");
        taxonomy.load(&themes(), &eurovoc(), &mut ctx).expect("loaded");

        let values = taxonomy.for_theme_values("AGRI");
        assert_eq!(values[0], format!("{EV}100"));
        let raw = vec![format!("{EV}300"), "http://other/1".to_string(), format!("{EV}300")];
        assert_eq!(taxonomy.restrict("AGRI", &raw), vec![format!("{EV}300")]);
        assert!(taxonomy.restrict("ECON", &raw).is_empty());
        assert_eq!(taxonomy.for_theme_labels("AGRI", "it").len(), 3);
        assert_eq!(taxonomy.get_any("200").map(|s| s.default_label.as_str()), Some("Pesca"));
    }

    #[test]
    fn test_reload_is_repeatable() {
        let mut taxonomy = SubthemeTaxonomy::new();
        taxonomy
            .load(&themes(), &eurovoc(), &mut ImportContext::new("it"))
            .expect("loaded");
        let first: Vec<_> = taxonomy.iter().map(|s| (s.uri.clone(), s.path.clone())).collect();
        taxonomy
            .load(&themes(), &eurovoc(), &mut ImportContext::new("it"))
            .expect("loaded");
        let second: Vec<_> = taxonomy.iter().map(|s| (s.uri.clone(), s.path.clone())).collect();
        assert_eq!(first, second);
    }
}
