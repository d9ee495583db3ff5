//! RDF graph to dataset record.

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use super::{collect_multilang, localized_map, ItalianProfile};
use crate::dataset::{
    encode_list, parse_alternate_identifiers, AlternateIdentifier, ConformsTo, Creator, Dataset,
    IdentifierAgent, Resource, TemporalCoverage, ThemeEntry, MODELED_FIELDS,
};
use crate::error::Result;
use crate::license::LICENSE_NOT_SPECIFIED;
use crate::localization::{pick, LocalizedFields};
use crate::rdf::namespaces::{
    adms, dcat, dcatapit, dct, foaf, locn, owl, rdf, schema, skos, time, FORMAT_BASE_URI,
    FREQ_BASE_URI, GEO_BASE_URI, LANG_BASE_URI,
};
use crate::rdf::{strip_base, GraphIndex, RdfGraph, RdfNode};
use crate::subtheme::normalize_theme;
use crate::validation::{normalize_date, validate_alternate_identifier};

impl ItalianProfile<'_> {
    /// Reads the DCAT-AP_IT description of `dataset_ref` into a new record.
    #[must_use]
    pub fn parse_dataset(&self, graph: &RdfGraph, dataset_ref: &RdfNode) -> Dataset {
        self.parse(graph, dataset_ref, Dataset::default())
    }

    /// Enriches `dataset`, usually the output of a generic DCAT-AP parser,
    /// with the DCAT-AP_IT fields of `dataset_ref`.
    ///
    /// A node that is not typed `dcatapit:Dataset` leaves the record
    /// untouched.
    #[must_use]
    pub fn parse(&self, graph: &RdfGraph, dataset_ref: &RdfNode, dataset: Dataset) -> Dataset {
        if !graph.contains(dataset_ref, rdf::TYPE, &RdfNode::uri(dcatapit::DATASET)) {
            info!(dataset = %dataset_ref.lexical(), "not a DCAT-AP_IT dataset, profile skipped");
            return dataset;
        }
        let index = graph.index();
        DatasetParser::new(self, &index, dataset_ref.clone(), dataset).parse()
    }

    /// Reads every `dcatapit:Dataset` node of `graph`, in graph order.
    #[must_use]
    pub fn parse_graph(&self, graph: &RdfGraph) -> Vec<Dataset> {
        let index = graph.index();
        graph
            .subjects_of_type(dcatapit::DATASET)
            .into_iter()
            .map(|node| DatasetParser::new(self, &index, node, Dataset::default()).parse())
            .collect()
    }
}

/// Per-dataset parsing state.
struct DatasetParser<'p> {
    profile: &'p ItalianProfile<'p>,
    index: &'p GraphIndex<'p>,
    node: RdfNode,
    dataset: Dataset,
}

impl<'p> DatasetParser<'p> {
    fn new(
        profile: &'p ItalianProfile<'p>,
        index: &'p GraphIndex<'p>,
        node: RdfNode,
        dataset: Dataset,
    ) -> Self {
        Self {
            profile,
            index,
            node,
            dataset,
        }
    }

    fn parse(mut self) -> Dataset {
        self.process_text();
        self.process_dates();
        self.process_codes();
        self.process_themes();
        self.process_spatial();
        self.process_agents();
        self.process_creators();
        self.process_alternate_identifiers();
        self.process_conforms_to();
        self.process_temporal_coverage();
        self.process_resources();
        self.process_dataset_license();
        self.drop_shadowed_extras();
        self.dataset
    }

    fn default_lang(&self) -> &'p str {
        let profile = self.profile;
        profile.default_lang()
    }

    fn request_lang(&self) -> &'p str {
        let profile = self.profile;
        &profile.lang
    }

    fn label(&self) -> String {
        self.dataset.display_name().to_string()
    }

    /// First non-empty lexical value of `(subject, predicate)`.
    fn literal(&self, subject: &RdfNode, predicate: &'p str) -> Option<String> {
        self.index
            .objects(subject, predicate)
            .map(|o| o.lexical().trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn set_field(&mut self, key: &str, value: Option<String>) {
        if let (Some(value), Some(slot)) = (value, self.dataset.field_mut(key)) {
            *slot = Some(value);
        }
    }

    fn record_failure(&self, field: &str, result: Result<()>) {
        if let Err(err) = result {
            warn!(dataset = %self.label(), field, error = %err, "field not stored");
        }
    }

    /// Title and description, with their translations.
    fn process_text(&mut self) {
        let lang = self.default_lang();
        for (key, predicate) in [("title", dct::TITLE), ("notes", dct::DESCRIPTION)] {
            let (primary, others) = collect_multilang(self.index, &self.node, predicate, lang);
            self.set_field(key, primary);
            if !others.is_empty() {
                debug!(field = key, count = others.len(), "found translations");
                self.dataset.multilang.insert(key.to_string(), others);
            }
        }
    }

    /// `dct:issued` and `dct:modified`, normalized to `YYYY-MM-DD`.
    fn process_dates(&mut self) {
        for (key, predicate) in [("issued", dct::ISSUED), ("modified", dct::MODIFIED)] {
            match self.literal(&self.node, predicate) {
                Some(raw) => match normalize_date(&raw) {
                    Some(date) => self.set_field(key, Some(date)),
                    None => warn!(dataset = %self.label(), field = key, value = %raw, "unparseable date"),
                },
                None => debug!(dataset = %self.label(), field = key, "no date found"),
            }
        }
    }

    /// Identifier, frequency, languages and previous versions.
    fn process_codes(&mut self) {
        let identifier = self.literal(&self.node, dct::IDENTIFIER);
        if identifier.is_none() {
            debug!(dataset = %self.label(), "no dct:identifier found");
        }
        self.set_field("identifier", identifier);

        let frequency = self
            .index
            .value(&self.node, dct::ACCRUAL_PERIODICITY)
            .map(|f| strip_base(f.lexical(), FREQ_BASE_URI).to_string());
        self.set_field("frequency", frequency);

        let languages: Vec<&str> = self
            .index
            .objects(&self.node, dct::LANGUAGE)
            .map(|l| strip_base(l.lexical(), LANG_BASE_URI))
            .collect();
        if !languages.is_empty() {
            self.set_field("language", Some(encode_list(&languages)));
        }

        let versions: Vec<&str> = self
            .index
            .objects(&self.node, dct::IS_VERSION_OF)
            .map(RdfNode::lexical)
            .collect();
        if !versions.is_empty() {
            self.set_field("is_version_of", Some(encode_list(&versions)));
        }
    }

    /// Themes with the subthemes allowed under each.
    ///
    /// Subthemes come from `dcatapit:subTheme` (older graphs) and
    /// `dct:subject`; each theme keeps the ones the taxonomy attaches to it.
    fn process_themes(&mut self) {
        let mut themes: IndexSet<&str> = IndexSet::new();
        for theme in self.index.objects(&self.node, dcat::THEME) {
            themes.insert(normalize_theme(theme.lexical()));
        }
        let candidates: Vec<&str> = self
            .index
            .objects(&self.node, dcatapit::SUBTHEME)
            .chain(self.index.objects(&self.node, dct::SUBJECT))
            .filter(|n| n.is_uri())
            .map(RdfNode::lexical)
            .collect();

        let subthemes = self.profile.subthemes;
        let entries: Vec<ThemeEntry> = themes
            .into_iter()
            .map(|theme| ThemeEntry {
                theme: theme.to_string(),
                subthemes: subthemes.restrict(theme, &candidates),
            })
            .collect();
        if entries.is_empty() {
            debug!(dataset = %self.label(), "no themes found");
        }
        let stored = self.dataset.set_theme_entries(&entries);
        self.record_failure("themes_aggregate", stored);
        self.dataset.take_extra("theme");
    }

    /// Place codes and the GeoNames URL from the `dct:spatial` locations.
    fn process_spatial(&mut self) {
        let mut codes: IndexSet<String> = IndexSet::new();
        let mut geonames: Option<&str> = None;
        for location in self.index.objects(&self.node, dct::SPATIAL) {
            for identifier in self.index.objects(location, dcatapit::GEOGRAPHICAL_IDENTIFIER) {
                let value = identifier.lexical();
                if let Some(code) = value.strip_prefix(GEO_BASE_URI) {
                    codes.insert(code.to_string());
                } else if let Some(kept) = geonames {
                    warn!(kept, ignored = value, "GeoNames URL already set, value not imported");
                } else {
                    geonames = Some(value);
                }
            }
            for name in self.index.objects(location, locn::GEOGRAPHICAL_NAME) {
                match name {
                    RdfNode::Uri(uri) => {
                        if let Some(code) = uri.strip_prefix(GEO_BASE_URI) {
                            codes.insert(code.to_string());
                        }
                    },
                    RdfNode::BlankNode(_) => {
                        if let Some(label) = self.literal(name, skos::PREF_LABEL) {
                            codes.insert(label);
                        }
                    },
                    RdfNode::Literal { value, .. } => {
                        codes.insert(value.clone());
                    },
                }
            }
        }
        let geonames = geonames.map(str::to_string);
        if !codes.is_empty() {
            let codes: Vec<String> = codes.into_iter().collect();
            self.set_field("geographical_name", Some(encode_list(&codes)));
        }
        self.set_field("geographical_geonames_url", geonames);
    }

    /// Publisher and rights holder agents.
    fn process_agents(&mut self) {
        let lang = self.default_lang();
        for (base, predicate) in [("publisher", dct::PUBLISHER), ("holder", dct::RIGHTS_HOLDER)] {
            let Some(agent) = self.index.value(&self.node, predicate) else {
                debug!(dataset = %self.label(), agent = base, "no agent found");
                continue;
            };
            let identifier = self.literal(agent, dct::IDENTIFIER);
            let (name, others) = collect_multilang(self.index, agent, foaf::NAME, lang);
            self.set_field(&format!("{base}_identifier"), identifier);
            self.set_field(&format!("{base}_name"), name);
            if !others.is_empty() {
                self.dataset.multilang.insert(format!("{base}_name"), others);
            }
        }
    }

    /// Every `dct:creator` agent, plus the first one as the legacy pair.
    fn process_creators(&mut self) {
        let lang = self.request_lang();
        let creators: Vec<Creator> = self
            .index
            .objects(&self.node, dct::CREATOR)
            .map(|agent| Creator {
                creator_identifier: self.literal(agent, dct::IDENTIFIER),
                creator_name: localized_map(self.index, agent, foaf::NAME, lang),
            })
            .filter(|c| c.creator_identifier.is_some() || !c.creator_name.is_empty())
            .collect();
        let Some(first) = creators.first() else {
            debug!(dataset = %self.label(), "no creators found");
            return;
        };
        let identifier = first.creator_identifier.clone();
        let name = pick(&first.creator_name, self.default_lang(), lang).map(str::to_string);
        self.set_field("creator_identifier", identifier);
        self.set_field("creator_name", name);
        let stored = self.dataset.set_creators(&creators);
        self.record_failure("creator", stored);
    }

    /// `adms:identifier` nodes. Values from the graph win over a legacy
    /// value already on the record.
    fn process_alternate_identifiers(&mut self) {
        let lang = self.request_lang();
        let mut found: Vec<AlternateIdentifier> = Vec::new();
        for node in self.index.objects(&self.node, adms::IDENTIFIER) {
            let identifier = if node.is_literal() {
                Some(node.lexical().trim().to_string()).filter(|v| !v.is_empty())
            } else {
                self.literal(node, skos::NOTATION)
            };
            let Some(identifier) = identifier else {
                debug!(dataset = %self.label(), "identifier node without notation");
                continue;
            };
            let agent = self
                .index
                .value(node, dct::CREATOR)
                .map(|agent| IdentifierAgent {
                    agent_identifier: self.literal(agent, dct::IDENTIFIER),
                    agent_name: localized_map(self.index, agent, foaf::NAME, lang),
                })
                .unwrap_or_default();
            found.push(AlternateIdentifier { identifier, agent });
        }

        let legacy = self
            .dataset
            .field_or_extra("alternate_identifier")
            .map(|raw| parse_alternate_identifiers(raw, lang))
            .unwrap_or_default();
        if found.is_empty() && !legacy.is_empty() {
            match serde_json::to_string(&legacy)
                .map_err(Into::into)
                .and_then(|raw| validate_alternate_identifier(&raw))
            {
                Ok(()) => {
                    info!(dataset = %self.label(), "using stored alternate identifiers");
                    found = legacy;
                },
                Err(err) => {
                    warn!(dataset = %self.label(), error = %err, "stored alternate identifiers dropped");
                },
            }
        } else if !legacy.is_empty() {
            let from_graph: IndexSet<&str> = found.iter().map(|a| a.identifier.as_str()).collect();
            let stored: IndexSet<&str> = legacy.iter().map(|a| a.identifier.as_str()).collect();
            if from_graph != stored {
                warn!(
                    dataset = %self.label(),
                    graph = ?from_graph,
                    stored = ?stored,
                    "alternate identifiers disagree, graph values kept"
                );
            }
        }

        self.dataset.take_extra("alternate_identifier");
        if found.is_empty() {
            return;
        }
        let stored = self.dataset.set_alternate_identifiers(&found);
        self.record_failure("alternate_identifier", stored);
    }

    /// `dct:conformsTo` standards.
    fn process_conforms_to(&mut self) {
        let lang = self.request_lang();
        let mut standards = Vec::new();
        for node in self.index.objects(&self.node, dct::CONFORMS_TO) {
            let Some(identifier) = self
                .literal(node, dct::IDENTIFIER)
                .or_else(|| node.as_uri().map(str::to_string))
            else {
                warn!(dataset = %self.label(), "standard without identifier skipped");
                continue;
            };
            standards.push(ConformsTo {
                identifier,
                uri: node.as_uri().map(str::to_string),
                title: localized_map(self.index, node, dct::TITLE, lang),
                description: localized_map(self.index, node, dct::DESCRIPTION, lang),
                reference_documentation: self
                    .index
                    .objects(node, dcatapit::REFERENCE_DOCUMENTATION)
                    .map(|d| d.lexical().to_string())
                    .collect(),
            });
        }
        if standards.is_empty() {
            return;
        }
        let stored = self.dataset.set_conforms_to(&standards);
        self.record_failure("conforms_to", stored);
    }

    /// Date of a `time:Instant` linked through `predicate`.
    fn instant(&self, extent: &RdfNode, predicate: &'p str) -> Option<String> {
        let instant = self.index.value(extent, predicate)?;
        self.literal(instant, time::IN_XSD_DATE_TIME)
            .or_else(|| self.literal(instant, time::IN_XSD_DATE))
    }

    /// `dct:temporal` extents. `schema:startDate`/`endDate` are read first,
    /// then `time:hasBeginning`/`hasEnd`.
    fn process_temporal_coverage(&mut self) {
        let mut coverages = Vec::new();
        for extent in self.index.objects(&self.node, dct::TEMPORAL) {
            let (start, end) = match (
                self.literal(extent, schema::START_DATE),
                self.literal(extent, schema::END_DATE),
            ) {
                (None, None) => (
                    self.instant(extent, time::HAS_BEGINNING),
                    self.instant(extent, time::HAS_END),
                ),
                pair => pair,
            };
            let coverage = TemporalCoverage {
                temporal_start: start.as_deref().and_then(normalize_date),
                temporal_end: end.as_deref().and_then(normalize_date),
            };
            if coverage.temporal_start.is_none() && coverage.temporal_end.is_none() {
                warn!(dataset = %self.label(), "temporal extent without readable dates");
                continue;
            }
            coverages.push(coverage.collapsed());
        }
        if coverages.is_empty() {
            return;
        }
        let stored = self.dataset.set_temporal_coverages(&coverages);
        self.record_failure("temporal_coverage", stored);
    }

    /// Resolves the license of a distribution to a taxonomy URI.
    fn resolve_license(&self, distribution: &RdfNode) -> Option<String> {
        let node = self.index.value(distribution, dct::LICENSE)?;
        let mut candidates: Vec<&str> = Vec::new();
        candidates.extend(node.as_uri());
        candidates.extend(self.index.objects(node, foaf::NAME).map(RdfNode::lexical));
        candidates.extend(self.index.objects(node, dct::TYPE).map(RdfNode::lexical));

        let (license, fallback) = self.profile.licenses.resolve(&candidates)?;
        if fallback {
            info!(license = %node.lexical(), "license not recognized, default used");
        }
        if let (Some(found), Some(stored)) = (self.literal(node, owl::VERSION_INFO), &license.version) {
            if &found != stored {
                warn!(
                    license = %license.uri,
                    graph = %found,
                    stored = %stored,
                    "license version differs from the taxonomy"
                );
            }
        }
        Some(license.uri.clone())
    }

    /// Distributions: format code, license and translations.
    fn process_resources(&mut self) {
        let lang = self.default_lang();
        let distributions: Vec<&'p RdfNode> = self
            .index
            .objects(&self.node, dcat::DISTRIBUTION_PROP)
            .collect();
        for distribution in distributions {
            let Some(uri) = distribution.as_uri() else {
                debug!(dataset = %self.label(), "blank distribution skipped");
                continue;
            };
            let (name, name_others) = collect_multilang(self.index, distribution, dct::TITLE, lang);
            let (description, description_others) =
                collect_multilang(self.index, distribution, dct::DESCRIPTION, lang);
            let format = self.index.value(distribution, dct::FORMAT);
            let license = self.resolve_license(distribution);

            let position = match self
                .dataset
                .resources
                .iter()
                .position(|r| r.uri.as_deref() == Some(uri))
            {
                Some(position) => position,
                None => {
                    self.dataset.resources.push(Resource {
                        uri: Some(uri.to_string()),
                        ..Resource::default()
                    });
                    self.dataset.resources.len() - 1
                },
            };
            let resource = &mut self.dataset.resources[position];
            if name.is_some() {
                resource.name = name;
            }
            if description.is_some() {
                resource.description = description;
            }
            match format {
                Some(RdfNode::Uri(format)) if format.starts_with(FORMAT_BASE_URI) => {
                    resource.distribution_format = Some(strip_base(format, FORMAT_BASE_URI).to_string());
                },
                Some(other) if resource.format.is_none() => {
                    resource.format = Some(other.lexical().to_string());
                },
                _ => {},
            }
            if license.is_some() {
                resource.license_type = license;
            }

            let mut translations = LocalizedFields::new();
            if !name_others.is_empty() {
                translations.insert("name".into(), name_others);
            }
            if !description_others.is_empty() {
                translations.insert("description".into(), description_others);
            }
            if !translations.is_empty() {
                self.dataset.resources_multilang.insert(uri.to_string(), translations);
            }
        }
    }

    /// Dataset license: the resources' license when they agree on one.
    fn process_dataset_license(&mut self) {
        if self.dataset.resources.is_empty() {
            return;
        }
        let distinct: IndexSet<&str> = self
            .dataset
            .resources
            .iter()
            .filter_map(|r| r.license_type.as_deref())
            .collect();
        let license_id = if distinct.len() == 1 {
            distinct.first().map(|l| (*l).to_string())
        } else {
            if distinct.len() > 1 {
                warn!(dataset = %self.label(), count = distinct.len(), "multiple licenses in dataset");
            }
            Some(LICENSE_NOT_SPECIFIED.to_string())
        };
        self.dataset.license_id = license_id;
    }

    /// Drops extras whose key now has a first-class value.
    fn drop_shadowed_extras(&mut self) {
        let dataset = &mut self.dataset;
        let shadowed: Vec<String> = dataset
            .extras
            .iter()
            .filter(|e| MODELED_FIELDS.contains(&e.key.as_str()) && dataset.field(&e.key).is_some())
            .map(|e| e.key.clone())
            .collect();
        for key in shadowed {
            dataset.take_extra(&key);
        }
    }
}
