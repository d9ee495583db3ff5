//! Dataset record to RDF graph.

use serde_json::Value;
use tracing::{debug, warn};

use super::{add_localized, guess_format, scoped_blank, ItalianProfile, THEME_TAXONOMY_TITLE};
use crate::catalog::Organization;
use crate::dataset::{
    decode_list, Creator, Dataset, Resource, TemporalCoverage, ThemeEntry, DEFAULT_FORMAT_CODE,
    DEFAULT_FREQ_CODE, DEFAULT_THEME_KEY,
};
use crate::license::License;
use crate::loader::ConceptScheme;
use crate::localization::{language_code, xml_lang, LocalizedText};
use crate::rdf::namespaces::{
    adms, dcat, dcatapit, dct, foaf, locn, owl, rdf, schema, skos, vcard, xsd, FORMAT_BASE_URI,
    FREQ_BASE_URI, GEO_BASE_URI, LANG_BASE_URI, THEME_BASE_URI,
};
use crate::rdf::{RdfGraph, RdfNode};
use crate::validation::{is_url, normalize_date};

/// Dataset properties rewritten on every serialization.
const DATASET_PROPERTIES: [&str; 20] = [
    dct::TITLE,
    dct::DESCRIPTION,
    dct::IDENTIFIER,
    dct::ISSUED,
    dct::MODIFIED,
    dcat::LANDING_PAGE,
    dct::ACCRUAL_PERIODICITY,
    dct::LANGUAGE,
    dct::IS_VERSION_OF,
    dcat::THEME,
    dct::SUBJECT,
    dcatapit::SUBTHEME,
    dct::SPATIAL,
    dct::PUBLISHER,
    dct::RIGHTS_HOLDER,
    dct::CREATOR,
    adms::IDENTIFIER,
    dct::CONFORMS_TO,
    dct::TEMPORAL,
    dcat::CONTACT_POINT,
];

/// Distribution properties rewritten on every serialization.
const DISTRIBUTION_PROPERTIES: [&str; 4] = [dct::FORMAT, dct::LICENSE, dct::TITLE, dct::DESCRIPTION];

/// Catalog properties rewritten on every serialization.
const CATALOG_PROPERTIES: [&str; 5] = [
    foaf::HOMEPAGE,
    dct::PUBLISHER,
    dct::ISSUED,
    dcat::THEME_TAXONOMY,
    dct::LANGUAGE,
];

/// True for values that can be appended to a namespace to form an IRI.
fn is_code(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// IRI node for `base` + `code`, or `None` when the code cannot form one.
fn code_node(base: &str, code: &str) -> Option<RdfNode> {
    if is_code(code) {
        Some(RdfNode::uri(format!("{base}{code}")))
    } else {
        warn!(base, code, "code cannot be used in an IRI, skipped");
        None
    }
}

/// An IRI node for URLs, a plain literal for anything else.
fn url_or_literal(value: &str) -> RdfNode {
    if is_url(value) {
        RdfNode::uri(value)
    } else {
        RdfNode::literal(value)
    }
}

fn date_literal(value: &str) -> Option<RdfNode> {
    normalize_date(value).map(|d| RdfNode::typed_literal(d, xsd::DATE))
}

impl ItalianProfile<'_> {
    /// Writes the DCAT-AP_IT description of `dataset` at `dataset_ref`.
    ///
    /// The graph may already hold a generic DCAT-AP description of the
    /// dataset; the properties this profile owns are replaced, the rest is
    /// kept.
    pub fn serialize(&self, dataset: &Dataset, dataset_ref: &RdfNode, graph: &mut RdfGraph) {
        let mut dataset = dataset.clone();
        dataset.lift_extras();
        DatasetSerializer::new(self, &dataset, dataset_ref.clone(), graph).serialize();
    }

    /// Builds a graph holding only the profile's description of `dataset`,
    /// at [`ItalianProfile::dataset_uri`].
    #[must_use]
    pub fn dataset_graph(&self, dataset: &Dataset) -> RdfGraph {
        let mut graph = RdfGraph::new();
        let node = self.dataset_uri(dataset);
        self.serialize(dataset, &node, &mut graph);
        graph
    }

    /// Writes the catalog-level metadata at `catalog_ref`. Everything comes
    /// from configuration.
    pub fn serialize_catalog(&self, catalog_ref: &RdfNode, graph: &mut RdfGraph) {
        for predicate in CATALOG_PROPERTIES {
            graph.remove_property(catalog_ref, predicate);
        }
        graph.add(catalog_ref.clone(), rdf::TYPE, RdfNode::uri(dcat::CATALOG));
        graph.add(catalog_ref.clone(), rdf::TYPE, RdfNode::uri(dcatapit::CATALOG));
        graph.add(
            catalog_ref.clone(),
            foaf::HOMEPAGE,
            RdfNode::uri(format!("{}/#", self.config.catalog_base())),
        );

        let publisher = scoped_blank("catalog", "publisher");
        graph.add(catalog_ref.clone(), dct::PUBLISHER, publisher.clone());
        graph.add(publisher.clone(), rdf::TYPE, RdfNode::uri(dcatapit::AGENT));
        graph.add(publisher.clone(), rdf::TYPE, RdfNode::uri(foaf::AGENT));
        graph.add(
            publisher.clone(),
            dct::IDENTIFIER,
            RdfNode::literal(self.config.publisher_code.clone()),
        );
        graph.add(
            publisher,
            foaf::NAME,
            RdfNode::literal(self.config.publisher_name.clone()),
        );

        match date_literal(&self.config.catalog_issued) {
            Some(issued) => {
                graph.add(catalog_ref.clone(), dct::ISSUED, issued);
            },
            None => warn!(value = %self.config.catalog_issued, "catalog issued date unreadable"),
        }

        let taxonomy = RdfNode::uri(ConceptScheme::EuThemes.uri());
        graph.add(catalog_ref.clone(), dcat::THEME_TAXONOMY, taxonomy.clone());
        graph.add(taxonomy.clone(), rdf::TYPE, RdfNode::uri(skos::CONCEPT_SCHEME));
        graph.add(
            taxonomy,
            dct::TITLE,
            RdfNode::literal_with_lang(THEME_TAXONOMY_TITLE, "it"),
        );

        for lang in &self.config.offered_languages {
            match language_code(lang) {
                Some(code) => {
                    graph.add(
                        catalog_ref.clone(),
                        dct::LANGUAGE,
                        RdfNode::uri(format!("{LANG_BASE_URI}{code}")),
                    );
                },
                None => debug!(lang = %lang, "offered language has no authority code"),
            }
        }
    }
}

/// Per-dataset serialization state.
struct DatasetSerializer<'s> {
    profile: &'s ItalianProfile<'s>,
    dataset: &'s Dataset,
    node: RdfNode,
    graph: &'s mut RdfGraph,
    /// Prefix of the blank node ids minted for this dataset.
    scope: String,
}

impl<'s> DatasetSerializer<'s> {
    fn new(
        profile: &'s ItalianProfile<'s>,
        dataset: &'s Dataset,
        node: RdfNode,
        graph: &'s mut RdfGraph,
    ) -> Self {
        let scope = dataset
            .name
            .clone()
            .or_else(|| dataset.id.clone())
            .unwrap_or_else(|| node.lexical().to_string());
        Self {
            profile,
            dataset,
            node,
            graph,
            scope,
        }
    }

    fn serialize(mut self) {
        self.clear_owned_properties();
        self.add_types();
        self.process_text();
        self.process_dates();
        self.process_codes();
        self.process_themes();
        self.process_spatial();
        self.process_publisher();
        self.process_holder();
        self.process_creators();
        self.process_alternate_identifiers();
        self.process_conforms_to();
        self.process_temporal_coverage();
        self.process_contact_point();
        self.process_distributions();
    }

    fn default_lang(&self) -> &'s str {
        let profile = self.profile;
        profile.default_lang()
    }

    fn request_lang(&self) -> &'s str {
        let profile = self.profile;
        &profile.lang
    }

    fn blank(&self, role: &str) -> RdfNode {
        scoped_blank(&self.scope, role)
    }

    fn add(&mut self, subject: &RdfNode, predicate: &str, object: RdfNode) {
        self.graph.add(subject.clone(), predicate, object);
    }

    fn organization(&self) -> Option<Organization> {
        let owner = self.dataset.owner_org.as_deref()?;
        self.profile.organizations?.organization(owner)
    }

    /// Removes `(subject, predicate, ?)`, then the description of any IRI
    /// object nothing else points to.
    fn detach(&mut self, subject: &RdfNode, predicate: &str) {
        let targets: Vec<RdfNode> = self
            .graph
            .objects(subject, predicate)
            .filter(|o| o.is_uri())
            .cloned()
            .collect();
        self.graph.remove_property(subject, predicate);
        for target in targets {
            if !self.graph.triples().any(|t| t.object == target) {
                self.graph.remove_subtree(&target);
            }
        }
    }

    fn clear_owned_properties(&mut self) {
        let node = self.node.clone();
        for predicate in DATASET_PROPERTIES {
            if predicate == dct::CONFORMS_TO {
                self.detach(&node, predicate);
            } else {
                self.graph.remove_property(&node, predicate);
            }
        }
    }

    fn add_types(&mut self) {
        let node = self.node.clone();
        self.add(&node, rdf::TYPE, RdfNode::uri(dcat::DATASET));
        self.add(&node, rdf::TYPE, RdfNode::uri(dcatapit::DATASET));
    }

    /// Localized values of a dataset field: the primary value in the
    /// default language, then the record's translations, then the stored
    /// ones.
    fn dataset_text(&self, field: &str, primary: Option<&str>) -> LocalizedText {
        let mut text = LocalizedText::new();
        if let Some(value) = primary.filter(|v| !v.trim().is_empty()) {
            text.insert(self.default_lang().to_string(), value.to_string());
        }
        if let Some(translations) = self.dataset.multilang.get(field) {
            for (lang, value) in translations {
                text.entry(lang.clone()).or_insert_with(|| value.clone());
            }
        }
        if let (Some(store), Some(id)) = (self.profile.localization, self.dataset.id.as_deref()) {
            if let Some(stored) = store.package_fields(id).get(field) {
                for (lang, value) in stored {
                    text.entry(lang.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        text
    }

    /// Title and description.
    fn process_text(&mut self) {
        let node = self.node.clone();
        let title = self.dataset_text("title", self.dataset.title.as_deref());
        let notes = self.dataset_text("notes", self.dataset.notes.as_deref());
        add_localized(self.graph, &node, dct::TITLE, &title);
        add_localized(self.graph, &node, dct::DESCRIPTION, &notes);
    }

    /// Issue and modification dates as `xsd:date`.
    fn process_dates(&mut self) {
        let node = self.node.clone();
        let dataset = self.dataset;
        for (key, predicate) in [("issued", dct::ISSUED), ("modified", dct::MODIFIED)] {
            let Some(raw) = dataset.field(key) else {
                debug!(dataset = %dataset.display_name(), field = key, "no date to write");
                continue;
            };
            match date_literal(raw) {
                Some(date) => self.add(&node, predicate, date),
                None => warn!(dataset = %dataset.display_name(), field = key, value = raw, "unparseable date"),
            }
        }
    }

    /// Identifier, landing page, frequency, languages and previous versions.
    fn process_codes(&mut self) {
        let node = self.node.clone();
        let dataset = self.dataset;

        if let Some(identifier) = dataset.field("identifier") {
            self.add(&node, dct::IDENTIFIER, RdfNode::literal(identifier));
        }

        let landing_page = match dataset.name.as_deref() {
            Some(name) if is_code(name) => Some(format!(
                "{}/dataset/{name}",
                self.profile.config.catalog_base()
            )),
            _ => dataset.url.clone().filter(|u| is_url(u)),
        };
        if let Some(page) = landing_page {
            self.add(&node, dcat::LANDING_PAGE, RdfNode::uri(page));
        }

        let frequency = dataset.field("frequency").unwrap_or(DEFAULT_FREQ_CODE);
        if let Some(frequency) = code_node(FREQ_BASE_URI, frequency) {
            self.add(&node, dct::ACCRUAL_PERIODICITY, frequency);
        }

        for code in dataset.field("language").map(decode_list).unwrap_or_default() {
            if let Some(language) = code_node(LANG_BASE_URI, &code) {
                self.add(&node, dct::LANGUAGE, language);
            }
        }

        for version in dataset.field("is_version_of").map(decode_list).unwrap_or_default() {
            self.add(&node, dct::IS_VERSION_OF, url_or_literal(&version));
        }
    }

    /// Declares `concept` as a SKOS concept labelled with `labels`. Nothing
    /// is declared without labels.
    fn add_concept(&mut self, concept: &RdfNode, labels: &LocalizedText) {
        if labels.is_empty() {
            return;
        }
        self.add(concept, rdf::TYPE, RdfNode::uri(skos::CONCEPT));
        add_localized(self.graph, concept, skos::PREF_LABEL, labels);
    }

    /// Themes from the aggregate, the legacy field, or the default theme,
    /// each with its subthemes.
    fn process_themes(&mut self) {
        let node = self.node.clone();
        let mut entries = self.dataset.theme_entries();
        if entries.is_empty() {
            debug!(dataset = %self.dataset.display_name(), "no themes, using default");
            entries.push(ThemeEntry::new(DEFAULT_THEME_KEY));
        }
        let vocabulary = self.profile.vocabulary;
        let taxonomy = self.profile.subthemes;
        for entry in entries {
            let Some(theme) = code_node(THEME_BASE_URI, &entry.theme) else {
                continue;
            };
            self.add(&node, dcat::THEME, theme.clone());
            let labels = vocabulary.lookup_labels(ConceptScheme::EuThemes.name(), &entry.theme);
            self.add_concept(&theme, &labels);

            for uri in entry.subthemes.iter().filter(|u| is_url(u)) {
                let subtheme = RdfNode::uri(uri.as_str());
                self.add(&node, dct::SUBJECT, subtheme.clone());
                if let Some(known) = taxonomy.get(uri) {
                    self.add_concept(&subtheme, &known.labels);
                }
            }
        }
    }

    /// Controlled places, free-text places and the GeoNames location.
    fn process_spatial(&mut self) {
        let node = self.node.clone();
        let vocabulary = self.profile.vocabulary;
        let places = self
            .dataset
            .field("geographical_name")
            .map(decode_list)
            .unwrap_or_default();
        for (i, place) in places.iter().enumerate() {
            let location = self.blank(&format!("spatial_{i}"));
            self.add(&node, dct::SPATIAL, location.clone());
            self.add(&location, rdf::TYPE, RdfNode::uri(dct::LOCATION));

            let controlled = vocabulary.contains(ConceptScheme::Places.name(), place) && is_code(place);
            if controlled {
                let uri = format!("{GEO_BASE_URI}{place}");
                self.add(
                    &location,
                    dcatapit::GEOGRAPHICAL_IDENTIFIER,
                    RdfNode::literal(uri.clone()),
                );
                let concept = RdfNode::uri(uri);
                self.add(&location, locn::GEOGRAPHICAL_NAME, concept.clone());
                let labels = vocabulary.lookup_labels(ConceptScheme::Places.name(), place);
                self.add_concept(&concept, &labels);
            } else {
                let concept = self.blank(&format!("spatial_{i}_concept"));
                self.add(&concept, rdf::TYPE, RdfNode::uri(skos::CONCEPT));
                self.add(&concept, skos::PREF_LABEL, RdfNode::literal(place.as_str()));
                self.add(&location, locn::GEOGRAPHICAL_NAME, concept);
            }
        }

        if let Some(geonames) = self.dataset.field("geographical_geonames_url") {
            let location = self.blank("geonames");
            self.add(&node, dct::SPATIAL, location.clone());
            self.add(&location, rdf::TYPE, RdfNode::uri(dct::LOCATION));
            self.add(&location, dcatapit::GEOGRAPHICAL_IDENTIFIER, RdfNode::literal(geonames));
        }
    }

    /// Adds a `dcatapit:Agent` under `predicate` and returns it.
    fn add_agent(
        &mut self,
        subject: &RdfNode,
        predicate: &str,
        role: &str,
        identifier: Option<&str>,
        names: &LocalizedText,
    ) -> RdfNode {
        let agent = self.blank(role);
        self.add(subject, predicate, agent.clone());
        self.add(&agent, rdf::TYPE, RdfNode::uri(dcatapit::AGENT));
        self.add(&agent, rdf::TYPE, RdfNode::uri(foaf::AGENT));
        if let Some(identifier) = identifier.filter(|i| !i.is_empty()) {
            self.add(&agent, dct::IDENTIFIER, RdfNode::literal(identifier));
        }
        add_localized(self.graph, &agent, foaf::NAME, names);
        agent
    }

    /// Names of an organization: its title in the default language plus
    /// the stored translations.
    fn organization_text(&self, organization: &Organization) -> LocalizedText {
        let mut text = LocalizedText::new();
        let title = organization.title.as_deref().unwrap_or(&organization.name);
        text.insert(self.default_lang().to_string(), title.to_string());
        if let Some(store) = self.profile.localization {
            if let Some(stored) = store.organization_fields(&organization.id).get("title") {
                for (lang, value) in stored {
                    text.entry(lang.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        text
    }

    /// Publisher from the record, falling back to the owning organization.
    fn process_publisher(&mut self) {
        let node = self.node.clone();
        let dataset = self.dataset;
        let name = dataset.field("publisher_name");
        let identifier = dataset.field("publisher_identifier");
        if name.is_some() || identifier.is_some() {
            let names = self.dataset_text("publisher_name", name);
            self.add_agent(&node, dct::PUBLISHER, "publisher", identifier, &names);
        } else if let Some(organization) = self.organization() {
            let names = self.organization_text(&organization);
            let identifier = organization.identifier.as_deref();
            self.add_agent(&node, dct::PUBLISHER, "publisher", identifier, &names);
        } else {
            debug!(dataset = %dataset.display_name(), "no publisher to write");
        }
    }

    /// Rights holder: the record's holder when both name and identifier are
    /// set, otherwise the owning organization.
    fn process_holder(&mut self) {
        let node = self.node.clone();
        let dataset = self.dataset;
        let use_dataset = dataset.field("holder_name").is_some() && dataset.field("holder_identifier").is_some();
        if use_dataset {
            let names = self.dataset_text("holder_name", dataset.field("holder_name"));
            let identifier = dataset.field("holder_identifier");
            self.add_agent(&node, dct::RIGHTS_HOLDER, "holder", identifier, &names);
        } else if let Some(organization) = self.organization() {
            let names = self.organization_text(&organization);
            let identifier = organization.identifier.as_deref();
            self.add_agent(&node, dct::RIGHTS_HOLDER, "holder", identifier, &names);
        } else {
            debug!(dataset = %dataset.display_name(), "no rights holder to write");
        }
    }

    /// Structured creators, plus the legacy pair when its identifier is new.
    fn process_creators(&mut self) {
        let node = self.node.clone();
        let dataset = self.dataset;
        let lang = self.request_lang();
        let mut creators = dataset.creators(lang).unwrap_or_else(|err| {
            warn!(dataset = %dataset.display_name(), error = %err, "creators not written");
            Vec::new()
        });

        let legacy_identifier = dataset.field("creator_identifier");
        let legacy_name = dataset.field("creator_name");
        if legacy_identifier.is_some() || legacy_name.is_some() {
            let known = creators
                .iter()
                .any(|c| c.creator_identifier.as_deref() == legacy_identifier);
            if known {
                debug!(dataset = %dataset.display_name(), "legacy creator already listed");
            } else {
                let mut creator_name = LocalizedText::new();
                if let Some(name) = legacy_name {
                    creator_name.insert(lang.to_string(), name.to_string());
                }
                creators.push(Creator {
                    creator_identifier: legacy_identifier.map(str::to_string),
                    creator_name,
                });
            }
        }

        for (i, creator) in creators.iter().enumerate() {
            self.add_agent(
                &node,
                dct::CREATOR,
                &format!("creator_{i}"),
                creator.creator_identifier.as_deref(),
                &creator.creator_name,
            );
        }
    }

    /// `adms:Identifier` nodes with their issuing agent.
    fn process_alternate_identifiers(&mut self) {
        let node = self.node.clone();
        let identifiers = self.dataset.alternate_identifiers(self.request_lang());
        for (i, alternate) in identifiers.iter().enumerate() {
            let identifier = self.blank(&format!("altid_{i}"));
            self.add(&node, adms::IDENTIFIER, identifier.clone());
            self.add(&identifier, rdf::TYPE, RdfNode::uri(adms::IDENTIFIER_CLASS));
            self.add(&identifier, skos::NOTATION, RdfNode::literal(alternate.identifier.as_str()));
            if !alternate.agent.is_empty() {
                self.add_agent(
                    &identifier,
                    dct::CREATOR,
                    &format!("altid_{i}_agent"),
                    alternate.agent.agent_identifier.as_deref(),
                    &alternate.agent.agent_name,
                );
            }
        }
    }

    /// `dct:Standard` nodes.
    fn process_conforms_to(&mut self) {
        let node = self.node.clone();
        let dataset = self.dataset;
        let standards = dataset.conforms_to_list(self.request_lang()).unwrap_or_else(|err| {
            warn!(dataset = %dataset.display_name(), error = %err, "conforms_to not written");
            Vec::new()
        });
        for (i, standard) in standards.iter().enumerate() {
            let subject = match standard.uri.as_deref().filter(|u| is_url(u)) {
                Some(uri) => RdfNode::uri(uri),
                None => self.blank(&format!("conforms_{i}")),
            };
            self.add(&node, dct::CONFORMS_TO, subject.clone());
            self.add(&subject, rdf::TYPE, RdfNode::uri(dct::STANDARD));
            self.add(&subject, rdf::TYPE, RdfNode::uri(dcatapit::STANDARD));
            self.add(&subject, dct::IDENTIFIER, RdfNode::literal(standard.identifier.as_str()));
            add_localized(self.graph, &subject, dct::TITLE, &standard.title);
            add_localized(self.graph, &subject, dct::DESCRIPTION, &standard.description);
            for document in &standard.reference_documentation {
                self.add(&subject, dcatapit::REFERENCE_DOCUMENTATION, url_or_literal(document));
            }
        }
    }

    /// Legacy single-extent value, read from extras or unmodeled keys.
    fn legacy_value(&self, key: &str) -> Option<&'s str> {
        let dataset = self.dataset;
        dataset
            .extra(key)
            .or_else(|| dataset.other.get(key).and_then(Value::as_str))
            .filter(|v| !v.trim().is_empty())
    }

    /// `dct:PeriodOfTime` nodes with `schema:startDate`/`endDate`.
    fn process_temporal_coverage(&mut self) {
        let node = self.node.clone();
        let dataset = self.dataset;
        let mut coverages = dataset.temporal_coverages().unwrap_or_else(|err| {
            warn!(dataset = %dataset.display_name(), error = %err, "temporal coverage not written");
            Vec::new()
        });
        if let Some(start) = self.legacy_value("temporal_start") {
            let legacy = TemporalCoverage {
                temporal_start: Some(start.to_string()),
                temporal_end: self.legacy_value("temporal_end").map(str::to_string),
            };
            if !coverages.contains(&legacy) {
                coverages.push(legacy);
            }
        }

        for (i, coverage) in coverages.into_iter().enumerate() {
            let coverage = TemporalCoverage {
                temporal_start: coverage.temporal_start.as_deref().and_then(normalize_date),
                temporal_end: coverage.temporal_end.as_deref().and_then(normalize_date),
            }
            .collapsed();
            if coverage.temporal_start.is_none() && coverage.temporal_end.is_none() {
                warn!(dataset = %dataset.display_name(), "temporal coverage without readable dates");
                continue;
            }
            let extent = self.blank(&format!("temporal_{i}"));
            self.add(&node, dct::TEMPORAL, extent.clone());
            self.add(&extent, rdf::TYPE, RdfNode::uri(dct::PERIOD_OF_TIME));
            if let Some(start) = coverage.temporal_start {
                self.add(&extent, schema::START_DATE, RdfNode::typed_literal(start, xsd::DATE));
            }
            if let Some(end) = coverage.temporal_end {
                self.add(&extent, schema::END_DATE, RdfNode::typed_literal(end, xsd::DATE));
            }
        }
    }

    /// Contact point describing the owning organization.
    fn process_contact_point(&mut self) {
        let node = self.node.clone();
        let Some(organization) = self.organization() else {
            debug!(dataset = %self.dataset.display_name(), "no organization for contact point");
            return;
        };
        let contact = if is_code(&organization.name) {
            RdfNode::uri(format!(
                "{}/organization/{}",
                self.profile.config.catalog_base(),
                organization.name
            ))
        } else {
            self.blank("contact")
        };
        self.add(&node, dcat::CONTACT_POINT, contact.clone());
        for class in [dcatapit::ORGANIZATION, vcard::KIND, vcard::ORGANIZATION] {
            self.add(&contact, rdf::TYPE, RdfNode::uri(class));
        }
        let name = organization.title.as_deref().unwrap_or(&organization.name);
        self.add(&contact, vcard::FN, RdfNode::literal(name));
        if let Some(email) = organization.email.as_deref().filter(|e| !e.is_empty()) {
            let mailto = if email.starts_with("mailto:") {
                email.to_string()
            } else {
                format!("mailto:{email}")
            };
            let object = if mailto.contains(char::is_whitespace) {
                RdfNode::literal(email)
            } else {
                RdfNode::uri(mailto)
            };
            self.add(&contact, vcard::HAS_EMAIL, object);
        }
        if let Some(telephone) = organization.telephone.as_deref().filter(|t| !t.is_empty()) {
            self.add(&contact, vcard::HAS_TELEPHONE, RdfNode::literal(telephone));
        }
        if let Some(site) = organization.site.as_deref().filter(|s| !s.is_empty()) {
            self.add(&contact, vcard::HAS_URL, url_or_literal(site));
        }
    }

    /// IRI of a distribution: its own URI when usable, else one under the
    /// dataset landing page.
    fn distribution_node(&self, resource: &Resource, position: usize) -> RdfNode {
        if let Some(uri) = resource.uri.as_deref().filter(|u| is_url(u)) {
            return RdfNode::uri(uri);
        }
        let key = resource
            .id
            .clone()
            .filter(|id| is_code(id))
            .unwrap_or_else(|| position.to_string());
        RdfNode::uri(format!("{}/resource/{key}", self.node.lexical()))
    }

    /// License of a resource: its own, the dataset's, or the default one.
    fn resource_license(&self, resource: &Resource) -> Option<&'s License> {
        let licenses = self.profile.licenses;
        resource
            .license_type
            .as_deref()
            .and_then(|l| licenses.get(l))
            .or_else(|| self.dataset.license_id.as_deref().and_then(|l| licenses.get(l)))
            .or_else(|| licenses.default_license())
    }

    fn add_license(&mut self, distribution: &RdfNode, license: &License) {
        let subject = RdfNode::uri(
            license
                .document_uri
                .as_deref()
                .filter(|d| is_url(d))
                .unwrap_or(&license.uri),
        );
        self.add(distribution, dct::LICENSE, subject.clone());
        self.add(&subject, rdf::TYPE, RdfNode::uri(dcatapit::LICENSE_DOCUMENT));
        self.add(&subject, rdf::TYPE, RdfNode::uri(dct::LICENSE_DOCUMENT));
        let licenses = self.profile.licenses;
        if let Some(license_type) = licenses.effective_type(license) {
            self.add(&subject, dct::TYPE, RdfNode::uri(license_type));
        }
        if license.names.is_empty() {
            self.add(
                &subject,
                foaf::NAME,
                RdfNode::literal_with_lang(license.default_name.as_str(), xml_lang(self.default_lang())),
            );
        } else {
            add_localized(self.graph, &subject, foaf::NAME, &license.names);
        }
        if let Some(version) = license.version.as_deref() {
            self.add(&subject, owl::VERSION_INFO, RdfNode::literal(version));
        }
    }

    /// Localized values of a resource field.
    fn resource_text(&self, resource: &Resource, uri: &str, field: &str, primary: Option<&str>) -> LocalizedText {
        let mut text = LocalizedText::new();
        if let Some(value) = primary.filter(|v| !v.trim().is_empty()) {
            text.insert(self.default_lang().to_string(), value.to_string());
        }
        if let Some(translations) = self.dataset.resources_multilang.get(uri).and_then(|f| f.get(field)) {
            for (lang, value) in translations {
                text.entry(lang.clone()).or_insert_with(|| value.clone());
            }
        }
        if let (Some(store), Some(id)) = (self.profile.localization, resource.id.as_deref()) {
            if let Some(stored) = store.resource_fields(id).get(field) {
                for (lang, value) in stored {
                    text.entry(lang.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        text
    }

    /// `dcatapit:Distribution` nodes with format, license and names.
    fn process_distributions(&mut self) {
        let node = self.node.clone();
        let dataset = self.dataset;
        for (i, resource) in dataset.resources.iter().enumerate() {
            let distribution = self.distribution_node(resource, i);
            for predicate in DISTRIBUTION_PROPERTIES {
                if predicate == dct::LICENSE {
                    self.detach(&distribution, predicate);
                } else {
                    self.graph.remove_property(&distribution, predicate);
                }
            }
            self.add(&node, dcat::DISTRIBUTION_PROP, distribution.clone());
            self.add(&distribution, rdf::TYPE, RdfNode::uri(dcat::DISTRIBUTION));
            self.add(&distribution, rdf::TYPE, RdfNode::uri(dcatapit::DISTRIBUTION));

            let format = resource
                .distribution_format
                .as_deref()
                .filter(|f| is_code(f))
                .or_else(|| resource.format.as_deref().and_then(guess_format))
                .unwrap_or_else(|| {
                    warn!(
                        dataset = %dataset.display_name(),
                        resource = %resource.name.as_deref().unwrap_or("N/A"),
                        "no format for resource, using default"
                    );
                    DEFAULT_FORMAT_CODE
                });
            self.add(
                &distribution,
                dct::FORMAT,
                RdfNode::uri(format!("{FORMAT_BASE_URI}{format}")),
            );

            match self.resource_license(resource) {
                Some(license) => self.add_license(&distribution, license),
                None => warn!(dataset = %dataset.display_name(), "no license available for resource"),
            }

            let uri = distribution.lexical().to_string();
            let name = self.resource_text(resource, &uri, "name", resource.name.as_deref());
            let description = self.resource_text(resource, &uri, "description", resource.description.as_deref());
            add_localized(self.graph, &distribution, dct::TITLE, &name);
            add_localized(self.graph, &distribution, dct::DESCRIPTION, &description);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::DcatapitConfig;
    use crate::dataset::Extra;
    use crate::license::{LicenseData, LicenseTaxonomy};
    use crate::subtheme::SubthemeTaxonomy;
    use crate::vocabulary::VocabularyStore;

    fn fixtures() -> (DcatapitConfig, VocabularyStore, LicenseTaxonomy, SubthemeTaxonomy) {
        let config = DcatapitConfig::default().with_catalog_uri("http://dati.example.org");
        let mut vocabulary = VocabularyStore::new();
        vocabulary.upsert_term("eu_themes", "ECON", [("it", "Economia"), ("en", "Economy")]);
        vocabulary.upsert_term("places", "ITA_BZO", [("it", "Bolzano")]);
        let mut licenses = LicenseTaxonomy::new();
        licenses
            .insert(
                LicenseData {
                    license_type: Some("http://purl.org/adms/licencetype/Attribution".into()),
                    version: Some("4.0".into()),
                    uri: "https://w3id.org/italia/controlled-vocabulary/licences/A21_CCBY40".into(),
                    document_uri: Some("https://creativecommons.org/licenses/by/4.0/".into()),
                    names: [("it".to_string(), "CC BY 4.0".to_string())].into_iter().collect(),
                    ..LicenseData::default()
                },
                "it",
            )
            .expect("unique");
        (config, vocabulary, licenses, SubthemeTaxonomy::new())
    }

    fn sample() -> Dataset {
        let mut ds = Dataset::named("test-dataset");
        ds.id = Some("4b6fe9ca".into());
        ds.title = Some("Dataset di test".into());
        ds.theme = Some("{ECON,ENVI}".into());
        ds.geographical_name = Some("{ITA_BZO,Altrove}".into());
        ds.resources.push(Resource {
            id: Some("r1".into()),
            format: Some("csv".into()),
            license_type: Some("https://w3id.org/italia/controlled-vocabulary/licences/A21_CCBY40".into()),
            ..Resource::default()
        });
        ds
    }

    #[test]
    fn test_serialize_is_idempotent() {
        let (config, vocabulary, licenses, subthemes) = fixtures();
        let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
        let ds = sample();
        let mut graph = profile.dataset_graph(&ds);
        let first: Vec<_> = graph.triples().cloned().collect();
        let node = profile.dataset_uri(&ds);
        profile.serialize(&ds, &node, &mut graph);
        let second: Vec<_> = graph.triples().cloned().collect();
        assert_eq!(first.len(), second.len());
        for triple in &first {
            assert!(second.contains(triple), "{triple:?}");
        }
    }

    #[test]
    fn test_theme_concepts_only_with_labels() {
        let (config, vocabulary, licenses, subthemes) = fixtures();
        let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
        let graph = profile.dataset_graph(&sample());
        let econ = RdfNode::uri(format!("{THEME_BASE_URI}ECON"));
        let envi = RdfNode::uri(format!("{THEME_BASE_URI}ENVI"));
        assert!(graph.contains(&econ, rdf::TYPE, &RdfNode::uri(skos::CONCEPT)));
        assert_eq!(graph.objects(&econ, skos::PREF_LABEL).count(), 2);
        assert!(graph.value(&envi, rdf::TYPE).is_none());
    }

    #[test]
    fn test_default_theme_and_frequency() {
        let (config, vocabulary, licenses, subthemes) = fixtures();
        let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
        let ds = Dataset::named("bare");
        let graph = profile.dataset_graph(&ds);
        let node = profile.dataset_uri(&ds);
        assert!(graph.contains(&node, dcat::THEME, &RdfNode::uri(format!("{THEME_BASE_URI}OP_DATPRO"))));
        assert!(graph.contains(
            &node,
            dct::ACCRUAL_PERIODICITY,
            &RdfNode::uri(format!("{FREQ_BASE_URI}UNKNOWN"))
        ));
        assert!(graph.contains(
            &node,
            dcat::LANDING_PAGE,
            &RdfNode::uri("http://dati.example.org/dataset/bare")
        ));
    }

    #[test]
    fn test_spatial_controlled_and_free_text() {
        let (config, vocabulary, licenses, subthemes) = fixtures();
        let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
        let graph = profile.dataset_graph(&sample());
        let controlled = RdfNode::blank("test_dataset_spatial_0");
        assert!(graph.contains(
            &controlled,
            dcatapit::GEOGRAPHICAL_IDENTIFIER,
            &RdfNode::literal(format!("{GEO_BASE_URI}ITA_BZO"))
        ));
        let free = RdfNode::blank("test_dataset_spatial_1_concept");
        assert!(graph.contains(&free, skos::PREF_LABEL, &RdfNode::literal("Altrove")));
    }

    #[test]
    fn test_distribution_format_and_license() {
        let (config, vocabulary, licenses, subthemes) = fixtures();
        let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
        let graph = profile.dataset_graph(&sample());
        let distribution = RdfNode::uri("http://dati.example.org/dataset/test-dataset/resource/r1");
        assert!(graph.contains(
            &distribution,
            dct::FORMAT,
            &RdfNode::uri(format!("{FORMAT_BASE_URI}CSV"))
        ));
        let license = RdfNode::uri("https://creativecommons.org/licenses/by/4.0/");
        assert!(graph.contains(&distribution, dct::LICENSE, &license));
        assert!(graph.contains(
            &license,
            dct::TYPE,
            &RdfNode::uri("http://purl.org/adms/licencetype/Attribution")
        ));
        assert!(graph.contains(&license, owl::VERSION_INFO, &RdfNode::literal("4.0")));
    }

    #[test]
    fn test_holder_falls_back_to_organization() {
        let (config, vocabulary, licenses, subthemes) = fixtures();
        let mut catalog = MemoryCatalog::new();
        catalog.insert_organization(Organization {
            id: "org-1".into(),
            name: "comune".into(),
            title: Some("Comune di Test".into()),
            identifier: Some("c_test".into()),
            email: Some("info@comune.example.org".into()),
            ..Organization::default()
        });
        let profile =
            ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes).with_organizations(&catalog);
        let mut ds = Dataset::named("ds");
        ds.owner_org = Some("org-1".into());
        ds.holder_name = Some("Only a name".into());
        let graph = profile.dataset_graph(&ds);

        let holder = RdfNode::blank("ds_holder");
        assert!(graph.contains(&holder, dct::IDENTIFIER, &RdfNode::literal("c_test")));
        assert!(graph.contains(
            &holder,
            foaf::NAME,
            &RdfNode::literal_with_lang("Comune di Test", "it")
        ));
        let contact = RdfNode::uri("http://dati.example.org/organization/comune");
        assert!(graph.contains(
            &contact,
            vcard::HAS_EMAIL,
            &RdfNode::uri("mailto:info@comune.example.org")
        ));
    }

    #[test]
    fn test_legacy_creator_merged_once() {
        let (config, vocabulary, licenses, subthemes) = fixtures();
        let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
        let mut ds = Dataset::named("ds");
        ds.creator = Some(r#"[{"creator_identifier": "ABC", "creator_name": {"it": "abc"}}]"#.into());
        ds.extras.push(Extra::new("creator_identifier", "ABC"));
        ds.extras.push(Extra::new("creator_name", "abc legacy"));
        let graph = profile.dataset_graph(&ds);
        let node = profile.dataset_uri(&ds);
        assert_eq!(graph.objects(&node, dct::CREATOR).count(), 1);

        ds.extras = vec![Extra::new("creator_identifier", "XYZ")];
        let graph = profile.dataset_graph(&ds);
        assert_eq!(graph.objects(&node, dct::CREATOR).count(), 2);
    }

    #[test]
    fn test_catalog_metadata() {
        let (config, vocabulary, licenses, subthemes) = fixtures();
        let config = config.with_offered_languages(["it", "en", "xx"]);
        let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
        let mut graph = RdfGraph::new();
        let catalog = profile.catalog_uri();
        profile.serialize_catalog(&catalog, &mut graph);
        profile.serialize_catalog(&catalog, &mut graph);
        assert_eq!(graph.objects(&catalog, dct::LANGUAGE).count(), 2);
        assert!(graph.contains(
            &catalog,
            dct::ISSUED,
            &RdfNode::typed_literal("1900-01-01", xsd::DATE)
        ));
        let scheme = RdfNode::uri(ConceptScheme::EuThemes.uri());
        assert!(graph.contains(
            &scheme,
            dct::TITLE,
            &RdfNode::literal_with_lang(THEME_TAXONOMY_TITLE, "it")
        ));
    }
}
