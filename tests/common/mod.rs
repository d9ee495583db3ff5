//! Common test helpers and fixtures shared across the integration suite.

use dcatapit::rdf::namespaces::{clv, dcatapit as dcatapit_ns, owl, rdf, skos};
use dcatapit::{
    ConceptScheme, DcatapitConfig, LicenseTaxonomy, RdfGraph, RdfNode, SubthemeTaxonomy, VocabularyStore,
};

/// Base URI of the test catalog.
pub const CATALOG_URI: &str = "http://dati.example.org";

/// Eurovoc namespace used by the subtheme fixtures.
#[allow(dead_code)]
pub const EUROVOC: &str = "http://eurovoc.europa.eu/";

/// Licences vocabulary namespace.
pub const LICENCES: &str = "https://w3id.org/italia/controlled-vocabulary/licences/";

/// License type shared by the attribution licenses.
#[allow(dead_code)]
pub const ATTRIBUTION_TYPE: &str = "http://purl.org/adms/licencetype/Attribution";

/// Creates the configuration used by most tests.
pub fn test_config() -> DcatapitConfig {
    DcatapitConfig::default()
        .with_catalog_uri(CATALOG_URI)
        .with_publisher("Regione Esempio", "r_esempio")
        .with_catalog_issued("2019-01-01")
}

/// Vocabulary store with a few themes, places and languages.
#[allow(dead_code)]
pub fn test_vocabulary() -> VocabularyStore {
    let mut vocabulary = VocabularyStore::new();
    vocabulary.upsert_term("eu_themes", "AGRI", [("it", "Agricoltura"), ("en", "Agriculture")]);
    vocabulary.upsert_term("eu_themes", "ECON", [("it", "Economia"), ("en", "Economy")]);
    vocabulary.upsert_term("places", "ITA_BZO", [("it", "Bolzano"), ("de", "Bozen")]);
    vocabulary.upsert_term("languages", "ITA", [("it", "Italiano")]);
    vocabulary
}

/// A small copy of the Italian licences vocabulary.
///
/// `A2_Attribution` is a category carrying the license type; `A21_CCBY40`
/// inherits it through `skos:broader`; `C1_Unknown` is the default license.
pub fn license_graph() -> RdfGraph {
    let mut g = RdfGraph::new();
    let scheme = RdfNode::uri(ConceptScheme::Licenses.uri());
    g.add(scheme.clone(), rdf::TYPE, RdfNode::uri(skos::CONCEPT_SCHEME));

    let category = RdfNode::uri(format!("{LICENCES}A2_Attribution"));
    g.add(category.clone(), rdf::TYPE, RdfNode::uri(skos::CONCEPT));
    g.add(category.clone(), skos::IN_SCHEME, scheme.clone());
    g.add(category.clone(), skos::EXACT_MATCH, RdfNode::uri(ATTRIBUTION_TYPE));
    g.add(category.clone(), clv::HAS_RANK_ORDER, RdfNode::literal("1"));
    g.add(category.clone(), skos::PREF_LABEL, RdfNode::literal_with_lang("Attribuzione", "it"));
    g.add(category.clone(), skos::PREF_LABEL, RdfNode::literal_with_lang("Attribution", "en"));

    let ccby = RdfNode::uri(format!("{LICENCES}A21_CCBY40"));
    g.add(ccby.clone(), rdf::TYPE, RdfNode::uri(skos::CONCEPT));
    g.add(ccby.clone(), skos::IN_SCHEME, scheme.clone());
    g.add(ccby.clone(), skos::BROADER, category);
    g.add(ccby.clone(), clv::HAS_RANK_ORDER, RdfNode::literal("2"));
    g.add(ccby.clone(), owl::VERSION_INFO, RdfNode::literal("4.0"));
    g.add(
        ccby.clone(),
        dcatapit_ns::REFERENCE_DOC,
        RdfNode::uri("https://creativecommons.org/licenses/by/4.0/"),
    );
    g.add(
        ccby,
        skos::PREF_LABEL,
        RdfNode::literal_with_lang("Creative Commons Attribuzione 4.0 Internazionale (CC BY 4.0)", "it"),
    );

    let unknown = RdfNode::uri(format!("{LICENCES}C1_Unknown"));
    g.add(unknown.clone(), rdf::TYPE, RdfNode::uri(skos::CONCEPT));
    g.add(unknown.clone(), skos::IN_SCHEME, scheme);
    g.add(unknown.clone(), clv::HAS_RANK_ORDER, RdfNode::literal("3"));
    g.add(unknown, skos::PREF_LABEL, RdfNode::literal_with_lang("Licenza sconosciuta", "it"));
    g
}

/// License taxonomy loaded from [`license_graph`].
pub fn test_licenses() -> LicenseTaxonomy {
    let mut licenses = LicenseTaxonomy::new();
    licenses
        .clear_and_reload(&license_graph(), "it")
        .expect("licenses loaded");
    licenses
}

/// Eurovoc fragment in Turtle: `100` has `200` below it, which has `300`.
pub const EUROVOC_TTL: &str = r#"
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
@prefix dct: <http://purl.org/dc/terms/> .

<http://eurovoc.europa.eu/100141> a skos:ConceptScheme .

<http://eurovoc.europa.eu/100> skos:prefLabel "Agricoltura"@it, "Agriculture"@en ;
    dct:identifier "100" ;
    skos:hasTopConcept <http://eurovoc.europa.eu/200> .
<http://eurovoc.europa.eu/200> skos:prefLabel "Pesca"@it ;
    dct:identifier "200" ;
    skos:hasTopConcept <http://eurovoc.europa.eu/300> .
<http://eurovoc.europa.eu/300> skos:prefLabel "Acquacoltura"@it ;
    dct:identifier "300" .
"#;

/// Theme to subtheme mapping in Turtle: `AGRI` maps to Eurovoc `100`.
pub const SUBTHEME_MAPPING_TTL: &str = r#"
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .

<https://w3id.org/italia/controlled-vocabulary/theme-subtheme-mapping> a skos:ConceptScheme .

<http://publications.europa.eu/resource/authority/data-theme/AGRI> a skos:Concept ;
    skos:narrowMatch <http://eurovoc.europa.eu/100> .
"#;

/// Subtheme taxonomy loaded from the Turtle fixtures.
#[allow(dead_code)]
pub fn test_subthemes() -> SubthemeTaxonomy {
    let themes = RdfGraph::parse(SUBTHEME_MAPPING_TTL, dcatapit::RdfFormat::Turtle).expect("mapping parsed");
    let eurovoc = RdfGraph::parse(EUROVOC_TTL, dcatapit::RdfFormat::Turtle).expect("eurovoc parsed");
    let mut taxonomy = SubthemeTaxonomy::new();
    let mut ctx = dcatapit::subtheme::ImportContext::new("it");
    taxonomy.load(&themes, &eurovoc, &mut ctx).expect("subthemes loaded");
    taxonomy
}

/// Builds a data-theme concept scheme in Turtle with the given codes.
#[allow(dead_code)]
pub fn themes_ttl(codes: &[&str]) -> String {
    let mut out = String::from(
        "@prefix skos: <http://www.w3.org/2004/02/skos/core#> .\n\
         <http://publications.europa.eu/resource/authority/data-theme> a skos:ConceptScheme .\n",
    );
    for code in codes {
        out.push_str(&format!(
            "<http://publications.europa.eu/resource/authority/data-theme/{code}> a skos:Concept ;\n    \
             skos:prefLabel \"{code} it\"@it, \"{code} en\"@en .\n"
        ));
    }
    out
}
