//! DCAT-AP_IT profile integration tests: parsing harvested graphs,
//! serializing stored records and reading the serialization back.

mod common;

use common::{test_config, test_licenses, test_subthemes, test_vocabulary, EUROVOC, LICENCES};
use dcatapit::dataset::Extra;
use dcatapit::rdf::namespaces::{dcat, dct, foaf, rdf};
use dcatapit::{
    AlternateIdentifier, ConformsTo, Creator, Dataset, IdentifierAgent, ItalianProfile, MemoryCatalog,
    Organization, RdfFormat, RdfGraph, RdfNode, Resource, TemporalCoverage, ThemeEntry,
};
use proptest::prelude::*;
use proptest::sample::subsequence;

fn names(pairs: &[(&str, &str)]) -> dcatapit::localization::LocalizedText {
    pairs.iter().map(|(l, n)| ((*l).to_string(), (*n).to_string())).collect()
}

fn stored_dataset() -> Dataset {
    let mut ds = Dataset::named("spesa-regionale");
    ds.id = Some("0c6a3b52".into());
    ds.title = Some("Spesa regionale".into());
    ds.notes = Some("Spesa della regione per capitolo".into());
    ds.owner_org = Some("org-1".into());
    ds.identifier = Some("r_esempio:spesa".into());
    ds.issued = Some("2018-03-01".into());
    ds.modified = Some("2019-06-30".into());
    ds.frequency = Some("ANNUAL".into());
    ds.language = Some("{ITA,ENG}".into());
    ds.is_version_of = Some("http://dati.example.org/dataset/spesa-regionale-2017".into());
    ds.geographical_name = Some("ITA_BZO".into());
    ds.publisher_name = Some("Regione Esempio".into());
    ds.publisher_identifier = Some("r_esempio".into());
    ds.set_theme_entries(&[
        ThemeEntry {
            theme: "AGRI".into(),
            subthemes: vec![format!("{EUROVOC}200")],
        },
        ThemeEntry::new("ECON"),
    ])
    .expect("themes stored");
    ds.set_creators(&[
        Creator {
            creator_identifier: Some("CR1".into()),
            creator_name: names(&[("it", "Ufficio statistica")]),
        },
        Creator {
            creator_identifier: Some("CR2".into()),
            creator_name: names(&[("it", "Ragioneria"), ("en", "Accounting")]),
        },
    ])
    .expect("creators stored");
    ds.set_conforms_to(&[ConformsTo {
        identifier: "SIOPE".into(),
        title: names(&[("it", "Codifica SIOPE")]),
        ..ConformsTo::default()
    }])
    .expect("standards stored");
    ds.set_alternate_identifiers(&[AlternateIdentifier {
        identifier: "OLD:42".into(),
        agent: IdentifierAgent {
            agent_identifier: Some("ISTAT".into()),
            agent_name: names(&[("it", "Istituto nazionale di statistica")]),
        },
    }])
    .expect("identifiers stored");
    ds.set_temporal_coverages(&[TemporalCoverage {
        temporal_start: Some("2017-01-01".into()),
        temporal_end: Some("2017-12-31".into()),
    }])
    .expect("coverage stored");
    ds.resources.push(Resource {
        id: Some("csv".into()),
        name: Some("Spesa 2017".into()),
        format: Some("CSV".into()),
        license_type: Some(format!("{LICENCES}A21_CCBY40")),
        ..Resource::default()
    });
    ds
}

fn catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog.insert_organization(Organization {
        id: "org-1".into(),
        name: "regione-esempio".into(),
        title: Some("Regione Esempio".into()),
        identifier: Some("r_esempio".into()),
        email: Some("opendata@regione.example.it".into()),
        ..Organization::default()
    });
    catalog
}

// ============================================================================
// Parsing harvested graphs
// ============================================================================

const TWO_CREATORS_TTL: &str = r#"
@prefix dcat: <http://www.w3.org/ns/dcat#> .
@prefix dcatapit: <http://dati.gov.it/onto/dcatapit#> .
@prefix dct: <http://purl.org/dc/terms/> .
@prefix foaf: <http://xmlns.com/foaf/0.1/> .

<http://harvested.example.org/dataset/1> a dcat:Dataset, dcatapit:Dataset ;
    dct:title "Harvested"@it ;
    dct:creator [ a dcatapit:Agent ;
        dct:identifier "EN-ID" ;
        foaf:name "Creator Name"@en ] ,
      [ a dcatapit:Agent ;
        dct:identifier "IT-ID" ;
        foaf:name "Nome del creatore"@it ] .
"#;

#[test]
fn test_parse_two_creators() {
    let config = test_config();
    let (vocabulary, licenses, subthemes) = (test_vocabulary(), test_licenses(), test_subthemes());
    let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
    let graph = RdfGraph::parse(TWO_CREATORS_TTL, RdfFormat::Turtle).expect("graph parsed");

    let parsed = profile.parse_graph(&graph);
    assert_eq!(parsed.len(), 1);
    let dataset = &parsed[0];

    let raw = dataset.creator.as_deref().expect("creator list stored");
    let json: serde_json::Value = serde_json::from_str(raw).expect("creator list is JSON");
    assert_eq!(json.as_array().map(Vec::len), Some(2));

    let creators = dataset.creators("it").expect("creators readable");
    let mut ids: Vec<&str> = creators.iter().filter_map(|c| c.creator_identifier.as_deref()).collect();
    ids.sort_unstable();
    assert_eq!(ids, ["EN-ID", "IT-ID"]);
    assert!(creators.iter().any(|c| c.creator_name.get("en").map(String::as_str) == Some("Creator Name")));
    assert!(dataset.creator_identifier.is_some());
}

#[test]
fn test_parse_ignores_plain_dcat_dataset() {
    let config = test_config();
    let (vocabulary, licenses, subthemes) = (test_vocabulary(), test_licenses(), test_subthemes());
    let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);
    let mut graph = RdfGraph::new();
    let node = RdfNode::uri("http://harvested.example.org/dataset/plain");
    graph.add(node.clone(), rdf::TYPE, RdfNode::uri(dcat::DATASET));
    graph.add(node.clone(), dct::TITLE, RdfNode::literal("Plain"));

    let input = Dataset::named("plain");
    assert_eq!(profile.parse(&graph, &node, input.clone()), input);
    assert!(profile.parse_graph(&graph).is_empty());
}

#[test]
fn test_parse_resources_license_agreement() {
    let config = test_config();
    let (vocabulary, licenses, subthemes) = (test_vocabulary(), test_licenses(), test_subthemes());
    let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);

    let build = |license_names: &[&str]| {
        let mut graph = RdfGraph::parse(TWO_CREATORS_TTL, RdfFormat::Turtle).expect("graph parsed");
        let node = RdfNode::uri("http://harvested.example.org/dataset/1");
        for (i, name) in license_names.iter().enumerate() {
            let distribution = RdfNode::uri(format!("http://harvested.example.org/dataset/1/resource/{i}"));
            let license = RdfNode::blank(format!("license{i}"));
            graph.add(node.clone(), dcat::DISTRIBUTION_PROP, distribution.clone());
            graph.add(distribution, dct::LICENSE, license.clone());
            graph.add(license, foaf::NAME, RdfNode::literal(*name));
        }
        (graph, node)
    };

    let ccby = "Creative Commons Attribuzione 4.0 Internazionale (CC BY 4.0)";
    let (graph, node) = build(&[ccby]);
    let single = profile.parse_dataset(&graph, &node);
    assert_eq!(single.license_id, Some(format!("{LICENCES}A21_CCBY40")));

    let (graph, node) = build(&[ccby, "Attribuzione"]);
    let multiple = profile.parse_dataset(&graph, &node);
    assert_eq!(multiple.resources.len(), 2);
    assert_eq!(multiple.license_id.as_deref(), Some("notspecified"));

    let (graph, node) = build(&[]);
    assert_eq!(profile.parse_dataset(&graph, &node).license_id, None);
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_equal_temporal_dates_collapse() {
    let config = test_config();
    let (vocabulary, licenses, subthemes) = (test_vocabulary(), test_licenses(), test_subthemes());
    let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);

    let mut ds = Dataset::named("one-day");
    ds.extras.push(Extra::new("temporal_start", "2001-01-01"));
    ds.extras.push(Extra::new("temporal_end", "2001-01-01"));
    let graph = profile.dataset_graph(&ds);

    let parsed = profile.parse_dataset(&graph, &profile.dataset_uri(&ds));
    let coverages = parsed.temporal_coverages().expect("coverage readable");
    assert_eq!(
        coverages,
        vec![TemporalCoverage {
            temporal_start: Some("2001-01-01".into()),
            temporal_end: None,
        }]
    );
}

#[test]
fn test_serialization_survives_text_formats() {
    let config = test_config();
    let (vocabulary, licenses, subthemes) = (test_vocabulary(), test_licenses(), test_subthemes());
    let catalog = catalog();
    let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes).with_organizations(&catalog);
    let graph = profile.dataset_graph(&stored_dataset());

    for format in [RdfFormat::Turtle, RdfFormat::NTriples, RdfFormat::RdfXml] {
        let text = graph.serialize(format).expect("serialized");
        let reread = RdfGraph::parse(&text, format).expect("reparsed");
        assert_eq!(reread.len(), graph.len(), "{format} changed the triple count");
    }
}

#[test]
fn test_roundtrip_keeps_profile_fields() {
    let config = test_config();
    let (vocabulary, licenses, subthemes) = (test_vocabulary(), test_licenses(), test_subthemes());
    let catalog = catalog();
    let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes).with_organizations(&catalog);
    let original = stored_dataset();

    let text = profile
        .dataset_graph(&original)
        .serialize(RdfFormat::Turtle)
        .expect("serialized");
    let graph = RdfGraph::parse(&text, RdfFormat::Turtle).expect("reparsed");
    let parsed = profile.parse_dataset(&graph, &profile.dataset_uri(&original));

    assert_eq!(parsed.title, original.title);
    assert_eq!(parsed.notes, original.notes);
    assert_eq!(parsed.is_version_of, original.is_version_of);
    assert_eq!(parsed.identifier, original.identifier);
    assert_eq!(parsed.issued, original.issued);
    assert_eq!(parsed.modified, original.modified);
    assert_eq!(parsed.frequency, original.frequency);
    assert_eq!(parsed.language, original.language);
    assert_eq!(parsed.geographical_name, original.geographical_name);
    assert_eq!(parsed.theme_entries(), original.theme_entries());
    assert_eq!(parsed.creators("it").expect("creators"), original.creators("it").expect("creators"));
    assert_eq!(parsed.alternate_identifiers("it"), original.alternate_identifiers("it"));
    assert_eq!(parsed.temporal_coverages().expect("coverage"), original.temporal_coverages().expect("coverage"));
    assert_eq!(parsed.publisher_identifier.as_deref(), Some("r_esempio"));
    assert_eq!(parsed.holder_identifier.as_deref(), Some("r_esempio"));

    let standards = parsed.conforms_to_list("it").expect("standards");
    assert_eq!(standards.len(), 1);
    assert_eq!(standards[0].identifier, "SIOPE");
    assert_eq!(standards[0].title.get("it").map(String::as_str), Some("Codifica SIOPE"));

    assert_eq!(parsed.resources.len(), 1);
    let resource = &parsed.resources[0];
    assert_eq!(resource.distribution_format.as_deref(), Some("CSV"));
    assert_eq!(resource.license_type, Some(format!("{LICENCES}A21_CCBY40")));
    assert_eq!(parsed.license_id, Some(format!("{LICENCES}A21_CCBY40")));
}

#[test]
fn test_serialize_twice_into_same_graph() {
    let config = test_config();
    let (vocabulary, licenses, subthemes) = (test_vocabulary(), test_licenses(), test_subthemes());
    let catalog = catalog();
    let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes)
        .with_organizations(&catalog)
        .with_localization(&catalog);
    let ds = stored_dataset();
    let node = profile.dataset_uri(&ds);

    let mut graph = RdfGraph::new();
    profile.serialize(&ds, &node, &mut graph);
    let first: Vec<String> = {
        let mut lines: Vec<String> = graph.triples().map(|t| format!("{t:?}")).collect();
        lines.sort();
        lines
    };
    profile.serialize(&ds, &node, &mut graph);
    let mut second: Vec<String> = graph.triples().map(|t| format!("{t:?}")).collect();
    second.sort();
    assert_eq!(first, second);
}

// ============================================================================
// Generated records
// ============================================================================

fn date_strategy() -> impl Strategy<Value = String> {
    (1990u32..2030, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}"))
}

fn creator_strategy() -> impl Strategy<Value = Creator> {
    (
        "[A-Z]{2,4}[0-9]{1,3}",
        "[A-Z][a-z]{2,10}( [a-z]{2,10})?",
        proptest::option::of("[A-Z][a-z]{2,10}"),
    )
        .prop_map(|(id, it, en)| {
            let mut creator_name = names(&[("it", it.as_str())]);
            if let Some(en) = en {
                creator_name.insert("en".into(), en);
            }
            Creator {
                creator_identifier: Some(id),
                creator_name,
            }
        })
}

/// Coverage whose end is absent, equal to the start, or another date.
fn coverage_strategy() -> impl Strategy<Value = TemporalCoverage> {
    (date_strategy(), date_strategy(), 0u8..3).prop_map(|(start, other, kind)| TemporalCoverage {
        temporal_end: match kind {
            0 => None,
            1 => Some(start.clone()),
            _ => Some(other),
        },
        temporal_start: Some(start),
    })
}

fn themes_strategy() -> impl Strategy<Value = Vec<ThemeEntry>> {
    (
        subsequence(vec!["AGRI", "ECON", "GOVE"], 1..=3),
        subsequence(vec!["100", "200", "300"], 0..=3),
    )
        .prop_map(|(themes, codes)| {
            themes
                .into_iter()
                .map(|theme| ThemeEntry {
                    theme: theme.to_string(),
                    subthemes: if theme == "AGRI" {
                        codes.iter().map(|c| format!("{EUROVOC}{c}")).collect()
                    } else {
                        Vec::new()
                    },
                })
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_serialized_record_parses_back(
        creators in proptest::collection::vec(creator_strategy(), 1..4),
        coverages in proptest::collection::vec(coverage_strategy(), 1..3),
        themes in themes_strategy(),
        notes in "[A-Z][a-z]{2,12}( [a-z]{2,12}){0,3}",
        version in "[a-z]{3,10}",
    ) {
        let config = test_config();
        let (vocabulary, licenses, subthemes) = (test_vocabulary(), test_licenses(), test_subthemes());
        let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes);

        let mut ds = Dataset::named("generated");
        ds.title = Some("Generated".into());
        ds.notes = Some(notes);
        ds.is_version_of = Some(format!("http://dati.example.org/dataset/{version}"));
        ds.set_creators(&creators).expect("creators stored");
        ds.set_temporal_coverages(&coverages).expect("coverage stored");
        ds.set_theme_entries(&themes).expect("themes stored");

        let parsed = profile.parse_dataset(&profile.dataset_graph(&ds), &profile.dataset_uri(&ds));

        prop_assert_eq!(&parsed.notes, &ds.notes);
        prop_assert_eq!(&parsed.is_version_of, &ds.is_version_of);
        prop_assert_eq!(parsed.creators("it").expect("creators"), creators);
        let expected: Vec<TemporalCoverage> = coverages.into_iter().map(TemporalCoverage::collapsed).collect();
        prop_assert_eq!(parsed.temporal_coverages().expect("coverage"), expected);
        prop_assert_eq!(parsed.theme_entries(), themes);
    }
}
