#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # DCAT-AP_IT: Italian application profile of DCAT
//!
//! Translation between catalog dataset records and RDF graphs following the
//! Italian DCAT-AP_IT profile, backed by the controlled vocabularies, the
//! license taxonomy and the subtheme taxonomy the profile refers to.
//!
//! ## Quick Start
//!
//! ### Loading controlled vocabularies
//!
//! ```ignore
//! use dcatapit::{ConceptSchemeLoader, DcatapitConfig, MemoryCatalog};
//! use dcatapit::loader::LoadTargets;
//!
//! let config = DcatapitConfig::from_path("dcatapit.json")?;
//! let loader = ConceptSchemeLoader::new(&config);
//! let report = loader.load_file("data-theme-skos.rdf", LoadTargets {
//!     vocabulary: &mut vocabulary,
//!     licenses: &mut licenses,
//!     subthemes: &mut subthemes,
//!     tags: &mut catalog,
//! })?;
//! println!("{} created, {} deleted", report.created, report.deleted);
//! ```
//!
//! ### Serializing a dataset
//!
//! ```ignore
//! use dcatapit::{ItalianProfile, RdfFormat};
//!
//! let profile = ItalianProfile::new(&config, &vocabulary, &licenses, &subthemes)
//!     .with_organizations(&catalog)
//!     .with_localization(&catalog);
//! let graph = profile.dataset_graph(&dataset);
//! println!("{}", graph.serialize(RdfFormat::Turtle)?);
//! ```
//!
//! ### Parsing a dataset
//!
//! ```ignore
//! let graph = RdfGraph::parse(&input, RdfFormat::RdfXml)?;
//! for dataset in profile.parse_graph(&graph) {
//!     println!("{}", dataset.display_name());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`profile`]: DCAT-AP_IT parsing and serialization
//! - [`dataset`]: Catalog dataset record and its structured fields
//! - [`vocabulary`]: Controlled vocabulary term store
//! - [`license`]: License taxonomy and fuzzy license resolution
//! - [`subtheme`]: Theme to subtheme taxonomy
//! - [`loader`]: Concept scheme import into the stores
//! - [`mapping`]: Theme to group and harvested theme mappings
//! - [`migration`]: Schema upgrades of stored datasets
//! - [`catalog`]: Catalog collaborator contracts and an in-memory catalog
//! - [`rdf`]: RDF graph, formats and namespaces
//! - [`validation`]: Date, URL and structured field validation
//! - [`localization`]: Language tags and localized text
//! - [`config`]: Configuration
//! - [`error`]: Error types and result type

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod error;
pub mod license;
pub mod loader;
pub mod localization;
pub mod mapping;
pub mod migration;
/// DCAT-AP_IT translation of dataset records.
///
/// See the [`profile`] module documentation for the parse and serialize
/// contracts.
pub mod profile;
pub mod rdf;
pub mod subtheme;
pub mod validation;
pub mod vocabulary;

pub use catalog::{
    DatasetStore, GroupRegistry, LocalizationStore, MemoryCatalog, Organization, OrganizationLookup,
    OrganizationStore, SiteUser, TagRegistry,
};
pub use config::DcatapitConfig;
pub use dataset::{
    AlternateIdentifier, ConformsTo, Creator, Dataset, Extra, IdentifierAgent, Resource, TemporalCoverage,
    ThemeEntry,
};
pub use error::{DcatError, Result};
pub use license::{License, LicenseData, LicenseTaxonomy};
pub use loader::{ConceptScheme, ConceptSchemeLoader, LoadReport};
pub use mapping::{ThemeGroupMapping, ThemeMapping};
pub use migration::{BatchOptions, MigrationReport, Migrator, ThemeMigrationReport};
pub use profile::ItalianProfile;
pub use rdf::{RdfFormat, RdfGraph, RdfNode, RdfTriple};
pub use subtheme::{Subtheme, SubthemeTaxonomy};
pub use vocabulary::VocabularyStore;
