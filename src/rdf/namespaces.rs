//! Namespace and term constants for the ontologies used by DCAT-AP_IT.
//!
//! Each vocabulary is a module exposing its namespace as `NS` and one full
//! IRI constant per term, e.g. [`dct::TITLE`].

macro_rules! vocabulary {
    ($(#[$meta:meta])* $module:ident = $ns:literal { $($name:ident => $local:literal),* $(,)? }) => {
        $(#[$meta])*
        pub mod $module {
            /// Namespace IRI.
            pub const NS: &str = $ns;
            $(
                #[doc = concat!("`", $ns, $local, "`")]
                pub const $name: &str = concat!($ns, $local);
            )*
        }
    };
}

vocabulary! {
    /// RDF core.
    rdf = "http://www.w3.org/1999/02/22-rdf-syntax-ns#" {
        TYPE => "type",
        LANG_STRING => "langString",
    }
}

vocabulary! {
    /// RDF Schema.
    rdfs = "http://www.w3.org/2000/01/rdf-schema#" {
        LABEL => "label",
    }
}

vocabulary! {
    /// XML Schema datatypes.
    xsd = "http://www.w3.org/2001/XMLSchema#" {
        STRING => "string",
        DATE => "date",
        DATE_TIME => "dateTime",
        ANY_URI => "anyURI",
        INTEGER => "integer",
    }
}

vocabulary! {
    /// Dublin Core terms.
    dct = "http://purl.org/dc/terms/" {
        TITLE => "title",
        DESCRIPTION => "description",
        ISSUED => "issued",
        MODIFIED => "modified",
        IDENTIFIER => "identifier",
        LANGUAGE => "language",
        IS_VERSION_OF => "isVersionOf",
        CONFORMS_TO => "conformsTo",
        TEMPORAL => "temporal",
        PUBLISHER => "publisher",
        RIGHTS_HOLDER => "rightsHolder",
        CREATOR => "creator",
        SUBJECT => "subject",
        SPATIAL => "spatial",
        ACCRUAL_PERIODICITY => "accrualPeriodicity",
        FORMAT => "format",
        LICENSE => "license",
        TYPE => "type",
        LOCATION => "Location",
        PERIOD_OF_TIME => "PeriodOfTime",
        STANDARD => "Standard",
        LICENSE_DOCUMENT => "LicenseDocument",
    }
}

vocabulary! {
    /// Dublin Core elements 1.1.
    dc = "http://purl.org/dc/elements/1.1/" {
        IDENTIFIER => "identifier",
    }
}

vocabulary! {
    /// W3C Data Catalog vocabulary.
    dcat = "http://www.w3.org/ns/dcat#" {
        CATALOG => "Catalog",
        DATASET => "Dataset",
        DISTRIBUTION => "Distribution",
        THEME => "theme",
        THEME_TAXONOMY => "themeTaxonomy",
        LANDING_PAGE => "landingPage",
        CONTACT_POINT => "contactPoint",
        DISTRIBUTION_PROP => "distribution",
    }
}

vocabulary! {
    /// Italian application profile of DCAT-AP.
    dcatapit = "http://dati.gov.it/onto/dcatapit#" {
        CATALOG => "Catalog",
        DATASET => "Dataset",
        DISTRIBUTION => "Distribution",
        AGENT => "Agent",
        ORGANIZATION => "Organization",
        LICENSE_DOCUMENT => "LicenseDocument",
        STANDARD => "Standard",
        SUBTHEME => "subTheme",
        GEOGRAPHICAL_IDENTIFIER => "geographicalIdentifier",
        REFERENCE_DOCUMENTATION => "referenceDocumentation",
        REFERENCE_DOC => "referenceDoc",
    }
}

vocabulary! {
    /// Friend of a friend.
    foaf = "http://xmlns.com/foaf/0.1/" {
        NAME => "name",
        AGENT => "Agent",
        HOMEPAGE => "homepage",
    }
}

vocabulary! {
    /// Simple Knowledge Organization System.
    skos = "http://www.w3.org/2004/02/skos/core#" {
        CONCEPT => "Concept",
        CONCEPT_SCHEME => "ConceptScheme",
        PREF_LABEL => "prefLabel",
        IN_SCHEME => "inScheme",
        BROADER => "broader",
        NARROW_MATCH => "narrowMatch",
        EXACT_MATCH => "exactMatch",
        HAS_TOP_CONCEPT => "hasTopConcept",
        NOTATION => "notation",
    }
}

vocabulary! {
    /// Web Ontology Language.
    owl = "http://www.w3.org/2002/07/owl#" {
        VERSION_INFO => "versionInfo",
    }
}

vocabulary! {
    /// Asset Description Metadata Schema.
    adms = "http://www.w3.org/ns/adms#" {
        IDENTIFIER => "identifier",
        IDENTIFIER_CLASS => "Identifier",
    }
}

vocabulary! {
    /// schema.org.
    schema = "http://schema.org/" {
        START_DATE => "startDate",
        END_DATE => "endDate",
    }
}

vocabulary! {
    /// OWL-Time.
    time = "http://www.w3.org/2006/time#" {
        HAS_BEGINNING => "hasBeginning",
        HAS_END => "hasEnd",
        IN_XSD_DATE_TIME => "inXSDDateTime",
        IN_XSD_DATE => "inXSDDate",
        INSTANT => "Instant",
    }
}

vocabulary! {
    /// ISA core location vocabulary.
    locn = "http://www.w3.org/ns/locn#" {
        GEOGRAPHICAL_NAME => "geographicalName",
    }
}

vocabulary! {
    /// vCard ontology.
    vcard = "http://www.w3.org/2006/vcard/ns#" {
        KIND => "Kind",
        ORGANIZATION => "Organization",
        FN => "fn",
        HAS_EMAIL => "hasEmail",
        HAS_TELEPHONE => "hasTelephone",
        HAS_URL => "hasURL",
    }
}

vocabulary! {
    /// Italian core location vocabulary (w3id.org).
    clv = "https://w3id.org/italia/onto/CLV/" {
        REGION => "Region",
        HAS_RANK_ORDER => "hasRankOrder",
    }
}

vocabulary! {
    /// Legacy dati.gov.it namespace of the core location vocabulary.
    clvapit = "http://dati.gov.it/onto/clvapit#" {
        HAS_RANK_ORDER => "hasRankOrder",
    }
}

vocabulary! {
    /// Italian top level ontology.
    l0 = "https://w3id.org/italia/onto/l0/" {
        NAME => "name",
    }
}

/// Base IRI of the EU data-theme authority table.
pub const THEME_BASE_URI: &str = "http://publications.europa.eu/resource/authority/data-theme/";

/// Base IRI of the EU language authority table.
pub const LANG_BASE_URI: &str = "http://publications.europa.eu/resource/authority/language/";

/// Base IRI of the EU frequency authority table.
pub const FREQ_BASE_URI: &str = "http://publications.europa.eu/resource/authority/frequency/";

/// Base IRI of the EU file-type authority table.
pub const FORMAT_BASE_URI: &str = "http://publications.europa.eu/resource/authority/file-type/";

/// Base IRI of the EU place authority table.
pub const GEO_BASE_URI: &str = "http://publications.europa.eu/resource/authority/place/";
