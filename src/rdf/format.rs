//! RDF serialization formats.

use std::fmt;
use std::path::Path;

/// Serialization format of an RDF document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum RdfFormat {
    /// RDF/XML format (application/rdf+xml) - what the EU and Italian vocabularies ship as
    #[default]
    RdfXml,
    /// JSON-LD format (application/ld+json)
    JsonLd,
    /// Turtle format (text/turtle)
    Turtle,
    /// N-Triples format (application/n-triples)
    NTriples,
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RdfXml => write!(f, "RDF/XML"),
            Self::JsonLd => write!(f, "JSON-LD"),
            Self::Turtle => write!(f, "Turtle"),
            Self::NTriples => write!(f, "N-Triples"),
        }
    }
}

impl RdfFormat {
    /// Returns the MIME type for this RDF format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::RdfXml => "application/rdf+xml",
            Self::JsonLd => "application/ld+json",
            Self::Turtle => "text/turtle",
            Self::NTriples => "application/n-triples",
        }
    }

    /// Returns the typical file extension for this RDF format.
    #[must_use]
    pub const fn file_extension(&self) -> &'static str {
        match self {
            Self::RdfXml => "rdf",
            Self::JsonLd => "jsonld",
            Self::Turtle => "ttl",
            Self::NTriples => "nt",
        }
    }

    /// Guesses the format from a file extension.
    ///
    /// Unknown or missing extensions fall back to RDF/XML, the format every
    /// published controlled vocabulary is distributed in.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("ttl" | "turtle") => Self::Turtle,
            Some("nt" | "ntriples") => Self::NTriples,
            Some("jsonld" | "json") => Self::JsonLd,
            _ => Self::RdfXml,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(
            RdfFormat::from_path(Path::new("licences.ttl")),
            RdfFormat::Turtle
        );
        assert_eq!(
            RdfFormat::from_path(Path::new("data-theme-skos.rdf")),
            RdfFormat::RdfXml
        );
        assert_eq!(RdfFormat::from_path(Path::new("dump.NT")), RdfFormat::NTriples);
        assert_eq!(RdfFormat::from_path(Path::new("noext")), RdfFormat::RdfXml);
    }

    #[test]
    fn test_display_and_mime() {
        assert_eq!(RdfFormat::Turtle.to_string(), "Turtle");
        assert_eq!(RdfFormat::RdfXml.mime_type(), "application/rdf+xml");
        assert_eq!(RdfFormat::JsonLd.file_extension(), "jsonld");
    }
}
