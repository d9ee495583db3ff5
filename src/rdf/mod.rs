//! RDF graph model, formats and ontology namespaces.
//!
//! The graph is a thin layer over `oxrdf`/`oxrdfio`: it stores triples in
//! insertion order with set semantics and offers the small query surface the
//! profile translator and the concept-scheme loader need.

mod format;
mod graph;
pub mod namespaces;

pub use format::RdfFormat;
pub use graph::{GraphIndex, RdfGraph, RdfNode, RdfTriple};

/// Returns the last `/`-separated segment of an IRI.
///
/// `http://publications.europa.eu/resource/authority/data-theme/AGRI` yields `AGRI`.
#[must_use]
pub fn last_segment(uri: &str) -> &str {
    uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri)
}

/// Strips `base` from the start of `uri`, returning `uri` unchanged when it
/// does not start with it.
#[must_use]
pub fn strip_base<'a>(uri: &'a str, base: &str) -> &'a str {
    uri.strip_prefix(base).unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_segment() {
        assert_eq!(
            last_segment("http://publications.europa.eu/resource/authority/data-theme/AGRI"),
            "AGRI"
        );
        assert_eq!(last_segment("http://creativecommons.org/licenses/by/4.0/"), "4.0");
        assert_eq!(last_segment("plain"), "plain");
    }

    #[test]
    fn test_strip_base() {
        assert_eq!(
            strip_base(
                "http://publications.europa.eu/resource/authority/frequency/ANNUAL",
                namespaces::FREQ_BASE_URI
            ),
            "ANNUAL"
        );
        assert_eq!(strip_base("ANNUAL", namespaces::FREQ_BASE_URI), "ANNUAL");
    }
}
