//! In-memory RDF graph backed by oxrdf/oxrdfio.
//!
//! [`RdfGraph`] is a set of triples kept in insertion order. Adding a triple
//! that is already present is a no-op, which is what makes repeated
//! serialization of the same dataset converge to the same graph.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use indexmap::IndexSet;
use oxrdf::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Quad, Term, Triple};
use oxrdfio::{JsonLdProfileSet, RdfFormat as OxRdfFormat, RdfParser, RdfSerializer};

use crate::error::{DcatError, Result};

use super::format::RdfFormat;
use super::namespaces::{rdf, xsd};

/// A single RDF triple (subject, predicate, object).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfTriple {
    /// The subject of the triple.
    pub subject: RdfNode,
    /// The predicate (property) of the triple.
    pub predicate: String,
    /// The object of the triple.
    pub object: RdfNode,
}

impl RdfTriple {
    /// Creates a new RDF triple.
    #[must_use]
    pub fn new(subject: RdfNode, predicate: impl Into<String>, object: RdfNode) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

/// An RDF node (subject or object in a triple).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfNode {
    /// A named node (IRI/URI).
    Uri(String),
    /// A blank node with a local identifier.
    BlankNode(String),
    /// A literal value with optional language tag or datatype.
    Literal {
        /// The literal value.
        value: String,
        /// Optional language tag (e.g., "it", "en").
        language: Option<String>,
        /// Optional datatype URI. `None` means `xsd:string`.
        datatype: Option<String>,
    },
}

impl RdfNode {
    /// Creates a new URI node.
    #[must_use]
    pub fn uri(uri: impl Into<String>) -> Self {
        Self::Uri(uri.into())
    }

    /// Creates a new blank node.
    #[must_use]
    pub fn blank(id: impl Into<String>) -> Self {
        Self::BlankNode(id.into())
    }

    /// Creates a new plain literal.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    /// Creates a new literal with a language tag.
    #[must_use]
    pub fn literal_with_lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: Some(lang.into()),
            datatype: None,
        }
    }

    /// Creates a new typed literal.
    #[must_use]
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: None,
            datatype: Some(datatype.into()),
        }
    }

    /// Returns true if this is a URI node.
    #[must_use]
    pub const fn is_uri(&self) -> bool {
        matches!(self, Self::Uri(_))
    }

    /// Returns true if this is a blank node.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    /// Returns true if this is a literal.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }

    /// Returns the IRI of a URI node.
    #[must_use]
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Self::Uri(uri) => Some(uri),
            _ => None,
        }
    }

    /// Returns the lexical form: the IRI, the blank node id or the literal value.
    #[must_use]
    pub fn lexical(&self) -> &str {
        match self {
            Self::Uri(s) | Self::BlankNode(s) => s,
            Self::Literal { value, .. } => value,
        }
    }

    /// Returns the language tag of a literal, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Literal { language, .. } => language.as_deref(),
            _ => None,
        }
    }
}

/// An RDF graph containing a set of triples.
#[derive(Debug, Clone, Default)]
pub struct RdfGraph {
    /// The triples in this graph, in insertion order.
    triples: IndexSet<RdfTriple>,
    /// Counter for generating unique blank node IDs.
    blank_node_counter: usize,
}

impl RdfGraph {
    /// Creates a new empty RDF graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a triple to the graph. Returns false if it was already present.
    pub fn add_triple(&mut self, triple: RdfTriple) -> bool {
        self.triples.insert(triple)
    }

    /// Adds a triple from components. Returns false if it was already present.
    pub fn add(&mut self, subject: RdfNode, predicate: impl Into<String>, object: RdfNode) -> bool {
        self.add_triple(RdfTriple::new(subject, predicate, object))
    }

    /// Generates a blank node whose id is not used anywhere in the graph.
    pub fn new_blank_node(&mut self) -> RdfNode {
        loop {
            self.blank_node_counter += 1;
            let candidate = RdfNode::blank(format!("n{}", self.blank_node_counter));
            let used = self
                .triples
                .iter()
                .any(|t| t.subject == candidate || t.object == candidate);
            if !used {
                return candidate;
            }
        }
    }

    /// Returns the number of triples in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Returns true if the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Returns an iterator over the triples.
    pub fn triples(&self) -> impl Iterator<Item = &RdfTriple> {
        self.triples.iter()
    }

    /// Returns true if the exact triple is present.
    #[must_use]
    pub fn contains(&self, subject: &RdfNode, predicate: &str, object: &RdfNode) -> bool {
        self.triples.contains(&RdfTriple::new(
            subject.clone(),
            predicate,
            object.clone(),
        ))
    }

    /// Returns the objects of all triples matching `(subject, predicate, ?)`.
    pub fn objects<'a>(
        &'a self,
        subject: &'a RdfNode,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a RdfNode> + 'a {
        self.triples
            .iter()
            .filter(move |t| &t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// Returns the first object matching `(subject, predicate, ?)`.
    #[must_use]
    pub fn value<'a>(&'a self, subject: &'a RdfNode, predicate: &'a str) -> Option<&'a RdfNode> {
        self.objects(subject, predicate).next()
    }

    /// Returns the subjects of all triples matching `(?, predicate, object)`.
    pub fn subjects<'a>(
        &'a self,
        predicate: &'a str,
        object: &'a RdfNode,
    ) -> impl Iterator<Item = &'a RdfNode> + 'a {
        self.triples
            .iter()
            .filter(move |t| t.predicate == predicate && &t.object == object)
            .map(|t| &t.subject)
    }

    /// Returns the distinct subjects typed with `class_uri`, in graph order.
    #[must_use]
    pub fn subjects_of_type(&self, class_uri: &str) -> Vec<RdfNode> {
        let class = RdfNode::uri(class_uri);
        let mut seen = IndexSet::new();
        for subject in self.subjects(rdf::TYPE, &class) {
            seen.insert(subject.clone());
        }
        seen.into_iter().collect()
    }

    /// Removes a single triple. Returns true if it was present.
    pub fn remove(&mut self, subject: &RdfNode, predicate: &str, object: &RdfNode) -> bool {
        self.triples
            .shift_remove(&RdfTriple::new(subject.clone(), predicate, object.clone()))
    }

    /// Removes every triple matching the pattern; `None` matches anything.
    ///
    /// Returns the number of triples removed.
    pub fn remove_matching(
        &mut self,
        subject: Option<&RdfNode>,
        predicate: Option<&str>,
        object: Option<&RdfNode>,
    ) -> usize {
        let before = self.triples.len();
        self.triples.retain(|t| {
            !(subject.map_or(true, |s| &t.subject == s)
                && predicate.map_or(true, |p| t.predicate == p)
                && object.map_or(true, |o| &t.object == o))
        });
        before - self.triples.len()
    }

    /// Removes every triple whose subject is `node`, then recursively the
    /// description of any blank node it pointed to that is no longer
    /// referenced by another triple.
    ///
    /// Returns the number of triples removed.
    pub fn remove_subtree(&mut self, node: &RdfNode) -> usize {
        let children: Vec<RdfNode> = self
            .triples
            .iter()
            .filter(|t| &t.subject == node && t.object.is_blank())
            .map(|t| t.object.clone())
            .collect();
        let mut removed = self.remove_matching(Some(node), None, None);
        for child in children {
            let still_referenced = self.triples.iter().any(|t| t.object == child);
            if !still_referenced {
                removed += self.remove_subtree(&child);
            }
        }
        removed
    }

    /// Detaches every object of `(subject, predicate, ?)` and drops the
    /// blank-node descriptions left dangling.
    ///
    /// Returns the number of triples removed.
    pub fn remove_property(&mut self, subject: &RdfNode, predicate: &str) -> usize {
        let targets: Vec<RdfNode> = self.objects(subject, predicate).cloned().collect();
        let mut removed = self.remove_matching(Some(subject), Some(predicate), None);
        for target in targets.iter().filter(|t| t.is_blank()) {
            if !self.triples.iter().any(|t| &t.object == target) {
                removed += self.remove_subtree(target);
            }
        }
        removed
    }

    /// Builds a subject index for repeated lookups over a large graph.
    #[must_use]
    pub fn index(&self) -> GraphIndex<'_> {
        GraphIndex::new(self)
    }

    /// Serializes the graph to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self, format: RdfFormat) -> Result<String> {
        let mut output = Vec::new();
        self.serialize_to_writer(&mut output, format)?;
        String::from_utf8(output).map_err(|e| DcatError::ParseError(e.to_string()))
    }

    /// Serializes the graph to a writer in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if a node cannot be represented or writing fails.
    pub fn serialize_to_writer<W: Write>(&self, writer: W, format: RdfFormat) -> Result<()> {
        let ox_format = to_oxrdf_format(format);
        let mut serializer = RdfSerializer::from_format(ox_format).for_writer(writer);

        for triple in &self.triples {
            let ox_triple = to_oxrdf_triple(triple)?;
            serializer.serialize_triple(&ox_triple).map_err(|e| {
                DcatError::IoError(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    e.to_string(),
                ))
            })?;
        }

        serializer.finish().map_err(|e| {
            DcatError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            ))
        })?;

        Ok(())
    }

    /// Parses an RDF graph from a reader in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn parse_from_reader<R: Read>(reader: R, format: RdfFormat) -> Result<Self> {
        let ox_format = to_oxrdf_format(format);
        let parser = RdfParser::from_format(ox_format).for_reader(reader);

        let mut graph = Self::new();

        for result in parser {
            let quad = result.map_err(|e| DcatError::ParseError(e.to_string()))?;
            let triple = from_oxrdf_quad(&quad)?;
            graph.add_triple(triple);
        }

        Ok(graph)
    }

    /// Parses an RDF graph from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn parse(input: &str, format: RdfFormat) -> Result<Self> {
        Self::parse_from_reader(input.as_bytes(), format)
    }

    /// Parses an RDF file, guessing the format from its extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = RdfFormat::from_path(path);
        let file = File::open(path)?;
        Self::parse_from_reader(BufReader::new(file), format)
    }
}

/// Read-only subject index over an [`RdfGraph`].
///
/// Lookups are constant time per subject, which matters when walking a
/// Eurovoc dump with hundreds of thousands of triples.
#[derive(Debug)]
pub struct GraphIndex<'a> {
    by_subject: HashMap<&'a RdfNode, Vec<&'a RdfTriple>>,
}

impl<'a> GraphIndex<'a> {
    fn new(graph: &'a RdfGraph) -> Self {
        let mut by_subject: HashMap<&'a RdfNode, Vec<&'a RdfTriple>> = HashMap::new();
        for triple in graph.triples() {
            by_subject.entry(&triple.subject).or_default().push(triple);
        }
        Self { by_subject }
    }

    /// Returns the objects of `(subject, predicate, ?)`.
    pub fn objects(
        &self,
        subject: &RdfNode,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a RdfNode> + '_ {
        self.by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// Returns the first object of `(subject, predicate, ?)`.
    #[must_use]
    pub fn value(&self, subject: &RdfNode, predicate: &'a str) -> Option<&'a RdfNode> {
        self.objects(subject, predicate).next()
    }
}

/// Converts our [`RdfFormat`] to oxrdfio's format.
fn to_oxrdf_format(format: RdfFormat) -> OxRdfFormat {
    match format {
        RdfFormat::RdfXml => OxRdfFormat::RdfXml,
        RdfFormat::JsonLd => OxRdfFormat::JsonLd {
            profile: JsonLdProfileSet::default(),
        },
        RdfFormat::Turtle => OxRdfFormat::Turtle,
        RdfFormat::NTriples => OxRdfFormat::NTriples,
    }
}

/// Converts an [`RdfTriple`] to an oxrdf Triple.
fn to_oxrdf_triple(triple: &RdfTriple) -> Result<Triple> {
    let subject = match &triple.subject {
        RdfNode::Uri(uri) => NamedOrBlankNode::NamedNode(
            NamedNode::new(uri).map_err(|e| DcatError::ParseError(format!("Invalid URI: {e}")))?,
        ),
        RdfNode::BlankNode(id) => NamedOrBlankNode::BlankNode(
            BlankNode::new(id)
                .map_err(|e| DcatError::ParseError(format!("Invalid blank node ID: {e}")))?,
        ),
        RdfNode::Literal { .. } => {
            return Err(DcatError::ParseError(
                "Literals cannot be triple subjects".into(),
            ));
        },
    };

    let predicate = NamedNode::new(&triple.predicate)
        .map_err(|e| DcatError::ParseError(format!("Invalid predicate URI: {e}")))?;

    let object = match &triple.object {
        RdfNode::Uri(uri) => Term::NamedNode(
            NamedNode::new(uri).map_err(|e| DcatError::ParseError(format!("Invalid URI: {e}")))?,
        ),
        RdfNode::BlankNode(id) => Term::BlankNode(
            BlankNode::new(id)
                .map_err(|e| DcatError::ParseError(format!("Invalid blank node ID: {e}")))?,
        ),
        RdfNode::Literal {
            value,
            language,
            datatype,
        } => {
            let lit = if let Some(lang) = language {
                Literal::new_language_tagged_literal(value, lang)
                    .map_err(|e| DcatError::ParseError(format!("Invalid language tag: {e}")))?
            } else if let Some(dt) = datatype {
                let dt_node = NamedNode::new(dt)
                    .map_err(|e| DcatError::ParseError(format!("Invalid datatype URI: {e}")))?;
                Literal::new_typed_literal(value, dt_node)
            } else {
                Literal::new_simple_literal(value)
            };
            Term::Literal(lit)
        },
    };

    Ok(Triple::new(subject, predicate, object))
}

/// Converts an oxrdf Quad back to our [`RdfTriple`].
fn from_oxrdf_quad(quad: &Quad) -> Result<RdfTriple> {
    let subject = match &quad.subject {
        NamedOrBlankNode::NamedNode(n) => RdfNode::Uri(n.as_str().to_string()),
        NamedOrBlankNode::BlankNode(b) => RdfNode::BlankNode(b.as_str().to_string()),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(DcatError::ParseError("Unsupported subject type".into()));
        },
    };

    let predicate = quad.predicate.as_str().to_string();

    let object = match &quad.object {
        Term::NamedNode(n) => RdfNode::Uri(n.as_str().to_string()),
        Term::BlankNode(b) => RdfNode::BlankNode(b.as_str().to_string()),
        Term::Literal(lit) => {
            let value = lit.value().to_string();
            let language = lit.language().map(|l| l.to_ascii_lowercase());
            let dt = lit.datatype().as_str();
            let datatype = if language.is_none() && dt != xsd::STRING && dt != rdf::LANG_STRING {
                Some(dt.to_string())
            } else {
                None
            };
            RdfNode::Literal {
                value,
                language,
                datatype,
            }
        },
        #[allow(unreachable_patterns)]
        _ => {
            return Err(DcatError::ParseError("Unsupported object type".into()));
        },
    };

    Ok(RdfTriple::new(subject, predicate, object))
}
