//! Typed view of a catalog dataset record.
//!
//! The catalog stores a dataset as a dictionary of scalar fields, a list of
//! `{key, value}` extras and a list of resources. [`Dataset`] gives every field
//! the DCAT-AP_IT profile reads or writes a typed slot, keeps anything else in
//! [`Dataset::other`], and exposes the JSON-string-encoded structured fields
//! (`creator`, `conforms_to`, `alternate_identifier`, `temporal_coverage`,
//! `themes_aggregate`) through typed accessors.
//!
//! Structured fields stay raw strings on the record so that a malformed value
//! only breaks the accessor for that field, never the whole dataset.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::localization::{LocalizedFields, LocalizedText};

/// Key of the structured theme/subtheme aggregate.
pub const FIELD_THEMES_AGGREGATE: &str = "themes_aggregate";

/// Theme assigned when a dataset declares none.
pub const DEFAULT_THEME_KEY: &str = "OP_DATPRO";

/// Frequency assigned when a dataset declares none.
pub const DEFAULT_FREQ_CODE: &str = "UNKNOWN";

/// File type assigned when a resource format cannot be determined.
pub const DEFAULT_FORMAT_CODE: &str = "OP_DATPRO";

/// Scalar and JSON-encoded fields that may live either as first-class fields
/// or in the extras bag.
pub const MODELED_FIELDS: [&str; 22] = [
    "issued",
    "modified",
    "identifier",
    "frequency",
    "language",
    "is_version_of",
    "geographical_name",
    "geographical_geonames_url",
    "publisher_name",
    "publisher_identifier",
    "holder_name",
    "holder_identifier",
    "creator_name",
    "creator_identifier",
    "theme",
    FIELD_THEMES_AGGREGATE,
    "creator",
    "conforms_to",
    "alternate_identifier",
    "temporal_coverage",
    "license_id",
    "license_url",
];

/// A `{key, value}` pair of the extras bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extra {
    /// Extra key.
    pub key: String,
    /// Extra value.
    pub value: String,
}

impl Extra {
    /// Creates an extra.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A distribution of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    /// Catalog identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URI of the distribution node in RDF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Download or access URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free-text format label (`CSV`, `WMS`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Controlled file-type code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_format: Option<String>,
    /// Resolved license URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    /// Unmodeled attributes.
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

/// Catalog dataset record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Id of the owning organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_org: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    /// List-encoded language codes, see [`encode_list`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_version_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geographical_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geographical_geonames_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_identifier: Option<String>,
    /// Legacy single creator name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    /// Legacy single creator identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_identifier: Option<String>,

    /// Legacy plain theme list, or a pre-2.0 aggregate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// JSON array of [`ThemeEntry`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub themes_aggregate: Option<String>,
    /// JSON array of [`Creator`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// JSON array of [`ConformsTo`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conforms_to: Option<String>,
    /// JSON array of [`AlternateIdentifier`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_identifier: Option<String>,
    /// JSON array of [`TemporalCoverage`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_coverage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,

    pub extras: Vec<Extra>,
    pub resources: Vec<Resource>,

    /// Non-default-language values of dataset fields: field, then language.
    #[serde(
        rename = "DCATAPIT_MULTILANG_BASE",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub multilang: LocalizedFields,

    /// Non-default-language values of resource fields, keyed by resource URI.
    #[serde(
        rename = "DCATAPIT_MULTILANG_RESOURCES",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub resources_multilang: IndexMap<String, LocalizedFields>,

    /// Unmodeled attributes.
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

/// One entry of the structured creator list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    /// Identifier of the creator agent.
    #[serde(default)]
    pub creator_identifier: Option<String>,
    /// Name of the creator agent by language.
    #[serde(default)]
    pub creator_name: LocalizedText,
}

/// A standard the dataset conforms to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformsTo {
    /// Identifier of the standard.
    pub identifier: String,
    /// URI of the standard node, when it is not a blank node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Title by language.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub title: LocalizedText,
    /// Description by language.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub description: LocalizedText,
    /// Reference documentation URLs.
    #[serde(
        default,
        rename = "referenceDocumentation",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub reference_documentation: Vec<String>,
}

/// Agent that issued an alternate identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierAgent {
    /// Identifier of the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_identifier: Option<String>,
    /// Name of the agent by language.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub agent_name: LocalizedText,
}

impl IdentifierAgent {
    /// Returns true if neither identifier nor name is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agent_identifier.is_none() && self.agent_name.is_empty()
    }
}

/// An alternate identifier of the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateIdentifier {
    /// The identifier value.
    pub identifier: String,
    /// Issuing agent.
    #[serde(default)]
    pub agent: IdentifierAgent,
}

/// A temporal extent. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalCoverage {
    /// Start date.
    #[serde(default)]
    pub temporal_start: Option<String>,
    /// End date.
    #[serde(default)]
    pub temporal_end: Option<String>,
}

impl TemporalCoverage {
    /// Drops the end date when it equals the start date.
    #[must_use]
    pub fn collapsed(mut self) -> Self {
        if self.temporal_end.is_some() && self.temporal_end == self.temporal_start {
            self.temporal_end = None;
        }
        self
    }
}

/// A theme with the subthemes selected under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeEntry {
    /// Theme code (`AGRI`).
    pub theme: String,
    /// Subtheme URIs.
    #[serde(default)]
    pub subthemes: Vec<String>,
}

impl ThemeEntry {
    /// Creates an entry without subthemes.
    #[must_use]
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            subthemes: Vec::new(),
        }
    }
}

/// Encodes a list of codes the way the catalog stores multi-valued fields:
/// a single value as-is, several values comma-joined inside braces.
///
/// ```
/// use dcatapit::dataset::encode_list;
///
/// assert_eq!(encode_list(&["ITA"]), "ITA");
/// assert_eq!(encode_list(&["ITA", "ENG"]), "{ITA,ENG}");
/// ```
#[must_use]
pub fn encode_list<S: AsRef<str>>(values: &[S]) -> String {
    let joined = values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",");
    if values.len() > 1 {
        format!("{{{joined}}}")
    } else {
        joined
    }
}

/// Decodes a value written by [`encode_list`], tolerating stray whitespace.
#[must_use]
pub fn decode_list(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// Parses a JSON array, turning plain strings found under `localized_keys`
/// into `{lang: text}` maps so legacy single-language values load.
fn parse_json_array<T: for<'de> Deserialize<'de>>(
    raw: &str,
    localized_keys: &[&str],
    lang: &str,
) -> Result<Vec<T>> {
    let mut value: Value = serde_json::from_str(raw)?;
    if let Value::Array(items) = &mut value {
        for item in items.iter_mut() {
            let Value::Object(map) = item else { continue };
            for key in localized_keys {
                if let Some(Value::String(text)) = map.get(*key) {
                    let mut localized = serde_json::Map::new();
                    localized.insert(lang.to_string(), Value::String(text.clone()));
                    map.insert((*key).to_string(), Value::Object(localized));
                }
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}

fn encode_json<T: Serialize>(items: &[T]) -> Result<Option<String>> {
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(items)?))
}

impl Dataset {
    /// Creates an empty dataset with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parses a dataset from the catalog's JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a dataset object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the dataset in the catalog's JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns a label for log lines.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("---")
    }

    /// Returns a mutable slot for a modeled string field, by catalog key.
    pub fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            "title" => &mut self.title,
            "notes" => &mut self.notes,
            "issued" => &mut self.issued,
            "modified" => &mut self.modified,
            "identifier" => &mut self.identifier,
            "frequency" => &mut self.frequency,
            "language" => &mut self.language,
            "is_version_of" => &mut self.is_version_of,
            "geographical_name" => &mut self.geographical_name,
            "geographical_geonames_url" => &mut self.geographical_geonames_url,
            "publisher_name" => &mut self.publisher_name,
            "publisher_identifier" => &mut self.publisher_identifier,
            "holder_name" => &mut self.holder_name,
            "holder_identifier" => &mut self.holder_identifier,
            "creator_name" => &mut self.creator_name,
            "creator_identifier" => &mut self.creator_identifier,
            "theme" => &mut self.theme,
            FIELD_THEMES_AGGREGATE => &mut self.themes_aggregate,
            "creator" => &mut self.creator,
            "conforms_to" => &mut self.conforms_to,
            "alternate_identifier" => &mut self.alternate_identifier,
            "temporal_coverage" => &mut self.temporal_coverage,
            "license_id" => &mut self.license_id,
            "license_url" => &mut self.license_url,
            _ => return None,
        };
        Some(slot)
    }

    /// Returns a modeled string field, by catalog key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        let slot = match key {
            "title" => &self.title,
            "notes" => &self.notes,
            "issued" => &self.issued,
            "modified" => &self.modified,
            "identifier" => &self.identifier,
            "frequency" => &self.frequency,
            "language" => &self.language,
            "is_version_of" => &self.is_version_of,
            "geographical_name" => &self.geographical_name,
            "geographical_geonames_url" => &self.geographical_geonames_url,
            "publisher_name" => &self.publisher_name,
            "publisher_identifier" => &self.publisher_identifier,
            "holder_name" => &self.holder_name,
            "holder_identifier" => &self.holder_identifier,
            "creator_name" => &self.creator_name,
            "creator_identifier" => &self.creator_identifier,
            "theme" => &self.theme,
            FIELD_THEMES_AGGREGATE => &self.themes_aggregate,
            "creator" => &self.creator,
            "conforms_to" => &self.conforms_to,
            "alternate_identifier" => &self.alternate_identifier,
            "temporal_coverage" => &self.temporal_coverage,
            "license_id" => &self.license_id,
            "license_url" => &self.license_url,
            _ => return None,
        };
        slot.as_deref().filter(|v| !v.is_empty())
    }

    /// Returns the value of the first extra with `key`.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Removes every extra with `key`, returning the last value seen.
    pub fn take_extra(&mut self, key: &str) -> Option<String> {
        let mut taken = None;
        self.extras.retain(|e| {
            if e.key == key {
                taken = Some(e.value.clone());
                false
            } else {
                true
            }
        });
        taken
    }

    /// Replaces the value of extra `key`, appending it if absent.
    pub fn set_extra(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.extras.iter_mut().find(|e| e.key == key) {
            Some(extra) => extra.value = value,
            None => self.extras.push(Extra::new(key, value)),
        }
    }

    /// Returns the field value, or the extra with the same key.
    #[must_use]
    pub fn field_or_extra(&self, key: &str) -> Option<&str> {
        self.field(key)
            .or_else(|| self.extra(key).filter(|v| !v.is_empty()))
    }

    /// Moves modeled fields that were stored in the extras bag to their
    /// first-class slots. A first-class value already present wins and the
    /// extra is dropped.
    pub fn lift_extras(&mut self) {
        for key in MODELED_FIELDS {
            let Some(value) = self.take_extra(key) else {
                continue;
            };
            if let Some(slot) = self.field_mut(key) {
                if slot.as_deref().map_or(true, str::is_empty) {
                    *slot = Some(value);
                }
            }
        }
    }

    /// Decodes the structured creator list. An absent field is an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not a JSON creator array.
    pub fn creators(&self, lang: &str) -> Result<Vec<Creator>> {
        match self.field("creator") {
            Some(raw) => parse_json_array(raw, &["creator_name"], lang),
            None => Ok(Vec::new()),
        }
    }

    /// Stores the structured creator list; an empty list clears the field.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn set_creators(&mut self, creators: &[Creator]) -> Result<()> {
        self.creator = encode_json(creators)?;
        Ok(())
    }

    /// Decodes the conforms-to list.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not a JSON standards array.
    pub fn conforms_to_list(&self, lang: &str) -> Result<Vec<ConformsTo>> {
        match self.field("conforms_to") {
            Some(raw) => parse_json_array(raw, &["title", "description"], lang),
            None => Ok(Vec::new()),
        }
    }

    /// Stores the conforms-to list; an empty list clears the field.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn set_conforms_to(&mut self, standards: &[ConformsTo]) -> Result<()> {
        self.conforms_to = encode_json(standards)?;
        Ok(())
    }

    /// Decodes the alternate identifiers.
    ///
    /// A value that is not JSON is read as the legacy comma-separated list of
    /// bare identifiers.
    #[must_use]
    pub fn alternate_identifiers(&self, lang: &str) -> Vec<AlternateIdentifier> {
        self.field("alternate_identifier")
            .map(|raw| parse_alternate_identifiers(raw, lang))
            .unwrap_or_default()
    }

    /// Stores the alternate identifiers; an empty list clears the field.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn set_alternate_identifiers(&mut self, items: &[AlternateIdentifier]) -> Result<()> {
        self.alternate_identifier = encode_json(items)?;
        Ok(())
    }

    /// Decodes the temporal coverage list.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not a JSON coverage array.
    pub fn temporal_coverages(&self) -> Result<Vec<TemporalCoverage>> {
        match self.field("temporal_coverage") {
            Some(raw) => parse_json_array(raw, &[], ""),
            None => Ok(Vec::new()),
        }
    }

    /// Stores the temporal coverage list; an empty list clears the field.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn set_temporal_coverages(&mut self, items: &[TemporalCoverage]) -> Result<()> {
        self.temporal_coverage = encode_json(items)?;
        Ok(())
    }

    /// Returns the theme classification of the dataset.
    ///
    /// The aggregate field is preferred. Without it the plain `theme` field
    /// is read, either as a pre-2.0 JSON aggregate or as a list of codes.
    /// Unreadable values produce an empty list.
    #[must_use]
    pub fn theme_entries(&self) -> Vec<ThemeEntry> {
        if let Some(raw) = self.field_or_extra(FIELD_THEMES_AGGREGATE) {
            match serde_json::from_str::<Vec<ThemeEntry>>(raw) {
                Ok(entries) => return entries,
                Err(err) => warn!(
                    dataset = %self.display_name(),
                    error = %err,
                    "unreadable theme aggregate"
                ),
            }
        }
        match self.field_or_extra("theme") {
            Some(raw) => themes_from_str(raw),
            None => Vec::new(),
        }
    }

    /// Stores the theme aggregate and clears the legacy plain field.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn set_theme_entries(&mut self, entries: &[ThemeEntry]) -> Result<()> {
        self.themes_aggregate = Some(serde_json::to_string(entries)?);
        self.theme = None;
        Ok(())
    }
}

/// Reads alternate identifiers from a JSON array or from the legacy
/// comma-separated list of bare identifiers.
#[must_use]
pub fn parse_alternate_identifiers(raw: &str, lang: &str) -> Vec<AlternateIdentifier> {
    match parse_json_array(raw, &["agent_name"], lang) {
        Ok(items) => items,
        Err(_) => decode_list(raw)
            .into_iter()
            .map(|identifier| AlternateIdentifier {
                identifier,
                agent: IdentifierAgent::default(),
            })
            .collect(),
    }
}

/// Reads a theme value that is either a JSON aggregate or a plain code list.
#[must_use]
pub fn themes_from_str(raw: &str) -> Vec<ThemeEntry> {
    if let Ok(entries) = serde_json::from_str::<Vec<ThemeEntry>>(raw) {
        return entries;
    }
    if raw.trim_start().starts_with('[') {
        return Vec::new();
    }
    decode_list(raw).into_iter().map(ThemeEntry::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_list() {
        assert_eq!(encode_list::<&str>(&[]), "");
        assert_eq!(encode_list(&["AGRI"]), "AGRI");
        assert_eq!(encode_list(&["AGRI", "ECON"]), "{AGRI,ECON}");
        assert_eq!(decode_list("{AGRI, ECON}"), vec!["AGRI", "ECON"]);
        assert_eq!(decode_list("AGRI"), vec!["AGRI"]);
        assert!(decode_list("{}").is_empty());
    }

    #[test]
    fn test_dataset_json_shape() {
        let json = r#"{
            "name": "ds1",
            "title": "Dataset",
            "frequency": "ANNUAL",
            "extras": [{"key": "custom", "value": "x"}],
            "resources": [{"uri": "http://example.org/r1", "format": "CSV", "size": 10}],
            "DCATAPIT_MULTILANG_BASE": {"title": {"en": "Dataset EN"}},
            "state": "active"
        }"#;
        let ds = Dataset::from_json(json).expect("valid dataset");
        assert_eq!(ds.frequency.as_deref(), Some("ANNUAL"));
        assert_eq!(ds.resources[0].other.get("size"), Some(&Value::from(10)));
        assert_eq!(ds.multilang["title"]["en"], "Dataset EN");
        assert_eq!(ds.other.get("state"), Some(&Value::from("active")));

        let back = Dataset::from_json(&ds.to_json().expect("serializable")).expect("reparse");
        assert_eq!(back, ds);
    }

    #[test]
    fn test_lift_extras_moves_modeled_keys_only() {
        let mut ds = Dataset::named("ds");
        ds.identifier = Some("kept".into());
        ds.extras = vec![
            Extra::new("frequency", "MONTHLY"),
            Extra::new("identifier", "ignored"),
            Extra::new("custom", "stays"),
        ];
        ds.lift_extras();
        assert_eq!(ds.frequency.as_deref(), Some("MONTHLY"));
        assert_eq!(ds.identifier.as_deref(), Some("kept"));
        assert_eq!(ds.extras, vec![Extra::new("custom", "stays")]);
    }

    #[test]
    fn test_creators_accept_plain_names() {
        let mut ds = Dataset::named("ds");
        ds.creator = Some(r#"[{"creator_identifier": "c1", "creator_name": "Mario"}]"#.into());
        let creators = ds.creators("it").expect("readable");
        assert_eq!(creators[0].creator_name["it"], "Mario");
    }

    #[test]
    fn test_malformed_structured_field_is_contained() {
        let mut ds = Dataset::named("ds");
        ds.creator = Some("not json".into());
        ds.conforms_to = Some(r#"[{"identifier": "STD"}]"#.into());
        assert!(ds.creators("it").is_err());
        assert_eq!(ds.conforms_to_list("it").expect("readable")[0].identifier, "STD");
    }

    #[test]
    fn test_alternate_identifier_legacy_list() {
        let mut ds = Dataset::named("ds");
        ds.alternate_identifier = Some("ID1,ID2".into());
        let ids = ds.alternate_identifiers("it");
        assert_eq!(ids.len(), 2);
        assert!(ids[1].agent.is_empty());
        assert_eq!(
            serde_json::to_string(&ids[0]).expect("serializable"),
            r#"{"identifier":"ID1","agent":{}}"#
        );
    }

    #[test]
    fn test_theme_entries_sources() {
        let mut ds = Dataset::named("ds");
        assert!(ds.theme_entries().is_empty());

        ds.theme = Some("{AGRI,ECON}".into());
        let entries = ds.theme_entries();
        assert_eq!(entries, vec![ThemeEntry::new("AGRI"), ThemeEntry::new("ECON")]);

        ds.set_theme_entries(&[ThemeEntry {
            theme: "ENVI".into(),
            subthemes: vec!["http://eurovoc.europa.eu/100".into()],
        }])
        .expect("serializable");
        assert!(ds.theme.is_none());
        assert_eq!(ds.theme_entries()[0].subthemes.len(), 1);

        ds.themes_aggregate = Some("[{broken".into());
        assert!(ds.theme_entries().is_empty());
    }

    #[test]
    fn test_set_empty_list_clears_field() {
        let mut ds = Dataset::named("ds");
        ds.set_creators(&[Creator::default()]).expect("ok");
        assert!(ds.creator.is_some());
        ds.set_creators(&[]).expect("ok");
        assert!(ds.creator.is_none());
    }
}
