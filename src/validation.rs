//! Validation of the structured dataset fields.
//!
//! Each validator checks one JSON-encoded field of a [`Dataset`] and returns
//! [`DcatError::InvalidField`] naming that field. Callers treat a failure as
//! local to the field: the field falls back to a safe default and the rest
//! of the dataset is processed normally.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::dataset::{Dataset, ThemeEntry};
use crate::error::{DcatError, Result};

/// Date-only formats accepted in catalog input.
const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%Y-%m-%d", "%d-%m-%y"];

/// Date-time formats accepted in catalog input and RDF literals.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses a date in any of the formats the catalog has used over time,
/// including `xsd:dateTime` values with a timezone.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    // chrono's %Y accepts short years; a four-digit year is required here
    // so that `29-11-16` is read as 2016 rather than year 16.
    let plausible = |d: &NaiveDate| d.year() >= 1000;
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok().filter(plausible))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                .map(|dt| dt.date())
                .filter(plausible)
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Normalizes a date to `YYYY-MM-DD`.
#[must_use]
pub fn normalize_date(value: &str) -> Option<String> {
    parse_date(value).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Returns true for absolute http(s) URLs.
#[must_use]
pub fn is_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn parse_array(field: &str, raw: &str) -> Result<Vec<serde_json::Map<String, Value>>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|_| DcatError::invalid_field(field, "invalid JSON payload"))?;
    let Value::Array(items) = value else {
        return Err(DcatError::invalid_field(field, "list expected"));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(DcatError::invalid_field(field, "each element should be an object")),
        })
        .collect()
}

fn is_text_or_localized(value: &Value) -> bool {
    match value {
        Value::String(_) | Value::Null => true,
        Value::Object(map) => map.values().all(Value::is_string),
        _ => false,
    }
}

/// Validates the conforms-to structure.
///
/// Every element needs a string `identifier`; `title` and `description` are
/// plain or localized text; `referenceDocumentation` is a list of URLs.
///
/// # Errors
///
/// Returns [`DcatError::InvalidField`] describing the first violation.
pub fn validate_conforms_to(raw: &str) -> Result<()> {
    const FIELD: &str = "conforms_to";
    const ALLOWED: [&str; 5] = [
        "identifier",
        "uri",
        "title",
        "description",
        "referenceDocumentation",
    ];

    for elm in parse_array(FIELD, raw)? {
        if let Some(key) = elm.keys().find(|k| !ALLOWED.contains(&k.as_str())) {
            return Err(DcatError::invalid_field(
                FIELD,
                format!("unexpected {key} key"),
            ));
        }
        if !matches!(elm.get("identifier"), Some(Value::String(_))) {
            return Err(DcatError::invalid_field(FIELD, "element should contain identifier"));
        }
        for prop in ["title", "description"] {
            if let Some(value) = elm.get(prop) {
                if !is_text_or_localized(value) {
                    return Err(DcatError::invalid_field(
                        FIELD,
                        format!("property {prop} is not valid type"),
                    ));
                }
            }
        }
        match elm.get("referenceDocumentation") {
            None | Some(Value::Null) => {},
            Some(Value::Array(docs)) => {
                for doc in docs {
                    match doc.as_str() {
                        Some(url) if is_url(url) => {},
                        _ => {
                            return Err(DcatError::invalid_field(
                                FIELD,
                                "referenceDocumentation should contain urls",
                            ))
                        },
                    }
                }
            },
            Some(_) => {
                return Err(DcatError::invalid_field(
                    FIELD,
                    "property referenceDocumentation is not valid type",
                ))
            },
        }
    }
    Ok(())
}

/// Validates the temporal coverage structure.
///
/// Each element needs a parseable `temporal_start`; `temporal_end` is
/// optional but must not precede the start.
///
/// # Errors
///
/// Returns [`DcatError::InvalidField`] describing the first violation.
pub fn validate_temporal_coverage(raw: &str) -> Result<()> {
    const FIELD: &str = "temporal_coverage";

    for elm in parse_array(FIELD, raw)? {
        let start = elm
            .get("temporal_start")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DcatError::invalid_field(FIELD, "temporal_start is required"))?;
        let start = parse_date(start).ok_or_else(|| {
            DcatError::invalid_field(FIELD, format!("invalid temporal_start {start}"))
        })?;
        match elm.get("temporal_end") {
            None | Some(Value::Null) => {},
            Some(Value::String(end)) if end.is_empty() => {},
            Some(Value::String(end)) => {
                let end_date = parse_date(end).ok_or_else(|| {
                    DcatError::invalid_field(FIELD, format!("invalid temporal_end {end}"))
                })?;
                if end_date < start {
                    return Err(DcatError::invalid_field(
                        FIELD,
                        "temporal_end before temporal_start",
                    ));
                }
            },
            Some(_) => return Err(DcatError::invalid_field(FIELD, "temporal_end should be a date")),
        }
    }
    Ok(())
}

/// Validates the alternate identifier structure.
///
/// # Errors
///
/// Returns [`DcatError::InvalidField`] describing the first violation.
pub fn validate_alternate_identifier(raw: &str) -> Result<()> {
    const FIELD: &str = "alternate_identifier";

    for elm in parse_array(FIELD, raw)? {
        match elm.get("identifier").and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => {},
            _ => return Err(DcatError::invalid_field(FIELD, "identifier is required")),
        }
        if let Some(agent) = elm.get("agent") {
            let Value::Object(agent) = agent else {
                return Err(DcatError::invalid_field(FIELD, "agent should be an object"));
            };
            if let Some(name) = agent.get("agent_name") {
                if !is_text_or_localized(name) {
                    return Err(DcatError::invalid_field(FIELD, "agent_name is not valid type"));
                }
            }
        }
    }
    Ok(())
}

/// Validates the creator structure.
///
/// # Errors
///
/// Returns [`DcatError::InvalidField`] describing the first violation.
pub fn validate_creator(raw: &str) -> Result<()> {
    const FIELD: &str = "creator";

    for elm in parse_array(FIELD, raw)? {
        if let Some(key) = elm
            .keys()
            .find(|k| !matches!(k.as_str(), "creator_identifier" | "creator_name"))
        {
            return Err(DcatError::invalid_field(FIELD, format!("unexpected {key} key")));
        }
        if let Some(name) = elm.get("creator_name") {
            if !is_text_or_localized(name) {
                return Err(DcatError::invalid_field(FIELD, "creator_name is not valid type"));
            }
        }
        if elm.get("creator_identifier").is_none() && elm.get("creator_name").is_none() {
            return Err(DcatError::invalid_field(FIELD, "empty creator"));
        }
    }
    Ok(())
}

/// Validates a theme aggregate: a non-empty list of entries with a theme
/// code, no theme repeated.
///
/// Subtheme membership is checked separately against the taxonomy, see
/// [`crate::subtheme::SubthemeTaxonomy::restrict`].
///
/// # Errors
///
/// Returns [`DcatError::InvalidField`] describing the first violation.
pub fn validate_themes(raw: &str) -> Result<Vec<ThemeEntry>> {
    const FIELD: &str = "themes_aggregate";

    let entries: Vec<ThemeEntry> = serde_json::from_str(raw)
        .map_err(|e| DcatError::invalid_field(FIELD, format!("invalid payload: {e}")))?;
    if entries.is_empty() {
        return Err(DcatError::invalid_field(FIELD, "at least one theme is required"));
    }
    let mut seen = Vec::new();
    for entry in &entries {
        if entry.theme.trim().is_empty() {
            return Err(DcatError::invalid_field(FIELD, "theme code is required"));
        }
        if seen.contains(&entry.theme.as_str()) {
            return Err(DcatError::invalid_field(
                FIELD,
                format!("duplicate theme {}", entry.theme),
            ));
        }
        seen.push(entry.theme.as_str());
    }
    Ok(entries)
}

/// Runs every structured-field validator that applies to `dataset`,
/// collecting all failures.
#[must_use]
pub fn validate_dataset(dataset: &Dataset) -> Vec<DcatError> {
    let checks: [(&str, fn(&str) -> Result<()>); 4] = [
        ("conforms_to", validate_conforms_to),
        ("temporal_coverage", validate_temporal_coverage),
        ("alternate_identifier", validate_alternate_identifier),
        ("creator", validate_creator),
    ];
    let mut errors: Vec<DcatError> = checks
        .iter()
        .filter_map(|(field, check)| dataset.field(field).and_then(|raw| check(raw).err()))
        .collect();
    if let Some(raw) = dataset.themes_aggregate.as_deref() {
        if let Err(err) = validate_themes(raw) {
            errors.push(err);
        }
    }
    errors
}
