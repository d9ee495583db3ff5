//! Theme based mappings.
//!
//! Two mapping files are supported:
//!
//! - the theme to group mapping assigns datasets to catalog groups
//!   according to their themes. It is an INI-style file with a
//!   `[dcatapit:theme_group_mapping]` section; each key is a theme code and
//!   each value a list of group names, separated by commas or newlines:
//!
//!   ```ini
//!   [dcatapit:theme_group_mapping]
//!   ECON = economy01, economy02
//!   SOCI = society
//!       economy01
//!   ```
//!
//! - the non-conformant theme mapping rewrites the group names of records
//!   harvested from catalogs that do not use the EU themes into theme
//!   codes. It is either JSON (`{"data": [{"syn": [to, from...]}]}`) or INI
//!   with a `[dcatapit:terms_theme_mapping]` section.

use std::fs;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::GroupRegistry;
use crate::config::DcatapitConfig;
use crate::dataset::{encode_list, Dataset};
use crate::error::{DcatError, Result};

/// INI section of the theme to group mapping.
pub const THEME_GROUP_SECTION: &str = "dcatapit:theme_group_mapping";

/// INI section of the non-conformant theme mapping.
pub const TERMS_THEME_SECTION: &str = "dcatapit:terms_theme_mapping";

lazy_static! {
    static ref SECTION: Regex = Regex::new(r"^\[\s*(?P<name>[^\]]+?)\s*\]\s*$").expect("valid regex");
    static ref OPTION: Regex = Regex::new(r"^(?P<key>[^=:\s][^=:]*?)\s*[=:]\s*(?P<value>.*)$").expect("valid regex");
}

/// Reads the options of one section of an INI document.
///
/// Indented lines continue the previous value and are joined with a
/// newline. Lines starting with `#` or `;` are comments. Returns `None` when
/// the section is absent.
fn ini_section(text: &str, section: &str) -> Option<IndexMap<String, String>> {
    let mut options: IndexMap<String, String> = IndexMap::new();
    let mut found = false;
    let mut in_section = false;
    let mut current: Option<String> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        if let Some(caps) = SECTION.captures(trimmed) {
            in_section = &caps["name"] == section;
            found |= in_section;
            current = None;
            continue;
        }
        if !in_section {
            continue;
        }
        if trimmed.is_empty() {
            current = None;
            continue;
        }
        let continuation = line.starts_with([' ', '\t']);
        match (&current, continuation) {
            (Some(key), true) => {
                if let Some(value) = options.get_mut(key) {
                    value.push('\n');
                    value.push_str(trimmed);
                }
            },
            _ => match OPTION.captures(trimmed) {
                Some(caps) => {
                    let key = caps["key"].trim().to_string();
                    options.insert(key.clone(), caps["value"].trim().to_string());
                    current = Some(key);
                },
                None => {
                    debug!(line = trimmed, "unreadable mapping line, skipped");
                    current = None;
                },
            },
        }
    }
    found.then_some(options)
}

/// Splits a mapping value on commas and newlines.
fn split_values(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Theme code to catalog groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeGroupMapping {
    groups: IndexMap<String, Vec<String>>,
}

impl ThemeGroupMapping {
    /// Parses the INI mapping. Theme codes keep their case.
    ///
    /// # Errors
    ///
    /// Returns [`DcatError::MissingConfiguration`] if the document has no
    /// `[dcatapit:theme_group_mapping]` section.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let section = ini_section(text, THEME_GROUP_SECTION).ok_or_else(|| {
            DcatError::MissingConfiguration(format!("section [{THEME_GROUP_SECTION}]"))
        })?;
        let groups = section
            .into_iter()
            .map(|(theme, value)| (theme, split_values(&value)))
            .collect();
        Ok(Self { groups })
    }

    /// Reads the mapping from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or has no mapping section.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mapping = Self::from_ini_str(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), themes = mapping.len(), "theme to group mapping read");
        Ok(mapping)
    }

    /// Reads the mapping file named in the configuration.
    ///
    /// Returns `Ok(None)` when no file is configured, or when the configured
    /// file does not exist (logged as a warning).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_config(config: &DcatapitConfig) -> Result<Option<Self>> {
        let Some(path) = config.theme_group_mapping_file.as_deref() else {
            return Ok(None);
        };
        if !path.exists() {
            warn!(path = %path.display(), "cannot read theme mapping, no such file");
            return Ok(None);
        }
        Self::from_path(path).map(Some)
    }

    /// Number of mapped themes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no theme is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups mapped to `theme`.
    #[must_use]
    pub fn groups_for(&self, theme: &str) -> &[String] {
        self.groups.get(theme).map_or(&[], Vec::as_slice)
    }

    /// Assigns `dataset` to the groups mapped to its themes.
    ///
    /// Missing groups are created when `add_new_groups` is set and skipped
    /// otherwise. With `clean_existing` the dataset is first removed from
    /// every group. Returns the groups the dataset was added to.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry fails to create or assign a group.
    pub fn populate_theme_groups(
        &self,
        dataset: &Dataset,
        registry: &mut dyn GroupRegistry,
        add_new_groups: bool,
        clean_existing: bool,
    ) -> Result<Vec<String>> {
        let Some(dataset_id) = dataset.id.as_deref().or(dataset.name.as_deref()) else {
            return Err(DcatError::invalid_field("id", "dataset has no id"));
        };
        let themes = dataset.theme_entries();
        if themes.is_empty() {
            debug!(dataset = %dataset.display_name(), "no theme, no groups");
            return Ok(Vec::new());
        }
        if self.is_empty() {
            warn!("theme to group map is empty");
            return Ok(Vec::new());
        }

        let wanted: IndexSet<&str> = themes
            .iter()
            .flat_map(|entry| self.groups_for(&entry.theme))
            .map(String::as_str)
            .collect();
        if clean_existing {
            registry.clear_dataset_groups(dataset_id);
        }

        let mut assigned = Vec::new();
        for group in wanted {
            if !registry.group_exists(group) {
                if !add_new_groups {
                    debug!(group, "mapped group does not exist, skipped");
                    continue;
                }
                registry.create_group(group)?;
                info!(group, "group created from theme mapping");
            }
            registry.add_dataset_to_group(dataset_id, group)?;
            assigned.push(group.to_string());
        }
        debug!(dataset = %dataset.display_name(), groups = ?assigned, "theme groups assigned");
        Ok(assigned)
    }
}

#[derive(Debug, Deserialize)]
struct SynonymFile {
    data: Vec<SynonymEntry>,
}

#[derive(Debug, Deserialize)]
struct SynonymEntry {
    syn: Vec<String>,
}

/// Source group names of harvested records to theme codes.
///
/// Group names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeMapping {
    themes: IndexMap<String, Vec<String>>,
}

impl ThemeMapping {
    fn insert(&mut self, from: &str, to: &str) {
        let targets = self.themes.entry(from.trim().to_lowercase()).or_default();
        if !targets.iter().any(|t| t == to) {
            targets.push(to.to_string());
        }
    }

    /// Parses the JSON synonym list: the first element of each `syn` array
    /// is the theme, the others are the names mapped to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not have the expected shape.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: SynonymFile = serde_json::from_str(text)?;
        let mut mapping = Self::default();
        for entry in file.data {
            let Some((to, from)) = entry.syn.split_first() else {
                continue;
            };
            for name in from {
                mapping.insert(name, to);
            }
        }
        Ok(mapping)
    }

    /// Parses the INI mapping: each key is a source name and each value a
    /// list of themes.
    ///
    /// # Errors
    ///
    /// Returns [`DcatError::MissingConfiguration`] if the document has no
    /// `[dcatapit:terms_theme_mapping]` section.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let section = ini_section(text, TERMS_THEME_SECTION).ok_or_else(|| {
            DcatError::MissingConfiguration(format!("section [{TERMS_THEME_SECTION}]"))
        })?;
        let mut mapping = Self::default();
        for (from, value) in section {
            for to in split_values(&value) {
                mapping.insert(&from, &to);
            }
        }
        Ok(mapping)
    }

    /// Reads a mapping file; `.json` files are read as JSON, anything else
    /// as INI.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mapping = if path.extension().is_some_and(|e| e == "json") {
            Self::from_json_str(&text)?
        } else {
            Self::from_ini_str(&text)?
        };
        info!(path = %path.display(), names = mapping.len(), "theme mapping read");
        Ok(mapping)
    }

    /// Number of mapped names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.themes.len()
    }

    /// Returns true if no name is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Themes mapped to a source name.
    #[must_use]
    pub fn themes_for(&self, name: &str) -> &[String] {
        self.themes
            .get(&name.trim().to_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Replaces source names with their mapped themes.
    ///
    /// Unmapped names are kept when `keep_unmapped` is set and dropped
    /// otherwise. Returns `None` when nothing would change.
    #[must_use]
    pub fn new_themes<S: AsRef<str>>(&self, names: &[S], keep_unmapped: bool) -> Option<Vec<String>> {
        let mut out: IndexSet<String> = IndexSet::new();
        for name in names {
            let name = name.as_ref();
            match self.themes_for(name) {
                [] if keep_unmapped => {
                    out.insert(name.to_string());
                },
                [] => {},
                mapped => out.extend(mapped.iter().cloned()),
            }
        }
        let before: IndexSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        let unchanged = out.len() == before.len() && out.iter().all(|t| before.contains(t.as_str()));
        (!out.is_empty() && !unchanged).then(|| out.into_iter().collect())
    }

    /// Sets the `theme` of a harvested record from its source groups.
    ///
    /// The record's groups are read from the unmodeled `groups` key, a list
    /// of objects with a `name` and an optional `display_name`. Themes are
    /// upper-cased and stored list-encoded both in the `theme` field and in
    /// the `theme` extra. Returns true if the record was changed.
    pub fn map_nonconformant_groups(&self, dataset: &mut Dataset) -> bool {
        let Some(Value::Array(groups)) = dataset.other.get("groups") else {
            return false;
        };
        let mut names: Vec<&str> = groups
            .iter()
            .filter_map(|g| g.get("name").and_then(Value::as_str))
            .collect();
        names.extend(
            groups
                .iter()
                .filter_map(|g| g.get("display_name").and_then(Value::as_str)),
        );
        let Some(themes) = self.new_themes(&names, false) else {
            return false;
        };
        let value = encode_list(&themes).to_uppercase();
        debug!(dataset = %dataset.display_name(), theme = %value, "harvested groups mapped to themes");
        dataset.set_extra("theme", value.clone());
        dataset.theme = Some(value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use serde_json::json;

    const GROUP_MAPPING: &str = "\
# theme to groups
[other]
ECON = nope

[dcatapit:theme_group_mapping]
ECON = economy01, economy02, test01
SOCI = society
    economy01
OP_DATPRO = test01
    test02, test03
";

    #[test]
    fn test_parse_theme_group_mapping() {
        let mapping = ThemeGroupMapping::from_ini_str(GROUP_MAPPING).expect("mapping");
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.groups_for("ECON"), ["economy01", "economy02", "test01"]);
        assert_eq!(mapping.groups_for("SOCI"), ["society", "economy01"]);
        assert_eq!(mapping.groups_for("OP_DATPRO"), ["test01", "test02", "test03"]);
        assert!(mapping.groups_for("econ").is_empty());

        assert!(matches!(
            ThemeGroupMapping::from_ini_str("[other]\na = b\n"),
            Err(DcatError::MissingConfiguration(_))
        ));
    }

    #[test]
    fn test_populate_theme_groups() {
        let mapping = ThemeGroupMapping::from_ini_str(GROUP_MAPPING).expect("mapping");
        let mut catalog = MemoryCatalog::new();
        catalog.create_group("society").expect("created");
        catalog.create_group("stale").expect("created");
        catalog.add_dataset_to_group("ds-1", "stale").expect("added");

        let mut ds = Dataset::named("ds");
        ds.id = Some("ds-1".into());
        ds.theme = Some("{SOCI}".into());

        let groups = mapping
            .populate_theme_groups(&ds, &mut catalog, false, false)
            .expect("assigned");
        assert_eq!(groups, ["society"]);
        assert_eq!(catalog.dataset_groups("ds-1"), ["stale", "society"]);

        let groups = mapping
            .populate_theme_groups(&ds, &mut catalog, true, true)
            .expect("assigned");
        assert_eq!(groups, ["society", "economy01"]);
        assert!(catalog.group_exists("economy01"));
        assert_eq!(catalog.dataset_groups("ds-1"), ["society", "economy01"]);
    }

    #[test]
    fn test_from_config_without_file() {
        let config = DcatapitConfig::default();
        assert!(ThemeGroupMapping::from_config(&config).expect("ok").is_none());
        let config = config.with_theme_group_mapping_file("/nonexistent/mapping.ini");
        assert!(ThemeGroupMapping::from_config(&config).expect("ok").is_none());
    }

    #[test]
    fn test_theme_mapping_formats() {
        let from_json = ThemeMapping::from_json_str(
            r#"{"data": [{"syn": ["econ", "Economia", "Finanza"]}, {"syn": ["soci", "Economia"]}]}"#,
        )
        .expect("json");
        assert_eq!(from_json.themes_for("economia"), ["econ", "soci"]);
        assert_eq!(from_json.themes_for("FINANZA"), ["econ"]);

        let from_ini = ThemeMapping::from_ini_str(
            "[dcatapit:terms_theme_mapping]\nEconomia = econ,\n    soci\n",
        )
        .expect("ini");
        assert_eq!(from_ini.len(), 1);
        assert_eq!(from_ini.themes_for("ECONOMIA"), from_json.themes_for("economia"));
    }

    #[test]
    fn test_new_themes() {
        let mapping = ThemeMapping::from_json_str(r#"{"data": [{"syn": ["ECON", "money"]}]}"#).expect("json");
        assert_eq!(mapping.new_themes(&["money", "other"], false), Some(vec!["ECON".to_string()]));
        assert_eq!(
            mapping.new_themes(&["money", "other"], true),
            Some(vec!["ECON".to_string(), "other".to_string()])
        );
        assert_eq!(mapping.new_themes(&["other"], true), None);
        assert_eq!(mapping.new_themes(&["other"], false), None);
    }

    #[test]
    fn test_map_nonconformant_groups() {
        let mapping = ThemeMapping::from_json_str(
            r#"{"data": [{"syn": ["econ", "economia"]}, {"syn": ["envi", "Ambiente"]}]}"#,
        )
        .expect("json");
        let mut ds = Dataset::named("harvested");
        ds.other.insert(
            "groups".into(),
            json!([{"name": "economia"}, {"name": "x", "display_name": "Ambiente"}]),
        );
        ds.set_extra("theme", "old");
        assert!(mapping.map_nonconformant_groups(&mut ds));
        assert_eq!(ds.extra("theme"), Some("{ECON,ENVI}"));
        assert_eq!(ds.extras.len(), 1);
        assert_eq!(ds.theme.as_deref(), Some("{ECON,ENVI}"));

        let mut plain = Dataset::named("plain");
        assert!(!mapping.map_nonconformant_groups(&mut plain));
    }
}
